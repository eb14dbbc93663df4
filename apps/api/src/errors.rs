use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::layout::{LayoutError, RenderError};

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Rate limit exceeded; retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<RenderError> for AppError {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::Layout(e) => AppError::Layout(e),
            other => AppError::Internal(anyhow::Error::new(other)),
        }
    }
}

/// Machine-readable error codes carried in every error payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    TemplateValidationError,
    InputValidationError,
    LayoutOverflow,
    NotFound,
    ValidationError,
    RateLimited,
    InternalError,
}

/// `{ error, code, details? }`
#[derive(Debug, Serialize)]
pub struct ErrorPayload {
    pub error: String,
    pub code: ErrorCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl AppError {
    fn parts(&self) -> (StatusCode, ErrorCode, Option<Value>) {
        match self {
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, ErrorCode::NotFound, None),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, ErrorCode::ValidationError, None),
            AppError::RateLimited { retry_after_secs } => (
                StatusCode::TOO_MANY_REQUESTS,
                ErrorCode::RateLimited,
                Some(json!({ "retryAfterSecs": retry_after_secs })),
            ),
            AppError::Layout(LayoutError::TemplateValidation {
                template_id, field, ..
            }) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorCode::TemplateValidationError,
                Some(json!({ "templateId": template_id, "field": field })),
            ),
            AppError::Layout(LayoutError::InputValidation { field, .. }) => (
                StatusCode::BAD_REQUEST,
                ErrorCode::InputValidationError,
                Some(json!({ "field": field })),
            ),
            AppError::Layout(LayoutError::LayoutOverflow {
                required_pages,
                max_pages,
            }) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorCode::LayoutOverflow,
                Some(json!({ "requiredPages": required_pages, "maxPages": max_pages })),
            ),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::InternalError,
                None,
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, details) = self.parts();

        let message = match &self {
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                "An internal server error occurred".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(ErrorPayload {
            error: message,
            code,
            details,
        });
        let mut response = (status, body).into_response();

        if let AppError::RateLimited { retry_after_secs } = self {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn make_payload(err: AppError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_input_validation_maps_to_400_with_field() {
        let (status, body) =
            make_payload(LayoutError::input("sections[0].items[1].price", "must be >= 0").into())
                .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INPUT_VALIDATION_ERROR");
        assert_eq!(body["details"]["field"], "sections[0].items[1].price");
        assert!(body["error"].as_str().unwrap().contains("must be >= 0"));
    }

    #[tokio::test]
    async fn test_overflow_maps_to_422() {
        let (status, body) = make_payload(
            LayoutError::LayoutOverflow {
                required_pages: 5,
                max_pages: 3,
            }
            .into(),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], "LAYOUT_OVERFLOW");
        assert_eq!(body["details"]["requiredPages"], 5);
    }

    #[tokio::test]
    async fn test_internal_error_hides_detail() {
        let (status, body) = make_payload(anyhow::anyhow!("disk on fire").into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "INTERNAL_ERROR");
        assert!(!body["error"].as_str().unwrap().contains("disk"));
        assert!(body.get("details").is_none());
    }

    #[test]
    fn test_rate_limited_sets_retry_after() {
        let response = AppError::RateLimited { retry_after_secs: 7 }.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "7");
    }

    #[test]
    fn test_render_layout_error_keeps_its_kind() {
        let err: AppError = RenderError::Layout(LayoutError::template("t", "regions", "bad")).into();
        assert!(matches!(err, AppError::Layout(LayoutError::TemplateValidation { .. })));
    }
}
