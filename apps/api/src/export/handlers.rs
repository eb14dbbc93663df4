//! Axum route handlers for the layout export API.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, HeaderMap, HeaderName},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::layout::selector::TemplateProfile;
use crate::layout::{
    build_render_plan, generate, normalize, LayoutDocument, LayoutOptions, MenuCharacteristics,
    OutputContext, RenderOptions, Selection, Template, TemplateSelector, TemplateStore,
};
use crate::state::AppState;

pub const CALLER_ID_HEADER: &str = "x-caller-id";
pub const ANONYMOUS_CALLER: &str = "anonymous";

const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutRequest {
    /// Raw menu payload; normalised before layout.
    pub menu: Value,
    #[serde(default)]
    pub options: LayoutOptions,
    #[serde(default)]
    pub context: OutputContext,
    /// Pins a version of the selected template. Latest when absent.
    #[serde(default)]
    pub template_version: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderPlanRequest {
    #[serde(flatten)]
    pub layout: LayoutRequest,
    #[serde(default)]
    pub render_options: RenderOptions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutResponse {
    pub request_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub selection: Selection,
    pub characteristics: MenuCharacteristics,
    pub document: LayoutDocument,
}

#[derive(Debug, Serialize)]
pub struct TemplateListResponse {
    pub templates: Vec<TemplateProfile>,
}

#[derive(Debug, Deserialize)]
pub struct TemplateQuery {
    pub version: Option<u32>,
}

/// Everything one layout run produces, before it is shaped for a response.
struct LayoutOutcome {
    selection: Selection,
    characteristics: MenuCharacteristics,
    template: Arc<Template>,
    document: LayoutDocument,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/templates
///
/// Lists the latest version of every loaded template.
pub async fn handle_list_templates(State(state): State<AppState>) -> Json<TemplateListResponse> {
    Json(TemplateListResponse {
        templates: state.templates.profiles(),
    })
}

/// GET /api/v1/templates/:id
pub async fn handle_get_template(
    State(state): State<AppState>,
    Path(template_id): Path<String>,
    Query(query): Query<TemplateQuery>,
) -> Result<Json<Template>, AppError> {
    let template = state
        .templates
        .get(&template_id, query.version)
        .ok_or_else(|| AppError::NotFound(format!("Template '{template_id}' not found")))?;
    Ok(Json(template.as_ref().clone()))
}

/// POST /api/v1/layout
///
/// Normalise → select → generate. Returns the layout document with the
/// selection that produced it.
pub async fn handle_layout(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<LayoutRequest>, JsonRejection>,
) -> Result<Json<LayoutResponse>, AppError> {
    enforce_rate_limit(&state, &headers).await?;
    let Json(request) = payload.map_err(|e| AppError::Validation(e.body_text()))?;

    let request_id = Uuid::new_v4();
    let templates = Arc::clone(&state.templates);
    let selector = Arc::clone(&state.selector);
    let max_pages = state.config.max_pages;

    let outcome =
        run_blocking(move || run_layout(&templates, &selector, max_pages, request)).await?;
    log_outcome(request_id, &outcome);

    Ok(Json(LayoutResponse {
        request_id,
        generated_at: Utc::now(),
        selection: outcome.selection,
        characteristics: outcome.characteristics,
        document: outcome.document,
    }))
}

/// POST /api/v1/layout/render-plan
///
/// Same pipeline as `/layout`, then resolves the document into absolute
/// geometry and encodes it with the configured renderer.
pub async fn handle_render_plan(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<RenderPlanRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    enforce_rate_limit(&state, &headers).await?;
    let Json(request) = payload.map_err(|e| AppError::Validation(e.body_text()))?;

    let request_id = Uuid::new_v4();
    let templates = Arc::clone(&state.templates);
    let selector = Arc::clone(&state.selector);
    let renderer = Arc::clone(&state.renderer);
    let max_pages = state.config.max_pages;

    let bytes = run_blocking(move || {
        let outcome = run_layout(&templates, &selector, max_pages, request.layout)?;
        log_outcome(request_id, &outcome);
        let plan = build_render_plan(&outcome.document, &outcome.template, &request.render_options)?;
        Ok(renderer.render(&plan)?)
    })
    .await?;

    Ok((
        [
            (header::CONTENT_TYPE, state.renderer.content_type().to_string()),
            (REQUEST_ID_HEADER, request_id.to_string()),
        ],
        bytes,
    )
        .into_response())
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

fn caller_id(headers: &HeaderMap) -> &str {
    headers
        .get(CALLER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .unwrap_or(ANONYMOUS_CALLER)
}

async fn enforce_rate_limit(state: &AppState, headers: &HeaderMap) -> Result<(), AppError> {
    let caller = caller_id(headers);
    let decision = state.rate_limiter.check(caller).await;
    if decision.allowed {
        return Ok(());
    }
    let retry_after_secs = decision
        .retry_after
        .map(|d| d.as_secs_f64().ceil() as u64)
        .unwrap_or(1)
        .max(1);
    info!(caller_id = caller, retry_after_secs, "Layout request rate limited");
    Err(AppError::RateLimited { retry_after_secs })
}

/// Runs CPU-bound layout work off the async executor.
async fn run_blocking<T, F>(work: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work).await.map_err(|e| {
        AppError::Internal(anyhow::anyhow!("spawn_blocking failed in layout: {e}"))
    })?
}

fn run_layout(
    templates: &TemplateStore,
    selector: &TemplateSelector,
    max_pages: u32,
    request: LayoutRequest,
) -> Result<LayoutOutcome, AppError> {
    let menu = normalize(&request.menu)?;
    let characteristics = menu.characteristics();

    let selection = selector.select(
        &characteristics,
        request.context,
        request.options.preset_id.as_deref(),
    );
    let template = templates
        .get(&selection.template_id, request.template_version)
        .ok_or_else(|| {
            AppError::NotFound(format!("Template '{}' not found", selection.template_id))
        })?;

    let mut options = request.options;
    options.max_pages = Some(options.max_pages.map_or(max_pages, |m| m.min(max_pages)));

    let document = generate(&menu, &template, &options)?;
    Ok(LayoutOutcome {
        selection,
        characteristics,
        template,
        document,
    })
}

fn log_outcome(request_id: Uuid, outcome: &LayoutOutcome) {
    info!(
        %request_id,
        template_id = %outcome.selection.template_id,
        rule = ?outcome.selection.rule,
        items = outcome.characteristics.item_count,
        pages = outcome.document.total_pages(),
        tiles = outcome.document.tiles().count(),
        "Layout generated"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::selector::SelectionRule;
    use crate::layout::LayoutError;
    use axum::http::HeaderValue;
    use serde_json::json;

    fn make_request(menu: Value, options: Value) -> LayoutRequest {
        serde_json::from_value(json!({ "menu": menu, "options": options })).unwrap()
    }

    fn make_menu(items: usize, with_images: bool) -> Value {
        let items: Vec<Value> = (0..items)
            .map(|i| {
                let mut item = json!({ "name": format!("Dish {i}"), "price": 9.5 });
                if with_images {
                    item["imageUrl"] = json!(format!("dish-{i}.jpg"));
                }
                item
            })
            .collect();
        json!({
            "metadata": { "title": "Harbour Cafe", "currency": "EUR" },
            "sections": [{ "name": "Mains", "items": items }]
        })
    }

    fn make_services() -> (TemplateStore, TemplateSelector) {
        let store = TemplateStore::with_builtins().unwrap();
        let selector = TemplateSelector::new(store.profiles(), "classic-grid");
        (store, selector)
    }

    #[test]
    fn test_caller_id_defaults_to_anonymous() {
        let mut headers = HeaderMap::new();
        assert_eq!(caller_id(&headers), ANONYMOUS_CALLER);
        headers.insert(CALLER_ID_HEADER, HeaderValue::from_static("  "));
        assert_eq!(caller_id(&headers), ANONYMOUS_CALLER);
        headers.insert(CALLER_ID_HEADER, HeaderValue::from_static("kiosk-7"));
        assert_eq!(caller_id(&headers), "kiosk-7");
    }

    #[test]
    fn test_image_heavy_menu_selects_photo_grid() {
        let (store, selector) = make_services();
        let outcome = run_layout(&store, &selector, 12, make_request(make_menu(6, true), json!({})))
            .unwrap();
        assert_eq!(outcome.selection.template_id, "photo-grid");
        assert_eq!(outcome.selection.rule, SelectionRule::ImageHeavy);
        assert_eq!(outcome.document.template_id(), "photo-grid");
        assert_eq!(outcome.characteristics.item_count, 6);
    }

    #[test]
    fn test_preset_override_is_honoured() {
        let (store, selector) = make_services();
        let request = make_request(make_menu(3, true), json!({ "presetId": "legacy-flow" }));
        let outcome = run_layout(&store, &selector, 12, request).unwrap();
        assert_eq!(outcome.selection.rule, SelectionRule::Override);
        assert_eq!(outcome.document.template_id(), "legacy-flow");
    }

    #[test]
    fn test_unknown_preset_is_not_found() {
        let (store, selector) = make_services();
        let request = make_request(make_menu(3, false), json!({ "presetId": "nope" }));
        let err = run_layout(&store, &selector, 12, request).err().unwrap();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_caller_cannot_raise_page_ceiling() {
        let (store, selector) = make_services();
        let request = make_request(
            make_menu(60, true),
            json!({ "presetId": "classic-grid", "maxPages": 500 }),
        );
        let err = run_layout(&store, &selector, 1, request).err().unwrap();
        assert!(matches!(
            err,
            AppError::Layout(LayoutError::LayoutOverflow { max_pages: 1, .. })
        ));
    }
}
