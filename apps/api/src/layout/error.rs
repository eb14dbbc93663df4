//! Fatal layout failures.
//!
//! All three kinds are all-or-nothing: a caller never receives a partially
//! built `LayoutDocument` alongside one of these.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    /// The template is internally inconsistent. Raised at load time.
    #[error("template '{template_id}' is invalid at '{field}': {message}")]
    TemplateValidation {
        template_id: String,
        field: String,
        message: String,
    },

    /// Menu content could not be coerced into the canonical shape.
    #[error("menu input is invalid at '{field}': {message}")]
    InputValidation { field: String, message: String },

    /// Content needs more pages than the configured ceiling allows.
    #[error("layout needs {required_pages} pages but at most {max_pages} are allowed")]
    LayoutOverflow { required_pages: u32, max_pages: u32 },
}

impl LayoutError {
    pub fn template(
        template_id: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        LayoutError::TemplateValidation {
            template_id: template_id.into(),
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn input(field: impl Into<String>, message: impl Into<String>) -> Self {
        LayoutError::InputValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// The offending field path, when the error carries one.
    pub fn field(&self) -> Option<&str> {
        match self {
            LayoutError::TemplateValidation { field, .. } => Some(field),
            LayoutError::InputValidation { field, .. } => Some(field),
            LayoutError::LayoutOverflow { .. } => None,
        }
    }
}
