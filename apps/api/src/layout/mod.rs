// Menu layout engine: regions, templates, selection, grid placement, render plans.
// Layout generation is pure and CPU-bound; handlers run it inside tokio::task::spawn_blocking.

pub mod document;
pub mod engine;
pub mod error;
pub mod fields;
pub mod geometry;
pub mod menu;
pub mod options;
pub mod placement;
pub mod regions;
pub mod render;
pub mod selector;
pub mod template;
pub mod template_store;

// Re-export the public API consumed by the HTTP layer.
pub use document::LayoutDocument;
pub use engine::generate;
pub use error::LayoutError;
pub use menu::{normalize, LayoutMenu, MenuCharacteristics};
pub use options::{LayoutOptions, RenderOptions};
pub use render::{build_render_plan, JsonPlanRenderer, RenderError, RenderPlan, Renderer};
pub use selector::{OutputContext, Selection, TemplateSelector};
pub use template::Template;
pub use template_store::TemplateStore;
