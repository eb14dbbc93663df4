pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::export::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Template catalogue
        .route("/api/v1/templates", get(handlers::handle_list_templates))
        .route("/api/v1/templates/:id", get(handlers::handle_get_template))
        // Layout export
        .route("/api/v1/layout", post(handlers::handle_layout))
        .route(
            "/api/v1/layout/render-plan",
            post(handlers::handle_render_plan),
        )
        .with_state(state)
}
