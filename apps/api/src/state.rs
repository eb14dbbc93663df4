use std::sync::Arc;

use anyhow::{ensure, Context, Result};
use tracing::info;

use crate::config::Config;
use crate::layout::{JsonPlanRenderer, Renderer, TemplateSelector, TemplateStore};
use crate::rate_limit::{RateLimiter, TokenBucketLimiter};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Validated templates, read-only after startup.
    pub templates: Arc<TemplateStore>,
    pub selector: Arc<TemplateSelector>,
    /// Pluggable limiter. Default: in-memory TokenBucketLimiter.
    pub rate_limiter: Arc<dyn RateLimiter>,
    /// Encodes render plans. Default: JsonPlanRenderer.
    pub renderer: Arc<dyn Renderer>,
}

impl AppState {
    /// Loads and validates every template, then wires the default services.
    /// Any invalid template aborts startup.
    pub fn new(config: Config) -> Result<Self> {
        let templates = TemplateStore::with_builtins().context("Built-in templates are invalid")?;
        if let Some(dir) = &config.template_dir {
            let loaded = templates.load_dir(dir)?;
            info!("Loaded {loaded} template file(s) from {}", dir.display());
        }

        ensure!(
            templates.get(&config.default_template_id, None).is_some(),
            "DEFAULT_TEMPLATE_ID '{}' does not name a loaded template",
            config.default_template_id
        );

        let selector = TemplateSelector::new(templates.profiles(), config.default_template_id.clone());
        let rate_limiter = Arc::new(TokenBucketLimiter::new(
            config.rate_limit_burst,
            config.rate_limit_per_minute,
        ));

        Ok(AppState {
            config,
            templates: Arc::new(templates),
            selector: Arc::new(selector),
            rate_limiter,
            renderer: Arc::new(JsonPlanRenderer),
        })
    }
}
