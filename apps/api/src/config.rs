use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{ensure, Context, Result};

/// Application configuration loaded from environment variables.
/// Every variable has a default; malformed values fail startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    /// Extra template definitions loaded on top of the built-ins.
    pub template_dir: Option<PathBuf>,
    pub default_template_id: String,
    /// Ceiling for pages per layout; callers may only lower it.
    pub max_pages: u32,
    pub rate_limit_burst: u32,
    pub rate_limit_per_minute: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 8080,
            rust_log: "info".to_string(),
            template_dir: None,
            default_template_id: "classic-grid".to_string(),
            max_pages: 12,
            rate_limit_burst: 10,
            rate_limit_per_minute: 30,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup, falling back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Config::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let config = Config {
            port: parse_or(&var, "PORT", defaults.port)?,
            rust_log: var("RUST_LOG").unwrap_or(defaults.rust_log),
            template_dir: var("TEMPLATE_DIR").map(PathBuf::from),
            default_template_id: var("DEFAULT_TEMPLATE_ID")
                .map(|v| v.trim().to_string())
                .unwrap_or(defaults.default_template_id),
            max_pages: parse_or(&var, "MAX_PAGES", defaults.max_pages)?,
            rate_limit_burst: parse_or(&var, "RATE_LIMIT_BURST", defaults.rate_limit_burst)?,
            rate_limit_per_minute: parse_or(
                &var,
                "RATE_LIMIT_PER_MINUTE",
                defaults.rate_limit_per_minute,
            )?,
        };

        ensure!(config.max_pages >= 1, "MAX_PAGES must be at least 1");
        ensure!(config.rate_limit_burst >= 1, "RATE_LIMIT_BURST must be at least 1");
        ensure!(
            config.rate_limit_per_minute >= 1,
            "RATE_LIMIT_PER_MINUTE must be at least 1"
        );
        Ok(config)
    }
}

fn parse_or<T>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn make_config(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_apply_when_unset() {
        let config = make_config(&[]).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.rust_log, "info");
        assert!(config.template_dir.is_none());
        assert_eq!(config.default_template_id, "classic-grid");
        assert_eq!(config.max_pages, 12);
        assert_eq!(config.rate_limit_burst, 10);
        assert_eq!(config.rate_limit_per_minute, 30);
    }

    #[test]
    fn test_values_are_read() {
        let config = make_config(&[
            ("PORT", "9000"),
            ("TEMPLATE_DIR", "/etc/menu-templates"),
            ("DEFAULT_TEMPLATE_ID", " photo-grid "),
            ("MAX_PAGES", "4"),
        ])
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.template_dir, Some(PathBuf::from("/etc/menu-templates")));
        assert_eq!(config.default_template_id, "photo-grid");
        assert_eq!(config.max_pages, 4);
    }

    #[test]
    fn test_invalid_number_names_the_variable() {
        let err = make_config(&[("MAX_PAGES", "lots")]).unwrap_err();
        assert!(err.to_string().contains("MAX_PAGES"), "{err}");
    }

    #[test]
    fn test_zero_limits_are_rejected() {
        assert!(make_config(&[("MAX_PAGES", "0")]).is_err());
        assert!(make_config(&[("RATE_LIMIT_PER_MINUTE", "0")]).is_err());
    }

    #[test]
    fn test_blank_values_fall_back_to_defaults() {
        let config = make_config(&[("PORT", "  "), ("TEMPLATE_DIR", "")]).unwrap();
        assert_eq!(config.port, 8080);
        assert!(config.template_dir.is_none());
    }
}
