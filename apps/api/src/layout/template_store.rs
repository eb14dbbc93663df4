//! Template store: validated templates cached by `(id, version)`.
//!
//! Built-in definitions are compiled in; `TEMPLATE_DIR` may add more at
//! startup. Every definition is validated before it is cached, and a single
//! invalid file aborts loading. Cached templates are immutable `Arc`s, so
//! readers never contend beyond the brief read lock.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use anyhow::Context;
use tracing::{info, warn};

use crate::layout::error::LayoutError;
use crate::layout::selector::TemplateProfile;
use crate::layout::template::Template;

const BUILTIN_TEMPLATES: [(&str, &str); 5] = [
    ("classic-grid.json", include_str!("../../templates/classic-grid.json")),
    ("photo-grid.json", include_str!("../../templates/photo-grid.json")),
    ("compact-list.json", include_str!("../../templates/compact-list.json")),
    ("mobile-stack.json", include_str!("../../templates/mobile-stack.json")),
    ("legacy-flow.json", include_str!("../../templates/legacy-flow.json")),
];

type TemplateKey = (String, u32);

#[derive(Debug, Default)]
pub struct TemplateStore {
    templates: RwLock<HashMap<TemplateKey, Arc<Template>>>,
}

impl TemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding the compiled-in templates.
    pub fn with_builtins() -> Result<Self, LayoutError> {
        let store = Self::new();
        for (name, raw) in BUILTIN_TEMPLATES {
            let template = store.insert_json(raw).inspect_err(|e| {
                warn!(file = name, error = %e, "Rejected built-in template");
            })?;
            info!(
                template_id = %template.id,
                version = template.version,
                rows_per_page = template.rows_per_page,
                "Loaded built-in template"
            );
        }
        Ok(store)
    }

    /// Validates and caches one template.
    pub fn insert(&self, template: Template) -> Result<Arc<Template>, LayoutError> {
        let key = (template.id.clone(), template.version);
        let mut templates = self.templates.write().unwrap_or_else(PoisonError::into_inner);
        if templates.contains_key(&key) {
            return Err(LayoutError::template(
                &template.id,
                "version",
                format!("version {} is already registered", template.version),
            ));
        }
        let template = Arc::new(template);
        templates.insert(key, Arc::clone(&template));
        Ok(template)
    }

    pub fn insert_json(&self, raw: &str) -> Result<Arc<Template>, LayoutError> {
        self.insert(Template::from_json_str(raw)?)
    }

    /// Loads every `*.json` file in `dir`, in file-name order. Fails on the
    /// first invalid definition.
    pub fn load_dir(&self, dir: &Path) -> anyhow::Result<usize> {
        let mut paths: Vec<PathBuf> = fs::read_dir(dir)
            .with_context(|| format!("Failed to read template directory '{}'", dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        for path in &paths {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("Failed to read template file '{}'", path.display()))?;
            let template = self.insert_json(&raw).map_err(|e| {
                warn!(file = %path.display(), error = %e, "Rejected template file");
                anyhow::Error::new(e)
                    .context(format!("Invalid template file '{}'", path.display()))
            })?;
            info!(
                template_id = %template.id,
                version = template.version,
                file = %path.display(),
                "Loaded template"
            );
        }

        Ok(paths.len())
    }

    /// Resolves a template. `None` selects the highest registered version.
    pub fn get(&self, id: &str, version: Option<u32>) -> Option<Arc<Template>> {
        let templates = self.templates.read().unwrap_or_else(PoisonError::into_inner);
        match version {
            Some(version) => templates.get(&(id.to_string(), version)).cloned(),
            None => templates
                .iter()
                .filter(|((key_id, _), _)| key_id == id)
                .max_by_key(|((_, key_version), _)| *key_version)
                .map(|(_, template)| Arc::clone(template)),
        }
    }

    /// Profiles of the latest version of every template, ordered by id.
    pub fn profiles(&self) -> Vec<TemplateProfile> {
        let templates = self.templates.read().unwrap_or_else(PoisonError::into_inner);
        let mut latest: HashMap<&str, &Arc<Template>> = HashMap::new();
        for ((id, version), template) in templates.iter() {
            let newer = latest
                .get(id.as_str())
                .map_or(true, |current| current.version < *version);
            if newer {
                latest.insert(id.as_str(), template);
            }
        }

        let mut profiles: Vec<TemplateProfile> = latest
            .into_values()
            .map(|template| TemplateProfile::from(template.as_ref()))
            .collect();
        profiles.sort_by(|a, b| a.id.cmp(&b.id));
        profiles
    }

    pub fn len(&self) -> usize {
        self.templates
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
