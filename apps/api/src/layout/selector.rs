//! Template/Preset Selector: picks a template id for a menu and output context.
//!
//! Rules are evaluated in a fixed order; the first that yields a candidate wins:
//! 1. `Override`: caller-supplied preset id, unconditionally
//! 2. `ImageHeavy`: image ratio ≥ 0.5 → grid templates with image-capable cards
//! 3. `Dense`: many items (or many short items) → compact text-row templates
//! 4. `NarrowContext`: mobile output → grid templates with at most 2 columns
//! 5. `Default`: the configured default template
//!
//! Rules 2–4 only consider `grid-v2` templates that list the requested context.
//! Ties go to the highest `priority`, then the lexicographically smallest id.
//! Selection is a pure function of its inputs.

use serde::{Deserialize, Serialize};

use crate::layout::menu::MenuCharacteristics;
use crate::layout::template::{Template, TemplateFormat};

pub const IMAGE_HEAVY_RATIO: f64 = 0.5;
pub const DENSE_ITEM_COUNT: u32 = 40;
pub const SHORT_ITEM_COUNT: u32 = 24;
pub const SHORT_DESCRIPTION_CHARS: f64 = 40.0;
pub const NARROW_MAX_COLS: u16 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputContext {
    Mobile,
    Tablet,
    Desktop,
    #[default]
    Print,
}

impl OutputContext {
    pub const ALL: [OutputContext; 4] = [
        OutputContext::Mobile,
        OutputContext::Tablet,
        OutputContext::Desktop,
        OutputContext::Print,
    ];

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "mobile" => Some(OutputContext::Mobile),
            "tablet" => Some(OutputContext::Tablet),
            "desktop" => Some(OutputContext::Desktop),
            "print" => Some(OutputContext::Print),
            _ => None,
        }
    }
}

/// The facts about a template that selection rules look at.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateProfile {
    pub id: String,
    pub version: u32,
    pub name: String,
    pub format: TemplateFormat,
    pub priority: u32,
    pub contexts: Vec<OutputContext>,
    pub cols: u16,
    pub image_capable: bool,
    pub compact: bool,
}

impl From<&Template> for TemplateProfile {
    fn from(template: &Template) -> Self {
        TemplateProfile {
            id: template.id.clone(),
            version: template.version,
            name: template.name.clone(),
            format: template.format,
            priority: template.priority,
            contexts: template.contexts.clone(),
            cols: template.grid.cols,
            image_capable: template.supports_images(),
            compact: template.is_compact(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SelectionRule {
    Override,
    ImageHeavy,
    Dense,
    NarrowContext,
    Default,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub template_id: String,
    pub rule: SelectionRule,
}

/// Inputs that stay fixed across requests.
#[derive(Debug, Clone)]
pub struct TemplateSelector {
    profiles: Vec<TemplateProfile>,
    default_template_id: String,
}

impl TemplateSelector {
    pub fn new(profiles: Vec<TemplateProfile>, default_template_id: impl Into<String>) -> Self {
        TemplateSelector {
            profiles,
            default_template_id: default_template_id.into(),
        }
    }

    pub fn select(
        &self,
        characteristics: &MenuCharacteristics,
        context: OutputContext,
        override_id: Option<&str>,
    ) -> Selection {
        if let Some(id) = override_id.map(str::trim).filter(|id| !id.is_empty()) {
            return Selection {
                template_id: id.to_string(),
                rule: SelectionRule::Override,
            };
        }

        let rules: [(SelectionRule, bool, fn(&TemplateProfile) -> bool); 3] = [
            (
                SelectionRule::ImageHeavy,
                is_image_heavy(characteristics),
                has_image_cards,
            ),
            (SelectionRule::Dense, is_dense(characteristics), has_compact_rows),
            (
                SelectionRule::NarrowContext,
                context == OutputContext::Mobile,
                is_narrow,
            ),
        ];

        for (rule, applies, fits) in rules {
            if !applies {
                continue;
            }
            if let Some(profile) = self.best_match(context, fits) {
                return Selection {
                    template_id: profile.id.clone(),
                    rule,
                };
            }
        }

        Selection {
            template_id: self.default_template_id.clone(),
            rule: SelectionRule::Default,
        }
    }

    fn best_match(
        &self,
        context: OutputContext,
        fits: fn(&TemplateProfile) -> bool,
    ) -> Option<&TemplateProfile> {
        self.profiles
            .iter()
            .filter(|p| p.format == TemplateFormat::GridV2)
            .filter(|p| p.contexts.contains(&context))
            .filter(|p| fits(p))
            .min_by(|a, b| b.priority.cmp(&a.priority).then_with(|| a.id.cmp(&b.id)))
    }
}

fn has_image_cards(profile: &TemplateProfile) -> bool {
    profile.image_capable
}

fn has_compact_rows(profile: &TemplateProfile) -> bool {
    profile.compact
}

fn is_narrow(profile: &TemplateProfile) -> bool {
    profile.cols <= NARROW_MAX_COLS
}

fn is_image_heavy(c: &MenuCharacteristics) -> bool {
    c.item_count > 0 && c.image_ratio >= IMAGE_HEAVY_RATIO
}

fn is_dense(c: &MenuCharacteristics) -> bool {
    c.item_count >= DENSE_ITEM_COUNT
        || (c.item_count >= SHORT_ITEM_COUNT
            && c.average_description_length < SHORT_DESCRIPTION_CHARS)
}
