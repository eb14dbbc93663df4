//! Caller-facing option surfaces for layout and rendering.

use serde::{Deserialize, Deserializer, Serialize};

/// How item images are presented. Unknown values degrade to `Stretch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImageMode {
    None,
    CompactRect,
    CompactCircle,
    #[default]
    Stretch,
    Background,
}

impl ImageMode {
    /// Lenient parse: anything unrecognised becomes `Stretch`.
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "none" => ImageMode::None,
            "compact-rect" => ImageMode::CompactRect,
            "compact-circle" => ImageMode::CompactCircle,
            "stretch" => ImageMode::Stretch,
            "background" => ImageMode::Background,
            other => {
                tracing::debug!(image_mode = other, "Unknown image mode, falling back to stretch");
                ImageMode::Stretch
            }
        }
    }

    pub fn shows_images(self) -> bool {
        self != ImageMode::None
    }
}

impl<'de> Deserialize<'de> for ImageMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(ImageMode::parse_lenient(&raw))
    }
}

fn default_true() -> bool {
    true
}

/// Options for a single layout run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutOptions {
    #[serde(default)]
    pub text_only: bool,
    /// `None` defers to the template's `fillerEnabled` policy.
    #[serde(default)]
    pub fillers_enabled: Option<bool>,
    /// Passed through to the renderer; no effect on placement.
    #[serde(default)]
    pub textures_enabled: bool,
    #[serde(default = "default_true")]
    pub show_menu_title: bool,
    #[serde(default)]
    pub image_mode: ImageMode,
    #[serde(default)]
    pub preset_id: Option<String>,
    /// Page ceiling for this run. The service clamps it to its configured maximum.
    #[serde(default)]
    pub max_pages: Option<u32>,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        LayoutOptions {
            text_only: false,
            fillers_enabled: None,
            textures_enabled: false,
            show_menu_title: true,
            image_mode: ImageMode::default(),
            preset_id: None,
            max_pages: None,
        }
    }
}

impl LayoutOptions {
    /// Whether items with an image reference should become cards.
    pub fn wants_image_cards(&self) -> bool {
        !self.text_only && self.image_mode.shows_images()
    }
}

pub const MIN_PIXEL_RATIO: f64 = 0.5;
pub const MAX_PIXEL_RATIO: f64 = 4.0;

fn default_pixel_ratio() -> f64 {
    1.0
}

fn default_background() -> String {
    "#FFFFFF".to_string()
}

/// Options consumed by the external renderer alongside a `LayoutDocument`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderOptions {
    #[serde(default)]
    pub image_mode: ImageMode,
    #[serde(default = "default_pixel_ratio")]
    pub pixel_ratio: f64,
    #[serde(default = "default_background")]
    pub background_color: String,
    #[serde(default)]
    pub print_page_numbers: bool,
    #[serde(default)]
    pub textures_enabled: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            image_mode: ImageMode::default(),
            pixel_ratio: default_pixel_ratio(),
            background_color: default_background(),
            print_page_numbers: false,
            textures_enabled: false,
        }
    }
}

impl RenderOptions {
    /// Clamps the pixel ratio and replaces a malformed colour with white.
    pub fn sanitized(mut self) -> Self {
        self.pixel_ratio = if self.pixel_ratio.is_finite() {
            self.pixel_ratio.clamp(MIN_PIXEL_RATIO, MAX_PIXEL_RATIO)
        } else {
            default_pixel_ratio()
        };
        if !is_hex_color(&self.background_color) {
            self.background_color = default_background();
        }
        self.background_color = self.background_color.to_uppercase();
        self
    }
}

fn is_hex_color(raw: &str) -> bool {
    raw.len() == 7
        && raw.starts_with('#')
        && raw.chars().skip(1).all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_image_mode_falls_back_to_stretch() {
        let options: LayoutOptions =
            serde_json::from_str(r#"{ "imageMode": "hologram" }"#).unwrap();
        assert_eq!(options.image_mode, ImageMode::Stretch);
    }

    #[test]
    fn test_known_image_modes_parse() {
        assert_eq!(ImageMode::parse_lenient("compact-circle"), ImageMode::CompactCircle);
        assert_eq!(ImageMode::parse_lenient(" NONE "), ImageMode::None);
        assert_eq!(
            serde_json::to_string(&ImageMode::CompactRect).unwrap(),
            "\"compact-rect\""
        );
    }

    #[test]
    fn test_layout_option_defaults() {
        let options: LayoutOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, LayoutOptions::default());
        assert!(options.show_menu_title);
        assert!(options.wants_image_cards());
    }

    #[test]
    fn test_text_only_disables_cards() {
        let options = LayoutOptions {
            text_only: true,
            ..LayoutOptions::default()
        };
        assert!(!options.wants_image_cards());
    }

    #[test]
    fn test_render_options_sanitized() {
        let options = RenderOptions {
            pixel_ratio: 12.0,
            background_color: "red".to_string(),
            ..RenderOptions::default()
        }
        .sanitized();
        assert_eq!(options.pixel_ratio, MAX_PIXEL_RATIO);
        assert_eq!(options.background_color, "#FFFFFF");

        let lower = RenderOptions {
            background_color: "#fafafa".to_string(),
            ..RenderOptions::default()
        }
        .sanitized();
        assert_eq!(lower.background_color, "#FAFAFA");
    }
}
