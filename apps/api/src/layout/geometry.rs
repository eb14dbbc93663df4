//! Page geometry in typographic points (1pt = 1/72 inch).
//!
//! All derived measurements are rounded to hundredths of a point so that
//! region stacking and grid maths stay reproducible across platforms.

use serde::{Deserialize, Serialize};

use crate::layout::error::LayoutError;

/// Tolerance used when comparing point values that went through arithmetic.
pub const PT_EPSILON: f64 = 0.005;

/// Rounds a point value to hundredths.
pub fn round_pt(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Approximate equality for point values.
pub fn pt_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= PT_EPSILON
}

// ────────────────────────────────────────────────────────────────────────────
// Named sheets
// ────────────────────────────────────────────────────────────────────────────

/// Named sheet sizes supported by templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PageSize {
    A3Portrait,
    A3Landscape,
    A4Portrait,
    A4Landscape,
    A5Portrait,
    A5Landscape,
    LetterPortrait,
    LetterLandscape,
    LegalPortrait,
    LegalLandscape,
    TabloidPortrait,
    TabloidLandscape,
}

impl PageSize {
    /// Returns `(width, height)` in points.
    pub fn dimensions(self) -> (f64, f64) {
        let (short, long) = match self {
            PageSize::A3Portrait | PageSize::A3Landscape => (841.89, 1190.55),
            PageSize::A4Portrait | PageSize::A4Landscape => (595.28, 841.89),
            PageSize::A5Portrait | PageSize::A5Landscape => (419.53, 595.28),
            PageSize::LetterPortrait | PageSize::LetterLandscape => (612.0, 792.0),
            PageSize::LegalPortrait | PageSize::LegalLandscape => (612.0, 1008.0),
            PageSize::TabloidPortrait | PageSize::TabloidLandscape => (792.0, 1224.0),
        };
        if self.is_landscape() {
            (long, short)
        } else {
            (short, long)
        }
    }

    pub fn is_landscape(self) -> bool {
        matches!(
            self,
            PageSize::A3Landscape
                | PageSize::A4Landscape
                | PageSize::A5Landscape
                | PageSize::LetterLandscape
                | PageSize::LegalLandscape
                | PageSize::TabloidLandscape
        )
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Margins and resolved page spec
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margins {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Margins {
    pub fn uniform(value: f64) -> Self {
        Margins {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }

    pub fn horizontal(&self) -> f64 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f64 {
        self.top + self.bottom
    }
}

/// A resolved page: named size, concrete dimensions, margins.
///
/// Immutable once resolved; construct through [`PageSpec::resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSpec {
    pub size: PageSize,
    pub width: f64,
    pub height: f64,
    pub margins: Margins,
}

impl PageSpec {
    /// Resolves a named size with margins, rejecting margins that leave no
    /// printable area. `template_id` is only used for error reporting.
    pub fn resolve(size: PageSize, margins: Margins, template_id: &str) -> Result<Self, LayoutError> {
        let sides = [
            ("top", margins.top),
            ("right", margins.right),
            ("bottom", margins.bottom),
            ("left", margins.left),
        ];
        for (side, value) in sides {
            if !value.is_finite() || value < 0.0 {
                return Err(LayoutError::template(
                    template_id,
                    format!("page.margins.{side}"),
                    format!("must be a finite value >= 0, got {value}"),
                ));
            }
        }

        let (width, height) = size.dimensions();
        let spec = PageSpec {
            size,
            width,
            height,
            margins,
        };

        if spec.content_width() <= 0.0 {
            return Err(LayoutError::template(
                template_id,
                "page.margins",
                format!(
                    "left + right margins ({:.2}pt) leave no content width on a {:.2}pt page",
                    margins.horizontal(),
                    width
                ),
            ));
        }
        if spec.content_height() <= 0.0 {
            return Err(LayoutError::template(
                template_id,
                "page.margins",
                format!(
                    "top + bottom margins ({:.2}pt) leave no content height on a {:.2}pt page",
                    margins.vertical(),
                    height
                ),
            ));
        }

        Ok(spec)
    }

    pub fn content_width(&self) -> f64 {
        round_pt(self.width - self.margins.horizontal())
    }

    pub fn content_height(&self) -> f64 {
        round_pt(self.height - self.margins.vertical())
    }
}
