//! Layout strategies, one implementation per template definition format.
//!
//! The template's explicit `format` tag picks the strategy; the shape of the
//! definition is never inspected.

use tracing::debug;

use crate::layout::document::LayoutDocument;
use crate::layout::error::LayoutError;
use crate::layout::menu::LayoutMenu;
use crate::layout::options::LayoutOptions;
use crate::layout::placement::{place_with, ItemSizing};
use crate::layout::template::{LastRowBalancing, Template, TemplateFormat};

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

/// Turns a normalised menu into a paginated document for one template.
///
/// Implementations are pure and synchronous; callers on an async runtime run
/// them inside `spawn_blocking`.
pub trait LayoutStrategy: Send + Sync {
    fn format(&self) -> TemplateFormat;

    fn generate(
        &self,
        menu: &LayoutMenu,
        template: &Template,
        options: &LayoutOptions,
    ) -> Result<LayoutDocument, LayoutError>;
}

/// Returns the strategy registered for a definition format.
pub fn strategy_for(format: TemplateFormat) -> &'static dyn LayoutStrategy {
    match format {
        TemplateFormat::GridV2 => &GridLayoutV2,
        TemplateFormat::FlowV1 => &LegacyFlowV1,
    }
}

/// Dispatches on the template's format and generates its document.
pub fn generate(
    menu: &LayoutMenu,
    template: &Template,
    options: &LayoutOptions,
) -> Result<LayoutDocument, LayoutError> {
    strategy_for(template.format).generate(menu, template, options)
}

fn check_format(strategy: &dyn LayoutStrategy, template: &Template) -> Result<(), LayoutError> {
    if strategy.format() == template.format {
        return Ok(());
    }
    Err(LayoutError::template(
        &template.id,
        "format",
        format!(
            "template format {:?} cannot be generated by the {:?} strategy",
            template.format,
            strategy.format()
        ),
    ))
}

// ────────────────────────────────────────────────────────────────────────────
// GridLayoutV2: current format
// ────────────────────────────────────────────────────────────────────────────

/// Tile-spec driven grid placement with pagination, balancing and fillers.
pub struct GridLayoutV2;

impl LayoutStrategy for GridLayoutV2 {
    fn format(&self) -> TemplateFormat {
        TemplateFormat::GridV2
    }

    fn generate(
        &self,
        menu: &LayoutMenu,
        template: &Template,
        options: &LayoutOptions,
    ) -> Result<LayoutDocument, LayoutError> {
        check_format(self, template)?;
        let regions = template.regions()?;
        place_with(menu, template, &regions, options, ItemSizing::TemplateSpans)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// LegacyFlowV1: single-column flow
// ────────────────────────────────────────────────────────────────────────────

/// Legacy flow: every item is a full-width text row, images are ignored and
/// rows stay left-aligned.
pub struct LegacyFlowV1;

impl LayoutStrategy for LegacyFlowV1 {
    fn format(&self) -> TemplateFormat {
        TemplateFormat::FlowV1
    }

    fn generate(
        &self,
        menu: &LayoutMenu,
        template: &Template,
        options: &LayoutOptions,
    ) -> Result<LayoutDocument, LayoutError> {
        check_format(self, template)?;

        let mut flow = template.clone();
        flow.policies.last_row_balancing = LastRowBalancing::Left;
        let options = LayoutOptions {
            text_only: true,
            ..options.clone()
        };
        debug!(template_id = %template.id, "Generating legacy flow layout");

        let regions = flow.regions()?;
        place_with(menu, &flow, &regions, &options, ItemSizing::FullWidthRows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::document::TileBody;
    use crate::layout::menu::tests::make_menu;
    use crate::layout::template::tests::{reference_definition, reference_template};
    use crate::layout::template::TileType;
    use serde_json::json;

    fn legacy_template() -> Template {
        let mut def = reference_definition();
        def["id"] = json!("legacy");
        def["format"] = json!("flow-v1");
        Template::from_value(&def).unwrap()
    }

    #[test]
    fn test_strategy_for_matches_format() {
        assert_eq!(strategy_for(TemplateFormat::GridV2).format(), TemplateFormat::GridV2);
        assert_eq!(strategy_for(TemplateFormat::FlowV1).format(), TemplateFormat::FlowV1);
    }

    #[test]
    fn test_grid_strategy_produces_cards() {
        let doc = generate(&make_menu(&[4], true), &reference_template(), &LayoutOptions::default())
            .unwrap();
        assert_eq!(doc.count_of(TileType::ItemCard), 4);
        assert_eq!(doc.template_id(), "reference");
    }

    #[test]
    fn test_legacy_strategy_ignores_images_and_stacks_rows() {
        let template = legacy_template();
        let doc = generate(&make_menu(&[3], true), &template, &LayoutOptions::default()).unwrap();

        assert_eq!(doc.count_of(TileType::ItemCard), 0);
        assert_eq!(doc.count_of(TileType::ItemTextRow), 3);
        for (_, tile) in doc.tiles() {
            if let TileBody::ItemTextRow(content) = &tile.body {
                assert!(content.image_ref.is_none());
                assert_eq!(tile.grid.col, 0);
                assert_eq!(tile.grid.col_span, template.grid.cols);
            }
            assert!(tile.adjust.is_none());
        }
    }

    #[test]
    fn test_mismatched_strategy_is_rejected() {
        let err = GridLayoutV2
            .generate(&make_menu(&[1], false), &legacy_template(), &LayoutOptions::default())
            .unwrap_err();
        assert_eq!(err.field(), Some("format"));
    }
}
