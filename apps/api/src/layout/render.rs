//! Renderer boundary.
//!
//! Resolves a `LayoutDocument` into absolute page rectangles (points, margins
//! included) and one `DrawCommand` per tile. Rasterisers consume the plan
//! as-is and never make a layout decision of their own.
//!
//! Body tile position:
//!   x = margin.left + region.x + col * (cellWidth + gapX) + adjust.offsetX
//!   y = margin.top  + region.y + row * (rowHeight + gapY)
//! Tiles in the other regions fill their band.

use serde::Serialize;
use thiserror::Error;

use crate::layout::document::{ItemContent, LayoutDocument, Tile, TileBody};
use crate::layout::error::LayoutError;
use crate::layout::geometry::{round_pt, PT_EPSILON};
use crate::layout::menu::DietaryIndicator;
use crate::layout::options::{ImageMode, RenderOptions};
use crate::layout::regions::{find_region, Region, RegionId};
use crate::layout::template::{ItemIndicatorMode, Template};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("document was laid out with template '{document}' but '{template}' was supplied")]
    TemplateMismatch { document: String, template: String },

    #[error("tile '{tile_id}' on page {page_index} escapes the {region} region")]
    TileOutOfBounds {
        page_index: u32,
        tile_id: String,
        region: &'static str,
    },

    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error("failed to encode render plan: {0}")]
    Encode(#[from] serde_json::Error),
}

// ────────────────────────────────────────────────────────────────────────────
// Plan types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    fn of_region(region: &Region, left: f64, top: f64) -> Self {
        Rect {
            x: round_pt(left + region.x),
            y: round_pt(top + region.y),
            width: region.width,
            height: region.height,
        }
    }

    fn contains(&self, other: &Rect) -> bool {
        other.x >= self.x - PT_EPSILON
            && other.y >= self.y - PT_EPSILON
            && other.x + other.width <= self.x + self.width + PT_EPSILON
            && other.y + other.height <= self.y + self.height + PT_EPSILON
    }
}

/// What to draw in a tile rectangle.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DrawCommand {
    #[serde(rename_all = "camelCase")]
    Title { text: String, currency: String },
    #[serde(rename_all = "camelCase")]
    SectionHeader { text: String },
    #[serde(rename_all = "camelCase")]
    ItemCard {
        name: String,
        price: String,
        description: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        image_ref: Option<String>,
        image_mode: ImageMode,
        featured: bool,
        indicators: Vec<DietaryIndicator>,
        indicator_mode: ItemIndicatorMode,
    },
    #[serde(rename_all = "camelCase")]
    ItemTextRow {
        name: String,
        price: String,
        description: String,
        featured: bool,
        indicators: Vec<DietaryIndicator>,
        indicator_mode: ItemIndicatorMode,
    },
    #[serde(rename_all = "camelCase")]
    Filler { variant: u8, textured: bool },
    #[serde(rename_all = "camelCase")]
    PageNumber { text: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedTile {
    pub tile_id: String,
    pub region: RegionId,
    pub rect: Rect,
    pub command: DrawCommand,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedPage {
    pub page_index: u32,
    pub width: f64,
    pub height: f64,
    pub tiles: Vec<RenderedTile>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderPlan {
    pub template_id: String,
    pub template_version: u32,
    pub pixel_ratio: f64,
    pub background_color: String,
    pub pages: Vec<RenderedPage>,
}

// ────────────────────────────────────────────────────────────────────────────
// Plan construction
// ────────────────────────────────────────────────────────────────────────────

/// Resolves every tile of `document` to an absolute rectangle and draw command.
pub fn build_render_plan(
    document: &LayoutDocument,
    template: &Template,
    options: &RenderOptions,
) -> Result<RenderPlan, RenderError> {
    if document.template_id() != template.id || document.template_version() != template.version {
        return Err(RenderError::TemplateMismatch {
            document: format!("{}@{}", document.template_id(), document.template_version()),
            template: format!("{}@{}", template.id, template.version),
        });
    }

    let options = options.clone().sanitized();
    let regions = template.regions()?;
    let left = template.page.margins.left;
    let top = template.page.margins.top;

    let mut pages = Vec::with_capacity(document.pages().len());
    for page in document.pages() {
        let mut tiles = Vec::with_capacity(page.tiles.len() + 1);

        for tile in &page.tiles {
            let region = region_of(&regions, tile.region, template)?;
            let bounds = Rect::of_region(region, left, top);
            let rect = match tile.region {
                RegionId::Body => body_rect(tile, template, &bounds),
                _ => bounds,
            };
            if !bounds.contains(&rect) {
                return Err(RenderError::TileOutOfBounds {
                    page_index: page.page_index,
                    tile_id: tile.id.clone(),
                    region: tile.region.as_str(),
                });
            }
            tiles.push(RenderedTile {
                tile_id: tile.id.clone(),
                region: tile.region,
                rect,
                command: draw_command(&tile.body, &options),
            });
        }

        if options.print_page_numbers {
            let footer = region_of(&regions, RegionId::Footer, template)?;
            tiles.push(RenderedTile {
                tile_id: format!("page-number-{}", page.page_index),
                region: RegionId::Footer,
                rect: Rect::of_region(footer, left, top),
                command: DrawCommand::PageNumber {
                    text: format!("{} / {}", page.page_index + 1, document.total_pages()),
                },
            });
        }

        pages.push(RenderedPage {
            page_index: page.page_index,
            width: template.page.width,
            height: template.page.height,
            tiles,
        });
    }

    Ok(RenderPlan {
        template_id: template.id.clone(),
        template_version: template.version,
        pixel_ratio: options.pixel_ratio,
        background_color: options.background_color,
        pages,
    })
}

fn region_of<'r>(
    regions: &'r [Region],
    id: RegionId,
    template: &Template,
) -> Result<&'r Region, RenderError> {
    find_region(regions, id).ok_or_else(|| {
        RenderError::Layout(LayoutError::template(
            &template.id,
            format!("regions.{}", id.as_str()),
            "required region is missing",
        ))
    })
}

fn body_rect(tile: &Tile, template: &Template, body: &Rect) -> Rect {
    let grid = &template.grid;
    let cell_width = grid.cell_width(body.width);
    let col_span = f64::from(tile.grid.col_span);
    let row_span = f64::from(tile.grid.row_span);

    let natural_width = col_span * cell_width + (col_span - 1.0) * grid.gap_x;
    let (offset_x, width) = match tile.adjust {
        Some(adjust) => (adjust.offset_x, adjust.width),
        None => (0.0, natural_width),
    };

    Rect {
        x: round_pt(body.x + f64::from(tile.grid.col) * (cell_width + grid.gap_x) + offset_x),
        y: round_pt(body.y + f64::from(tile.grid.row) * (grid.row_height + grid.gap_y)),
        width: round_pt(width),
        height: round_pt(row_span * grid.row_height + (row_span - 1.0) * grid.gap_y),
    }
}

fn draw_command(body: &TileBody, options: &RenderOptions) -> DrawCommand {
    match body {
        TileBody::Title(content) => DrawCommand::Title {
            text: content.title.clone(),
            currency: content.currency.code().to_string(),
        },
        TileBody::SectionHeader(content) => DrawCommand::SectionHeader {
            text: content.name.clone(),
        },
        TileBody::ItemCard(content) => DrawCommand::ItemCard {
            name: content.name.clone(),
            price: content.formatted_price.clone(),
            description: content.description.clone(),
            image_ref: content
                .image_ref
                .clone()
                .filter(|_| options.image_mode.shows_images()),
            image_mode: options.image_mode,
            featured: content.featured,
            indicators: content.indicators.clone(),
            indicator_mode: content.indicator_mode,
        },
        TileBody::ItemTextRow(content) => text_row(content),
        TileBody::Filler(content) => DrawCommand::Filler {
            variant: content.variant,
            textured: options.textures_enabled,
        },
    }
}

fn text_row(content: &ItemContent) -> DrawCommand {
    DrawCommand::ItemTextRow {
        name: content.name.clone(),
        price: content.formatted_price.clone(),
        description: content.description.clone(),
        featured: content.featured,
        indicators: content.indicators.clone(),
        indicator_mode: content.indicator_mode,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Renderers
// ────────────────────────────────────────────────────────────────────────────

/// Turns a resolved plan into output bytes. Rasterising implementations live
/// outside this service.
pub trait Renderer: Send + Sync {
    fn content_type(&self) -> &'static str;

    fn render(&self, plan: &RenderPlan) -> Result<Vec<u8>, RenderError>;
}

/// Emits the plan itself as JSON.
pub struct JsonPlanRenderer;

impl Renderer for JsonPlanRenderer {
    fn content_type(&self) -> &'static str {
        "application/json"
    }

    fn render(&self, plan: &RenderPlan) -> Result<Vec<u8>, RenderError> {
        Ok(serde_json::to_vec(plan)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::document::{FillerContent, GridPlacement, Page};
    use crate::layout::geometry::pt_eq;
    use crate::layout::menu::tests::make_menu;
    use crate::layout::options::LayoutOptions;
    use crate::layout::placement::place;
    use crate::layout::template::tests::reference_template;

    fn make_document(counts: &[usize]) -> (Template, LayoutDocument) {
        let template = reference_template();
        let regions = template.regions().unwrap();
        let doc = place(&make_menu(counts, true), &template, &regions, &LayoutOptions::default())
            .unwrap();
        (template, doc)
    }

    fn rendered<'p>(plan: &'p RenderPlan, id: &str) -> &'p RenderedTile {
        plan.pages
            .iter()
            .flat_map(|p| p.tiles.iter())
            .find(|t| t.tile_id == id)
            .unwrap_or_else(|| panic!("tile {id} missing from plan"))
    }

    #[test]
    fn test_body_tiles_resolve_to_absolute_points() {
        let (template, doc) = make_document(&[4]);
        let plan = build_render_plan(&doc, &template, &RenderOptions::default()).unwrap();

        // Row 1 of the body: 56.69 margin + 100 region offset + 78 pitch.
        let card = rendered(&plan, "item-0-0");
        assert!(pt_eq(card.rect.x, 42.52));
        assert!(pt_eq(card.rect.y, 234.69));
        assert!(pt_eq(card.rect.width, 121.56));
        assert!(pt_eq(card.rect.height, 148.0));

        let last = rendered(&plan, "item-0-3");
        // 42.52 + 3 * 129.56
        assert!(pt_eq(last.rect.x, 431.2));
    }

    #[test]
    fn test_title_fills_title_band() {
        let (template, doc) = make_document(&[1]);
        let plan = build_render_plan(&doc, &template, &RenderOptions::default()).unwrap();
        let title = rendered(&plan, "title");
        assert_eq!(title.region, RegionId::Title);
        assert!(pt_eq(title.rect.y, 116.69));
        assert!(pt_eq(title.rect.height, 40.0));
        assert!(matches!(title.command, DrawCommand::Title { .. }));
    }

    #[test]
    fn test_balancing_adjust_moves_tile() {
        let (template, doc) = make_document(&[2]);
        let plan = build_render_plan(&doc, &template, &RenderOptions::default()).unwrap();
        // CENTER: 42.52 + 129.56 pitch + 129.56 offset
        assert!(pt_eq(rendered(&plan, "item-0-1").rect.x, 301.64));
    }

    #[test]
    fn test_page_numbers_go_to_footer() {
        let (template, doc) = make_document(&[6, 4]);
        let options = RenderOptions {
            print_page_numbers: true,
            ..RenderOptions::default()
        };
        let plan = build_render_plan(&doc, &template, &options).unwrap();
        let number = rendered(&plan, "page-number-1");
        assert_eq!(
            number.command,
            DrawCommand::PageNumber {
                text: "2 / 2".to_string()
            }
        );
        assert!(pt_eq(number.rect.y, 755.2));
    }

    #[test]
    fn test_image_mode_none_drops_image_refs() {
        let (template, doc) = make_document(&[1]);
        let options = RenderOptions {
            image_mode: ImageMode::None,
            ..RenderOptions::default()
        };
        let plan = build_render_plan(&doc, &template, &options).unwrap();
        match &rendered(&plan, "item-0-0").command {
            DrawCommand::ItemCard { image_ref, .. } => assert!(image_ref.is_none()),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_tile_outside_body_is_rejected() {
        let template = reference_template();
        let stray = Tile {
            id: "filler-0-9-0".to_string(),
            body: TileBody::Filler(FillerContent { variant: 1 }),
            region: RegionId::Body,
            grid: GridPlacement {
                row: 9,
                col: 0,
                row_span: 1,
                col_span: 1,
            },
            adjust: None,
        };
        let doc = LayoutDocument::assemble(
            &template,
            vec![Page {
                page_index: 0,
                tiles: vec![stray],
            }],
        );
        let err = build_render_plan(&doc, &template, &RenderOptions::default()).unwrap_err();
        assert!(matches!(err, RenderError::TileOutOfBounds { page_index: 0, .. }));
    }

    #[test]
    fn test_template_mismatch_is_rejected() {
        let (mut template, doc) = make_document(&[1]);
        template.version = 2;
        let err = build_render_plan(&doc, &template, &RenderOptions::default()).unwrap_err();
        assert!(matches!(err, RenderError::TemplateMismatch { .. }));
    }

    #[test]
    fn test_json_renderer_emits_plan() {
        let (template, doc) = make_document(&[3]);
        let plan = build_render_plan(&doc, &template, &RenderOptions::default()).unwrap();
        let bytes = JsonPlanRenderer.render(&plan).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["templateId"], "reference");
        assert_eq!(json["pages"][0]["tiles"][1]["command"]["kind"], "SECTION_HEADER");
        assert_eq!(JsonPlanRenderer.content_type(), "application/json");
    }
}
