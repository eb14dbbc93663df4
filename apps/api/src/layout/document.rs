//! `LayoutDocument`: the engine's single output artifact.
//!
//! Tiles carry their content as a tagged union (`TileBody`); the renderer
//! dispatches on it with an exhaustive `match`. Grid coordinates are zero-based
//! and scoped to the tile's region on its page.
//!
//! A document is assembled once from finished pages and exposes read-only
//! accessors afterwards.

use serde::Serialize;

use crate::layout::menu::{Currency, DietaryIndicator};
use crate::layout::regions::RegionId;
use crate::layout::template::{ItemIndicatorMode, Template, TileType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridPlacement {
    pub row: u16,
    pub col: u16,
    pub row_span: u16,
    pub col_span: u16,
}

impl GridPlacement {
    pub fn end_row(&self) -> u16 {
        self.row + self.row_span
    }

    pub fn end_col(&self) -> u16 {
        self.col + self.col_span
    }

    pub fn overlaps(&self, other: &GridPlacement) -> bool {
        self.row < other.end_row()
            && other.row < self.end_row()
            && self.col < other.end_col()
            && other.col < self.end_col()
    }
}

/// Horizontal adjustment from last-row balancing, in points relative to the
/// tile's grid-derived position. Grid coordinates are never rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TileAdjust {
    pub offset_x: f64,
    pub width: f64,
}

// ────────────────────────────────────────────────────────────────────────────
// Tile content
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TitleContent {
    pub title: String,
    pub currency: Currency,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionHeaderContent {
    pub section_index: usize,
    pub name: String,
    pub item_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemContent {
    pub section_index: usize,
    pub item_index: usize,
    pub name: String,
    pub price: f64,
    pub formatted_price: String,
    /// Empty when the item has no description.
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,
    pub featured: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub indicators: Vec<DietaryIndicator>,
    pub indicator_mode: ItemIndicatorMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FillerContent {
    /// Decoration variant, stable for a given cell position.
    pub variant: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "content", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TileBody {
    Title(TitleContent),
    SectionHeader(SectionHeaderContent),
    ItemCard(ItemContent),
    ItemTextRow(ItemContent),
    Filler(FillerContent),
}

impl TileBody {
    pub fn tile_type(&self) -> TileType {
        match self {
            TileBody::Title(_) => TileType::Title,
            TileBody::SectionHeader(_) => TileType::SectionHeader,
            TileBody::ItemCard(_) => TileType::ItemCard,
            TileBody::ItemTextRow(_) => TileType::ItemTextRow,
            TileBody::Filler(_) => TileType::Filler,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tile {
    pub id: String,
    #[serde(flatten)]
    pub body: TileBody,
    pub region: RegionId,
    pub grid: GridPlacement,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adjust: Option<TileAdjust>,
}

impl Tile {
    pub fn tile_type(&self) -> TileType {
        self.body.tile_type()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub page_index: u32,
    pub tiles: Vec<Tile>,
}

// ────────────────────────────────────────────────────────────────────────────
// Document
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutDocument {
    template_id: String,
    template_version: u32,
    total_pages: u32,
    pages: Vec<Page>,
}

impl LayoutDocument {
    /// Assembles finished pages. Page indices are rewritten to match position
    /// so `total_pages` and `page_index` can never disagree.
    pub(crate) fn assemble(template: &Template, mut pages: Vec<Page>) -> Self {
        for (index, page) in pages.iter_mut().enumerate() {
            page.page_index = index as u32;
        }
        LayoutDocument {
            template_id: template.id.clone(),
            template_version: template.version,
            total_pages: pages.len() as u32,
            pages,
        }
    }

    pub fn template_id(&self) -> &str {
        &self.template_id
    }

    pub fn template_version(&self) -> u32 {
        self.template_version
    }

    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn tiles(&self) -> impl Iterator<Item = (&Page, &Tile)> {
        self.pages
            .iter()
            .flat_map(|page| page.tiles.iter().map(move |tile| (page, tile)))
    }

    pub fn count_of(&self, tile_type: TileType) -> usize {
        self.tiles()
            .filter(|(_, tile)| tile.tile_type() == tile_type)
            .count()
    }

    /// Lists grid invariant violations: tiles outside the body grid, full-width
    /// tiles that do not start at column 0, and overlapping tiles per region.
    pub fn grid_violations(&self, cols: u16, rows_per_page: u16) -> Vec<String> {
        let mut violations = Vec::new();

        for page in &self.pages {
            for (i, tile) in page.tiles.iter().enumerate() {
                let grid = tile.grid;
                if grid.row_span == 0 || grid.col_span == 0 {
                    violations.push(format!("page {} tile {} has an empty span", page.page_index, tile.id));
                }
                if grid.end_col() > cols {
                    violations.push(format!(
                        "page {} tile {} ends at col {} beyond {cols}",
                        page.page_index,
                        tile.id,
                        grid.end_col()
                    ));
                }
                if tile.region == RegionId::Body && grid.end_row() > rows_per_page {
                    violations.push(format!(
                        "page {} tile {} ends at row {} beyond {rows_per_page}",
                        page.page_index,
                        tile.id,
                        grid.end_row()
                    ));
                }
                if matches!(tile.body, TileBody::SectionHeader(_) | TileBody::Title(_))
                    && (grid.col != 0 || grid.col_span != cols)
                {
                    violations.push(format!(
                        "page {} tile {} is not full width",
                        page.page_index, tile.id
                    ));
                }
                for other in &page.tiles[i + 1..] {
                    if other.region == tile.region && other.grid.overlaps(&grid) {
                        violations.push(format!(
                            "page {} tiles {} and {} overlap",
                            page.page_index, tile.id, other.id
                        ));
                    }
                }
            }
        }

        violations
    }
}
