//! Grid Placement & Pagination Engine.
//!
//! # Algorithm
//! A cursor `(page, row, col)` walks the body grid row-major. Tiles placed on
//! the same row form a *band*; the band is as tall as its tallest tile, and the
//! next band starts below it.
//!
//! For every section, in input order:
//! 1. Close the current band if it is partially filled.
//! 2. Place a full-width `SECTION_HEADER` on a fresh row.
//! 3. Place each item with its fixed template footprint: wrap to a new band if
//!    the columns run out, open a new page if the rows run out. Items are
//!    atomic, so a tile is never split across bands or pages.
//! 4. Close the final band of the section.
//!
//! Closing a partially filled band (at a section end or a page break) either
//! fills its empty cells with `FILLER` tiles, when fillers are active, or
//! applies the template's last-row balancing as a per-tile `adjust`.
//!
//! Placement is pure and deterministic: identical inputs give identical output.

use std::collections::BTreeSet;

use tracing::debug;

use crate::layout::document::{
    FillerContent, GridPlacement, ItemContent, LayoutDocument, Page, SectionHeaderContent, Tile,
    TileAdjust, TileBody, TitleContent,
};
use crate::layout::error::LayoutError;
use crate::layout::geometry::round_pt;
use crate::layout::menu::{LayoutMenu, MenuItem, MenuMetadata};
use crate::layout::options::LayoutOptions;
use crate::layout::regions::{find_region, Region, RegionId};
use crate::layout::template::{ItemIndicatorMode, LastRowBalancing, Template, TileSpec, TileType};

/// Page ceiling used when the caller does not supply one.
pub const DEFAULT_MAX_PAGES: u32 = 12;

const FILLER_VARIANTS: u32 = 4;

/// How item footprints are derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemSizing {
    /// Footprints come from the template's tile specs.
    TemplateSpans,
    /// Every item is a full-width text row (legacy flow templates).
    FullWidthRows,
}

/// Places `menu` into the body grid of `template` using its tile specs.
pub fn place(
    menu: &LayoutMenu,
    template: &Template,
    regions: &[Region],
    options: &LayoutOptions,
) -> Result<LayoutDocument, LayoutError> {
    place_with(menu, template, regions, options, ItemSizing::TemplateSpans)
}

pub(crate) fn place_with(
    menu: &LayoutMenu,
    template: &Template,
    regions: &[Region],
    options: &LayoutOptions,
    sizing: ItemSizing,
) -> Result<LayoutDocument, LayoutError> {
    let engine = PlacementEngine::new(template, regions, options, sizing)?;
    let pages = engine.run(menu);

    let max_pages = options.max_pages.unwrap_or(DEFAULT_MAX_PAGES).max(1);
    let required_pages = pages.len() as u32;
    if required_pages > max_pages {
        return Err(LayoutError::LayoutOverflow {
            required_pages,
            max_pages,
        });
    }

    Ok(LayoutDocument::assemble(template, pages))
}

// ────────────────────────────────────────────────────────────────────────────
// Cursor
// ────────────────────────────────────────────────────────────────────────────

/// Where the next tile goes on the page being built.
#[derive(Debug)]
struct PageCursor {
    page_index: u32,
    /// Top row of the current band.
    row: u16,
    col: u16,
    /// Height of the current band; 0 while the band is empty.
    band_height: u16,
    tiles: Vec<Tile>,
}

impl PageCursor {
    fn new(page_index: u32) -> Self {
        PageCursor {
            page_index,
            row: 0,
            col: 0,
            band_height: 0,
            tiles: Vec::new(),
        }
    }

    fn into_page(self) -> Page {
        Page {
            page_index: self.page_index,
            tiles: self.tiles,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Engine
// ────────────────────────────────────────────────────────────────────────────

fn required_spec(template: &Template, tile_type: TileType) -> Result<&TileSpec, LayoutError> {
    template.tile_spec(tile_type).ok_or_else(|| {
        LayoutError::template(
            &template.id,
            format!("tiles.{}", tile_type.as_str()),
            "required tile spec is missing",
        )
    })
}

struct PlacementEngine<'a> {
    template: &'a Template,
    options: &'a LayoutOptions,
    sizing: ItemSizing,
    body: Region,
    title_region: Region,
    cols: u16,
    rows_per_page: u16,
    cell_width: f64,
    fillers: bool,
    section_header: &'a TileSpec,
    text_row: &'a TileSpec,
}

impl<'a> PlacementEngine<'a> {
    fn new(
        template: &'a Template,
        regions: &[Region],
        options: &'a LayoutOptions,
        sizing: ItemSizing,
    ) -> Result<Self, LayoutError> {
        let region = |id: RegionId| {
            find_region(regions, id).copied().ok_or_else(|| {
                LayoutError::template(
                    &template.id,
                    format!("regions.{}", id.as_str()),
                    "required region is missing",
                )
            })
        };
        let body = region(RegionId::Body)?;
        let title_region = region(RegionId::Title)?;

        let section_header = required_spec(template, TileType::SectionHeader)?;
        let text_row = required_spec(template, TileType::ItemTextRow)?;

        let cols = template.grid.cols;
        let rows_per_page = template.grid.rows_fitting(body.height);
        if rows_per_page == 0 {
            return Err(LayoutError::template(
                &template.id,
                "body.container.rowHeight",
                "no grid row fits in the body region",
            ));
        }

        Ok(PlacementEngine {
            template,
            options,
            sizing,
            body,
            title_region,
            cols,
            rows_per_page,
            cell_width: template.grid.cell_width(body.width),
            fillers: options
                .fillers_enabled
                .unwrap_or(template.policies.filler_enabled),
            section_header,
            text_row,
        })
    }

    fn run(&self, menu: &LayoutMenu) -> Vec<Page> {
        let mut pages = Vec::new();
        let mut cursor = PageCursor::new(0);

        if self.options.show_menu_title {
            self.place_title(&mut cursor, &menu.metadata);
        }

        for (section_index, section) in menu.sections.iter().enumerate() {
            self.close_band(&mut cursor);

            let header_rows = self.section_header.row_span;
            if cursor.row + header_rows > self.rows_per_page {
                self.break_page(&mut cursor, &mut pages);
            }
            cursor.tiles.push(Tile {
                id: format!("section-{section_index}"),
                body: TileBody::SectionHeader(SectionHeaderContent {
                    section_index,
                    name: section.name.clone(),
                    item_count: section.items.len(),
                }),
                region: RegionId::Body,
                grid: GridPlacement {
                    row: cursor.row,
                    col: 0,
                    row_span: header_rows,
                    col_span: self.cols,
                },
                adjust: None,
            });
            cursor.row += header_rows;

            for (item_index, item) in section.items.iter().enumerate() {
                let (tile_type, row_span, col_span) = self.footprint(item);

                if cursor.col + col_span > self.cols {
                    self.close_band(&mut cursor);
                }
                if cursor.row + row_span > self.rows_per_page {
                    debug!(
                        page = cursor.page_index,
                        section = section_index,
                        item = item_index,
                        "Body grid full, opening a new page"
                    );
                    self.break_page(&mut cursor, &mut pages);
                }

                let content = self.item_content(&menu.metadata, section_index, item_index, item, tile_type);
                let body = match tile_type {
                    TileType::ItemCard => TileBody::ItemCard(content),
                    _ => TileBody::ItemTextRow(content),
                };
                cursor.tiles.push(Tile {
                    id: format!("item-{section_index}-{item_index}"),
                    body,
                    region: RegionId::Body,
                    grid: GridPlacement {
                        row: cursor.row,
                        col: cursor.col,
                        row_span,
                        col_span,
                    },
                    adjust: None,
                });

                cursor.col += col_span;
                cursor.band_height = cursor.band_height.max(row_span);
                if cursor.col == self.cols {
                    cursor.row += cursor.band_height;
                    cursor.col = 0;
                    cursor.band_height = 0;
                }
            }

            self.close_band(&mut cursor);
        }

        if !cursor.tiles.is_empty() || pages.is_empty() {
            pages.push(cursor.into_page());
        }
        pages
    }

    fn place_title(&self, cursor: &mut PageCursor, metadata: &MenuMetadata) {
        let body = TileBody::Title(TitleContent {
            title: metadata.title.clone(),
            currency: metadata.currency,
        });

        if self.title_region.height > 0.0 {
            cursor.tiles.push(Tile {
                id: "title".to_string(),
                body,
                region: RegionId::Title,
                grid: GridPlacement {
                    row: 0,
                    col: 0,
                    row_span: 1,
                    col_span: self.cols,
                },
                adjust: None,
            });
            return;
        }

        // No title band: the title takes the first full-width rows of the body.
        let row_span = self
            .template
            .tile_spec(TileType::Title)
            .map(|spec| spec.row_span)
            .unwrap_or(1)
            .min(self.rows_per_page);
        cursor.tiles.push(Tile {
            id: "title".to_string(),
            body,
            region: RegionId::Body,
            grid: GridPlacement {
                row: 0,
                col: 0,
                row_span,
                col_span: self.cols,
            },
            adjust: None,
        });
        cursor.row = row_span;
    }

    /// `(tile type, rowSpan, colSpan)` for an item.
    fn footprint(&self, item: &MenuItem) -> (TileType, u16, u16) {
        if self.sizing == ItemSizing::FullWidthRows {
            return (TileType::ItemTextRow, self.text_row.row_span, self.cols);
        }

        let card = if self.options.wants_image_cards() && item.image_ref.is_some() {
            self.template.tile_spec(TileType::ItemCard)
        } else {
            None
        };

        match card {
            Some(spec) => (TileType::ItemCard, spec.row_span, spec.col_span),
            None => (
                TileType::ItemTextRow,
                self.text_row.row_span,
                self.text_row.col_span,
            ),
        }
    }

    fn item_content(
        &self,
        metadata: &MenuMetadata,
        section_index: usize,
        item_index: usize,
        item: &MenuItem,
        tile_type: TileType,
    ) -> ItemContent {
        let indicator_mode = self.template.policies.item_indicator_mode;
        ItemContent {
            section_index,
            item_index,
            name: item.name.clone(),
            price: item.price,
            formatted_price: metadata.currency.format_price(item.price),
            description: item.description.clone().unwrap_or_default(),
            image_ref: if tile_type == TileType::ItemCard {
                item.image_ref.clone()
            } else {
                None
            },
            featured: item.featured,
            indicators: if indicator_mode == ItemIndicatorMode::None {
                Vec::new()
            } else {
                item.indicators.clone()
            },
            indicator_mode,
        }
    }

    /// Finishes the current band and moves the cursor below it.
    fn close_band(&self, cursor: &mut PageCursor) {
        if cursor.col == 0 {
            return;
        }
        if cursor.col < self.cols {
            if self.fillers {
                self.fill_band(cursor);
            } else {
                self.balance_band(cursor);
            }
        }
        cursor.row += cursor.band_height.max(1);
        cursor.col = 0;
        cursor.band_height = 0;
    }

    /// Closes the current page (finishing its band first) and starts the next.
    fn break_page(&self, cursor: &mut PageCursor, pages: &mut Vec<Page>) {
        self.close_band(cursor);
        let next = PageCursor::new(cursor.page_index + 1);
        pages.push(std::mem::replace(cursor, next).into_page());
    }

    fn fill_band(&self, cursor: &mut PageCursor) {
        let band_row = cursor.row;
        let band_end = cursor.row + cursor.band_height.max(1);

        let occupied: BTreeSet<(u16, u16)> = cursor
            .tiles
            .iter()
            .filter(|t| t.region == RegionId::Body && t.grid.row == band_row)
            .flat_map(|t| {
                let grid = t.grid;
                (grid.row..grid.end_row())
                    .flat_map(move |r| (grid.col..grid.end_col()).map(move |c| (r, c)))
            })
            .collect();

        for row in band_row..band_end {
            for col in 0..self.cols {
                if occupied.contains(&(row, col)) {
                    continue;
                }
                let variant = (cursor.page_index + u32::from(row) + u32::from(col)) % FILLER_VARIANTS;
                cursor.tiles.push(Tile {
                    id: format!("filler-{}-{row}-{col}", cursor.page_index),
                    body: TileBody::Filler(FillerContent {
                        variant: variant as u8,
                    }),
                    region: RegionId::Body,
                    grid: GridPlacement {
                        row,
                        col,
                        row_span: 1,
                        col_span: 1,
                    },
                    adjust: None,
                });
            }
        }
    }

    fn balance_band(&self, cursor: &mut PageCursor) {
        let policy = self.template.policies.last_row_balancing;
        if policy == LastRowBalancing::Left {
            return;
        }

        let band_row = cursor.row;
        let occupied_cols = cursor.col;
        let gap_x = self.template.grid.gap_x;
        let pitch = self.cell_width + gap_x;

        let band: Vec<&mut Tile> = cursor
            .tiles
            .iter_mut()
            .filter(|t| t.region == RegionId::Body && t.grid.row == band_row)
            .collect();
        let count = band.len();
        if count == 0 {
            return;
        }

        debug!(
            page = cursor.page_index,
            row = band_row,
            tiles = count,
            policy = ?policy,
            "Balancing partial last row"
        );

        match policy {
            LastRowBalancing::Center => {
                let free = f64::from(self.cols - occupied_cols) * pitch;
                let offset_x = round_pt(free / 2.0);
                for tile in band {
                    let width = self.natural_width(tile.grid.col_span);
                    tile.adjust = Some(TileAdjust { offset_x, width });
                }
            }
            LastRowBalancing::Stretch => {
                let n = count as f64;
                let width = (self.body.width - (n - 1.0) * gap_x) / n;
                let mut ordered = band;
                ordered.sort_by_key(|t| t.grid.col);
                for (slot, tile) in ordered.into_iter().enumerate() {
                    let target_x = slot as f64 * (width + gap_x);
                    let base_x = f64::from(tile.grid.col) * pitch;
                    tile.adjust = Some(TileAdjust {
                        offset_x: round_pt(target_x - base_x),
                        width: round_pt(width),
                    });
                }
            }
            LastRowBalancing::Left => {}
        }
    }

    fn natural_width(&self, col_span: u16) -> f64 {
        let span = f64::from(col_span);
        round_pt(span * self.cell_width + (span - 1.0) * self.template.grid.gap_x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::geometry::pt_eq;
    use crate::layout::menu::tests::make_menu;
    use crate::layout::menu::{Currency, MenuMetadata, MenuSection};
    use crate::layout::options::ImageMode;
    use crate::layout::template::tests::{reference_definition, reference_template};
    use serde_json::json;

    fn options(fillers: bool) -> LayoutOptions {
        LayoutOptions {
            fillers_enabled: Some(fillers),
            show_menu_title: false,
            image_mode: ImageMode::Stretch,
            ..LayoutOptions::default()
        }
    }

    fn run(menu: &LayoutMenu, template: &Template, options: &LayoutOptions) -> LayoutDocument {
        let regions = template.regions().unwrap();
        let doc = place(menu, template, &regions, options).unwrap();
        let violations = doc.grid_violations(template.grid.cols, template.rows_per_page);
        assert!(violations.is_empty(), "grid violations: {violations:?}");
        doc
    }

    fn template_with(edit: impl FnOnce(&mut serde_json::Value)) -> Template {
        let mut def = reference_definition();
        edit(&mut def);
        Template::from_value(&def).unwrap()
    }

    fn tile<'d>(doc: &'d LayoutDocument, id: &str) -> (&'d Page, &'d Tile) {
        doc.tiles()
            .find(|(_, t)| t.id == id)
            .unwrap_or_else(|| panic!("tile {id} not found"))
    }

    #[test]
    fn test_two_sections_ten_items_paginate_onto_second_page() {
        let template = reference_template();
        let menu = make_menu(&[6, 4], true);
        let doc = run(&menu, &template, &options(false));

        assert_eq!(doc.total_pages(), 2);
        let first = &doc.pages()[0];
        let second = &doc.pages()[1];

        // Section 1 header owns row 0.
        let (page, header) = tile(&doc, "section-0");
        assert_eq!(page.page_index, 0);
        assert_eq!(header.grid, GridPlacement { row: 0, col: 0, row_span: 1, col_span: 4 });

        // Cards tile four per row, wrapping.
        for i in 0..4u16 {
            let (_, card) = tile(&doc, &format!("item-0-{i}"));
            assert_eq!(card.tile_type(), TileType::ItemCard);
            assert_eq!((card.grid.row, card.grid.col), (1, i));
        }
        let (_, wrapped) = tile(&doc, "item-0-4");
        assert_eq!((wrapped.grid.row, wrapped.grid.col), (3, 0));

        // Section 2 header starts a fresh row; its first card no longer fits.
        let (page, header) = tile(&doc, "section-1");
        assert_eq!(page.page_index, 0);
        assert_eq!((header.grid.row, header.grid.col), (5, 0));

        let items_on_first = first
            .tiles
            .iter()
            .filter(|t| matches!(t.body, TileBody::ItemCard(_)))
            .count();
        assert_eq!(items_on_first, 6);
        assert_eq!(second.tiles.len(), 10 - items_on_first);
        assert!(second.tiles.iter().all(|t| t.grid.row < 2));
    }

    #[test]
    fn test_item_without_image_is_text_row_regardless_of_description() {
        let template = reference_template();
        let mut menu = make_menu(&[2], true);
        menu.sections[0].items[1].image_ref = None;
        menu.sections[0].items[1].description = Some("x".repeat(600));

        let doc = run(&menu, &template, &options(false));
        assert_eq!(tile(&doc, "item-0-0").1.tile_type(), TileType::ItemCard);
        let (_, text) = tile(&doc, "item-0-1");
        assert_eq!(text.tile_type(), TileType::ItemTextRow);
        match &text.body {
            TileBody::ItemTextRow(content) => assert!(content.image_ref.is_none()),
            other => panic!("unexpected body {other:?}"),
        }
    }

    #[test]
    fn test_image_mode_none_and_text_only_force_text_rows() {
        let template = reference_template();
        let menu = make_menu(&[3], true);

        let none = LayoutOptions {
            image_mode: ImageMode::None,
            ..options(false)
        };
        let text_only = LayoutOptions {
            text_only: true,
            ..options(false)
        };
        for opts in [none, text_only] {
            let doc = run(&menu, &template, &opts);
            assert_eq!(doc.count_of(TileType::ItemCard), 0);
            assert_eq!(doc.count_of(TileType::ItemTextRow), 3);
        }
    }

    #[test]
    fn test_placement_is_deterministic() {
        let template = reference_template();
        let menu = make_menu(&[5, 9, 3], true);
        let opts = options(true);
        let a = serde_json::to_vec(&run(&menu, &template, &opts)).unwrap();
        let b = serde_json::to_vec(&run(&menu, &template, &opts)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_fillers_complete_partial_rows_only_when_enabled() {
        let template = reference_template();
        let menu = make_menu(&[6], true);

        let without = run(&menu, &template, &options(false));
        assert_eq!(without.count_of(TileType::Filler), 0);

        let with = run(&menu, &template, &options(true));
        // Cards 5 and 6 sit in rows 3-4, cols 0-1; four cells remain.
        assert_eq!(with.count_of(TileType::Filler), 4);
        for row in 3..5u16 {
            let used: u16 = with.pages()[0]
                .tiles
                .iter()
                .filter(|t| t.grid.row <= row && row < t.grid.end_row())
                .map(|t| t.grid.col_span)
                .sum();
            assert_eq!(used, 4, "row {row} not filled to capacity");
        }
        // A full row with fillers active needs no balancing offsets.
        assert!(with.tiles().all(|(_, t)| t.adjust.is_none()));
    }

    #[test]
    fn test_template_filler_policy_applies_when_option_absent() {
        let template = template_with(|def| def["policies"]["fillerEnabled"] = json!(true));
        let menu = make_menu(&[1], true);
        let opts = LayoutOptions {
            fillers_enabled: None,
            ..options(false)
        };
        let doc = run(&menu, &template, &opts);
        assert_eq!(doc.count_of(TileType::Filler), 6);
    }

    #[test]
    fn test_center_balancing_offsets_partial_row() {
        let template = reference_template();
        let menu = make_menu(&[2], true);
        let doc = run(&menu, &template, &options(false));

        // cell width 121.56, pitch 129.56, two free columns → offset 129.56
        for id in ["item-0-0", "item-0-1"] {
            let adjust = tile(&doc, id).1.adjust.expect("center adjust");
            assert!(pt_eq(adjust.offset_x, 129.56), "offset {}", adjust.offset_x);
            assert!(pt_eq(adjust.width, 121.56));
        }
        assert_eq!(tile(&doc, "item-0-1").1.grid.col, 1, "grid coordinates unchanged");
    }

    #[test]
    fn test_stretch_balancing_spreads_row_width() {
        let template = template_with(|def| def["policies"]["lastRowBalancing"] = json!("STRETCH"));
        let menu = make_menu(&[2], true);
        let doc = run(&menu, &template, &options(false));

        let first = tile(&doc, "item-0-0").1.adjust.unwrap();
        let second = tile(&doc, "item-0-1").1.adjust.unwrap();
        // (510.24 - 8) / 2
        assert!(pt_eq(first.width, 251.12));
        assert!(pt_eq(first.offset_x, 0.0));
        // target 259.12 - base 129.56
        assert!(pt_eq(second.offset_x, 129.56));
        assert!(pt_eq(second.width, 251.12));
    }

    #[test]
    fn test_left_balancing_is_a_no_op() {
        let template = template_with(|def| def["policies"]["lastRowBalancing"] = json!("LEFT"));
        let doc = run(&make_menu(&[3], true), &template, &options(false));
        assert!(doc.tiles().all(|(_, t)| t.adjust.is_none()));
    }

    #[test]
    fn test_full_rows_are_not_balanced() {
        let template = reference_template();
        let doc = run(&make_menu(&[4], true), &template, &options(false));
        assert!(doc.tiles().all(|(_, t)| t.adjust.is_none()));
    }

    #[test]
    fn test_page_break_balances_the_row_it_leaves_behind() {
        // rowHeight 190 → 3 rows per page
        let template = template_with(|def| def["body"]["container"]["rowHeight"] = json!(190));
        assert_eq!(template.rows_per_page, 3);

        let mut menu = make_menu(&[4], false);
        menu.sections[0].items[3].image_ref = Some("card.jpg".to_string());
        let doc = run(&menu, &template, &options(false));

        // Header row 0, text rows (1x2): row 1 full, row 2 half; the card needs
        // rows 2-3 and moves to page 2.
        assert_eq!(doc.total_pages(), 2);
        let (page, stranded) = tile(&doc, "item-0-2");
        assert_eq!(page.page_index, 0);
        assert_eq!(stranded.grid.row, 2);
        assert!(stranded.adjust.is_some(), "row left behind by the break is centered");

        let (page, card) = tile(&doc, "item-0-3");
        assert_eq!(page.page_index, 1);
        assert_eq!((card.grid.row, card.grid.col), (0, 0));
    }

    #[test]
    fn test_text_rows_pair_up_with_col_span_two() {
        let template = reference_template();
        let doc = run(&make_menu(&[3], false), &template, &options(false));
        let positions: Vec<(u16, u16)> = (0..3)
            .map(|i| {
                let grid = tile(&doc, &format!("item-0-{i}")).1.grid;
                (grid.row, grid.col)
            })
            .collect();
        assert_eq!(positions, vec![(1, 0), (1, 2), (2, 0)]);
    }

    #[test]
    fn test_title_goes_to_title_region_when_it_has_height() {
        let template = reference_template();
        let opts = LayoutOptions {
            show_menu_title: true,
            ..options(false)
        };
        let doc = run(&make_menu(&[1], true), &template, &opts);
        let (page, title) = tile(&doc, "title");
        assert_eq!(page.page_index, 0);
        assert_eq!(title.region, RegionId::Title);
        assert_eq!(tile(&doc, "section-0").1.grid.row, 0);
    }

    #[test]
    fn test_title_takes_first_body_row_without_title_region() {
        let template = template_with(|def| {
            def["regions"]["title"]["height"] = json!(0);
            def["tiles"]["TITLE"] = json!({ "rowSpan": 1, "colSpan": 4 });
        });
        let opts = LayoutOptions {
            show_menu_title: true,
            ..options(false)
        };
        let doc = run(&make_menu(&[1], true), &template, &opts);
        let (_, title) = tile(&doc, "title");
        assert_eq!(title.region, RegionId::Body);
        assert_eq!(title.grid, GridPlacement { row: 0, col: 0, row_span: 1, col_span: 4 });
        assert_eq!(tile(&doc, "section-0").1.grid.row, 1);
    }

    #[test]
    fn test_overflow_is_fatal_and_reports_required_pages() {
        let template = reference_template();
        let menu = make_menu(&[6, 4], true);
        let regions = template.regions().unwrap();
        let opts = LayoutOptions {
            max_pages: Some(1),
            ..options(false)
        };
        let err = place(&menu, &template, &regions, &opts).unwrap_err();
        assert_eq!(
            err,
            LayoutError::LayoutOverflow {
                required_pages: 2,
                max_pages: 1
            }
        );
    }

    #[test]
    fn test_empty_menu_yields_single_page() {
        let template = reference_template();
        let menu = LayoutMenu {
            metadata: MenuMetadata {
                title: "Closed".to_string(),
                currency: Currency::Eur,
            },
            sections: Vec::new(),
        };
        let doc = run(&menu, &template, &options(true));
        assert_eq!(doc.total_pages(), 1);
        assert!(doc.pages()[0].tiles.is_empty());
    }

    #[test]
    fn test_empty_section_still_gets_header() {
        let template = reference_template();
        let mut menu = make_menu(&[1], true);
        menu.sections.push(MenuSection {
            name: "Coming soon".to_string(),
            items: Vec::new(),
        });
        let doc = run(&menu, &template, &options(false));
        assert_eq!(doc.count_of(TileType::SectionHeader), 2);
    }

    #[test]
    fn test_full_width_sizing_stacks_items() {
        let template = reference_template();
        let regions = template.regions().unwrap();
        let doc = place_with(
            &make_menu(&[3], true),
            &template,
            &regions,
            &options(true),
            ItemSizing::FullWidthRows,
        )
        .unwrap();
        for i in 0..3u16 {
            let grid = tile(&doc, &format!("item-0-{i}")).1.grid;
            assert_eq!(grid, GridPlacement { row: 1 + i, col: 0, row_span: 1, col_span: 4 });
        }
        assert_eq!(doc.count_of(TileType::Filler), 0);
    }

    #[test]
    fn test_invariants_hold_across_many_shapes() {
        let templates = [
            reference_template(),
            template_with(|def| def["body"]["container"]["rowHeight"] = json!(190)),
            template_with(|def| {
                def["body"]["container"]["cols"] = json!(3);
                def["tiles"]["SECTION_HEADER"]["colSpan"] = json!(3);
                def["tiles"]["ITEM_TEXT_ROW"] = json!({ "rowSpan": 1, "colSpan": 1 });
                def["policies"]["lastRowBalancing"] = json!("STRETCH");
            }),
        ];
        let shapes: [&[usize]; 5] = [&[1], &[7, 0, 3], &[13, 2], &[4, 4, 4, 4], &[25]];

        for template in &templates {
            for shape in shapes {
                for (images, fillers) in [(true, false), (false, true), (true, true)] {
                    let mut menu = make_menu(shape, images);
                    // Mix cards and text rows.
                    for section in &mut menu.sections {
                        for (i, item) in section.items.iter_mut().enumerate() {
                            if i % 3 == 2 {
                                item.image_ref = None;
                            }
                        }
                    }
                    let opts = LayoutOptions {
                        max_pages: Some(50),
                        ..options(fillers)
                    };
                    let doc = run(&menu, template, &opts);

                    // Every item exactly once, in input order.
                    let placed: Vec<&str> = doc
                        .tiles()
                        .filter(|(_, t)| {
                            matches!(t.body, TileBody::ItemCard(_) | TileBody::ItemTextRow(_))
                        })
                        .map(|(_, t)| t.id.as_str())
                        .collect();
                    let expected: Vec<String> = menu
                        .sections
                        .iter()
                        .enumerate()
                        .flat_map(|(s, section)| {
                            (0..section.items.len()).map(move |i| format!("item-{s}-{i}"))
                        })
                        .collect();
                    assert_eq!(placed, expected);

                    if !fillers {
                        assert_eq!(doc.count_of(TileType::Filler), 0);
                    }
                    for (_, t) in doc.tiles() {
                        if let Some(adjust) = t.adjust {
                            let regions = template.regions().unwrap();
                            let body = find_region(&regions, RegionId::Body).unwrap();
                            let pitch = template.grid.cell_width(body.width) + template.grid.gap_x;
                            let x = f64::from(t.grid.col) * pitch + adjust.offset_x;
                            assert!(x >= -0.01 && x + adjust.width <= body.width + 0.01);
                        }
                    }
                }
            }
        }
    }
}
