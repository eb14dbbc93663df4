//! Template value object and its load-time validation.
//!
//! A template definition is a versioned JSON document:
//!
//! ```text
//! { id, version, format?, name?, priority?, contexts?,
//!   page:     { size, margins: { top, right, bottom, left } },
//!   regions:  { header: { height }, title: { height }, footer: { height } },
//!   body:     { container: { cols, rowHeight, gapX?, gapY? } },
//!   tiles:    { <TILE_TYPE>: { rowSpan, colSpan, capabilities? } },
//!   policies: { lastRowBalancing, fillerEnabled?, itemIndicatorMode? } }
//! ```
//!
//! Loading either yields a fully validated, immutable `Template` or fails on
//! the first invalid field. Nothing is partially accepted. Every check that
//! could otherwise surface mid-placement (spans wider than the grid, spans
//! taller than a page, a body region with no room for a row) happens here.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::layout::error::LayoutError;
use crate::layout::fields::{FieldIssue, Node};
use crate::layout::geometry::{round_pt, Margins, PageSize, PageSpec};
use crate::layout::regions::{
    calculate_regions, find_region, stack_regions, validate_regions, Region, RegionHeights,
    RegionId,
};
use crate::layout::selector::OutputContext;

// ────────────────────────────────────────────────────────────────────────────
// Tile vocabulary
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TileType {
    Title,
    SectionHeader,
    ItemCard,
    ItemTextRow,
    Filler,
}

impl TileType {
    pub fn as_str(self) -> &'static str {
        match self {
            TileType::Title => "TITLE",
            TileType::SectionHeader => "SECTION_HEADER",
            TileType::ItemCard => "ITEM_CARD",
            TileType::ItemTextRow => "ITEM_TEXT_ROW",
            TileType::Filler => "FILLER",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "TITLE" => Some(TileType::Title),
            "SECTION_HEADER" => Some(TileType::SectionHeader),
            "ITEM_CARD" => Some(TileType::ItemCard),
            "ITEM_TEXT_ROW" => Some(TileType::ItemTextRow),
            "FILLER" => Some(TileType::Filler),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TileCapability {
    Image,
    Description,
    Price,
    Indicators,
}

impl TileCapability {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "image" => Some(TileCapability::Image),
            "description" => Some(TileCapability::Description),
            "price" => Some(TileCapability::Price),
            "indicators" => Some(TileCapability::Indicators),
            _ => None,
        }
    }
}

/// Fixed footprint of one tile type in grid cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileSpec {
    pub row_span: u16,
    pub col_span: u16,
    pub capabilities: Vec<TileCapability>,
}

impl TileSpec {
    pub fn has(&self, capability: TileCapability) -> bool {
        self.capabilities.contains(&capability)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Grid, policies, format
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridSpec {
    pub cols: u16,
    pub row_height: f64,
    pub gap_x: f64,
    pub gap_y: f64,
}

impl GridSpec {
    /// `(width - (cols - 1) * gapX) / cols`
    pub fn cell_width(&self, body_width: f64) -> f64 {
        let cols = f64::from(self.cols);
        (body_width - (cols - 1.0) * self.gap_x) / cols
    }

    /// Number of whole rows that fit in `body_height`.
    pub fn rows_fitting(&self, body_height: f64) -> u16 {
        let pitch = self.row_height + self.gap_y;
        let rows = ((body_height + self.gap_y) / pitch + 1e-9).floor();
        if rows <= 0.0 {
            0
        } else if rows >= f64::from(u16::MAX) {
            u16::MAX
        } else {
            rows as u16
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LastRowBalancing {
    Center,
    Stretch,
    Left,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemIndicatorMode {
    #[default]
    None,
    Inline,
    Badge,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policies {
    pub last_row_balancing: LastRowBalancing,
    pub filler_enabled: bool,
    pub item_indicator_mode: ItemIndicatorMode,
}

/// Explicit definition-format tag. Drives engine dispatch; never inferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TemplateFormat {
    #[serde(rename = "flow-v1")]
    FlowV1,
    #[default]
    #[serde(rename = "grid-v2")]
    GridV2,
}

impl TemplateFormat {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "flow-v1" => Some(TemplateFormat::FlowV1),
            "grid-v2" => Some(TemplateFormat::GridV2),
            _ => None,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Template
// ────────────────────────────────────────────────────────────────────────────

/// A validated, immutable template.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: String,
    pub version: u32,
    pub name: String,
    pub format: TemplateFormat,
    pub priority: u32,
    pub contexts: Vec<OutputContext>,
    pub page: PageSpec,
    pub region_heights: RegionHeights,
    pub grid: GridSpec,
    pub tiles: BTreeMap<TileType, TileSpec>,
    pub policies: Policies,
    /// Derived: whole grid rows that fit in the body region of one page.
    pub rows_per_page: u16,
}

/// Upper bound on grid columns and on rows per page.
pub const MAX_GRID_TRACKS: u16 = 256;

const REQUIRED_TILES: [TileType; 2] = [TileType::SectionHeader, TileType::ItemTextRow];

impl Template {
    /// Parses and validates a JSON template definition.
    pub fn from_json_str(raw: &str) -> Result<Self, LayoutError> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| LayoutError::template("<unknown>", "<document>", e.to_string()))?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Result<Self, LayoutError> {
        let root = Node::root(value);
        // The id is needed for every later error, so it is read first.
        let id = read_id(&root).map_err(|issue| as_template_error("<unknown>", issue))?;
        let template = build(&root, &id).map_err(|issue| as_template_error(&id, issue))?;
        template.check_geometry()?;
        Ok(template)
    }

    pub fn tile_spec(&self, tile_type: TileType) -> Option<&TileSpec> {
        self.tiles.get(&tile_type)
    }

    /// True when the template offers an `ITEM_CARD` that can show images.
    pub fn supports_images(&self) -> bool {
        self.tile_spec(TileType::ItemCard)
            .is_some_and(|spec| spec.has(TileCapability::Image))
    }

    /// True when a text row occupies exactly one grid cell.
    pub fn is_compact(&self) -> bool {
        self.tile_spec(TileType::ItemTextRow)
            .is_some_and(|spec| spec.row_span == 1 && spec.col_span == 1)
    }

    pub fn supports_context(&self, context: OutputContext) -> bool {
        self.contexts.contains(&context)
    }

    pub fn regions(&self) -> Result<Vec<Region>, LayoutError> {
        calculate_regions(&self.page, self)
    }

    /// Geometry checks that need the derived body region.
    fn check_geometry(&self) -> Result<(), LayoutError> {
        let regions = stack_regions(&self.page, &self.region_heights, &self.id)?;
        validate_regions(
            &regions,
            self.page.content_width(),
            self.page.content_height(),
            &self.id,
        )?;
        let body = find_region(&regions, RegionId::Body).ok_or_else(|| {
            LayoutError::template(&self.id, "regions.body", "required region is missing")
        })?;

        if self.grid.cell_width(body.width) <= 0.0 {
            return Err(LayoutError::template(
                &self.id,
                "body.container.gapX",
                format!(
                    "{} columns with {:.2}pt gaps leave no cell width in a {:.2}pt body",
                    self.grid.cols, self.grid.gap_x, body.width
                ),
            ));
        }

        let rows = self.grid.rows_fitting(body.height);
        if rows == 0 {
            return Err(LayoutError::template(
                &self.id,
                "body.container.rowHeight",
                format!(
                    "row height {:.2}pt does not fit in the {:.2}pt body region",
                    self.grid.row_height, body.height
                ),
            ));
        }
        if rows > MAX_GRID_TRACKS {
            return Err(LayoutError::template(
                &self.id,
                "body.container.rowHeight",
                format!(
                    "row height {}pt fits {} rows per page, more than the {} allowed",
                    self.grid.row_height, rows, MAX_GRID_TRACKS
                ),
            ));
        }
        if rows != self.rows_per_page {
            return Err(LayoutError::template(
                &self.id,
                "body.container",
                "derived row count is inconsistent with the body region",
            ));
        }

        for (tile_type, spec) in &self.tiles {
            if spec.row_span > rows {
                return Err(LayoutError::template(
                    &self.id,
                    format!("tiles.{}.rowSpan", tile_type.as_str()),
                    format!(
                        "rowSpan {} exceeds the {} rows that fit on one page",
                        spec.row_span, rows
                    ),
                ));
            }
        }
        Ok(())
    }
}

fn as_template_error(template_id: &str, issue: FieldIssue) -> LayoutError {
    LayoutError::template(template_id, issue.field, issue.message)
}

fn read_id(root: &Node<'_>) -> Result<String, FieldIssue> {
    let node = root.require("id")?;
    let id = node.as_str()?.trim();
    if id.is_empty() {
        return Err(FieldIssue::new(node.path(), "must not be empty"));
    }
    Ok(id.to_string())
}

fn build(root: &Node<'_>, id: &str) -> Result<Template, FieldIssue> {
    let version_node = root.require("version")?;
    let version = version_node.as_u32()?;
    if version == 0 {
        return Err(FieldIssue::new(version_node.path(), "must be at least 1"));
    }

    let name = match root.get("name")? {
        Some(node) => node.as_str()?.trim().to_string(),
        None => id.to_string(),
    };

    let format = match root.get("format")? {
        Some(node) => {
            let raw = node.as_str()?;
            TemplateFormat::parse(raw).ok_or_else(|| {
                FieldIssue::new(node.path(), format!("unknown format '{raw}'"))
            })?
        }
        None => TemplateFormat::default(),
    };

    let priority = match root.get("priority")? {
        Some(node) => node.as_u32()?,
        None => 0,
    };

    let contexts = read_contexts(root)?;
    let page = read_page(root, id)?;
    let region_heights = read_region_heights(root)?;
    let grid = read_grid(root)?;
    let tiles = read_tiles(root, grid.cols)?;
    let policies = read_policies(root)?;

    // Body height is re-derived (and its errors reported) in check_geometry;
    // a failure here only means rows_per_page stays 0 until then.
    let rows_per_page = stack_regions(&page, &region_heights, id)
        .ok()
        .and_then(|regions| find_region(&regions, RegionId::Body).map(|b| b.height))
        .map(|height| grid.rows_fitting(height))
        .unwrap_or(0);

    Ok(Template {
        id: id.to_string(),
        version,
        name,
        format,
        priority,
        contexts,
        page,
        region_heights,
        grid,
        tiles,
        policies,
        rows_per_page,
    })
}

fn read_contexts(root: &Node<'_>) -> Result<Vec<OutputContext>, FieldIssue> {
    let Some(node) = root.get("contexts")? else {
        return Ok(OutputContext::ALL.to_vec());
    };
    let mut contexts = Vec::new();
    for entry in node.items()? {
        let raw = entry.as_str()?;
        let context = OutputContext::parse(raw)
            .ok_or_else(|| FieldIssue::new(entry.path(), format!("unknown output context '{raw}'")))?;
        if !contexts.contains(&context) {
            contexts.push(context);
        }
    }
    if contexts.is_empty() {
        return Err(FieldIssue::new(node.path(), "must list at least one output context"));
    }
    Ok(contexts)
}

fn read_page(root: &Node<'_>, id: &str) -> Result<PageSpec, FieldIssue> {
    let page = root.require("page")?;
    let size_node = page.require("size")?;
    let raw_size = size_node.as_str()?;
    let size: PageSize = serde_json::from_value(Value::String(raw_size.to_string()))
        .map_err(|_| FieldIssue::new(size_node.path(), format!("unknown page size '{raw_size}'")))?;

    let margins_node = page.require("margins")?;
    let margins = Margins {
        top: margins_node.require("top")?.as_f64()?,
        right: margins_node.require("right")?.as_f64()?,
        bottom: margins_node.require("bottom")?.as_f64()?,
        left: margins_node.require("left")?.as_f64()?,
    };

    PageSpec::resolve(size, margins, id).map_err(|e| match e {
        LayoutError::TemplateValidation { field, message, .. } => FieldIssue::new(field, message),
        other => FieldIssue::new("page", other.to_string()),
    })
}

fn read_region_heights(root: &Node<'_>) -> Result<RegionHeights, FieldIssue> {
    let regions = root.require("regions")?;
    let height = |name: &str| -> Result<f64, FieldIssue> {
        let node = regions.require(name)?.require("height")?;
        let value = node.as_f64()?;
        if value < 0.0 {
            return Err(FieldIssue::new(node.path(), format!("must be >= 0, got {value}")));
        }
        Ok(round_pt(value))
    };
    Ok(RegionHeights {
        header: height("header")?,
        title: height("title")?,
        footer: height("footer")?,
    })
}

fn read_grid(root: &Node<'_>) -> Result<GridSpec, FieldIssue> {
    let container = root.require("body")?.require("container")?;

    let cols_node = container.require("cols")?;
    let cols = cols_node.as_u32()?;
    if cols == 0 || cols > u32::from(MAX_GRID_TRACKS) {
        return Err(FieldIssue::new(
            cols_node.path(),
            format!("must be between 1 and {MAX_GRID_TRACKS}"),
        ));
    }

    let row_height_node = container.require("rowHeight")?;
    let row_height = row_height_node.as_f64()?;
    if row_height <= 0.0 {
        return Err(FieldIssue::new(row_height_node.path(), "must be > 0"));
    }

    let gap = |key: &str| -> Result<f64, FieldIssue> {
        match container.get(key)? {
            Some(node) => {
                let value = node.as_f64()?;
                if value < 0.0 {
                    return Err(FieldIssue::new(node.path(), "must be >= 0"));
                }
                Ok(value)
            }
            None => Ok(0.0),
        }
    };

    Ok(GridSpec {
        cols: cols as u16,
        row_height,
        gap_x: gap("gapX")?,
        gap_y: gap("gapY")?,
    })
}

fn read_span(tile: &Node<'_>, key: &str) -> Result<u16, FieldIssue> {
    let node = tile.require(key)?;
    let span = node.as_u32()?;
    if span == 0 || span > u32::from(u16::MAX) {
        return Err(FieldIssue::new(node.path(), "must be at least 1"));
    }
    Ok(span as u16)
}

fn read_tiles(root: &Node<'_>, cols: u16) -> Result<BTreeMap<TileType, TileSpec>, FieldIssue> {
    let tiles_node = root.require("tiles")?;
    let mut tiles = BTreeMap::new();

    for (key, tile) in tiles_node.entries()? {
        let tile_type = TileType::parse(key)
            .ok_or_else(|| FieldIssue::new(tile.path(), format!("unknown tile type '{key}'")))?;

        let row_span = read_span(&tile, "rowSpan")?;
        let col_span = read_span(&tile, "colSpan")?;
        if col_span > cols {
            return Err(FieldIssue::new(
                tile.child_path("colSpan"),
                format!("colSpan {col_span} exceeds grid cols {cols}"),
            ));
        }
        if tile_type == TileType::Filler && (row_span != 1 || col_span != 1) {
            return Err(FieldIssue::new(tile.path(), "FILLER tiles must be 1x1"));
        }

        let mut capabilities = Vec::new();
        if let Some(list) = tile.get("capabilities")? {
            for entry in list.items()? {
                let raw = entry.as_str()?;
                let capability = TileCapability::parse(raw).ok_or_else(|| {
                    FieldIssue::new(entry.path(), format!("unknown capability '{raw}'"))
                })?;
                if !capabilities.contains(&capability) {
                    capabilities.push(capability);
                }
            }
        }
        capabilities.sort();

        tiles.insert(
            tile_type,
            TileSpec {
                row_span,
                col_span,
                capabilities,
            },
        );
    }

    for required in REQUIRED_TILES {
        if !tiles.contains_key(&required) {
            return Err(FieldIssue::new(
                tiles_node.child_path(required.as_str()),
                "required tile spec is missing",
            ));
        }
    }

    Ok(tiles)
}

fn read_policies(root: &Node<'_>) -> Result<Policies, FieldIssue> {
    let policies = root.require("policies")?;

    let balancing_node = policies.require("lastRowBalancing")?;
    let balancing = match balancing_node.as_str()? {
        "CENTER" => LastRowBalancing::Center,
        "STRETCH" => LastRowBalancing::Stretch,
        "LEFT" => LastRowBalancing::Left,
        other => {
            return Err(FieldIssue::new(
                balancing_node.path(),
                format!("expected CENTER, STRETCH or LEFT, got '{other}'"),
            ))
        }
    };

    let filler_enabled = match policies.get("fillerEnabled")? {
        Some(node) => node.as_bool()?,
        None => false,
    };

    let item_indicator_mode = match policies.get("itemIndicatorMode")? {
        Some(node) => match node.as_str()? {
            "NONE" => ItemIndicatorMode::None,
            "INLINE" => ItemIndicatorMode::Inline,
            "BADGE" => ItemIndicatorMode::Badge,
            other => {
                return Err(FieldIssue::new(
                    node.path(),
                    format!("expected NONE, INLINE or BADGE, got '{other}'"),
                ))
            }
        },
        None => ItemIndicatorMode::None,
    };

    Ok(Policies {
        last_row_balancing: balancing,
        filler_enabled,
        item_indicator_mode,
    })
}
