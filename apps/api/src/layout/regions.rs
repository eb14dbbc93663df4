//! Region Calculator: partitions a page's content area into stacked bands.
//!
//! # Stacking rules
//! - Order is always header → title → body → footer, zero gap between bands.
//! - Every band starts at x = 0 and spans the full content width.
//! - Body gets whatever height remains; it is never declared.
//! - Footer is anchored to the bottom of the content area, computed from the
//!   content height directly rather than by summing the bands above it.

use serde::{Deserialize, Serialize};

use crate::layout::error::LayoutError;
use crate::layout::geometry::{pt_eq, round_pt, PageSpec};
use crate::layout::template::Template;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionId {
    Header,
    Title,
    #[default]
    Body,
    Footer,
}

impl RegionId {
    pub const ORDER: [RegionId; 4] = [
        RegionId::Header,
        RegionId::Title,
        RegionId::Body,
        RegionId::Footer,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RegionId::Header => "header",
            RegionId::Title => "title",
            RegionId::Body => "body",
            RegionId::Footer => "footer",
        }
    }
}

/// One band of the content area. Coordinates are relative to the content
/// area's top-left corner (inside the margins).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub id: RegionId,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Region {
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

/// Declared band heights. Body is derived.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionHeights {
    pub header: f64,
    pub title: f64,
    pub footer: f64,
}

/// Computes the four regions for a template's page.
pub fn calculate_regions(page: &PageSpec, template: &Template) -> Result<Vec<Region>, LayoutError> {
    stack_regions(page, &template.region_heights, &template.id)
}

/// Looks up a region by id. Regions produced by [`calculate_regions`] always
/// contain all four.
pub fn find_region(regions: &[Region], id: RegionId) -> Option<&Region> {
    regions.iter().find(|r| r.id == id)
}

pub(crate) fn stack_regions(
    page: &PageSpec,
    heights: &RegionHeights,
    template_id: &str,
) -> Result<Vec<Region>, LayoutError> {
    let declared = [
        ("regions.header.height", heights.header),
        ("regions.title.height", heights.title),
        ("regions.footer.height", heights.footer),
    ];
    for (field, value) in declared {
        if !value.is_finite() || value < 0.0 {
            return Err(LayoutError::template(
                template_id,
                field,
                format!("must be a finite value >= 0, got {value}"),
            ));
        }
    }

    let content_width = page.content_width();
    let content_height = page.content_height();

    let body_height = round_pt(content_height - (heights.header + heights.title + heights.footer));
    if body_height <= 0.0 {
        return Err(LayoutError::template(
            template_id,
            "regions",
            format!(
                "header + title + footer ({:.2}pt) exceed content height ({:.2}pt); body height would be {:.2}pt",
                heights.header + heights.title + heights.footer,
                content_height,
                body_height
            ),
        ));
    }

    let header = Region {
        id: RegionId::Header,
        x: 0.0,
        y: 0.0,
        width: content_width,
        height: round_pt(heights.header),
    };
    let title = Region {
        id: RegionId::Title,
        x: 0.0,
        y: header.height,
        width: content_width,
        height: round_pt(heights.title),
    };
    let body = Region {
        id: RegionId::Body,
        x: 0.0,
        y: round_pt(title.y + title.height),
        width: content_width,
        height: body_height,
    };
    let footer = Region {
        id: RegionId::Footer,
        x: 0.0,
        y: round_pt(content_height - heights.footer),
        width: content_width,
        height: round_pt(heights.footer),
    };

    Ok(vec![header, title, body, footer])
}

/// Checks the stacking invariants on an arbitrary set of regions.
pub fn validate_regions(
    regions: &[Region],
    content_width: f64,
    content_height: f64,
    template_id: &str,
) -> Result<(), LayoutError> {
    for id in RegionId::ORDER {
        if find_region(regions, id).is_none() {
            return Err(LayoutError::template(
                template_id,
                format!("regions.{}", id.as_str()),
                "required region is missing",
            ));
        }
    }

    let mut ordered: Vec<&Region> = regions.iter().collect();
    ordered.sort_by_key(|r| r.id);

    let mut expected_y = 0.0;
    for region in &ordered {
        let field = format!("regions.{}", region.id.as_str());
        if !pt_eq(region.x, 0.0) {
            return Err(LayoutError::template(
                template_id,
                field,
                format!("x must be 0, got {:.2}", region.x),
            ));
        }
        if !pt_eq(region.width, content_width) {
            return Err(LayoutError::template(
                template_id,
                field,
                format!(
                    "width {:.2}pt does not match content width {:.2}pt",
                    region.width, content_width
                ),
            ));
        }
        if !pt_eq(region.y, expected_y) {
            return Err(LayoutError::template(
                template_id,
                field,
                format!("y {:.2}pt leaves a gap; expected {:.2}pt", region.y, expected_y),
            ));
        }
        expected_y = region.bottom();
    }

    if !pt_eq(expected_y, content_height) {
        return Err(LayoutError::template(
            template_id,
            "regions",
            format!(
                "regions cover {:.2}pt of {:.2}pt content height",
                expected_y, content_height
            ),
        ));
    }

    Ok(())
}
