//! Menu Normalizer: coerces upstream menu payloads into the canonical
//! `LayoutMenu` and derives the characteristics the selector reads.
//!
//! Section and item order is preserved exactly. An item that cannot be coerced
//! is an `InputValidation` error naming its field path; nothing is dropped.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::layout::error::LayoutError;
use crate::layout::fields::{FieldIssue, Node};

// ────────────────────────────────────────────────────────────────────────────
// Canonical model
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutMenu {
    pub metadata: MenuMetadata,
    pub sections: Vec<MenuSection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuMetadata {
    pub title: String,
    pub currency: Currency,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuSection {
    pub name: String,
    pub items: Vec<MenuItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub name: String,
    pub price: f64,
    pub description: Option<String>,
    pub image_ref: Option<String>,
    pub featured: bool,
    pub indicators: Vec<DietaryIndicator>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DietaryIndicator {
    Vegetarian,
    Vegan,
    GlutenFree,
    Spicy,
    Halal,
    ContainsNuts,
}

impl DietaryIndicator {
    fn parse(raw: &str) -> Option<Self> {
        let key: String = raw
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c == '-' || c == ' ' { '_' } else { c })
            .collect();
        match key.as_str() {
            "vegetarian" => Some(DietaryIndicator::Vegetarian),
            "vegan" => Some(DietaryIndicator::Vegan),
            "gluten_free" => Some(DietaryIndicator::GlutenFree),
            "spicy" => Some(DietaryIndicator::Spicy),
            "halal" => Some(DietaryIndicator::Halal),
            "contains_nuts" => Some(DietaryIndicator::ContainsNuts),
            _ => None,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Currency
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    Eur,
    Gbp,
    Jpy,
    Cad,
    Aud,
    Nzd,
    Chf,
    Sgd,
    Myr,
    Inr,
    Hkd,
}

impl Currency {
    const ALL: [Currency; 12] = [
        Currency::Usd,
        Currency::Eur,
        Currency::Gbp,
        Currency::Jpy,
        Currency::Cad,
        Currency::Aud,
        Currency::Nzd,
        Currency::Chf,
        Currency::Sgd,
        Currency::Myr,
        Currency::Inr,
        Currency::Hkd,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
            Currency::Jpy => "JPY",
            Currency::Cad => "CAD",
            Currency::Aud => "AUD",
            Currency::Nzd => "NZD",
            Currency::Chf => "CHF",
            Currency::Sgd => "SGD",
            Currency::Myr => "MYR",
            Currency::Inr => "INR",
            Currency::Hkd => "HKD",
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Currency::Usd => "$",
            Currency::Eur => "€",
            Currency::Gbp => "£",
            Currency::Jpy => "¥",
            Currency::Cad => "CA$",
            Currency::Aud => "A$",
            Currency::Nzd => "NZ$",
            Currency::Chf => "CHF ",
            Currency::Sgd => "S$",
            Currency::Myr => "RM",
            Currency::Inr => "₹",
            Currency::Hkd => "HK$",
        }
    }

    pub fn decimals(self) -> usize {
        match self {
            Currency::Jpy => 0,
            _ => 2,
        }
    }

    /// Accepts ISO codes (any case) and the four unambiguous symbols.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        match trimmed {
            "$" => return Some(Currency::Usd),
            "€" => return Some(Currency::Eur),
            "£" => return Some(Currency::Gbp),
            "¥" => return Some(Currency::Jpy),
            _ => {}
        }
        let upper = trimmed.to_uppercase();
        Self::ALL.into_iter().find(|c| c.code() == upper)
    }

    /// `1234.5` → `$1,234.50`; JPY has no minor unit.
    pub fn format_price(self, amount: f64) -> String {
        let fixed = format!("{:.*}", self.decimals(), amount);
        let (whole, fraction) = match fixed.split_once('.') {
            Some((w, f)) => (w.to_string(), Some(f.to_string())),
            None => (fixed.clone(), None),
        };

        let digits: Vec<char> = whole.chars().collect();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, c) in digits.iter().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(*c);
        }

        match fraction {
            Some(f) => format!("{}{grouped}.{f}", self.symbol()),
            None => format!("{}{grouped}", self.symbol()),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Characteristics
// ────────────────────────────────────────────────────────────────────────────

/// Read-only content summary consumed by the template selector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuCharacteristics {
    pub item_count: u32,
    pub section_count: u32,
    /// Fraction of items with an image reference, 0.0 for an empty menu.
    pub image_ratio: f64,
    /// Mean description length in characters over all items.
    pub average_description_length: f64,
    pub featured_count: u32,
}

impl LayoutMenu {
    pub fn items(&self) -> impl Iterator<Item = &MenuItem> {
        self.sections.iter().flat_map(|s| s.items.iter())
    }

    pub fn characteristics(&self) -> MenuCharacteristics {
        let mut item_count = 0u32;
        let mut with_image = 0u32;
        let mut featured_count = 0u32;
        let mut description_chars = 0usize;

        for item in self.items() {
            item_count += 1;
            if item.image_ref.is_some() {
                with_image += 1;
            }
            if item.featured {
                featured_count += 1;
            }
            description_chars += item
                .description
                .as_deref()
                .map(|d| d.chars().count())
                .unwrap_or(0);
        }

        let (image_ratio, average_description_length) = if item_count == 0 {
            (0.0, 0.0)
        } else {
            (
                f64::from(with_image) / f64::from(item_count),
                description_chars as f64 / f64::from(item_count),
            )
        };

        MenuCharacteristics {
            item_count,
            section_count: self.sections.len() as u32,
            image_ratio,
            average_description_length,
            featured_count,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Normalisation
// ────────────────────────────────────────────────────────────────────────────

/// Converts a raw menu payload into a `LayoutMenu`.
pub fn normalize(raw: &Value) -> Result<LayoutMenu, LayoutError> {
    normalize_node(&Node::root(raw)).map_err(|issue| LayoutError::input(issue.field, issue.message))
}

/// Trims, drops control characters and collapses whitespace runs.
pub fn sanitize_text(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn normalize_node(root: &Node<'_>) -> Result<LayoutMenu, FieldIssue> {
    let metadata_node = root.require("metadata")?;

    let title = required_text(&metadata_node, "title")?;

    let currency_node = metadata_node.require("currency")?;
    let raw_currency = currency_node.as_str()?;
    let currency = Currency::parse(raw_currency).ok_or_else(|| {
        FieldIssue::new(
            currency_node.path(),
            format!("unsupported currency '{}'", raw_currency.trim()),
        )
    })?;

    let sections_node = root.get_any(&["sections", "categories"])?.ok_or_else(|| {
        FieldIssue::new(root.child_path("sections"), "required field is missing")
    })?;

    let sections = sections_node
        .items()?
        .iter()
        .map(normalize_section)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(LayoutMenu {
        metadata: MenuMetadata { title, currency },
        sections,
    })
}

fn normalize_section(node: &Node<'_>) -> Result<MenuSection, FieldIssue> {
    let name = required_text(node, "name")?;
    let items = match node.get("items")? {
        Some(list) => list
            .items()?
            .iter()
            .map(normalize_item)
            .collect::<Result<Vec<_>, _>>()?,
        None => Vec::new(),
    };
    Ok(MenuSection { name, items })
}

fn normalize_item(node: &Node<'_>) -> Result<MenuItem, FieldIssue> {
    let name = required_text(node, "name")?;
    let price = parse_price(&node.require("price")?)?;
    let description = optional_text(node, &["description"])?;
    let image_ref = optional_text(node, &["imageRef", "imageUrl", "image_url"])?;

    let featured = match node.get("featured")? {
        Some(flag) => flag.as_bool()?,
        None => false,
    };

    let mut indicators = Vec::new();
    if let Some(list) = node.get("indicators")? {
        for entry in list.items()? {
            let raw = entry.as_str()?;
            let indicator = DietaryIndicator::parse(raw).ok_or_else(|| {
                FieldIssue::new(entry.path(), format!("unknown indicator '{raw}'"))
            })?;
            if !indicators.contains(&indicator) {
                indicators.push(indicator);
            }
        }
    }

    Ok(MenuItem {
        name,
        price,
        description,
        image_ref,
        featured,
        indicators,
    })
}

fn required_text(node: &Node<'_>, key: &str) -> Result<String, FieldIssue> {
    let field = node.require(key)?;
    let text = sanitize_text(field.as_str()?);
    if text.is_empty() {
        return Err(FieldIssue::new(field.path(), "must not be empty"));
    }
    Ok(text)
}

fn optional_text(node: &Node<'_>, keys: &[&str]) -> Result<Option<String>, FieldIssue> {
    match node.get_any(keys)? {
        Some(field) => {
            let text = sanitize_text(field.as_str()?);
            Ok((!text.is_empty()).then_some(text))
        }
        None => Ok(None),
    }
}

/// Numbers pass through; strings such as `"$1,250.00"`, `"€12,50"` or
/// `"RM 8"` are reduced to their numeric part.
fn parse_price(node: &Node<'_>) -> Result<f64, FieldIssue> {
    let value = match node.value() {
        Value::Number(_) => node.as_f64()?,
        Value::String(raw) => parse_price_text(raw)
            .ok_or_else(|| FieldIssue::new(node.path(), format!("'{raw}' is not a price")))?,
        _ => return Err(FieldIssue::new(node.path(), "expected a number or numeric string")),
    };

    if !value.is_finite() || value < 0.0 {
        return Err(FieldIssue::new(node.path(), format!("must be >= 0, got {value}")));
    }
    Ok(value)
}

/// A comma followed by one or two final digits is a decimal comma (`12,50`,
/// `1.250,00`). Any other thousands separator must split the integer part
/// into groups of three; anything else is not a price.
fn parse_price_text(raw: &str) -> Option<f64> {
    let numeric: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        .collect();
    let (negative, unsigned) = match numeric.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, numeric.as_str()),
    };

    let (decimal, thousands) = match unsigned.rfind(|c: char| c == '.' || c == ',') {
        Some(pos) if unsigned[pos..].starts_with('.') => ('.', ','),
        Some(pos) if (2..=3).contains(&(unsigned.len() - pos)) => (',', '.'),
        _ => ('.', ','),
    };

    let (int_part, frac_part) = match unsigned.split_once(decimal) {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (unsigned, None),
    };
    if let Some(frac) = frac_part {
        if frac.is_empty() || !frac.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
    }

    let groups: Vec<&str> = int_part.split(thousands).collect();
    let grouped = groups.len() > 1;
    let groups_valid = groups.iter().enumerate().all(|(i, group)| {
        let len_ok = match (grouped, i) {
            (false, _) => !group.is_empty(),
            (true, 0) => (1..=3).contains(&group.len()),
            (true, _) => group.len() == 3,
        };
        len_ok && group.chars().all(|c| c.is_ascii_digit())
    });
    if !groups_valid {
        return None;
    }

    let digits = groups.concat();
    let text = match frac_part {
        Some(frac) => format!("{digits}.{frac}"),
        None => digits,
    };
    let value: f64 = text.parse().ok()?;
    Some(if negative { -value } else { value })
}
