use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// Seller recorded when neither the byline nor the merchant-info element
/// yields a name.
pub const DEFAULT_SELLER: &str = "Amazon";

/// Placeholder used by the derived string annotations (weight) when the
/// title carries no usable token.
pub const NOT_AVAILABLE: &str = "N/A";

/// A product extracted from a marketplace detail page.
///
/// Field names on the wire are the ones the report files have always used
/// (`product_name`, `current_price`, `pet`, ...). Downstream exporters flatten
/// `products` entries by these keys, so they must not change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    #[serde(rename = "product_name")]
    pub name: String,
    /// Always present: a record without a parseable price is never emitted.
    #[serde(rename = "current_price", with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(default = "default_seller")]
    pub seller: String,
    /// Best-effort weight token derived from the title, e.g. `"3.5kg"`.
    #[serde(default = "not_available")]
    pub weight: String,
    #[serde(rename = "pet", default)]
    pub pet_category: PetCategory,
    #[serde(rename = "product_url", default)]
    pub source_url: String,
    /// Keys written by older tools (`type_of_product`, `search_url`, ...),
    /// carried through rewrites untouched.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

fn default_seller() -> String {
    DEFAULT_SELLER.to_string()
}

fn not_available() -> String {
    NOT_AVAILABLE.to_string()
}

/// Pet category derived from a product title by keyword match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PetCategory {
    Dog,
    Cat,
    #[default]
    #[serde(rename = "N/A")]
    NotApplicable,
}

impl fmt::Display for PetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PetCategory::Dog => write!(f, "Dog"),
            PetCategory::Cat => write!(f, "Cat"),
            PetCategory::NotApplicable => write!(f, "{NOT_AVAILABLE}"),
        }
    }
}

/// Price bounds for one run. A missing side means "no bound".
///
/// Serialized as `{"min": "200", "max": "10000"}` to match the filter block
/// persisted in every report. Stored bounds are read back under the same
/// rules as user input, so a blank or garbage bound loads as no bound.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilters {
    #[serde(rename = "min", default, deserialize_with = "stored_bound")]
    pub min_price: Option<Decimal>,
    #[serde(rename = "max", default, deserialize_with = "stored_bound")]
    pub max_price: Option<Decimal>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredBound {
    Text(String),
    Number(f64),
    Other(serde::de::IgnoredAny),
}

fn stored_bound<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Decimal>, D::Error> {
    Ok(match Option::<StoredBound>::deserialize(d)? {
        None => None,
        Some(StoredBound::Text(raw)) => parse_bound(&raw),
        Some(StoredBound::Number(n)) => Decimal::try_from(n)
            .ok()
            .filter(|value| !value.is_sign_negative()),
        Some(StoredBound::Other(_)) => None,
    })
}

impl SearchFilters {
    /// Builds filters from raw user input.
    ///
    /// Blank, unparseable, or negative bounds are dropped rather than
    /// rejected. When both bounds parse but `min > max`, both are dropped:
    /// an inverted range would otherwise make the marketplace return nothing.
    #[must_use]
    pub fn from_raw(min: Option<&str>, max: Option<&str>) -> Self {
        let min_price = min.and_then(parse_bound);
        let max_price = max.and_then(parse_bound);

        if let (Some(lo), Some(hi)) = (min_price, max_price) {
            if lo > hi {
                tracing::warn!(%lo, %hi, "min price exceeds max price; ignoring both bounds");
                return Self::default();
            }
        }

        Self {
            min_price,
            max_price,
        }
    }

    #[must_use]
    pub fn is_unbounded(&self) -> bool {
        self.min_price.is_none() && self.max_price.is_none()
    }
}

fn parse_bound(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse::<Decimal>() {
        Ok(value) if value.is_sign_negative() => None,
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(raw = trimmed, error = %e, "ignoring unparseable price bound");
            None
        }
    }
}
