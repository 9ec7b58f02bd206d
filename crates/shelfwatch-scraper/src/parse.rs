//! String-level parsing for the fields the extractor derives from raw page
//! text: price, weight token, and pet category.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use shelfwatch_core::{PetCategory, NOT_AVAILABLE};

use crate::error::ScraperError;

static WEIGHT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*kg").expect("valid regex"));

/// Normalizes a rendered price string to a decimal.
///
/// Accepts the shapes the marketplace renders:
/// - `"₹1,234.56"`: currency prefix, thousands separators
/// - `"1,234\n56"`: whole and fraction in separate nodes, joined by a newline
/// - `"1234.56"`: already clean
///
/// Text before the first `currency` symbol is discarded, as is anything after
/// a second occurrence (offscreen and visible renders are often adjacent).
///
/// # Errors
///
/// Returns [`ScraperError::MalformedPrice`] when no decimal can be recovered.
pub fn normalize_price(raw: &str, currency: &str) -> Result<Decimal, ScraperError> {
    let malformed = || ScraperError::MalformedPrice {
        raw: raw.to_string(),
    };

    let after_symbol = if !currency.is_empty() && raw.contains(currency) {
        raw.split(currency).nth(1).unwrap_or_default()
    } else {
        raw
    };

    let without_separators = after_symbol.replace(',', "");
    let joined = join_whole_and_fraction(&without_separators);

    let token = joined
        .split_whitespace()
        .find(|t| t.chars().any(|c| c.is_ascii_digit()))
        .ok_or_else(malformed)?;

    let cleaned: String = token
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let cleaned = cleaned.trim_matches('.');

    if cleaned.is_empty() {
        return Err(malformed());
    }

    Decimal::from_str(cleaned).map_err(|_| malformed())
}

/// `"1234\n56"` → `"1234.56"`. Input without a line break is returned as-is.
fn join_whole_and_fraction(text: &str) -> String {
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
    match (lines.next(), lines.next()) {
        (Some(whole), Some(fraction))
            if fraction.chars().next().is_some_and(|c| c.is_ascii_digit()) =>
        {
            format!("{}.{}", whole.trim_end_matches('.'), fraction)
        }
        (Some(whole), _) => whole.to_string(),
        (None, _) => String::new(),
    }
}

/// First `<number>[.<number>] kg` token in the title, normalized to
/// lower-case without spaces (`"3.5 KG"` → `"3.5kg"`), or `"N/A"`.
#[must_use]
pub fn extract_weight(title: &str) -> String {
    WEIGHT_RE
        .captures(title)
        .and_then(|caps| caps.get(1))
        .map_or_else(
            || NOT_AVAILABLE.to_string(),
            |m| format!("{}kg", m.as_str()),
        )
}

/// Keyword match on the lower-cased title; `"dog"` wins over `"cat"`.
#[must_use]
pub fn extract_pet(title: &str) -> PetCategory {
    let lower = title.to_lowercase();
    if lower.contains("dog") {
        PetCategory::Dog
    } else if lower.contains("cat") {
        PetCategory::Cat
    } else {
        PetCategory::NotApplicable
    }
}

#[cfg(test)]
#[path = "parse_test.rs"]
mod tests;
