//! Marketplace URL construction shared by both strategies.

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use shelfwatch_core::SearchFilters;

use crate::error::ScraperError;

/// `{base}s?k=dog+food&low-price=200&high-price=10000`.
///
/// `base` must end with `/`; [`AppConfig`](shelfwatch_core::AppConfig)
/// guarantees this.
#[must_use]
pub fn search_url(base: &str, term: &str, filters: &SearchFilters) -> String {
    let keywords = term
        .split_whitespace()
        .map(|word| utf8_percent_encode(word, NON_ALPHANUMERIC).to_string())
        .collect::<Vec<_>>()
        .join("+");
    let mut url = format!("{base}s?k={keywords}");
    append_price_range(&mut url, filters);
    url
}

/// Appends `low-price`/`high-price` for whichever bounds are present.
pub fn append_price_range(url: &mut String, filters: &SearchFilters) {
    let mut push = |key: &str, value: String| {
        url.push(if url.contains('?') { '&' } else { '?' });
        url.push_str(key);
        url.push('=');
        url.push_str(&value);
    };
    if let Some(min) = filters.min_price {
        push("low-price", min.normalize().to_string());
    }
    if let Some(max) = filters.max_price {
        push("high-price", max.normalize().to_string());
    }
}

/// Canonical detail page for a candidate id.
#[must_use]
pub fn detail_url(base: &str, id: &str) -> String {
    format!("{base}dp/{id}")
}

/// Resolves a possibly relative `href` against the page it was found on.
///
/// # Errors
///
/// Returns [`ScraperError::InvalidUrl`] if either side fails to parse.
pub fn absolutize(page_url: &str, href: &str) -> Result<String, ScraperError> {
    let base = reqwest::Url::parse(page_url).map_err(|e| ScraperError::InvalidUrl {
        url: page_url.to_string(),
        reason: e.to_string(),
    })?;
    base.join(href)
        .map(String::from)
        .map_err(|e| ScraperError::InvalidUrl {
            url: href.to_string(),
            reason: e.to_string(),
        })
}
