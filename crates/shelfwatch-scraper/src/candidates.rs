//! Candidate product links on a search results page.

use std::collections::HashSet;

use scraper::Html;

use crate::selectors::ChainSelector;
use crate::urls::{absolutize, detail_url};

/// Path marker identifying a product detail URL.
pub const DETAIL_PATH_MARKER: &str = "/dp/";

/// A product detail page to visit, identified by its catalogue id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub id: String,
    /// Canonical `{base}dp/{id}` form.
    pub url: String,
}

impl Candidate {
    #[must_use]
    pub fn new(base: &str, id: &str) -> Self {
        Self {
            id: id.to_string(),
            url: detail_url(base, id),
        }
    }
}

/// Extracts the catalogue id from a product URL: the segment after `/dp/`
/// up to the next `/`, `?` or `#`.
#[must_use]
pub fn candidate_id(href: &str) -> Option<&str> {
    let start = href.find(DETAIL_PATH_MARKER)? + DETAIL_PATH_MARKER.len();
    let rest = &href[start..];
    let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let id = &rest[..end];
    (!id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric())).then_some(id)
}

/// Raw `href` values from the first result pattern that matches anything.
#[must_use]
pub fn result_hrefs(doc: &Html, patterns: &[ChainSelector]) -> Vec<String> {
    for pattern in patterns {
        let hrefs: Vec<String> = doc
            .select(&pattern.selector)
            .filter_map(|a| a.value().attr("href"))
            .map(str::to_string)
            .collect();
        if !hrefs.is_empty() {
            tracing::debug!(selector = %pattern.css, count = hrefs.len(), "result pattern matched");
            return hrefs;
        }
        tracing::debug!(selector = %pattern.css, "result pattern matched nothing");
    }
    Vec::new()
}

/// Filters hrefs to detail pages, de-duplicates by id preserving first-seen
/// order, and canonicalises each to `{base}dp/{id}`.
#[must_use]
pub fn to_candidates(hrefs: &[String], base: &str, seen: &mut HashSet<String>) -> Vec<Candidate> {
    hrefs
        .iter()
        .filter_map(|href| candidate_id(href))
        .filter(|id| seen.insert((*id).to_string()))
        .map(|id| Candidate::new(base, id))
        .collect()
}

/// Absolute URL of the first next-page link, if any.
#[must_use]
pub fn next_page_url(doc: &Html, page_url: &str, patterns: &[ChainSelector]) -> Option<String> {
    let href = patterns.iter().find_map(|pattern| {
        doc.select(&pattern.selector)
            .find_map(|a| a.value().attr("href"))
    })?;
    match absolutize(page_url, href) {
        Ok(url) => Some(url),
        Err(e) => {
            tracing::warn!(href, error = %e, "ignoring unusable next-page link");
            None
        }
    }
}
