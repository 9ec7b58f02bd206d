//! Per-invocation run configuration.
//!
//! A [`RunConfig`] is built once per extraction from the process-level
//! [`AppConfig`](crate::AppConfig) plus the caller's search input, and is
//! passed by reference to every stage of the pipeline.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::app_config::ScrapeSettings;
use crate::products::SearchFilters;
use crate::CoreError;

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    /// Trimmed, whitespace-collapsed search term.
    pub search_term: String,
    /// File-safe name of the report history this run appends to.
    pub report_name: String,
    pub filters: SearchFilters,
    pub scrape: ScrapeSettings,
}

impl RunConfig {
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidSearchTerm`] if the term is empty after
    /// normalisation or yields an empty report name.
    pub fn new(
        raw_term: &str,
        filters: SearchFilters,
        scrape: ScrapeSettings,
    ) -> Result<Self, CoreError> {
        let search_term = normalize_search_term(raw_term)?;
        let report_name = report_name(&search_term);
        if report_name.is_empty() {
            return Err(CoreError::InvalidSearchTerm {
                term: raw_term.to_string(),
                reason: "term contains no characters usable in a report name".to_string(),
            });
        }

        Ok(Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            search_term,
            report_name,
            filters,
            scrape,
        })
    }
}

/// Trims the term and collapses internal whitespace runs to single spaces.
///
/// # Errors
///
/// Returns [`CoreError::InvalidSearchTerm`] when nothing is left.
pub fn normalize_search_term(raw: &str) -> Result<String, CoreError> {
    let normalized = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if normalized.is_empty() {
        return Err(CoreError::InvalidSearchTerm {
            term: raw.to_string(),
            reason: "term is empty".to_string(),
        });
    }
    Ok(normalized)
}

/// Derives the report history name for a search term: spaces become
/// underscores, anything outside `[A-Za-z0-9_-]` is dropped.
#[must_use]
pub fn report_name(term: &str) -> String {
    term.split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}
