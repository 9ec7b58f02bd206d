//! Field extraction from a product detail page.
//!
//! Both acquisition strategies end up with the page's HTML (the interactive
//! one reads it back from the live DOM), so a single static-document
//! extractor serves both.

use std::collections::BTreeMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use scraper::Html;
use shelfwatch_core::{ProductRecord, DEFAULT_SELLER};

use crate::parse::{extract_pet, extract_weight, normalize_price};
use crate::selectors::{element_text, first_text, ChainSelector, CompiledSelectors};

#[derive(Debug, Clone)]
pub struct FieldExtractor {
    selectors: Arc<CompiledSelectors>,
    currency: String,
}

impl FieldExtractor {
    #[must_use]
    pub fn new(selectors: Arc<CompiledSelectors>, currency: impl Into<String>) -> Self {
        Self {
            selectors,
            currency: currency.into(),
        }
    }

    /// Parses `html` and extracts a record. See [`FieldExtractor::extract`].
    #[must_use]
    pub fn extract_html(&self, html: &str, source_url: &str) -> Option<ProductRecord> {
        let doc = Html::parse_document(html);
        self.extract(&doc, source_url)
    }

    /// Returns `None` when either the title or the price chain is exhausted.
    /// Every other field falls back to its default.
    #[must_use]
    pub fn extract(&self, doc: &Html, source_url: &str) -> Option<ProductRecord> {
        let Some(name) = first_text(doc, &self.selectors.title) else {
            tracing::debug!(url = source_url, "no title found; dropping record");
            return None;
        };

        let Some(price) = self.extract_price(doc) else {
            tracing::debug!(url = source_url, title = %name, "no parseable price; dropping record");
            return None;
        };

        let seller = first_text(doc, &self.selectors.seller)
            .unwrap_or_else(|| DEFAULT_SELLER.to_string());

        Some(ProductRecord {
            weight: extract_weight(&name),
            pet_category: extract_pet(&name),
            name,
            price,
            seller,
            source_url: source_url.to_string(),
            extra: BTreeMap::new(),
        })
    }

    fn extract_price(&self, doc: &Html) -> Option<Decimal> {
        self.composite_price(doc)
            .or_else(|| self.single_node_price(doc))
            .or_else(|| self.other_sellers_price(doc))
    }

    /// Whole and fraction rendered in separate spans inside one price block.
    fn composite_price(&self, doc: &Html) -> Option<Decimal> {
        let whole_sel = &self.selectors.price_whole.selector;
        let fraction_sel = &self.selectors.price_fraction.selector;

        self.selectors.price_blocks.iter().find_map(|stage| {
            doc.select(&stage.selector).find_map(|block| {
                let whole = block.select(whole_sel).find_map(element_text)?;
                let raw = match block.select(fraction_sel).find_map(element_text) {
                    Some(fraction) => format!("{whole}\n{fraction}"),
                    None => whole,
                };
                self.parse_candidate(&raw, stage)
            })
        })
    }

    fn single_node_price(&self, doc: &Html) -> Option<Decimal> {
        self.selectors.price_single.iter().find_map(|stage| {
            let raw = doc.select(&stage.selector).find_map(element_text)?;
            self.parse_candidate(&raw, stage)
        })
    }

    /// Only consulted when the availability text says the item can be bought.
    fn other_sellers_price(&self, doc: &Html) -> Option<Decimal> {
        let availability = first_text(doc, &self.selectors.availability)?;
        let in_stock = self
            .selectors
            .in_stock_markers
            .iter()
            .any(|marker| availability.contains(marker.as_str()));
        if !in_stock {
            return None;
        }

        self.selectors.other_sellers_price.iter().find_map(|stage| {
            let raw = doc.select(&stage.selector).find_map(element_text)?;
            self.parse_candidate(&raw, stage)
        })
    }

    fn parse_candidate(&self, raw: &str, stage: &ChainSelector) -> Option<Decimal> {
        match normalize_price(raw, &self.currency) {
            Ok(price) => Some(price),
            Err(e) => {
                tracing::debug!(selector = %stage.css, error = %e, "price candidate rejected");
                None
            }
        }
    }
}

#[cfg(test)]
#[path = "extract_test.rs"]
mod tests;
