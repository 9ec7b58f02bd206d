//! Compiled form of a [`SelectorProfile`].
//!
//! Compilation happens once at startup so a typo in a YAML override is a
//! configuration error rather than a silent miss during extraction.

use scraper::{ElementRef, Html, Selector};
use shelfwatch_core::SelectorProfile;

use crate::error::ScraperError;

/// One stage of a fallback chain: the source text is kept for logging and
/// for strategies that hand selectors to a live browser.
#[derive(Debug, Clone)]
pub struct ChainSelector {
    pub css: String,
    pub selector: Selector,
}

#[derive(Debug, Clone)]
pub struct CompiledSelectors {
    pub search_box: Vec<ChainSelector>,
    pub result_links: Vec<ChainSelector>,
    pub next_page: Vec<ChainSelector>,
    pub title: Vec<ChainSelector>,
    pub price_blocks: Vec<ChainSelector>,
    pub price_whole: ChainSelector,
    pub price_fraction: ChainSelector,
    pub price_single: Vec<ChainSelector>,
    pub availability: Vec<ChainSelector>,
    pub in_stock_markers: Vec<String>,
    pub other_sellers_price: Vec<ChainSelector>,
    pub seller: Vec<ChainSelector>,
    pub price_ready: Vec<ChainSelector>,
}

impl CompiledSelectors {
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidSelector`] naming the first selector
    /// that fails to parse.
    pub fn compile(profile: &SelectorProfile) -> Result<Self, ScraperError> {
        Ok(Self {
            search_box: compile_chain(&profile.search_box)?,
            result_links: compile_chain(&profile.result_links)?,
            next_page: compile_chain(&profile.next_page)?,
            title: compile_chain(&profile.title)?,
            price_blocks: compile_chain(&profile.price_blocks)?,
            price_whole: compile_one(&profile.price_whole)?,
            price_fraction: compile_one(&profile.price_fraction)?,
            price_single: compile_chain(&profile.price_single)?,
            availability: compile_chain(&profile.availability)?,
            in_stock_markers: profile.in_stock_markers.clone(),
            other_sellers_price: compile_chain(&profile.other_sellers_price)?,
            seller: compile_chain(&profile.seller)?,
            price_ready: compile_chain(&profile.price_ready)?,
        })
    }
}

fn compile_one(css: &str) -> Result<ChainSelector, ScraperError> {
    let selector = Selector::parse(css).map_err(|e| ScraperError::InvalidSelector {
        selector: css.to_string(),
        reason: e.to_string(),
    })?;
    Ok(ChainSelector {
        css: css.to_string(),
        selector,
    })
}

fn compile_chain(chain: &[String]) -> Result<Vec<ChainSelector>, ScraperError> {
    chain
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(compile_one)
        .collect()
}

/// Whitespace-normalized text of an element, `None` when blank.
pub(crate) fn element_text(element: ElementRef<'_>) -> Option<String> {
    let raw: String = element.text().collect();
    let text = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    (!text.is_empty()).then_some(text)
}

/// First non-blank text produced by the chain, in chain order.
pub(crate) fn first_text(doc: &Html, chain: &[ChainSelector]) -> Option<String> {
    chain.iter().find_map(|stage| {
        let found = doc.select(&stage.selector).find_map(element_text);
        if found.is_none() {
            tracing::debug!(selector = %stage.css, "selector fell through");
        }
        found
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_profile_compiles() {
        let compiled = CompiledSelectors::compile(&SelectorProfile::default()).unwrap();
        assert_eq!(compiled.title.len(), SelectorProfile::default().title.len());
    }

    #[test]
    fn invalid_selector_is_reported_by_name() {
        let profile = SelectorProfile {
            title: vec!["span#productTitle".to_string(), "div[[".to_string()],
            ..SelectorProfile::default()
        };
        let err = CompiledSelectors::compile(&profile).unwrap_err();
        assert!(
            matches!(err, ScraperError::InvalidSelector { ref selector, .. } if selector == "div[["),
            "unexpected error: {err:?}"
        );
    }

    #[test]
    fn blank_chain_entries_are_skipped() {
        let profile = SelectorProfile {
            seller: vec!["  ".to_string(), "#bylineInfo".to_string()],
            ..SelectorProfile::default()
        };
        let compiled = CompiledSelectors::compile(&profile).unwrap();
        assert_eq!(compiled.seller.len(), 1);
        assert_eq!(compiled.seller[0].css, "#bylineInfo");
    }

    #[test]
    fn first_text_falls_through_empty_matches() {
        let doc = Html::parse_document(
            r#"<div class="title-recipe">   </div><span id="productTitle"> Whiskas  Tuna </span>"#,
        );
        let chain = compile_chain(&[".title-recipe".to_string(), "span#productTitle".to_string()])
            .unwrap();
        assert_eq!(first_text(&doc, &chain).as_deref(), Some("Whiskas Tuna"));
    }
}
