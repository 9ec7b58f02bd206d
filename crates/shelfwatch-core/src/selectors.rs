//! CSS selector chains used by the field extractor and both acquisition
//! strategies.
//!
//! Every chain is ordered: the first selector that matches wins. The built-in
//! profile targets the current marketplace templates; a YAML file may replace
//! any chain, and keys it omits keep their defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SelectorProfile {
    /// Search input on the marketplace home page.
    pub search_box: Vec<String>,
    /// Result-item link patterns, tried until one yields matches.
    pub result_links: Vec<String>,
    pub next_page: Vec<String>,
    pub title: Vec<String>,
    /// Containers holding a composite whole/fraction price render.
    pub price_blocks: Vec<String>,
    /// Matched inside a price block.
    pub price_whole: String,
    /// Matched inside a price block.
    pub price_fraction: String,
    /// Single-node offscreen/aria price renders.
    pub price_single: Vec<String>,
    pub availability: Vec<String>,
    /// Case-sensitive phrases in the availability text that mean "in stock".
    pub in_stock_markers: Vec<String>,
    pub other_sellers_price: Vec<String>,
    pub seller: Vec<String>,
    /// Elements whose appearance means the price has rendered.
    pub price_ready: Vec<String>,
    /// Case-insensitive block-page phrases.
    pub block_markers: Vec<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

impl Default for SelectorProfile {
    fn default() -> Self {
        Self {
            search_box: strings(&["#twotabsearchtextbox", "input[name='field-keywords']"]),
            result_links: strings(&[
                "div[data-component-type='s-search-result'] h2 a",
                "div[data-component-type='s-search-result'] a.a-link-normal.s-no-outline",
                "div.s-result-item h2 a",
                "a.a-link-normal.s-underline-text",
            ]),
            next_page: strings(&["a.s-pagination-next"]),
            title: strings(&[".title-recipe", "span#productTitle", "#title"]),
            price_blocks: strings(&[
                "#corePriceDisplay_desktop_feature_div .a-price",
                "#corePrice_feature_div .a-price",
                ".apexPriceToPay",
                "span.a-price",
            ]),
            price_whole: "span.a-price-whole".to_string(),
            price_fraction: "span.a-price-fraction".to_string(),
            price_single: strings(&[
                ".apexPriceToPay .a-offscreen",
                "#corePrice_feature_div .a-offscreen",
                "span.a-price .a-offscreen",
                "#priceblock_ourprice",
                "#priceblock_dealprice",
            ]),
            availability: strings(&["#availability"]),
            in_stock_markers: strings(&["Available", "In Stock"]),
            other_sellers_price: strings(&[".olp-padding-right", "#olp_feature_div .a-color-price"]),
            seller: strings(&["#bylineInfo", "#sellerProfile span", "#merchant-info a"]),
            price_ready: strings(&[
                ".a-price-whole",
                ".apexPriceToPay",
                "#corePrice_feature_div",
                "#availability",
            ]),
            block_markers: strings(&[
                "robot check",
                "enter the characters you see below",
                "type the characters you see in this image",
                "sorry, we just need to make sure you're not a robot",
                "to discuss automated access to amazon data",
                "api-services-support@amazon.com",
                "captcha",
            ]),
        }
    }
}

/// Load a selector profile override from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or leaves a
/// mandatory chain empty.
pub fn load_selector_profile(path: &Path) -> Result<SelectorProfile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::SelectorsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let profile: SelectorProfile = serde_yaml::from_str(&content)?;
    validate_profile(&profile)?;

    Ok(profile)
}

fn validate_profile(profile: &SelectorProfile) -> Result<(), ConfigError> {
    let mandatory: [(&str, &[String]); 4] = [
        ("search_box", &profile.search_box),
        ("result_links", &profile.result_links),
        ("title", &profile.title),
        ("block_markers", &profile.block_markers),
    ];

    for (name, chain) in mandatory {
        if chain.iter().all(|s| s.trim().is_empty()) {
            return Err(ConfigError::Validation(format!(
                "selector chain '{name}' must contain at least one selector"
            )));
        }
    }

    if profile.price_blocks.is_empty()
        && profile.price_single.is_empty()
        && profile.other_sellers_price.is_empty()
    {
        return Err(ConfigError::Validation(
            "at least one price chain must be configured".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
#[path = "selectors_test.rs"]
mod tests;
