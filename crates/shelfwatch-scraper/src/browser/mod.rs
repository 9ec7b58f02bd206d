//! Browser session abstraction for the interactive strategy.
//!
//! The strategy only talks to [`BrowserSession`]; the Chromium-backed
//! implementation lives in [`chromium`] behind the `browser` feature.

#[cfg(feature = "browser")]
pub mod chromium;
pub mod stealth;

use std::time::Duration;

use async_trait::async_trait;
use shelfwatch_core::ScrapeSettings;

use crate::error::ScraperError;

/// Starts browser sessions. One session is launched per interactive attempt.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    /// # Errors
    ///
    /// Returns [`ScraperError::SessionAcquisition`] when no browser can be
    /// started or configured.
    async fn launch(&self, settings: &ScrapeSettings)
        -> Result<Box<dyn BrowserSession>, ScraperError>;
}

/// A single live page. Every network-bound call takes or applies a timeout.
#[async_trait]
pub trait BrowserSession: Send {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), ScraperError>;

    /// Waits until any selector in `selectors` matches and returns the one
    /// that did.
    async fn wait_for_any(
        &mut self,
        selectors: &[String],
        timeout: Duration,
    ) -> Result<String, ScraperError>;

    /// Appends `text` to the focused value of the element at `selector`.
    async fn type_text(&mut self, selector: &str, text: &str) -> Result<(), ScraperError>;

    async fn press_enter(&mut self, selector: &str) -> Result<(), ScraperError>;

    async fn current_url(&mut self) -> Result<String, ScraperError>;

    async fn content(&mut self) -> Result<String, ScraperError>;

    async fn screenshot(&mut self) -> Result<Vec<u8>, ScraperError>;

    /// Must be safe to call more than once.
    async fn close(&mut self);
}

/// Cookies set on the marketplace domain before the first navigation so the
/// storefront renders in English with rupee pricing.
pub const BASE_COOKIES: &[(&str, &str)] = &[("i18n-prefs", "INR"), ("lc-acbin", "en_IN")];

/// Cookie domain for `base_url`, e.g. `.amazon.in` for `https://www.amazon.in/`.
#[must_use]
pub fn cookie_domain(base_url: &str) -> Option<String> {
    let host = reqwest::Url::parse(base_url).ok()?.host_str()?.to_string();
    let bare = host.strip_prefix("www.").unwrap_or(&host);
    Some(format!(".{bare}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_domain_strips_www() {
        assert_eq!(
            cookie_domain("https://www.amazon.in/").as_deref(),
            Some(".amazon.in")
        );
    }

    #[test]
    fn cookie_domain_keeps_other_hosts() {
        assert_eq!(
            cookie_domain("http://127.0.0.1:8080/").as_deref(),
            Some(".127.0.0.1")
        );
    }

    #[test]
    fn cookie_domain_rejects_garbage() {
        assert!(cookie_domain("not a url").is_none());
    }
}
