//! Interactive strategy: drives a real browser session the way a shopper
//! would (type the query, submit, open each result).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use scraper::Html;
use shelfwatch_core::RunConfig;

use super::{AcquisitionStrategy, DetailOutcome, FetchedPage, StrategyContext};
use crate::browser::{BrowserLauncher, BrowserSession};
use crate::candidates::{result_hrefs, to_candidates, Candidate};
use crate::error::ScraperError;
use crate::pacing::PacingPolicy;
use crate::snapshot::Snapshot;
use crate::urls::append_price_range;

pub struct InteractiveStrategy {
    ctx: StrategyContext,
    launcher: Arc<dyn BrowserLauncher>,
    session: Option<Box<dyn BrowserSession>>,
    /// Overrides the configured keystroke/inter-page pacing (tests use
    /// [`PacingPolicy::none`]).
    pacing_override: Option<(PacingPolicy, PacingPolicy)>,
}

impl InteractiveStrategy {
    #[must_use]
    pub fn new(ctx: StrategyContext, launcher: Arc<dyn BrowserLauncher>) -> Self {
        Self {
            ctx,
            launcher,
            session: None,
            pacing_override: None,
        }
    }

    /// Fixes the keystroke and inter-page pacing regardless of run settings.
    #[must_use]
    pub fn with_pacing(mut self, keystrokes: PacingPolicy, pages: PacingPolicy) -> Self {
        self.pacing_override = Some((keystrokes, pages));
        self
    }

    fn keystroke_pacing(&self, run: &RunConfig) -> PacingPolicy {
        self.pacing_override.map_or_else(
            || PacingPolicy::from_millis(run.scrape.keystroke_min_ms, run.scrape.keystroke_max_ms),
            |(keys, _)| keys,
        )
    }

    fn session(&mut self) -> Result<&mut Box<dyn BrowserSession>, ScraperError> {
        self.session
            .as_mut()
            .ok_or_else(|| ScraperError::Browser("no active browser session".to_string()))
    }
}

/// `{candidate}?language=en_IN&_=<random>` so every visit bypasses caches.
fn cache_busted(candidate: &Candidate) -> String {
    format!(
        "{}?language=en_IN&_={}",
        candidate.url,
        rand::random::<u32>()
    )
}

#[async_trait]
impl AcquisitionStrategy for InteractiveStrategy {
    fn name(&self) -> &'static str {
        "interactive"
    }

    fn context(&self) -> &StrategyContext {
        &self.ctx
    }

    fn candidate_limit(&self, run: &RunConfig) -> usize {
        run.scrape.max_candidates
    }

    fn pacing(&self, run: &RunConfig) -> PacingPolicy {
        self.pacing_override.map_or_else(
            || PacingPolicy::from_millis(run.scrape.min_delay_ms, run.scrape.max_delay_ms),
            |(_, pages)| pages,
        )
    }

    async fn search(&mut self, run: &RunConfig) -> Result<FetchedPage, ScraperError> {
        if self.session.is_none() {
            self.session = Some(self.launcher.launch(&run.scrape).await?);
        }

        let element_timeout = Duration::from_secs(run.scrape.element_timeout_secs);
        let page_timeout = Duration::from_secs(run.scrape.page_timeout_secs);
        let keystrokes = self.keystroke_pacing(run);
        let search_box: Vec<String> = self.ctx.selectors.search_box.iter().map(|s| s.css.clone()).collect();
        let result_links: Vec<String> = self.ctx.selectors.result_links.iter().map(|s| s.css.clone()).collect();

        let session = self.session()?;
        session.navigate(&run.scrape.base_url, page_timeout).await?;

        let input = match session.wait_for_any(&search_box, element_timeout).await {
            Ok(css) => css,
            Err(e) => {
                tracing::error!(error = %e, "search box not found");
                return Err(e);
            }
        };

        for ch in run.search_term.chars() {
            session.type_text(&input, &ch.to_string()).await?;
            keystrokes.pause().await;
        }
        session.press_enter(&input).await?;

        // The results grid is the signal that the submit navigated; a miss
        // here is not fatal because the price-range reload follows anyway.
        if let Err(e) = session.wait_for_any(&result_links, page_timeout).await {
            tracing::debug!(error = %e, "results grid not seen after submit");
        }

        let mut url = session.current_url().await?;
        if !run.filters.is_unbounded() {
            append_price_range(&mut url, &run.filters);
            session.navigate(&url, page_timeout).await?;
        }

        match session.screenshot().await {
            Ok(png) => {
                self.ctx
                    .snapshots
                    .capture("search_results", Snapshot::Image(&png))
                    .await;
            }
            Err(e) => tracing::debug!(error = %e, "results screenshot failed"),
        }

        let session = self.session()?;
        let html = session.content().await?;
        let url = session.current_url().await.unwrap_or(url);
        Ok(FetchedPage { url, html })
    }

    async fn collect_candidates(
        &mut self,
        run: &RunConfig,
        results: &FetchedPage,
    ) -> Result<Vec<Candidate>, ScraperError> {
        let hrefs = {
            let doc = Html::parse_document(&results.html);
            result_hrefs(&doc, &self.ctx.selectors.result_links)
        };
        let mut seen = std::collections::HashSet::new();
        Ok(to_candidates(&hrefs, &run.scrape.base_url, &mut seen))
    }

    async fn extract_detail(
        &mut self,
        run: &RunConfig,
        candidate: &Candidate,
    ) -> Result<DetailOutcome, ScraperError> {
        let element_timeout = Duration::from_secs(run.scrape.element_timeout_secs);
        let price_ready: Vec<String> = self
            .ctx
            .selectors
            .price_ready
            .iter()
            .map(|s| s.css.clone())
            .collect();

        let url = cache_busted(candidate);
        let page_timeout = Duration::from_secs(run.scrape.page_timeout_secs);
        let session = self.session()?;
        session.navigate(&url, page_timeout).await?;
        if let Err(e) = session.wait_for_any(&price_ready, element_timeout).await {
            tracing::debug!(asin = %candidate.id, error = %e, "price never rendered; extracting anyway");
        }
        let html = session.content().await?;

        let page = FetchedPage { url, html };
        Ok(self.ctx.inspect_detail(candidate, &page).await)
    }

    async fn release(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.close().await;
            tracing::debug!("browser session released");
        }
    }
}

#[cfg(test)]
#[path = "interactive_test.rs"]
mod tests;
