//! Crawl strategy: plain HTTP requests over the same search and detail URLs,
//! used when the interactive session comes back empty.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::Client;
use scraper::Html;
use serde::Serialize;
use shelfwatch_core::{ProductRecord, RunConfig, ScrapeSettings};
use uuid::Uuid;

use super::{
    AcquisitionOutcome, AcquisitionStatus, AcquisitionStrategy, DetailOutcome, FetchedPage,
    StrategyContext,
};
use crate::candidates::{next_page_url, result_hrefs, to_candidates, Candidate};
use crate::error::ScraperError;
use crate::pacing::PacingPolicy;
use crate::rate_limit::retry_with_backoff;
use crate::snapshot::Snapshot;
use crate::urls::search_url;

/// Desktop browser profiles rotated across requests, after the configured
/// user agent.
const ROTATING_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:120.0) Gecko/20100101 Firefox/120.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/118.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36 Edg/119.0.0.0",
];

/// File name of the per-job feed written under the reports directory.
pub const CRAWL_FEED_FILE: &str = "crawl_feed.json";

pub struct CrawlStrategy {
    ctx: StrategyContext,
    client: Client,
    user_agents: Vec<String>,
    next_agent: AtomicUsize,
    feed_path: Option<PathBuf>,
}

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-IN,en-GB;q=0.9,en;q=0.8"),
    );
    headers.insert(header::DNT, HeaderValue::from_static("1"));
    headers.insert(
        header::UPGRADE_INSECURE_REQUESTS,
        HeaderValue::from_static("1"),
    );
    headers
}

impl CrawlStrategy {
    /// Builds the HTTP client: cookie store on, browser-like default headers,
    /// request timeout from `page_timeout_secs`.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the client cannot be constructed.
    pub fn new(ctx: StrategyContext, settings: &ScrapeSettings) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .cookie_store(true)
            .default_headers(default_headers())
            .timeout(Duration::from_secs(settings.page_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        let mut user_agents = vec![settings.user_agent.clone()];
        user_agents.extend(
            ROTATING_USER_AGENTS
                .iter()
                .filter(|ua| **ua != settings.user_agent)
                .map(|ua| (*ua).to_string()),
        );

        Ok(Self {
            ctx,
            client,
            user_agents,
            next_agent: AtomicUsize::new(0),
            feed_path: None,
        })
    }

    /// Writes each job's records to `path` once the job ends.
    #[must_use]
    pub fn with_feed(mut self, path: impl Into<PathBuf>) -> Self {
        self.feed_path = Some(path.into());
        self
    }

    fn next_user_agent(&self) -> &str {
        let index = self.next_agent.fetch_add(1, Ordering::Relaxed) % self.user_agents.len();
        &self.user_agents[index]
    }

    /// GET with retries on transient failures. Any non-2xx status is an
    /// error; only the retriable ones are tried again.
    async fn fetch(&self, url: &str, settings: &ScrapeSettings) -> Result<FetchedPage, ScraperError> {
        let backoff_base_ms = settings.retry_backoff_base_secs.saturating_mul(1_000);
        retry_with_backoff(settings.crawl_max_retries, backoff_base_ms, || async move {
            let response = self
                .client
                .get(url)
                .header(header::USER_AGENT, self.next_user_agent())
                .send()
                .await?;
            let status = response.status();
            if !status.is_success() {
                return Err(ScraperError::UnexpectedStatus {
                    status: status.as_u16(),
                    url: url.to_string(),
                });
            }
            let final_url = response.url().to_string();
            let html = response.text().await?;
            Ok(FetchedPage {
                url: final_url,
                html,
            })
        })
        .await
    }
}

#[derive(Serialize)]
struct CrawlFeed<'a> {
    run_id: Uuid,
    search_term: &'a str,
    status: AcquisitionStatus,
    products: &'a [ProductRecord],
}

async fn write_feed(path: &Path, feed: &CrawlFeed<'_>) -> Result<(), ScraperError> {
    let io_err = |source| ScraperError::FeedIo {
        path: path.display().to_string(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
    }
    let json = serde_json::to_vec_pretty(feed)?;
    tokio::fs::write(path, json).await.map_err(io_err)?;
    tracing::info!(path = %path.display(), records = feed.products.len(), "wrote crawl feed");
    Ok(())
}

#[async_trait]
impl AcquisitionStrategy for CrawlStrategy {
    fn name(&self) -> &'static str {
        "crawl"
    }

    fn context(&self) -> &StrategyContext {
        &self.ctx
    }

    fn candidate_limit(&self, run: &RunConfig) -> usize {
        run.scrape.crawl_max_candidates
    }

    fn pacing(&self, run: &RunConfig) -> PacingPolicy {
        PacingPolicy::around_millis(run.scrape.crawl_delay_ms)
    }

    fn job_timeout(&self, run: &RunConfig) -> Option<Duration> {
        Some(Duration::from_secs(run.scrape.crawl_job_timeout_secs))
    }

    async fn search(&mut self, run: &RunConfig) -> Result<FetchedPage, ScraperError> {
        let url = search_url(&run.scrape.base_url, &run.search_term, &run.filters);
        tracing::info!(%url, "crawling search results");
        let page = self.fetch(&url, &run.scrape).await?;
        self.ctx
            .snapshots
            .capture("search_results", Snapshot::Markup(&page.html))
            .await;
        Ok(page)
    }

    /// Follows next-page links up to `crawl_max_pages`. A failed later page
    /// ends pagination and keeps what was already collected; a blocked one
    /// aborts the whole job.
    async fn collect_candidates(
        &mut self,
        run: &RunConfig,
        results: &FetchedPage,
    ) -> Result<Vec<Candidate>, ScraperError> {
        let limit = self.candidate_limit(run);
        let pacing = self.pacing(run);
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        let mut page = results.clone();
        let mut page_number = 1usize;

        loop {
            let (hrefs, next) = {
                let doc = Html::parse_document(&page.html);
                (
                    result_hrefs(&doc, &self.ctx.selectors.result_links),
                    next_page_url(&doc, &page.url, &self.ctx.selectors.next_page),
                )
            };
            let found = to_candidates(&hrefs, &run.scrape.base_url, &mut seen);
            tracing::debug!(page = page_number, new = found.len(), "parsed results page");
            candidates.extend(found);

            if candidates.len() >= limit || page_number >= run.scrape.crawl_max_pages {
                break;
            }
            let Some(next) = next else {
                break;
            };

            pacing.pause().await;
            page_number += 1;
            page = match self.fetch(&next, &run.scrape).await {
                Ok(page) => page,
                Err(e) => {
                    tracing::warn!(page = page_number, url = %next, error = %e, "results page failed; stopping pagination");
                    break;
                }
            };
            if let Some(marker) = self.ctx.detector.matched_marker(&page.html) {
                tracing::warn!(page = page_number, url = %page.url, marker, "results page blocked; aborting crawl");
                self.ctx
                    .snapshots
                    .capture(
                        &format!("blocked_crawl_page_{page_number}"),
                        Snapshot::Markup(&page.html),
                    )
                    .await;
                return Err(ScraperError::Blocked {
                    url: page.url,
                    marker: marker.to_string(),
                });
            }
        }

        Ok(candidates)
    }

    async fn extract_detail(
        &mut self,
        run: &RunConfig,
        candidate: &Candidate,
    ) -> Result<DetailOutcome, ScraperError> {
        let page = self.fetch(&candidate.url, &run.scrape).await?;
        Ok(self.ctx.inspect_detail(candidate, &page).await)
    }

    async fn finish(
        &mut self,
        run: &RunConfig,
        outcome: &AcquisitionOutcome,
    ) -> Result<(), ScraperError> {
        let Some(path) = &self.feed_path else {
            return Ok(());
        };
        let feed = CrawlFeed {
            run_id: run.run_id,
            search_term: &run.search_term,
            status: outcome.status,
            products: &outcome.records,
        };
        write_feed(path, &feed).await
    }

    async fn release(&mut self) {}
}
