//! The acquisition capability and the state machine shared by both
//! strategies.
//!
//! A strategy only knows how to fetch: the results page, the candidate list,
//! and one detail page at a time. [`run_strategy`] owns the flow around
//! those steps (block checks, candidate capping, per-candidate error
//! isolation, pacing, and unconditional release).

pub mod crawl;
pub mod interactive;
#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use shelfwatch_core::{ProductRecord, RunConfig};

use crate::block::BlockDetector;
use crate::candidates::Candidate;
use crate::error::ScraperError;
use crate::extract::FieldExtractor;
use crate::pacing::PacingPolicy;
use crate::selectors::CompiledSelectors;
use crate::snapshot::{Snapshot, SnapshotSink};

/// HTML of a page together with the URL it was read from.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: String,
    pub html: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DetailOutcome {
    /// `None` when the page had no usable title or price.
    Extracted(Option<ProductRecord>),
    Blocked { marker: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AcquisitionStatus {
    /// Every collected candidate was visited.
    Completed,
    /// The results page itself was a block page.
    Blocked,
    /// A block page stopped the detail loop; earlier records are kept.
    BlockedMidway,
    /// Search or candidate collection failed.
    Aborted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AcquisitionOutcome {
    pub records: Vec<ProductRecord>,
    pub status: AcquisitionStatus,
}

impl AcquisitionOutcome {
    #[must_use]
    pub fn empty(status: AcquisitionStatus) -> Self {
        Self {
            records: Vec::new(),
            status,
        }
    }
}

/// Collaborators every strategy needs, shared by reference count.
#[derive(Clone)]
pub struct StrategyContext {
    pub selectors: Arc<CompiledSelectors>,
    pub extractor: FieldExtractor,
    pub detector: BlockDetector,
    pub snapshots: Arc<dyn SnapshotSink>,
}

impl StrategyContext {
    #[must_use]
    pub fn new(
        selectors: Arc<CompiledSelectors>,
        detector: BlockDetector,
        currency: &str,
        snapshots: Arc<dyn SnapshotSink>,
    ) -> Self {
        Self {
            extractor: FieldExtractor::new(Arc::clone(&selectors), currency),
            selectors,
            detector,
            snapshots,
        }
    }

    /// Block check, snapshot opportunity, then field extraction for one
    /// detail page.
    pub async fn inspect_detail(&self, candidate: &Candidate, page: &FetchedPage) -> DetailOutcome {
        if let Some(marker) = self.detector.matched_marker(&page.html) {
            tracing::warn!(asin = %candidate.id, url = %page.url, marker, "detail page blocked");
            self.snapshots
                .capture(
                    &format!("blocked_detail_{}", candidate.id),
                    Snapshot::Markup(&page.html),
                )
                .await;
            return DetailOutcome::Blocked {
                marker: marker.to_string(),
            };
        }
        DetailOutcome::Extracted(self.extractor.extract_html(&page.html, &candidate.url))
    }
}

impl std::fmt::Debug for StrategyContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyContext")
            .field("detector", &self.detector)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait AcquisitionStrategy: Send {
    fn name(&self) -> &'static str;

    fn context(&self) -> &StrategyContext;

    /// Upper bound on detail pages visited in one run.
    fn candidate_limit(&self, run: &RunConfig) -> usize;

    /// Delay inserted after every detail page, successful or not.
    fn pacing(&self, run: &RunConfig) -> PacingPolicy;

    /// Overall budget for one run of this strategy, if any.
    fn job_timeout(&self, _run: &RunConfig) -> Option<Duration> {
        None
    }

    /// Produces the first search results page.
    ///
    /// [`ScraperError::SessionAcquisition`] from here ends the run as a
    /// failure; any other error ends it as [`AcquisitionStatus::Aborted`].
    async fn search(&mut self, run: &RunConfig) -> Result<FetchedPage, ScraperError>;

    async fn collect_candidates(
        &mut self,
        run: &RunConfig,
        results: &FetchedPage,
    ) -> Result<Vec<Candidate>, ScraperError>;

    async fn extract_detail(
        &mut self,
        run: &RunConfig,
        candidate: &Candidate,
    ) -> Result<DetailOutcome, ScraperError>;

    /// Called once with the final outcome, after [`release`](Self::release).
    async fn finish(
        &mut self,
        _run: &RunConfig,
        _outcome: &AcquisitionOutcome,
    ) -> Result<(), ScraperError> {
        Ok(())
    }

    /// Releases any session resources. Called on every exit path.
    async fn release(&mut self);
}

/// Runs one strategy end to end.
///
/// # Errors
///
/// Only [`ScraperError::SessionAcquisition`] (and a job timeout) escape;
/// every other failure is folded into the returned status.
pub async fn run_strategy(
    strategy: &mut dyn AcquisitionStrategy,
    run: &RunConfig,
) -> Result<AcquisitionOutcome, ScraperError> {
    let name = strategy.name();
    let result = match strategy.job_timeout(run) {
        Some(limit) => tokio::time::timeout(limit, drive(strategy, run))
            .await
            .unwrap_or_else(|_| {
                Err(ScraperError::Timeout {
                    what: format!("{name} strategy"),
                    secs: limit.as_secs(),
                })
            }),
        None => drive(strategy, run).await,
    };

    strategy.release().await;

    let outcome = result?;
    if let Err(e) = strategy.finish(run, &outcome).await {
        tracing::warn!(strategy = name, error = %e, "strategy post-run hook failed");
    }

    tracing::info!(
        strategy = name,
        status = ?outcome.status,
        records = outcome.records.len(),
        "strategy finished"
    );
    Ok(outcome)
}

async fn drive(
    strategy: &mut dyn AcquisitionStrategy,
    run: &RunConfig,
) -> Result<AcquisitionOutcome, ScraperError> {
    let name = strategy.name();

    let results = match strategy.search(run).await {
        Ok(page) => page,
        Err(e @ ScraperError::SessionAcquisition(_)) => return Err(e),
        Err(ScraperError::Blocked { url, marker }) => {
            tracing::warn!(strategy = name, %url, %marker, "blocked during search");
            return Ok(AcquisitionOutcome::empty(AcquisitionStatus::Blocked));
        }
        Err(e) => {
            tracing::warn!(strategy = name, error = %e, "search failed; aborting run");
            return Ok(AcquisitionOutcome::empty(AcquisitionStatus::Aborted));
        }
    };

    let ctx = strategy.context().clone();
    if let Some(marker) = ctx.detector.matched_marker(&results.html) {
        tracing::warn!(strategy = name, url = %results.url, marker, "results page blocked");
        ctx.snapshots
            .capture("blocked_search", Snapshot::Markup(&results.html))
            .await;
        return Ok(AcquisitionOutcome::empty(AcquisitionStatus::Blocked));
    }

    let mut candidates = match strategy.collect_candidates(run, &results).await {
        Ok(candidates) => candidates,
        Err(ScraperError::Blocked { url, marker }) => {
            tracing::warn!(strategy = name, %url, %marker, "blocked while collecting candidates");
            return Ok(AcquisitionOutcome::empty(AcquisitionStatus::Blocked));
        }
        Err(e) => {
            tracing::warn!(strategy = name, error = %e, "candidate collection failed; aborting run");
            return Ok(AcquisitionOutcome::empty(AcquisitionStatus::Aborted));
        }
    };
    candidates.truncate(strategy.candidate_limit(run));
    tracing::info!(strategy = name, count = candidates.len(), "collected candidates");

    let pacing = strategy.pacing(run);
    let mut records = Vec::new();
    let mut status = AcquisitionStatus::Completed;

    for candidate in &candidates {
        match strategy.extract_detail(run, candidate).await {
            Ok(DetailOutcome::Extracted(Some(record))) => {
                tracing::info!(asin = %candidate.id, name = %record.name, price = %record.price, "extracted product");
                records.push(record);
            }
            Ok(DetailOutcome::Extracted(None)) => {
                tracing::warn!(asin = %candidate.id, "detail page had no usable title or price");
            }
            Ok(DetailOutcome::Blocked { marker }) => {
                tracing::warn!(
                    asin = %candidate.id,
                    %marker,
                    kept = records.len(),
                    "blocked mid-run; keeping records collected so far"
                );
                status = AcquisitionStatus::BlockedMidway;
                break;
            }
            Err(e) => {
                tracing::warn!(asin = %candidate.id, error = %e, "candidate failed; continuing");
            }
        }
        pacing.pause().await;
    }

    Ok(AcquisitionOutcome { records, status })
}

#[cfg(test)]
#[path = "strategy_test.rs"]
mod tests;
