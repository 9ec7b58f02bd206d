//! Strategy fallback: a bounded number of primary attempts, then one
//! fallback attempt.

use serde::Serialize;
use shelfwatch_core::{ProductRecord, RunConfig};

use crate::pacing::Backoff;
use crate::strategy::{run_strategy, AcquisitionStatus, AcquisitionStrategy};

/// Final result of one acquisition. An empty `records` list is a valid
/// terminal outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AcquisitionResult {
    pub records: Vec<ProductRecord>,
    pub status: AcquisitionStatus,
    /// Strategy whose attempt produced `records`; `None` when every attempt
    /// failed to run at all.
    pub source: Option<&'static str>,
}

impl AcquisitionResult {
    fn exhausted(status: AcquisitionStatus, source: Option<&'static str>) -> Self {
        Self {
            records: Vec::new(),
            status,
            source,
        }
    }
}

pub struct Orchestrator {
    primary: Box<dyn AcquisitionStrategy>,
    fallback: Box<dyn AcquisitionStrategy>,
    backoff: Backoff,
}

impl Orchestrator {
    #[must_use]
    pub fn new(
        primary: Box<dyn AcquisitionStrategy>,
        fallback: Box<dyn AcquisitionStrategy>,
        backoff: Backoff,
    ) -> Self {
        Self {
            primary,
            fallback,
            backoff,
        }
    }

    /// Runs the primary strategy up to `interactive_attempts` times and
    /// returns the first non-empty result; otherwise runs the fallback once.
    ///
    /// Never fails: a strategy that cannot run counts as an empty attempt.
    pub async fn acquire(&mut self, run: &RunConfig) -> AcquisitionResult {
        let attempts = run.scrape.interactive_attempts.max(1);
        let mut last = AcquisitionResult::exhausted(AcquisitionStatus::Aborted, None);

        for attempt in 0..attempts {
            if attempt > 0 {
                self.backoff.wait(attempt - 1).await;
            }

            match run_strategy(self.primary.as_mut(), run).await {
                Ok(outcome) if !outcome.records.is_empty() => {
                    return AcquisitionResult {
                        records: outcome.records,
                        status: outcome.status,
                        source: Some(self.primary.name()),
                    };
                }
                Ok(outcome) => {
                    tracing::warn!(
                        strategy = self.primary.name(),
                        attempt = attempt + 1,
                        status = ?outcome.status,
                        "attempt returned no records"
                    );
                    last = AcquisitionResult::exhausted(outcome.status, Some(self.primary.name()));
                }
                Err(e) => {
                    tracing::error!(
                        strategy = self.primary.name(),
                        attempt = attempt + 1,
                        error = %e,
                        "attempt failed to run"
                    );
                }
            }
        }

        tracing::warn!(
            primary = self.primary.name(),
            fallback = self.fallback.name(),
            "primary strategy exhausted; falling back"
        );

        match run_strategy(self.fallback.as_mut(), run).await {
            Ok(outcome) if !outcome.records.is_empty() => AcquisitionResult {
                records: outcome.records,
                status: outcome.status,
                source: Some(self.fallback.name()),
            },
            Ok(outcome) => {
                tracing::warn!(strategy = self.fallback.name(), status = ?outcome.status, "fallback returned no records");
                AcquisitionResult::exhausted(outcome.status, Some(self.fallback.name()))
            }
            Err(e) => {
                tracing::error!(strategy = self.fallback.name(), error = %e, "fallback failed to run");
                last
            }
        }
    }
}
