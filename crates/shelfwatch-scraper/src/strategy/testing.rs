//! Scripted collaborators shared by the strategy and orchestrator tests.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use shelfwatch_core::{
    PetCategory, ProductRecord, RunConfig, ScrapeSettings, SearchFilters, SelectorProfile,
};

use super::{AcquisitionOutcome, AcquisitionStrategy, DetailOutcome, FetchedPage, StrategyContext};
use crate::block::BlockDetector;
use crate::candidates::Candidate;
use crate::error::ScraperError;
use crate::pacing::PacingPolicy;
use crate::selectors::CompiledSelectors;
use crate::snapshot::{Snapshot, SnapshotSink};

pub(crate) const BASE: &str = "https://www.amazon.in/";

/// Remembers snapshot names instead of writing anything.
#[derive(Debug, Default)]
pub(crate) struct RecordingSnapshots {
    pub names: Mutex<Vec<String>>,
}

impl RecordingSnapshots {
    pub fn names(&self) -> Vec<String> {
        self.names.lock().unwrap().clone()
    }
}

#[async_trait]
impl SnapshotSink for RecordingSnapshots {
    async fn capture(&self, name: &str, _snapshot: Snapshot<'_>) {
        self.names.lock().unwrap().push(name.to_string());
    }
}

pub(crate) fn context(snapshots: Arc<dyn SnapshotSink>) -> StrategyContext {
    let profile = SelectorProfile::default();
    let selectors = Arc::new(CompiledSelectors::compile(&profile).unwrap());
    StrategyContext::new(selectors, BlockDetector::from_profile(&profile), "₹", snapshots)
}

pub(crate) fn run_with(filters: SearchFilters) -> RunConfig {
    RunConfig::new("dog food", filters, ScrapeSettings::default()).unwrap()
}

pub(crate) fn run() -> RunConfig {
    run_with(SearchFilters::default())
}

pub(crate) fn record(name: &str, price: &str) -> ProductRecord {
    ProductRecord {
        name: name.to_string(),
        price: Decimal::from_str(price).unwrap(),
        seller: "Amazon".to_string(),
        weight: "N/A".to_string(),
        pet_category: PetCategory::Dog,
        source_url: format!("{BASE}dp/{}", name.replace(' ', "")),
        extra: Default::default(),
    }
}

pub(crate) fn candidates(ids: &[&str]) -> Vec<Candidate> {
    ids.iter().map(|id| Candidate::new(BASE, id)).collect()
}

#[derive(Clone)]
pub(crate) enum SearchScript {
    Page(String),
    Fail(fn() -> ScraperError),
    /// Sleeps longer than any job timeout used in tests.
    Hang,
}

#[derive(Clone)]
pub(crate) enum DetailScript {
    Record(ProductRecord),
    Empty,
    Blocked,
    Fail,
}

/// What a [`ScriptedStrategy`] was asked to do.
#[derive(Debug, Default)]
pub(crate) struct Calls {
    pub searches: usize,
    pub visited: Vec<String>,
    pub releases: usize,
    pub finished: Vec<AcquisitionOutcome>,
}

/// A strategy that replays canned answers. With several search scripts,
/// attempt `n` uses script `n` (the last one repeats).
pub(crate) struct ScriptedStrategy {
    pub name: &'static str,
    pub ctx: StrategyContext,
    pub searches: Vec<SearchScript>,
    pub candidates: Result<Vec<Candidate>, fn() -> ScraperError>,
    pub details: HashMap<String, DetailScript>,
    pub limit: usize,
    pub job_timeout: Option<Duration>,
    pub calls: Arc<Mutex<Calls>>,
}

impl ScriptedStrategy {
    pub fn new(name: &'static str, search: SearchScript) -> Self {
        Self {
            name,
            ctx: context(Arc::new(RecordingSnapshots::default())),
            searches: vec![search],
            candidates: Ok(Vec::new()),
            details: HashMap::new(),
            limit: usize::MAX,
            job_timeout: None,
            calls: Arc::new(Mutex::new(Calls::default())),
        }
    }

    /// A strategy whose results page lists `products` and whose detail pages
    /// all extract cleanly.
    pub fn yielding(name: &'static str, products: &[(&str, &str)]) -> Self {
        let ids: Vec<String> = (0..products.len()).map(|i| format!("B0PROD{i:04}")).collect();
        let mut strategy = Self::new(name, SearchScript::Page("<html>results</html>".to_string()));
        strategy.candidates = Ok(ids.iter().map(|id| Candidate::new(BASE, id)).collect());
        for (id, (title, price)) in ids.iter().zip(products) {
            strategy
                .details
                .insert(id.clone(), DetailScript::Record(record(title, price)));
        }
        strategy
    }

    pub fn with_snapshots(mut self, snapshots: Arc<dyn SnapshotSink>) -> Self {
        self.ctx = context(snapshots);
        self
    }

    pub fn calls(&self) -> Arc<Mutex<Calls>> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl AcquisitionStrategy for ScriptedStrategy {
    fn name(&self) -> &'static str {
        self.name
    }

    fn context(&self) -> &StrategyContext {
        &self.ctx
    }

    fn candidate_limit(&self, _run: &RunConfig) -> usize {
        self.limit
    }

    fn pacing(&self, _run: &RunConfig) -> PacingPolicy {
        PacingPolicy::none()
    }

    fn job_timeout(&self, _run: &RunConfig) -> Option<Duration> {
        self.job_timeout
    }

    async fn search(&mut self, _run: &RunConfig) -> Result<FetchedPage, ScraperError> {
        let script = {
            let mut calls = self.calls.lock().unwrap();
            let index = calls.searches.min(self.searches.len() - 1);
            calls.searches += 1;
            self.searches[index].clone()
        };
        match script {
            SearchScript::Page(html) => Ok(FetchedPage {
                url: format!("{BASE}s?k=dog+food"),
                html,
            }),
            SearchScript::Fail(make) => Err(make()),
            SearchScript::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(ScraperError::Browser("woke up".to_string()))
            }
        }
    }

    async fn collect_candidates(
        &mut self,
        _run: &RunConfig,
        _results: &FetchedPage,
    ) -> Result<Vec<Candidate>, ScraperError> {
        self.candidates.clone().map_err(|make| make())
    }

    async fn extract_detail(
        &mut self,
        _run: &RunConfig,
        candidate: &Candidate,
    ) -> Result<DetailOutcome, ScraperError> {
        self.calls.lock().unwrap().visited.push(candidate.id.clone());
        match self.details.get(&candidate.id).cloned() {
            Some(DetailScript::Record(record)) => Ok(DetailOutcome::Extracted(Some(record))),
            Some(DetailScript::Empty) | None => Ok(DetailOutcome::Extracted(None)),
            Some(DetailScript::Blocked) => Ok(DetailOutcome::Blocked {
                marker: "captcha".to_string(),
            }),
            Some(DetailScript::Fail) => Err(ScraperError::UnexpectedStatus {
                status: 500,
                url: candidate.url.clone(),
            }),
        }
    }

    async fn finish(
        &mut self,
        _run: &RunConfig,
        outcome: &AcquisitionOutcome,
    ) -> Result<(), ScraperError> {
        self.calls.lock().unwrap().finished.push(outcome.clone());
        Ok(())
    }

    async fn release(&mut self) {
        self.calls.lock().unwrap().releases += 1;
    }
}
