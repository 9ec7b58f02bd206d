use std::str::FromStr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal::Decimal;
use shelfwatch_core::SelectorProfile;
use shelfwatch_db::{DbError, ProductHistoryRow};
use shelfwatch_scraper::candidates::Candidate;
use shelfwatch_scraper::{AcquisitionStrategy, DetailOutcome, FetchedPage, PacingPolicy, ScraperError};
use tempfile::TempDir;

use super::*;

const BASE: &str = "https://www.amazon.in/";

/// Serves a fixed results page and one canned detail page per candidate.
struct CannedStrategy {
    name: &'static str,
    ctx: StrategyContext,
    details: Vec<(&'static str, String)>,
}

impl CannedStrategy {
    fn new(name: &'static str, details: Vec<(&'static str, String)>) -> Self {
        let profile = SelectorProfile::default();
        let selectors = Arc::new(CompiledSelectors::compile(&profile).unwrap());
        let ctx = StrategyContext::new(
            selectors,
            BlockDetector::from_profile(&profile),
            "₹",
            Arc::new(NoopSnapshots),
        );
        Self { name, ctx, details }
    }

    fn empty(name: &'static str) -> Self {
        Self::new(name, Vec::new())
    }
}

#[async_trait]
impl AcquisitionStrategy for CannedStrategy {
    fn name(&self) -> &'static str {
        self.name
    }

    fn context(&self) -> &StrategyContext {
        &self.ctx
    }

    fn candidate_limit(&self, run: &RunConfig) -> usize {
        run.scrape.max_candidates
    }

    fn pacing(&self, _run: &RunConfig) -> PacingPolicy {
        PacingPolicy::none()
    }

    async fn search(&mut self, run: &RunConfig) -> Result<FetchedPage, ScraperError> {
        Ok(FetchedPage {
            url: format!("{BASE}s?k={}", run.search_term),
            html: "<html>results</html>".to_string(),
        })
    }

    async fn collect_candidates(
        &mut self,
        _run: &RunConfig,
        _results: &FetchedPage,
    ) -> Result<Vec<Candidate>, ScraperError> {
        Ok(self
            .details
            .iter()
            .map(|(id, _)| Candidate::new(BASE, id))
            .collect())
    }

    async fn extract_detail(
        &mut self,
        _run: &RunConfig,
        candidate: &Candidate,
    ) -> Result<DetailOutcome, ScraperError> {
        let html = self
            .details
            .iter()
            .find(|(id, _)| *id == candidate.id)
            .map(|(_, html)| html.clone())
            .unwrap_or_default();
        let page = FetchedPage {
            url: candidate.url.clone(),
            html,
        };
        Ok(self.ctx.inspect_detail(candidate, &page).await)
    }

    async fn release(&mut self) {}
}

type Batches = Arc<Mutex<Vec<(String, usize)>>>;

#[derive(Default)]
struct RecordingStore {
    batches: Batches,
    fail: bool,
}

#[async_trait]
impl ProductStore for RecordingStore {
    async fn append_rows(
        &self,
        stamp: RunStamp<'_>,
        records: &[ProductRecord],
    ) -> Result<u64, DbError> {
        if self.fail {
            return Err(DbError::MissingDatabaseUrl);
        }
        self.batches
            .lock()
            .unwrap()
            .push((stamp.report_name.to_string(), records.len()));
        Ok(records.len() as u64)
    }

    async fn recent_rows(&self, _limit: i64) -> Result<Vec<ProductHistoryRow>, DbError> {
        Ok(Vec::new())
    }
}

fn detail(title: &str, whole: &str) -> String {
    format!(
        r#"<span id="productTitle">{title}</span>
           <span class="a-price"><span class="a-price-whole">{whole}</span><span class="a-price-fraction">00</span></span>"#
    )
}

/// Five results: three with a title and price, two without a price.
fn dog_food_pages() -> Vec<(&'static str, String)> {
    vec![
        ("B0DOG00001", detail("Pedigree Adult Dry Dog Food 3kg", "649")),
        ("B0DOG00002", r#"<span id="productTitle">Dog Food Sampler</span>"#.to_string()),
        ("B0DOG00003", detail("Drools Chicken and Egg Adult Dog Food 3kg", "549")),
        ("B0DOG00004", "<html><body>Currently unavailable.</body></html>".to_string()),
        ("B0DOG00005", detail("Royal Canin Maxi Adult 4kg", "3,299")),
    ]
}

fn pipeline(
    dir: &TempDir,
    primary: CannedStrategy,
    fallback: CannedStrategy,
    products: Option<Box<dyn ProductStore>>,
) -> Pipeline {
    Pipeline {
        orchestrator: Orchestrator::new(Box::new(primary), Box::new(fallback), Backoff::none()),
        reports: ReportStore::new(dir.path()),
        products,
        scrape: ScrapeSettings::default(),
    }
}

#[tokio::test]
async fn dog_food_run_keeps_valid_records_and_reports_cheapest() {
    let dir = TempDir::new().unwrap();
    let store = RecordingStore::default();
    let batches = Arc::clone(&store.batches);
    let mut pipeline = pipeline(
        &dir,
        CannedStrategy::new("interactive", dog_food_pages()),
        CannedStrategy::empty("crawl"),
        Some(Box::new(store)),
    );

    let records = run_extraction(&mut pipeline, "dog food", Some("200"), Some("10000"))
        .await
        .unwrap();

    let names: Vec<_> = records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(
        names,
        [
            "Pedigree Adult Dry Dog Food 3kg",
            "Drools Chicken and Egg Adult Dog Food 3kg",
            "Royal Canin Maxi Adult 4kg",
        ]
    );
    assert_eq!(records[2].price, Decimal::from_str("3299.00").unwrap());

    let report = pipeline.reports.latest("dog_food").unwrap().unwrap();
    assert_eq!(report.title, "dog_food");
    assert_eq!(report.products.len(), 3);
    assert_eq!(
        report.best_item.unwrap().name,
        "Drools Chicken and Egg Adult Dog Food 3kg"
    );
    assert_eq!(report.filters.min_price, Some(Decimal::from(200)));
    assert_eq!(report.filters.max_price, Some(Decimal::from(10000)));

    assert_eq!(*batches.lock().unwrap(), [("dog_food".to_string(), 3)]);
}

#[tokio::test]
async fn fallback_records_are_reported_when_primary_finds_nothing() {
    let dir = TempDir::new().unwrap();
    let mut pipeline = pipeline(
        &dir,
        CannedStrategy::empty("interactive"),
        CannedStrategy::new(
            "crawl",
            vec![("B0CAT00001", detail("Whiskas Ocean Fish Cat Food 1.2kg", "399"))],
        ),
        None,
    );

    let records = run_extraction(&mut pipeline, "cat food", None, None)
        .await
        .unwrap();

    assert_eq!(records.len(), 1);
    let history = pipeline.reports.load("cat_food").unwrap();
    assert_eq!(history.reports.len(), 1);
    assert_eq!(history.reports[0].products, records);
}

#[tokio::test]
async fn nothing_found_still_appends_an_empty_report() {
    let dir = TempDir::new().unwrap();
    let mut pipeline = pipeline(
        &dir,
        CannedStrategy::empty("interactive"),
        CannedStrategy::empty("crawl"),
        None,
    );

    let records = run_extraction(&mut pipeline, "  dog   food ", Some("abc"), None)
        .await
        .unwrap();

    assert!(records.is_empty());
    let report = pipeline.reports.latest("dog_food").unwrap().unwrap();
    assert!(report.best_item.is_none());
    assert!(report.filters.is_unbounded());
}

#[tokio::test]
async fn blank_term_is_rejected_before_any_work() {
    let dir = TempDir::new().unwrap();
    let mut pipeline = pipeline(
        &dir,
        CannedStrategy::new("interactive", dog_food_pages()),
        CannedStrategy::empty("crawl"),
        None,
    );

    assert!(run_extraction(&mut pipeline, "   ", None, None).await.is_err());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn row_store_failure_does_not_fail_the_run() {
    let dir = TempDir::new().unwrap();
    let store = RecordingStore {
        fail: true,
        ..RecordingStore::default()
    };
    let mut pipeline = pipeline(
        &dir,
        CannedStrategy::new("interactive", dog_food_pages()),
        CannedStrategy::empty("crawl"),
        Some(Box::new(store)),
    );

    let records = run_extraction(&mut pipeline, "dog food", None, None)
        .await
        .unwrap();

    assert_eq!(records.len(), 3);
    assert!(pipeline.reports.latest("dog_food").unwrap().is_some());
}
