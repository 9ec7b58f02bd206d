//! The invocation boundary: one search term and optional price bounds in,
//! the extracted product records out.
//!
//! A run acquires records through the strategy orchestrator, appends a
//! report to the named history and, when a database is configured, writes
//! one history row per record.

use std::sync::Arc;

use anyhow::Context;
use shelfwatch_core::{
    AppConfig, ProductRecord, RunConfig, ScrapeSettings, SearchFilters, SelectorProfile,
};
use shelfwatch_db::{PgProductStore, ProductStore, ReportMeta, ReportStore, RunStamp};
use shelfwatch_scraper::{
    Backoff, BlockDetector, ChromiumLauncher, CompiledSelectors, CrawlStrategy,
    DirectorySnapshots, InteractiveStrategy, NoopSnapshots, Orchestrator, SnapshotSink,
    StrategyContext, CRAWL_FEED_FILE,
};
use tracing::Instrument;

pub(crate) struct Pipeline {
    pub(crate) orchestrator: Orchestrator,
    pub(crate) reports: ReportStore,
    pub(crate) products: Option<Box<dyn ProductStore>>,
    pub(crate) scrape: ScrapeSettings,
}

impl Pipeline {
    /// Wires the browser strategy as primary and the crawl strategy as
    /// fallback from application configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the selector profile cannot be loaded or
    /// compiled, or the crawl HTTP client cannot be built.
    pub(crate) async fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let profile = match &config.selectors_path {
            Some(path) => shelfwatch_core::load_selector_profile(path)?,
            None => SelectorProfile::default(),
        };
        let selectors = Arc::new(CompiledSelectors::compile(&profile)?);
        let snapshots: Arc<dyn SnapshotSink> = match &config.snapshot_dir {
            Some(dir) => Arc::new(DirectorySnapshots::new(dir)),
            None => Arc::new(NoopSnapshots),
        };
        let ctx = StrategyContext::new(
            selectors,
            BlockDetector::from_profile(&profile),
            &config.scrape.currency,
            snapshots,
        );

        let interactive = InteractiveStrategy::new(ctx.clone(), Arc::new(ChromiumLauncher));
        let crawl = CrawlStrategy::new(ctx, &config.scrape)?
            .with_feed(config.reports_dir.join(CRAWL_FEED_FILE));
        let orchestrator = Orchestrator::new(
            Box::new(interactive),
            Box::new(crawl),
            Backoff::between_attempts(config.scrape.retry_backoff_base_secs),
        );

        Ok(Self {
            orchestrator,
            reports: ReportStore::new(&config.reports_dir),
            products: connect_product_store(config).await,
            scrape: config.scrape.clone(),
        })
    }
}

/// `None` when no database is configured or it cannot be reached; the run
/// then keeps only the JSON report history.
async fn connect_product_store(config: &AppConfig) -> Option<Box<dyn ProductStore>> {
    config.database_url.as_ref()?;

    let pool = match shelfwatch_db::connect_pool_from_config(config).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::warn!(error = %e, "database unavailable; skipping product history rows");
            return None;
        }
    };
    if let Err(e) = shelfwatch_db::run_migrations(&pool).await {
        tracing::warn!(error = %e, "migrations failed; skipping product history rows");
        return None;
    }
    Some(Box::new(PgProductStore::new(pool)))
}

/// Runs one extraction for `search_term` within the optional price bounds.
///
/// Absent or unparseable bounds mean no filter on that side. An empty
/// record list is a valid result.
///
/// # Errors
///
/// Returns an error if the search term normalises to nothing or the report
/// history cannot be written. Product history row failures are logged only.
pub(crate) async fn run_extraction(
    pipeline: &mut Pipeline,
    search_term: &str,
    min_price: Option<&str>,
    max_price: Option<&str>,
) -> anyhow::Result<Vec<ProductRecord>> {
    let filters = SearchFilters::from_raw(min_price, max_price);
    let run = RunConfig::new(search_term, filters, pipeline.scrape.clone())?;
    let span = tracing::info_span!("run", run_id = %run.run_id, term = %run.search_term);

    execute(pipeline, &run).instrument(span).await
}

async fn execute(pipeline: &mut Pipeline, run: &RunConfig) -> anyhow::Result<Vec<ProductRecord>> {
    tracing::info!(
        min = ?run.filters.min_price,
        max = ?run.filters.max_price,
        "starting extraction"
    );

    let result = pipeline.orchestrator.acquire(run).await;
    tracing::info!(
        records = result.records.len(),
        status = ?result.status,
        source = result.source.unwrap_or("none"),
        "acquisition finished"
    );

    let meta = ReportMeta {
        name: &run.report_name,
        filters: run.filters,
        base_link: &run.scrape.base_url,
        currency: &run.scrape.currency,
    };
    let report = pipeline
        .reports
        .append_report(&meta, result.records)
        .with_context(|| format!("failed to append report '{}'", run.report_name))?;

    if let Some(store) = &pipeline.products {
        let stamp = RunStamp {
            run_id: run.run_id,
            report_name: &run.report_name,
            run_at: run.started_at,
        };
        match store.append_rows(stamp, &report.products).await {
            Ok(rows) => tracing::info!(rows, "product history rows written"),
            Err(e) => tracing::warn!(error = %e, "failed to write product history rows"),
        }
    }

    Ok(report.products)
}

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod tests;
