//! The resilient product extraction pipeline: field extraction, block
//! detection, the interactive and crawl acquisition strategies, and the
//! fallback orchestrator that sequences them.

pub mod block;
pub mod browser;
pub mod candidates;
pub mod error;
pub mod extract;
pub mod orchestrator;
pub mod pacing;
pub mod parse;
pub(crate) mod rate_limit;
pub mod selectors;
pub mod snapshot;
pub mod strategy;
pub mod urls;

pub use block::BlockDetector;
#[cfg(feature = "browser")]
pub use browser::chromium::ChromiumLauncher;
pub use browser::{BrowserLauncher, BrowserSession};
pub use error::ScraperError;
pub use extract::FieldExtractor;
pub use orchestrator::{AcquisitionResult, Orchestrator};
pub use pacing::{Backoff, PacingPolicy};
pub use selectors::CompiledSelectors;
pub use snapshot::{DirectorySnapshots, NoopSnapshots, Snapshot, SnapshotSink};
pub use strategy::crawl::{CrawlStrategy, CRAWL_FEED_FILE};
pub use strategy::interactive::InteractiveStrategy;
pub use strategy::{
    run_strategy, AcquisitionOutcome, AcquisitionStatus, AcquisitionStrategy, DetailOutcome,
    FetchedPage, StrategyContext,
};
