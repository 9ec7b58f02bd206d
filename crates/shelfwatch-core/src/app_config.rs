use std::path::PathBuf;

/// Process-level settings loaded once at startup. See [`crate::load_app_config`].
#[derive(Clone)]
pub struct AppConfig {
    /// Optional: row-level history persistence is skipped when absent.
    pub database_url: Option<String>,
    pub log_level: String,
    pub reports_dir: PathBuf,
    /// `None` disables diagnostic snapshots.
    pub snapshot_dir: Option<PathBuf>,
    pub selectors_path: Option<PathBuf>,
    pub db_max_connections: u32,
    pub scrape: ScrapeSettings,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[redacted]"),
            )
            .field("log_level", &self.log_level)
            .field("reports_dir", &self.reports_dir)
            .field("snapshot_dir", &self.snapshot_dir)
            .field("selectors_path", &self.selectors_path)
            .field("db_max_connections", &self.db_max_connections)
            .field("scrape", &self.scrape)
            .finish()
    }
}

/// Everything the acquisition strategies need to know about the target
/// marketplace and how politely to talk to it.
///
/// Delay bounds are inclusive millisecond ranges; every wait on the network
/// is bounded by one of the timeouts here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeSettings {
    /// Marketplace home, always with a trailing slash (e.g. `https://www.amazon.in/`).
    pub base_url: String,
    /// Currency symbol that prefixes rendered prices, e.g. `"₹"`.
    pub currency: String,
    pub user_agent: String,
    pub chrome_path: Option<PathBuf>,
    pub headless: bool,
    pub page_timeout_secs: u64,
    pub element_timeout_secs: u64,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    pub keystroke_min_ms: u64,
    pub keystroke_max_ms: u64,
    /// Interactive attempts before falling back to the crawl strategy.
    pub interactive_attempts: u32,
    pub retry_backoff_base_secs: u64,
    /// Detail pages visited per interactive attempt.
    pub max_candidates: usize,
    pub crawl_max_pages: usize,
    pub crawl_max_retries: u32,
    pub crawl_delay_ms: u64,
    pub crawl_job_timeout_secs: u64,
    pub crawl_max_candidates: usize,
}

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36";

impl Default for ScrapeSettings {
    fn default() -> Self {
        Self {
            base_url: "https://www.amazon.in/".to_string(),
            currency: "₹".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            chrome_path: None,
            headless: true,
            page_timeout_secs: 10,
            element_timeout_secs: 5,
            min_delay_ms: 3_000,
            max_delay_ms: 7_000,
            keystroke_min_ms: 50,
            keystroke_max_ms: 200,
            interactive_attempts: 2,
            retry_backoff_base_secs: 1,
            max_candidates: 5,
            crawl_max_pages: 5,
            crawl_max_retries: 5,
            crawl_delay_ms: 3_000,
            crawl_job_timeout_secs: 600,
            crawl_max_candidates: 50,
        }
    }
}
