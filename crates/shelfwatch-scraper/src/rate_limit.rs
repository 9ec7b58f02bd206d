//! Retry utilities for the crawl strategy's HTTP requests.
//!
//! Transient failures (network errors, throttling and gateway statuses) are
//! retried with exponential backoff. Everything else, including block pages,
//! is propagated immediately.

use std::future::Future;
use std::time::Duration;

use crate::error::ScraperError;

/// Statuses worth another try. 403 is included because the marketplace
/// serves it intermittently to throttled clients.
const RETRY_STATUSES: [u16; 7] = [500, 502, 503, 504, 408, 429, 403];

pub(crate) fn is_retriable_status(status: u16) -> bool {
    RETRY_STATUSES.contains(&status)
}

/// Network failures and statuses in [`RETRY_STATUSES`]; block pages and
/// other 4xx responses are final.
fn is_retriable(err: &ScraperError) -> bool {
    match err {
        ScraperError::Http(_) => true,
        ScraperError::UnexpectedStatus { status, .. } => is_retriable_status(*status),
        _ => false,
    }
}

/// Runs `operation`, retrying transient failures after
/// `backoff_base_ms * 2^attempt` milliseconds.
///
/// `max_retries` counts retries, not attempts: `operation` runs at most
/// `max_retries + 1` times and the last error is returned.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, ScraperError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ScraperError>>,
{
    let mut last_err;
    let mut attempt = 0u32;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                last_err = err;
            }
        }

        let delay_ms = backoff_base_ms.saturating_mul(1u64 << attempt.min(62));
        tracing::warn!(
            attempt,
            max_retries,
            delay_ms,
            error = %last_err,
            "transient crawl error, retrying after backoff"
        );
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        attempt += 1;
    }
}
