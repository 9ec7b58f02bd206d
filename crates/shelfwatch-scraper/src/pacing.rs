//! Randomized pacing between page fetches and between strategy attempts.
//!
//! Delays are injected rather than hard-coded so tests can run with
//! [`PacingPolicy::none`] and [`Backoff::none`].

use std::time::Duration;

/// Uniform random delay in `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingPolicy {
    min: Duration,
    max: Duration,
}

impl PacingPolicy {
    /// Bounds are swapped if given in the wrong order.
    #[must_use]
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    #[must_use]
    pub fn from_millis(min_ms: u64, max_ms: u64) -> Self {
        Self::new(Duration::from_millis(min_ms), Duration::from_millis(max_ms))
    }

    /// Scrapy-style randomized delay: `0.5x` to `1.5x` of `base_ms`.
    #[must_use]
    pub fn around_millis(base_ms: u64) -> Self {
        Self::from_millis(base_ms / 2, base_ms.saturating_add(base_ms / 2))
    }

    #[must_use]
    pub fn none() -> Self {
        Self {
            min: Duration::ZERO,
            max: Duration::ZERO,
        }
    }

    #[must_use]
    pub fn sample(&self) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        // Millisecond resolution is plenty for request pacing.
        let lo = u64::try_from(self.min.as_millis()).unwrap_or(u64::MAX);
        let hi = u64::try_from(self.max.as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(rand::random_range(lo..=hi))
    }

    pub async fn pause(&self) {
        let delay = self.sample();
        if !delay.is_zero() {
            tracing::debug!(delay_ms = delay.as_millis(), "pacing");
            tokio::time::sleep(delay).await;
        }
    }
}

/// Exponential backoff with additive jitter: `base * 2^attempt + jitter`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    base: Duration,
    jitter: PacingPolicy,
}

impl Backoff {
    #[must_use]
    pub fn new(base: Duration, jitter: PacingPolicy) -> Self {
        Self { base, jitter }
    }

    /// Between interactive attempts: `base_secs * 2^attempt` plus 1–3 s.
    #[must_use]
    pub fn between_attempts(base_secs: u64) -> Self {
        Self::new(
            Duration::from_secs(base_secs),
            PacingPolicy::from_millis(1_000, 3_000),
        )
    }

    #[must_use]
    pub fn none() -> Self {
        Self::new(Duration::ZERO, PacingPolicy::none())
    }

    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        let growth = 1_u32 << attempt.min(16);
        self.base.saturating_mul(growth) + self.jitter.sample()
    }

    pub async fn wait(&self, attempt: u32) {
        let delay = self.delay(attempt);
        if !delay.is_zero() {
            tracing::info!(attempt, delay_ms = delay.as_millis(), "backing off before retry");
            tokio::time::sleep(delay).await;
        }
    }
}
