use std::path::PathBuf;

use crate::app_config::{AppConfig, ScrapeSettings, DEFAULT_USER_AGENT};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so tests can drive it with a `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .trim()
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .trim()
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .trim()
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let database_url = optional("DATABASE_URL");
    let log_level = or_default("SHELFWATCH_LOG_LEVEL", "info");
    let reports_dir = PathBuf::from(or_default("SHELFWATCH_REPORTS_DIR", "reports"));
    // Present-but-empty disables snapshots; absent uses the default directory.
    let snapshot_dir = match lookup("SHELFWATCH_SNAPSHOT_DIR") {
        Ok(raw) if raw.trim().is_empty() => None,
        Ok(raw) => Some(PathBuf::from(raw.trim())),
        Err(_) => Some(PathBuf::from("snapshots")),
    };
    let selectors_path = optional("SHELFWATCH_SELECTORS_PATH").map(PathBuf::from);
    let db_max_connections = parse_u32("SHELFWATCH_DB_MAX_CONNECTIONS", "5")?;

    let base_url = normalize_base_url(&or_default("SHELFWATCH_BASE_URL", "https://www.amazon.in/"))
        .map_err(|reason| invalid("SHELFWATCH_BASE_URL", reason))?;

    let scrape = ScrapeSettings {
        base_url,
        currency: or_default("SHELFWATCH_CURRENCY", "₹"),
        user_agent: or_default("SHELFWATCH_USER_AGENT", DEFAULT_USER_AGENT),
        chrome_path: optional("SHELFWATCH_CHROME_PATH").map(PathBuf::from),
        headless: parse_bool(&or_default("SHELFWATCH_HEADLESS", "true"))
            .map_err(|reason| invalid("SHELFWATCH_HEADLESS", reason))?,
        page_timeout_secs: parse_u64("SHELFWATCH_PAGE_TIMEOUT_SECS", "10")?,
        element_timeout_secs: parse_u64("SHELFWATCH_ELEMENT_TIMEOUT_SECS", "5")?,
        min_delay_ms: parse_u64("SHELFWATCH_MIN_DELAY_MS", "3000")?,
        max_delay_ms: parse_u64("SHELFWATCH_MAX_DELAY_MS", "7000")?,
        keystroke_min_ms: parse_u64("SHELFWATCH_KEYSTROKE_MIN_MS", "50")?,
        keystroke_max_ms: parse_u64("SHELFWATCH_KEYSTROKE_MAX_MS", "200")?,
        interactive_attempts: parse_u32("SHELFWATCH_INTERACTIVE_ATTEMPTS", "2")?,
        retry_backoff_base_secs: parse_u64("SHELFWATCH_RETRY_BACKOFF_BASE_SECS", "1")?,
        max_candidates: parse_usize("SHELFWATCH_MAX_CANDIDATES", "5")?,
        crawl_max_pages: parse_usize("SHELFWATCH_CRAWL_MAX_PAGES", "5")?,
        crawl_max_retries: parse_u32("SHELFWATCH_CRAWL_MAX_RETRIES", "5")?,
        crawl_delay_ms: parse_u64("SHELFWATCH_CRAWL_DELAY_MS", "3000")?,
        crawl_job_timeout_secs: parse_u64("SHELFWATCH_CRAWL_JOB_TIMEOUT_SECS", "600")?,
        crawl_max_candidates: parse_usize("SHELFWATCH_CRAWL_MAX_CANDIDATES", "50")?,
    };

    validate_ranges(&scrape)?;

    Ok(AppConfig {
        database_url,
        log_level,
        reports_dir,
        snapshot_dir,
        selectors_path,
        db_max_connections,
        scrape,
    })
}

fn validate_ranges(scrape: &ScrapeSettings) -> Result<(), ConfigError> {
    let invalid = |var: &str, reason: &str| {
        Err(ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: reason.to_string(),
        })
    };

    if scrape.min_delay_ms > scrape.max_delay_ms {
        return invalid(
            "SHELFWATCH_MIN_DELAY_MS",
            "must not exceed SHELFWATCH_MAX_DELAY_MS",
        );
    }
    if scrape.keystroke_min_ms > scrape.keystroke_max_ms {
        return invalid(
            "SHELFWATCH_KEYSTROKE_MIN_MS",
            "must not exceed SHELFWATCH_KEYSTROKE_MAX_MS",
        );
    }
    if scrape.page_timeout_secs == 0 {
        return invalid("SHELFWATCH_PAGE_TIMEOUT_SECS", "must be greater than zero");
    }
    if scrape.element_timeout_secs == 0 {
        return invalid("SHELFWATCH_ELEMENT_TIMEOUT_SECS", "must be greater than zero");
    }
    if scrape.crawl_job_timeout_secs == 0 {
        return invalid("SHELFWATCH_CRAWL_JOB_TIMEOUT_SECS", "must be greater than zero");
    }
    if scrape.interactive_attempts == 0 {
        return invalid("SHELFWATCH_INTERACTIVE_ATTEMPTS", "must be at least 1");
    }
    Ok(())
}

/// Requires an http(s) scheme and guarantees a trailing slash so relative
/// paths (`s?k=...`, `dp/{id}`) can be appended directly.
fn normalize_base_url(raw: &str) -> Result<String, String> {
    let trimmed = raw.trim();
    if !(trimmed.starts_with("https://") || trimmed.starts_with("http://")) {
        return Err(format!("expected an http(s) URL, got {trimmed:?}"));
    }
    if trimmed.ends_with('/') {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("{trimmed}/"))
    }
}

fn parse_bool(raw: &str) -> Result<bool, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(format!("expected a boolean, got {other:?}")),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
