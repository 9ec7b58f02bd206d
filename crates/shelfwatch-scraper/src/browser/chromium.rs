//! Chromium-backed browser sessions via chromiumoxide.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{CookieParam, SetUserAgentOverrideParams};
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use shelfwatch_core::ScrapeSettings;
use tokio::task::JoinHandle;

use super::stealth::{STEALTH_ARGS, STEALTH_SCRIPTS};
use super::{cookie_domain, BrowserLauncher, BrowserSession, BASE_COOKIES};
use crate::error::ScraperError;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Find a Chromium binary: the configured path first, then `PATH`.
#[must_use]
pub fn find_chromium(configured: Option<&PathBuf>) -> Option<PathBuf> {
    if let Some(path) = configured {
        if path.exists() {
            return Some(path.clone());
        }
        tracing::warn!(path = %path.display(), "configured Chrome path does not exist; searching PATH");
    }

    ["google-chrome", "google-chrome-stable", "chromium", "chromium-browser"]
        .into_iter()
        .find_map(|name| which::which(name).ok())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ChromiumLauncher;

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(
        &self,
        settings: &ScrapeSettings,
    ) -> Result<Box<dyn BrowserSession>, ScraperError> {
        let acquisition = |what: &str, e: &dyn std::fmt::Display| {
            ScraperError::SessionAcquisition(format!("{what}: {e}"))
        };

        let chrome_path = find_chromium(settings.chrome_path.as_ref()).ok_or_else(|| {
            ScraperError::SessionAcquisition("Chromium not found on PATH".to_string())
        })?;

        tracing::info!(path = %chrome_path.display(), headless = settings.headless, "launching browser");

        let mut builder = BrowserConfig::builder().chrome_executable(chrome_path);
        if settings.headless {
            builder = builder.arg("--headless=new");
        } else {
            builder = builder.with_head();
        }
        for arg in STEALTH_ARGS {
            builder = builder.arg(*arg);
        }
        let config = builder
            .build()
            .map_err(|e| acquisition("failed to build browser config", &e))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| acquisition("failed to launch Chromium", &e))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let mut session = ChromiumSession {
            browser,
            page: None,
            handler_task,
            close_timeout: Duration::from_secs(settings.page_timeout_secs),
        };

        // From here on the browser process exists; close it on any failure.
        match session.prepare_page(settings).await {
            Ok(()) => Ok(Box::new(session)),
            Err(e) => {
                session.close().await;
                Err(acquisition("failed to prepare page", &e))
            }
        }
    }
}

pub struct ChromiumSession {
    browser: Browser,
    page: Option<Page>,
    handler_task: JoinHandle<()>,
    /// Bound on each shutdown step before the process is killed.
    close_timeout: Duration,
}

fn browser_err(e: impl std::fmt::Display) -> ScraperError {
    ScraperError::Browser(e.to_string())
}

/// Awaits one shutdown step for at most `limit`; `None` if it hung.
async fn within<T>(what: &str, limit: Duration, step: impl Future<Output = T>) -> Option<T> {
    if let Ok(value) = tokio::time::timeout(limit, step).await {
        Some(value)
    } else {
        tracing::warn!(step = what, secs = limit.as_secs(), "browser shutdown step timed out");
        None
    }
}

impl ChromiumSession {
    async fn prepare_page(&mut self, settings: &ScrapeSettings) -> Result<(), ScraperError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(browser_err)?;

        page.execute(SetUserAgentOverrideParams::new(settings.user_agent.clone()))
            .await
            .map_err(browser_err)?;

        for script in STEALTH_SCRIPTS {
            page.execute(AddScriptToEvaluateOnNewDocumentParams::new(
                (*script).to_string(),
            ))
            .await
            .map_err(browser_err)?;
        }

        if let Some(domain) = cookie_domain(&settings.base_url) {
            for (name, value) in BASE_COOKIES {
                let cookie = CookieParam::builder()
                    .name(*name)
                    .value(*value)
                    .domain(domain.clone())
                    .path("/")
                    .build()
                    .map_err(browser_err)?;
                if let Err(e) = page.set_cookie(cookie).await {
                    tracing::warn!(cookie = name, error = %e, "failed to set base cookie");
                }
            }
        }

        self.page = Some(page);
        Ok(())
    }

    fn page(&self) -> Result<&Page, ScraperError> {
        self.page
            .as_ref()
            .ok_or_else(|| ScraperError::Browser("session already closed".to_string()))
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), ScraperError> {
        let page = self.page()?;
        tracing::debug!(url, "navigating");
        tokio::time::timeout(timeout, page.goto(url))
            .await
            .map_err(|_| ScraperError::Timeout {
                what: format!("navigation to {url}"),
                secs: timeout.as_secs(),
            })?
            .map_err(browser_err)?;
        Ok(())
    }

    async fn wait_for_any(
        &mut self,
        selectors: &[String],
        timeout: Duration,
    ) -> Result<String, ScraperError> {
        let page = self.page()?;
        let poll = async {
            loop {
                for css in selectors {
                    if page.find_element(css.as_str()).await.is_ok() {
                        return css.clone();
                    }
                }
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        };
        tokio::time::timeout(timeout, poll)
            .await
            .map_err(|_| ScraperError::ElementNotFound {
                selector: selectors.join(", "),
            })
    }

    async fn type_text(&mut self, selector: &str, text: &str) -> Result<(), ScraperError> {
        let element = self
            .page()?
            .find_element(selector)
            .await
            .map_err(|_| ScraperError::ElementNotFound {
                selector: selector.to_string(),
            })?;
        element.click().await.map_err(browser_err)?;
        element.type_str(text).await.map_err(browser_err)?;
        Ok(())
    }

    async fn press_enter(&mut self, selector: &str) -> Result<(), ScraperError> {
        let element = self
            .page()?
            .find_element(selector)
            .await
            .map_err(|_| ScraperError::ElementNotFound {
                selector: selector.to_string(),
            })?;
        element.press_key("Enter").await.map_err(browser_err)?;
        Ok(())
    }

    async fn current_url(&mut self) -> Result<String, ScraperError> {
        let url = self.page()?.url().await.map_err(browser_err)?;
        url.ok_or_else(|| ScraperError::Browser("page has no URL".to_string()))
    }

    async fn content(&mut self) -> Result<String, ScraperError> {
        self.page()?.content().await.map_err(browser_err)
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>, ScraperError> {
        self.page()?
            .screenshot(ScreenshotParams::builder().full_page(true).build())
            .await
            .map_err(browser_err)
    }

    async fn close(&mut self) {
        let limit = self.close_timeout;
        if let Some(page) = self.page.take() {
            if let Some(Err(e)) = within("page close", limit, page.close()).await {
                tracing::warn!(error = %e, "page close returned an error");
            }
        }

        let exited = match within("browser close", limit, self.browser.close()).await {
            Some(Ok(_)) => matches!(
                within("browser exit", limit, self.browser.wait()).await,
                Some(Ok(_))
            ),
            Some(Err(e)) => {
                tracing::warn!(error = %e, "browser close returned an error");
                false
            }
            None => false,
        };
        if !exited {
            tracing::warn!("browser did not exit cleanly; killing the process");
            let killed = within("browser kill", limit, self.browser.kill()).await;
            if let Some(Err(e)) = killed.flatten() {
                tracing::warn!(error = %e, "failed to kill browser process");
            }
        }

        self.handler_task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn hung_shutdown_step_is_abandoned_after_limit() {
        let started = tokio::time::Instant::now();
        let hung = std::future::pending::<()>();
        let outcome = within("browser exit", Duration::from_secs(10), hung).await;
        assert!(outcome.is_none());
        assert!(started.elapsed() >= Duration::from_secs(10));
    }

    #[tokio::test]
    async fn finished_shutdown_step_returns_its_output() {
        let outcome = within("page close", Duration::from_secs(10), async { 7 }).await;
        assert_eq!(outcome, Some(7));
    }

    #[tokio::test]
    #[ignore] // Requires Chromium to be installed
    async fn launch_navigate_and_read_content() {
        let settings = ScrapeSettings::default();
        let mut session = ChromiumLauncher
            .launch(&settings)
            .await
            .expect("failed to launch browser");

        session
            .navigate(
                "data:text/html,<span id='productTitle'>Hello</span>",
                Duration::from_secs(10),
            )
            .await
            .expect("navigation failed");

        let matched = session
            .wait_for_any(&["#productTitle".to_string()], Duration::from_secs(5))
            .await
            .expect("title never appeared");
        assert_eq!(matched, "#productTitle");

        let html = session.content().await.expect("content failed");
        assert!(html.contains("Hello"));

        session.close().await;
        session.close().await;
    }

    #[test]
    fn missing_configured_path_falls_back_to_search() {
        let bogus = PathBuf::from("/definitely/not/chrome");
        // Either nothing is installed or a PATH binary is found; never the bogus path.
        assert_ne!(find_chromium(Some(&bogus)), Some(bogus));
    }
}
