//! Scoped WebDriver session management.
//!
//! The crawl drives a real Chrome session through a WebDriver endpoint
//! (chromedriver or a Selenium grid). A [`BrowserSession`] owns the remote
//! session; callers run their crawl body to an owned `Result`, call
//! [`BrowserSession::quit`], and only then propagate the outcome, so the
//! session is released on every exit path. Establishment failure is the one
//! fatal error in the crawl: everything after it degrades to partial results.

use std::time::Duration;

use thirtyfour::prelude::*;
use tracing::{debug, info, warn};

use crate::errors::EtlError;

/// Desktop user agent presented to the crawled site.
pub const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) \
    AppleWebKit/537.36 (KHTML, like Gecko) \
    Chrome/120.0.0.0 Safari/537.36";

const PAGE_LOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for the browser session.
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// WebDriver endpoint, e.g. `http://localhost:9515`.
    pub webdriver_url: String,
    /// Run Chrome without a visible window.
    pub headless: bool,
}

/// An established WebDriver session.
pub struct BrowserSession {
    driver: WebDriver,
}

impl BrowserSession {
    /// Establish a Chrome session against the configured endpoint.
    ///
    /// Failure here is fatal to the enclosing crawl and propagates.
    pub async fn connect(config: &BrowserConfig) -> Result<Self, EtlError> {
        let mut caps = DesiredCapabilities::chrome();
        if config.headless {
            caps.set_headless()?;
        }
        caps.set_no_sandbox()?;
        caps.set_disable_dev_shm_usage()?;
        caps.add_arg("--start-maximized")?;
        caps.add_arg(&format!("user-agent={USER_AGENT}"))?;

        let driver = WebDriver::new(&config.webdriver_url, caps).await?;
        // Release the half-set-up session rather than leaking it.
        if let Err(err) = driver.set_page_load_timeout(PAGE_LOAD_TIMEOUT).await {
            let _ = driver.quit().await;
            return Err(err.into());
        }

        info!(
            endpoint = %config.webdriver_url,
            headless = config.headless,
            "browser session established"
        );
        Ok(Self { driver })
    }

    pub fn driver(&self) -> &WebDriver {
        &self.driver
    }

    /// Navigate to `url`.
    pub async fn goto(&self, url: &str) -> Result<(), EtlError> {
        debug!(%url, "navigating");
        self.driver.goto(url).await?;
        Ok(())
    }

    /// Current rendered page source.
    pub async fn page_source(&self) -> Result<String, EtlError> {
        Ok(self.driver.source().await?)
    }

    /// Terminate the remote session. Failure to quit is logged, not raised:
    /// at teardown the crawl outcome is already decided.
    pub async fn quit(self) {
        if let Err(err) = self.driver.quit().await {
            warn!(error = %err, "failed to quit browser session");
        }
    }
}
