//! Headless Chrome sessions, one tab each.
//!
//! `headless_chrome` is blocking, so every tab call runs on tokio's blocking
//! pool.

use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use log::{debug, info};

use crate::browser::{BrowserDriver, BrowserSession};
use crate::error::DriverError;

/// Chrome exits on its own after this long without a command.
const MIN_IDLE_TIMEOUT: Duration = Duration::from_secs(300);

pub struct ChromeDriver {
    browser: Arc<Browser>,
    user_agent: String,
    page_timeout: Duration,
}

impl ChromeDriver {
    /// Starts a local headless Chrome shared by every session of the driver.
    pub async fn launch(user_agent: &str, page_timeout: Duration) -> Result<Self, DriverError> {
        let idle = MIN_IDLE_TIMEOUT.max(page_timeout * 4);
        let browser = blocking(move || {
            let options = LaunchOptions::default_builder()
                .headless(true)
                .idle_browser_timeout(idle)
                .build()
                .map_err(|e| anyhow!("invalid launch options: {e}"))?;
            Browser::new(options)
        })
        .await?;
        info!("Launched headless Chrome");

        Ok(Self {
            browser: Arc::new(browser),
            user_agent: user_agent.to_string(),
            page_timeout,
        })
    }
}

#[async_trait]
impl BrowserDriver for ChromeDriver {
    async fn open_session(&self) -> Result<Box<dyn BrowserSession>, DriverError> {
        let browser = Arc::clone(&self.browser);
        let user_agent = self.user_agent.clone();
        let page_timeout = self.page_timeout;
        let tab = blocking(move || {
            let tab = browser.new_tab()?;
            tab.set_user_agent(&user_agent, None, None)?;
            tab.set_default_timeout(page_timeout);
            Ok(tab)
        })
        .await?;
        Ok(Box::new(ChromeSession { tab }))
    }
}

pub struct ChromeSession {
    tab: Arc<Tab>,
}

#[async_trait]
impl BrowserSession for ChromeSession {
    async fn goto(&mut self, url: &str) -> Result<(), DriverError> {
        let tab = Arc::clone(&self.tab);
        let url = url.to_string();
        debug!("navigating tab to {url}");
        blocking(move || {
            tab.navigate_to(&url)?.wait_until_navigated()?;
            Ok(())
        })
        .await
    }

    async fn wait_for_selector(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<bool, DriverError> {
        let tab = Arc::clone(&self.tab);
        let selector = selector.to_string();
        blocking(move || {
            // Any error here means the element never showed up in time.
            let found = tab
                .wait_for_element_with_custom_timeout(&selector, timeout)
                .map(|_| ());
            if let Err(e) = found {
                debug!("{selector} not found: {e}");
                return Ok(false);
            }
            Ok(true)
        })
        .await
    }

    async fn content(&self) -> Result<String, DriverError> {
        let tab = Arc::clone(&self.tab);
        blocking(move || tab.get_content()).await
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        let tab = Arc::clone(&self.tab);
        let close = move || {
            if let Err(e) = tab.close(false) {
                debug!("couldn't close tab: {e}");
            }
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(close);
            }
            Err(_) => close(),
        }
    }
}

async fn blocking<T, F>(job: F) -> Result<T, DriverError>
where
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|e| DriverError::Other(e.to_string()))?
        .map_err(|e| DriverError::Transport(format!("{e:#}")))
}
