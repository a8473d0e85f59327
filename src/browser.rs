//! The boundary to whatever renders pages for us.
//!
//! A driver hands out sessions; a session is one exclusive browsing context.
//! Sessions are torn down by dropping them.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::DriverError;

#[async_trait]
pub trait BrowserDriver: Send + Sync {
    async fn open_session(&self) -> Result<Box<dyn BrowserSession>, DriverError>;
}

#[async_trait]
pub trait BrowserSession: Send {
    /// Load `url` into the session, replacing the current page.
    async fn goto(&mut self, url: &str) -> Result<(), DriverError>;

    /// Resolve `true` once `selector` matches on the current page, or `false`
    /// if it still doesn't after `timeout`.
    async fn wait_for_selector(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<bool, DriverError>;

    /// Rendered HTML of the current page.
    async fn content(&self) -> Result<String, DriverError>;
}
