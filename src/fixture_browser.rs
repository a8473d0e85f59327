//! In-memory driver serving canned pages, for offline runs and tests.
//!
//! Counts sessions opened and torn down and every navigation attempted, so a
//! caller can check nothing touched the "network" or leaked a session.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use scraper::{Html, Selector};

use crate::browser::{BrowserDriver, BrowserSession};
use crate::error::DriverError;

#[derive(Debug, Clone)]
pub enum FixturePage {
    Html(String),
    /// Loading fails with this message.
    Fail(String),
    /// Loading never finishes within any sane timeout.
    Hang,
    /// The first `failures` loads of this URL fail, later ones serve `html`.
    Flaky { failures: usize, html: String },
}

#[derive(Debug, Default)]
pub struct FixtureCounters {
    sessions_opened: AtomicUsize,
    sessions_closed: AtomicUsize,
    navigations: AtomicUsize,
    loads: Mutex<HashMap<String, usize>>,
}

impl FixtureCounters {
    pub fn sessions_opened(&self) -> usize {
        self.sessions_opened.load(Ordering::SeqCst)
    }
    pub fn sessions_closed(&self) -> usize {
        self.sessions_closed.load(Ordering::SeqCst)
    }
    pub fn navigations(&self) -> usize {
        self.navigations.load(Ordering::SeqCst)
    }

    /// Navigations to one URL so far.
    pub fn loads_of(&self, url: &str) -> usize {
        let loads = self.loads.lock().unwrap_or_else(PoisonError::into_inner);
        loads.get(url).copied().unwrap_or(0)
    }

    fn record_load(&self, url: &str) -> usize {
        self.navigations.fetch_add(1, Ordering::SeqCst);
        let mut loads = self.loads.lock().unwrap_or_else(PoisonError::into_inner);
        let count = loads.entry(url.to_string()).or_default();
        *count += 1;
        *count
    }
}

#[derive(Debug, Clone, Default)]
pub struct FixtureDriver {
    pages: Arc<HashMap<String, FixturePage>>,
    counters: Arc<FixtureCounters>,
    refuse_sessions: bool,
}

impl FixtureDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a page. Must be called before the driver is shared.
    pub fn with_page(mut self, url: impl Into<String>, page: FixturePage) -> Self {
        Arc::make_mut(&mut self.pages).insert(url.into(), page);
        self
    }

    pub fn with_html(self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.with_page(url, FixturePage::Html(html.into()))
    }

    /// Every `open_session` call fails.
    pub fn refusing_sessions(mut self) -> Self {
        self.refuse_sessions = true;
        self
    }

    pub fn counters(&self) -> Arc<FixtureCounters> {
        Arc::clone(&self.counters)
    }
}

#[async_trait]
impl BrowserDriver for FixtureDriver {
    async fn open_session(&self) -> Result<Box<dyn BrowserSession>, DriverError> {
        if self.refuse_sessions {
            return Err(DriverError::Other("browser refused to start".into()));
        }
        self.counters.sessions_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FixtureSession {
            pages: Arc::clone(&self.pages),
            counters: Arc::clone(&self.counters),
            current: None,
        }))
    }
}

pub struct FixtureSession {
    pages: Arc<HashMap<String, FixturePage>>,
    counters: Arc<FixtureCounters>,
    current: Option<String>,
}

#[async_trait]
impl BrowserSession for FixtureSession {
    async fn goto(&mut self, url: &str) -> Result<(), DriverError> {
        let attempt = self.counters.record_load(url);
        self.current = None;
        match self.pages.get(url) {
            Some(FixturePage::Html(html)) => {
                self.current = Some(html.clone());
                Ok(())
            }
            Some(FixturePage::Flaky { failures, .. }) if attempt <= *failures => {
                Err(DriverError::Transport(format!("connection reset (load {attempt})")))
            }
            Some(FixturePage::Flaky { html, .. }) => {
                self.current = Some(html.clone());
                Ok(())
            }
            Some(FixturePage::Fail(message)) => Err(DriverError::Other(message.clone())),
            Some(FixturePage::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(DriverError::Other("hung page eventually gave up".into()))
            }
            None => Err(DriverError::Status {
                status: 404,
                url: url.to_string(),
            }),
        }
    }

    async fn wait_for_selector(
        &mut self,
        selector: &str,
        _timeout: Duration,
    ) -> Result<bool, DriverError> {
        let html = self.current.as_deref().ok_or(DriverError::NoPage)?;
        let selector = Selector::parse(selector)
            .map_err(|e| DriverError::Other(format!("bad selector {selector:?}: {e}")))?;
        Ok(Html::parse_document(html).select(&selector).next().is_some())
    }

    async fn content(&self) -> Result<String, DriverError> {
        self.current.clone().ok_or(DriverError::NoPage)
    }
}

impl Drop for FixtureSession {
    fn drop(&mut self) {
        self.counters.sessions_closed.fetch_add(1, Ordering::SeqCst);
    }
}
