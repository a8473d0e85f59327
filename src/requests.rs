use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, ClientBuilder};
use scraper::{Html, Selector};

use crate::browser::{BrowserDriver, BrowserSession};
use crate::error::DriverError;

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";

/// Serves pages as the server sent them, without running scripts.
pub struct HttpDriver {
    client: Client,
}

impl HttpDriver {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, DriverError> {
        let client = ClientBuilder::new()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl BrowserDriver for HttpDriver {
    async fn open_session(&self) -> Result<Box<dyn BrowserSession>, DriverError> {
        Ok(Box::new(HttpSession {
            client: self.client.clone(),
            body: None,
        }))
    }
}

pub struct HttpSession {
    client: Client,
    body: Option<String>,
}

#[async_trait]
impl BrowserSession for HttpSession {
    async fn goto(&mut self, url: &str) -> Result<(), DriverError> {
        self.body = None;
        debug!("GET {url}");
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DriverError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        self.body = Some(response.text().await?);
        Ok(())
    }

    // A static page never changes after load, so the timeout has nothing to bound.
    async fn wait_for_selector(
        &mut self,
        selector: &str,
        _timeout: Duration,
    ) -> Result<bool, DriverError> {
        let body = self.body.as_deref().ok_or(DriverError::NoPage)?;
        let selector = Selector::parse(selector)
            .map_err(|e| DriverError::Other(format!("bad selector {selector:?}: {e}")))?;
        Ok(Html::parse_document(body).select(&selector).next().is_some())
    }

    async fn content(&self) -> Result<String, DriverError> {
        self.body.clone().ok_or(DriverError::NoPage)
    }
}
