use std::time::Duration;

use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Couldn't compile selector: {0}")]
    Selector(String),

    #[error("Couldn't start the browser driver: {0}")]
    Driver(#[from] DriverError),

    #[error("Io Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Csv Error: {0}")]
    Csv(#[from] csv::Error),
}

/// Rejected before any browser work starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("unsupported city identifier: {0:?}")]
    UnknownCity(String),

    #[error("no cities configured")]
    NoCities,

    #[error("max listings per city must be positive")]
    NonPositiveMaxListings,

    #[error("worker count must be positive")]
    NoWorkers,

    #[error("unknown output format {0:?}, expected table/pandas or file/csv")]
    UnknownOutputFormat(String),

    #[error("unknown browser driver {0:?}, expected chrome or http")]
    UnknownDriver(String),

    #[error("invalid base url {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

/// Ends pagination for one city early. Never propagated past the city scraper.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavigationFailure {
    #[error("timed out after {after:?} loading {url}")]
    Timeout { url: String, after: Duration },

    #[error("results container missing on {url}")]
    MissingResults { url: String },

    #[error("driver failed on {url}: {source}")]
    Driver { url: String, source: DriverError },
}

/// A whole city could not be attempted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CityFailure {
    #[error("couldn't open a browser session: {0}")]
    Session(DriverError),

    #[error("couldn't resolve search url for {city}: {reason}")]
    InvalidUrl { city: String, reason: String },
}

/// Reported by a browser driver implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("no page loaded")]
    NoPage,

    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for DriverError {
    fn from(value: reqwest::Error) -> Self {
        DriverError::Transport(value.to_string())
    }
}
