//! Collects residential listings for a fixed set of Utah and Salt Lake County
//! cities and hands them back as a table or a delimited file.

pub mod browser;
pub mod chrome;
pub mod cities;
pub mod city_scraper;
pub mod collector;
pub mod config;
mod csv_output;
pub mod error;
pub mod field_parsers;
pub mod fixture_browser;
pub mod listing;
pub mod listing_extractor;
pub mod listing_navigator;
pub mod ratelimit;
pub mod requests;
pub mod scraping_context;
mod text_manipulators;

pub use cities::{CityTarget, County};
pub use collector::{
    CityReport, CityStatus, Collection, DataOutput, collect, get_data, get_data_live,
    launch_driver,
};
pub use config::{DriverKind, NavigationSettings, OutputFormat, ScrapeConfig};
pub use error::{ConfigError, Error, Result};
pub use listing::{COLUMNS, ListingRecord, RecordTable};
