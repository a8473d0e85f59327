use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use log::{error, info, warn};

use crate::{
    browser::BrowserDriver,
    cities::CityTarget,
    city_scraper::{CityHarvest, CityScraper},
    chrome::ChromeDriver,
    config::{DriverKind, OutputFormat, ScrapeConfig},
    csv_output::write_table,
    error::{CityFailure, NavigationFailure, Result},
    listing::{ListingRecord, RecordTable},
    requests::HttpDriver,
    scraping_context::ScrapingContext,
};

#[derive(Debug, Clone, PartialEq)]
pub enum CityStatus {
    /// Pagination ran until the listing cap or the last page.
    Complete,
    /// Pagination stopped on a navigation failure. Records before it are kept.
    Partial(NavigationFailure),
    /// The city couldn't be attempted. Contributes zero records.
    Failed(CityFailure),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CityReport {
    pub city: CityTarget,
    pub records: usize,
    pub skipped: usize,
    pub status: CityStatus,
}

impl CityReport {
    pub fn is_complete(&self) -> bool {
        self.status == CityStatus::Complete
    }
}

/// Every city's records, in configured city order then page order.
#[derive(Debug, Clone, PartialEq)]
pub struct Collection {
    pub started_at: DateTime<Utc>,
    pub records: Vec<ListingRecord>,
    pub reports: Vec<CityReport>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DataOutput {
    Table(RecordTable),
    File(PathBuf),
}

/// Scrapes every configured city and merges the results.
///
/// The configuration is validated before any browser session is opened. After
/// that, nothing a remote site does makes this fail.
pub async fn collect(driver: Arc<dyn BrowserDriver>, config: &ScrapeConfig) -> Result<Collection> {
    let targets = config.validate()?;
    let ctx = ScrapingContext::new(driver, config)?;
    let started_at = Utc::now();
    info!(
        "Started scraping {} cities, up to {} listings each, {} at a time",
        targets.len(),
        config.max_listings_per_city,
        config.workers
    );

    let scraper = CityScraper::new(&ctx);
    let max_listings = config.max_listings_per_city;
    // `buffered` yields in input order, whatever order the cities finish in.
    let harvests: Vec<(CityTarget, std::result::Result<CityHarvest, CityFailure>)> =
        stream::iter(targets)
            .map(|target| {
                let scraper = &scraper;
                async move { (target, scraper.scrape_city(target, max_listings).await) }
            })
            .buffered(config.workers)
            .collect()
            .await;

    let mut records = Vec::new();
    let mut reports = Vec::with_capacity(harvests.len());
    for (city, harvest) in harvests {
        let report = match harvest {
            Ok(harvest) => {
                let report = CityReport {
                    city,
                    records: harvest.records.len(),
                    skipped: harvest.skipped,
                    status: harvest
                        .halted
                        .map_or(CityStatus::Complete, CityStatus::Partial),
                };
                records.extend(harvest.records);
                report
            }
            Err(failure) => {
                error!("{}: no records, {failure}", city.slug);
                CityReport {
                    city,
                    records: 0,
                    skipped: 0,
                    status: CityStatus::Failed(failure),
                }
            }
        };
        reports.push(report);
    }

    let incomplete = reports.iter().filter(|r| !r.is_complete()).count();
    if incomplete > 0 {
        warn!("{incomplete} of {} cities did not complete", reports.len());
    }
    let elapsed = Utc::now() - started_at;
    info!(
        "Finished scraping: {} records in {:.1}s",
        records.len(),
        elapsed.num_milliseconds() as f64 / 1000.0
    );

    Ok(Collection {
        started_at,
        records,
        reports,
    })
}

/// Scrapes and hands the records back in the configured output format.
pub async fn get_data(driver: Arc<dyn BrowserDriver>, config: &ScrapeConfig) -> Result<DataOutput> {
    let collection = collect(driver, config).await?;
    emit(config, collection.records)
}

/// Starts the driver the configuration names.
pub async fn launch_driver(config: &ScrapeConfig) -> Result<Arc<dyn BrowserDriver>> {
    let nav = &config.navigation;
    let driver: Arc<dyn BrowserDriver> = match nav.driver {
        DriverKind::Chrome => {
            Arc::new(ChromeDriver::launch(&nav.user_agent, nav.page_timeout).await?)
        }
        DriverKind::Http => Arc::new(HttpDriver::new(&nav.user_agent, nav.page_timeout)?),
    };
    Ok(driver)
}

/// [`get_data`] with the driver the configuration names. The configuration
/// is validated before a browser is started.
pub async fn get_data_live(config: &ScrapeConfig) -> Result<DataOutput> {
    config.validate()?;
    let driver = launch_driver(config).await?;
    get_data(driver, config).await
}

pub fn emit(config: &ScrapeConfig, records: Vec<ListingRecord>) -> Result<DataOutput> {
    let table = RecordTable::new(records);
    match config.output_format {
        OutputFormat::Table => Ok(DataOutput::Table(table)),
        OutputFormat::File => {
            let path = config.output_path();
            write_table(&path, &table, config.delimiter)?;
            info!("Wrote {} rows to {}", table.len(), path.display());
            Ok(DataOutput::File(path))
        }
    }
}
