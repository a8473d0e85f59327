use std::pin::pin;

use futures::StreamExt;
use log::{debug, info};

use crate::{
    cities::CityTarget,
    error::{CityFailure, NavigationFailure},
    listing::ListingRecord,
    listing_extractor::ExtractionOutcome,
    listing_navigator::ListingNavigator,
    scraping_context::ScrapingContext,
};

/// What one city produced. Discarded by the collector once merged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CityHarvest {
    pub records: Vec<ListingRecord>,
    pub skipped: usize,
    /// Set when pagination ended on a navigation failure instead of running out.
    pub halted: Option<NavigationFailure>,
}

pub struct CityScraper<'a> {
    ctx: &'a ScrapingContext,
}

impl<'a> CityScraper<'a> {
    pub fn new(ctx: &'a ScrapingContext) -> Self {
        Self { ctx }
    }

    /// Scrapes up to `max_listings` records for one city.
    ///
    /// Per-listing problems only bump the skip count and navigation failures
    /// only shorten the harvest. `Err` means the city couldn't be attempted at all.
    pub async fn scrape_city(
        &self,
        target: CityTarget,
        max_listings: usize,
    ) -> Result<CityHarvest, CityFailure> {
        info!("Scraping {target}");
        let fragments = ListingNavigator::new(self.ctx)
            .paginate(target, max_listings)
            .await?;
        let mut fragments = pin!(fragments);

        let mut harvest = CityHarvest::default();
        while harvest.records.len() < max_listings {
            let Some(item) = fragments.next().await else {
                break;
            };
            let fragment = match item {
                Ok(fragment) => fragment,
                Err(failure) => {
                    harvest.halted = Some(failure);
                    break;
                }
            };
            match self.ctx.extractor.extract(&fragment) {
                ExtractionOutcome::Extracted(fields) => {
                    harvest.records.push(ListingRecord::new(&target, fields));
                }
                ExtractionOutcome::Skipped(reason) => {
                    harvest.skipped += 1;
                    debug!(
                        "{}: skipped a listing on page {} ({})",
                        target.slug,
                        fragment.page,
                        reason.as_str()
                    );
                }
            }
        }

        info!(
            "{}: {} records, {} skipped{}",
            target.slug,
            harvest.records.len(),
            harvest.skipped,
            if harvest.halted.is_some() { " (partial)" } else { "" }
        );
        Ok(harvest)
    }
}
