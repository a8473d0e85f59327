use std::sync::Arc;

use reqwest::Url;

use crate::{
    browser::BrowserDriver,
    config::{NavigationSettings, ScrapeConfig},
    error::Result,
    listing_extractor::ListingExtractor,
    listing_navigator::PageSelectors,
    ratelimit::PagePacer,
};

/// Everything one `get_data` call needs to scrape, built fresh per call.
pub struct ScrapingContext {
    pub driver: Arc<dyn BrowserDriver>,
    pub extractor: ListingExtractor,
    pub page_selectors: PageSelectors,
    pub pacer: PagePacer,
    pub navigation: NavigationSettings,
    pub base_url: Url,
}

impl ScrapingContext {
    pub fn new(driver: Arc<dyn BrowserDriver>, config: &ScrapeConfig) -> Result<Self> {
        let navigation = config.navigation.clone();
        let base_url = navigation.parsed_base_url()?;
        let extractor = ListingExtractor::new()?;
        let page_selectors = PageSelectors::new()?;
        let pacer = PagePacer::new(navigation.page_delay, navigation.jitter);
        Ok(ScrapingContext {
            driver,
            extractor,
            page_selectors,
            pacer,
            navigation,
            base_url,
        })
    }
}
