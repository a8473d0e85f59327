use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use reqwest::Url;
use serde::{Deserialize, de::DeserializeOwned};

use crate::cities::{CityTarget, resolve_cities};
use crate::error::ConfigError;
use crate::requests::DEFAULT_USER_AGENT;

pub const DEFAULT_MAX_LISTINGS: usize = 5;
pub const DEFAULT_BASE_URL: &str = "https://www.utahrealestate.com/";
pub const DEFAULT_OUTPUT_FILE: &str = "utah_housing_data.csv";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Return the records in memory.
    #[default]
    Table,
    /// Write a delimited file and return its path.
    File,
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "table" | "pandas" => Ok(OutputFormat::Table),
            "file" | "csv" => Ok(OutputFormat::File),
            _ => Err(ConfigError::UnknownOutputFormat(s.to_string())),
        }
    }
}

/// What renders the pages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DriverKind {
    /// Headless Chrome. Runs the scripts that draw the results cards.
    #[default]
    Chrome,
    /// Plain HTTP GET. Only sees server-rendered markup.
    Http,
}

impl FromStr for DriverKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chrome" | "headless" => Ok(DriverKind::Chrome),
            "http" | "static" => Ok(DriverKind::Http),
            _ => Err(ConfigError::UnknownDriver(s.to_string())),
        }
    }
}

/// How the navigator talks to the remote site.
#[derive(Debug, Clone, PartialEq)]
pub struct NavigationSettings {
    pub base_url: String,
    /// Bound on every page load and selector wait.
    pub page_timeout: Duration,
    /// Minimum spacing between two page loads.
    pub page_delay: Duration,
    /// Upper bound of the random extra wait added to `page_delay`.
    pub jitter: Duration,
    /// Extra attempts for a failed page load.
    pub retries: u32,
    /// Also load each listing's own page to fill fields the card lacks.
    pub detail_pages: bool,
    pub user_agent: String,
    pub driver: DriverKind,
}

impl Default for NavigationSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            page_timeout: Duration::from_secs(15),
            page_delay: Duration::from_secs(1),
            jitter: Duration::from_millis(500),
            retries: 2,
            detail_pages: false,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            driver: DriverKind::Chrome,
        }
    }
}

impl NavigationSettings {
    pub fn parsed_base_url(&self) -> Result<Url, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidBaseUrl {
            url: self.base_url.clone(),
            reason,
        };
        let url = Url::parse(&self.base_url).map_err(|e| invalid(e.to_string()))?;
        if url.cannot_be_a_base() {
            return Err(invalid("cannot be a base".into()));
        }
        Ok(url)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScrapeConfig {
    pub max_listings_per_city: usize,
    /// City slugs, in the order they should be scraped.
    pub cities: Vec<String>,
    pub output_format: OutputFormat,
    /// Where file output goes. Defaults to [`DEFAULT_OUTPUT_FILE`].
    pub output_path: Option<PathBuf>,
    pub delimiter: u8,
    /// Cities scraped at once. Each worker owns its own browser session.
    pub workers: usize,
    pub navigation: NavigationSettings,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            max_listings_per_city: DEFAULT_MAX_LISTINGS,
            cities: CityTarget::all()
                .into_iter()
                .map(|c| c.slug.to_string())
                .collect(),
            output_format: OutputFormat::Table,
            output_path: None,
            delimiter: b',',
            workers: 1,
            navigation: NavigationSettings::default(),
        }
    }
}

impl ScrapeConfig {
    pub fn for_cities<S: Into<String>>(cities: impl IntoIterator<Item = S>) -> Self {
        Self {
            cities: cities.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Checks everything that can be checked without touching the network and
    /// resolves the configured cities.
    pub fn validate(&self) -> Result<Vec<CityTarget>, ConfigError> {
        if self.max_listings_per_city == 0 {
            return Err(ConfigError::NonPositiveMaxListings);
        }
        if self.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        self.navigation.parsed_base_url()?;
        resolve_cities(&self.cities)
    }

    pub fn output_path(&self) -> PathBuf {
        self.output_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_FILE))
    }

    pub fn from_env() -> anyhow::Result<Self> {
        let env = ScrapeEnv::load_from_env()?;
        env.into_config()
    }
}

/// `SCRAPE_*` environment variables. Anything unset keeps its default.
#[derive(Debug, Default, Deserialize)]
pub struct ScrapeEnv {
    max_listings: Option<usize>,
    cities: Option<String>,
    output: Option<String>,
    output_path: Option<PathBuf>,
    delimiter: Option<char>,
    workers: Option<usize>,
    base_url: Option<String>,
    page_timeout_secs: Option<u64>,
    page_delay_ms: Option<u64>,
    jitter_ms: Option<u64>,
    retries: Option<u32>,
    detail_pages: Option<bool>,
    user_agent: Option<String>,
    driver: Option<String>,
}

impl ScrapeEnv {
    pub fn into_config(self) -> anyhow::Result<ScrapeConfig> {
        let mut config = ScrapeConfig::default();
        if let Some(n) = self.max_listings {
            config.max_listings_per_city = n;
        }
        if let Some(cities) = self.cities {
            config.cities = cities
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(output) = self.output {
            config.output_format = output.parse()?;
        }
        config.output_path = self.output_path;
        if let Some(delimiter) = self.delimiter {
            config.delimiter = u8::try_from(delimiter)
                .ok()
                .filter(u8::is_ascii)
                .with_context(|| format!("delimiter {delimiter:?} is not a single ASCII byte"))?;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }

        let nav = &mut config.navigation;
        if let Some(url) = self.base_url {
            nav.base_url = url;
        }
        if let Some(secs) = self.page_timeout_secs {
            nav.page_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = self.page_delay_ms {
            nav.page_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = self.jitter_ms {
            nav.jitter = Duration::from_millis(ms);
        }
        if let Some(retries) = self.retries {
            nav.retries = retries;
        }
        if let Some(detail) = self.detail_pages {
            nav.detail_pages = detail;
        }
        if let Some(agent) = self.user_agent {
            nav.user_agent = agent;
        }
        if let Some(driver) = self.driver {
            nav.driver = driver.parse()?;
        }
        Ok(config)
    }
}

// Extension trait.
pub trait LoadFromEnv: DeserializeOwned {
    const PREFIX: &'static str = "SCRAPE_";

    fn load_from_env() -> anyhow::Result<Self> {
        // Don't throw an error if .env file doesn't exist.
        let _ = dotenv::dotenv();
        let config = envy::prefixed(Self::PREFIX)
            .from_env::<Self>()
            .context("failed to load env variables into config struct")?;
        Ok(config)
    }
}

impl<T: DeserializeOwned> LoadFromEnv for T {}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(vars: &[(&str, &str)]) -> ScrapeEnv {
        envy::prefixed("SCRAPE_")
            .from_iter(vars.iter().map(|(k, v)| (k.to_string(), v.to_string())))
            .unwrap()
    }

    #[test]
    fn defaults_cover_every_city() {
        let config = ScrapeConfig::default();
        assert_eq!(config.max_listings_per_city, 5);
        assert_eq!(config.output_format, OutputFormat::Table);
        assert_eq!(config.validate().unwrap().len(), 23);
        assert_eq!(config.output_path(), PathBuf::from(DEFAULT_OUTPUT_FILE));
    }

    #[test]
    fn output_format_accepts_both_vocabularies() {
        assert_eq!("pandas".parse::<OutputFormat>().unwrap(), OutputFormat::Table);
        assert_eq!("CSV".parse::<OutputFormat>().unwrap(), OutputFormat::File);
        assert_eq!("file".parse::<OutputFormat>().unwrap(), OutputFormat::File);
        assert!("xlsx".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut config = ScrapeConfig::for_cities(["provo"]);
        config.max_listings_per_city = 0;
        assert_eq!(config.validate(), Err(ConfigError::NonPositiveMaxListings));

        let mut config = ScrapeConfig::for_cities(["provo"]);
        config.workers = 0;
        assert_eq!(config.validate(), Err(ConfigError::NoWorkers));

        let mut config = ScrapeConfig::for_cities(["provo"]);
        config.navigation.base_url = "not a url".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidBaseUrl { .. })
        ));

        let config = ScrapeConfig::for_cities(["provo", "gotham"]);
        assert_eq!(
            config.validate(),
            Err(ConfigError::UnknownCity("gotham".into()))
        );
    }

    #[test]
    fn env_overrides_defaults() {
        let config = env(&[
            ("SCRAPE_MAX_LISTINGS", "2"),
            ("SCRAPE_CITIES", "provo, lehi,"),
            ("SCRAPE_OUTPUT", "csv"),
            ("SCRAPE_DELIMITER", "\t"),
            ("SCRAPE_PAGE_DELAY_MS", "250"),
            ("SCRAPE_DETAIL_PAGES", "true"),
        ])
        .into_config()
        .unwrap();
        assert_eq!(config.max_listings_per_city, 2);
        assert_eq!(config.cities, vec!["provo", "lehi"]);
        assert_eq!(config.output_format, OutputFormat::File);
        assert_eq!(config.delimiter, b'\t');
        assert_eq!(config.navigation.page_delay, Duration::from_millis(250));
        assert!(config.navigation.detail_pages);
        assert_eq!(config.navigation.retries, 2);
        assert_eq!(config.navigation.driver, DriverKind::Chrome);
    }

    #[test]
    fn driver_is_chosen_by_name() {
        let config = env(&[("SCRAPE_DRIVER", "HTTP")]).into_config().unwrap();
        assert_eq!(config.navigation.driver, DriverKind::Http);
        assert_eq!("chrome".parse::<DriverKind>().unwrap(), DriverKind::Chrome);
        assert_eq!(
            "firefox".parse::<DriverKind>(),
            Err(ConfigError::UnknownDriver("firefox".into()))
        );
    }

    #[test]
    fn env_rejects_unknown_output() {
        assert!(env(&[("SCRAPE_OUTPUT", "parquet")]).into_config().is_err());
    }
}
