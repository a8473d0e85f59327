#![allow(dead_code)]

use std::time::Duration;

use utah_listings::ScrapeConfig;

pub const BASE: &str = "https://fixture.test/";

pub fn search_url(slug: &str) -> String {
    format!("{BASE}{slug}-homes")
}

/// A test config: no pacing, short timeouts, no retries.
pub fn config(cities: &[&str], max_listings: usize) -> ScrapeConfig {
    let mut config = ScrapeConfig::for_cities(cities.iter().copied());
    config.max_listings_per_city = max_listings;
    config.navigation.base_url = BASE.to_string();
    config.navigation.page_delay = Duration::ZERO;
    config.navigation.jitter = Duration::ZERO;
    config.navigation.page_timeout = Duration::from_millis(200);
    config.navigation.retries = 0;
    config
}

pub fn card(mls: &str, price: &str, address: &str) -> String {
    format!(
        r#"<div class="property___card" listno="{mls}">
             <div class="property___price">{price}</div>
             <div class="property___address">{address}</div>
             <ul><li>3 bd</li><li>2 ba</li><li>1,800 sq ft</li></ul>
             <div class="agent-name">Pat Agent</div>
           </div>"#
    )
}

pub fn ad_tile() -> String {
    r#"<div class="property___card sponsored"><img src="banner.png"><p>Get pre-approved!</p></div>"#
        .to_string()
}

pub fn results_page(cards: &[String], next: Option<&str>) -> String {
    let next = next
        .map(|href| format!(r#"<a class="next" href="{href}">Next</a>"#))
        .unwrap_or_default();
    format!(
        "<html><body><div id=\"results\">{}</div><nav>{next}</nav></body></html>",
        cards.join("\n")
    )
}

pub fn cards(prefix: &str, n: usize) -> Vec<String> {
    (1..=n)
        .map(|i| card(&format!("{prefix}{i}"), &format!("${i}00,000"), &format!("{i} Main St")))
        .collect()
}
