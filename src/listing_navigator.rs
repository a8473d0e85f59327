use std::collections::{HashSet, VecDeque};
use std::future::Future;
use std::time::Duration;

use futures::stream::{self, Stream};
use log::{debug, info, warn};
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};

use crate::{
    browser::BrowserSession,
    cities::CityTarget,
    error::{CityFailure, DriverError, Error, NavigationFailure, Result},
    listing_extractor::{DetailPage, ListingFragment},
    scraping_context::ScrapingContext,
    text_manipulators::is_followable_href,
};

/// One search-results card.
pub const CARD_SELECTOR: &str = ".property___card";
const NEXT_LINK_SELECTOR: &str = "a";
/// Headroom over the session's own selector wait, so a session that honours
/// its timeout reports a miss before the outer bound turns it into a timeout.
const SELECTOR_WAIT_GRACE: Duration = Duration::from_secs(1);

/// Selectors the navigator needs for every results page, compiled once per run.
pub struct PageSelectors {
    card: Selector,
    anchor: Selector,
}

impl PageSelectors {
    pub fn new() -> Result<Self> {
        let parse = |s: &str| Selector::parse(s).map_err(|_| Error::Selector(s.into()));
        Ok(Self {
            card: parse(CARD_SELECTOR)?,
            anchor: parse(NEXT_LINK_SELECTOR)?,
        })
    }
}

#[derive(Clone, Copy)]
pub struct ListingNavigator<'a> {
    ctx: &'a ScrapingContext,
}

impl<'a> ListingNavigator<'a> {
    pub fn new(ctx: &'a ScrapingContext) -> Self {
        Self { ctx }
    }

    pub fn search_url(&self, city: &CityTarget) -> std::result::Result<Url, CityFailure> {
        self.ctx
            .base_url
            .join(&city.search_path())
            .map_err(|e| CityFailure::InvalidUrl {
                city: city.slug.to_string(),
                reason: e.to_string(),
            })
    }

    /// Opens a fresh browser session and walks the city's results pages,
    /// yielding their fragments in page order.
    ///
    /// No further page is loaded once `max_listings` fragments have been
    /// yielded, but the rest of an already loaded page stays available, so a
    /// consumer that skips ad tiles can still fill its quota from it.
    ///
    /// The first navigation failure is yielded as the last item; whatever came
    /// before it stands. The session is torn down when the stream is dropped.
    pub async fn paginate(
        self,
        city: CityTarget,
        max_listings: usize,
    ) -> std::result::Result<
        impl Stream<Item = std::result::Result<ListingFragment, NavigationFailure>> + 'a,
        CityFailure,
    > {
        let start = self.search_url(&city)?;
        let session = self
            .ctx
            .driver
            .open_session()
            .await
            .map_err(CityFailure::Session)?;

        let cursor = Cursor {
            ctx: self.ctx,
            session,
            city,
            next_url: Some(start),
            visited: HashSet::new(),
            page: 0,
            pending: VecDeque::new(),
            yielded: 0,
            limit: max_listings,
            halted: false,
        };

        Ok(stream::unfold(cursor, |mut cursor| async move {
            let item = cursor.next_fragment().await?;
            Some((item, cursor))
        }))
    }
}

struct CardStub {
    html: String,
    listing_id: Option<String>,
}

struct ResultsPage {
    cards: Vec<CardStub>,
    next: Option<Url>,
}

struct Cursor<'a> {
    ctx: &'a ScrapingContext,
    session: Box<dyn BrowserSession>,
    city: CityTarget,
    next_url: Option<Url>,
    visited: HashSet<Url>,
    page: usize,
    pending: VecDeque<CardStub>,
    yielded: usize,
    limit: usize,
    halted: bool,
}

impl Cursor<'_> {
    async fn next_fragment(
        &mut self,
    ) -> Option<std::result::Result<ListingFragment, NavigationFailure>> {
        loop {
            if self.halted {
                return None;
            }

            if let Some(card) = self.pending.pop_front() {
                self.yielded += 1;
                let detail = self.load_detail(card.listing_id.as_deref()).await;
                return Some(Ok(ListingFragment {
                    html: card.html,
                    page: self.page,
                    listing_id: card.listing_id,
                    detail,
                }));
            }

            if self.yielded >= self.limit {
                return None;
            }
            let url = self.next_url.take()?;
            if !self.visited.insert(url.clone()) {
                info!("{}: next page {url} was already visited, stopping", self.city.slug);
                return None;
            }

            match self.load_results_page(&url).await {
                Ok(page) => {
                    self.page += 1;
                    info!(
                        "{}: page {} loaded ({} listings)",
                        self.city.slug,
                        self.page,
                        page.cards.len()
                    );
                    self.pending.extend(page.cards);
                    self.next_url = page.next;
                }
                Err(failure) => {
                    warn!("{}: pagination stopped early: {failure}", self.city.slug);
                    self.halted = true;
                    return Some(Err(failure));
                }
            }
        }
    }

    async fn load_results_page(
        &mut self,
        url: &Url,
    ) -> std::result::Result<ResultsPage, NavigationFailure> {
        let timeout = self.ctx.navigation.page_timeout;
        self.load(url).await?;

        let found = bounded(
            url,
            timeout + SELECTOR_WAIT_GRACE,
            self.session.wait_for_selector(CARD_SELECTOR, timeout),
        )
        .await?;
        if !found {
            return Err(NavigationFailure::MissingResults {
                url: url.to_string(),
            });
        }

        let html = bounded(url, timeout, self.session.content()).await?;
        Ok(parse_results(&self.ctx.page_selectors, &html, url))
    }

    async fn load_detail(&mut self, listing_id: Option<&str>) -> DetailPage {
        if !self.ctx.navigation.detail_pages {
            return DetailPage::NotRequested;
        }
        let Some(id) = listing_id else {
            return DetailPage::NotRequested;
        };
        let url = match self.ctx.base_url.join(&format!("listing/{id}")) {
            Ok(url) => url,
            Err(e) => {
                return DetailPage::Failed(NavigationFailure::Driver {
                    url: id.to_string(),
                    source: DriverError::Other(e.to_string()),
                });
            }
        };

        let timeout = self.ctx.navigation.page_timeout;
        let loaded = match self.load(&url).await {
            Ok(()) => bounded(&url, timeout, self.session.content()).await,
            Err(failure) => Err(failure),
        };
        match loaded {
            Ok(html) => DetailPage::Loaded(html),
            Err(failure) => {
                warn!("{}: listing {id} detail page skipped: {failure}", self.city.slug);
                DetailPage::Failed(failure)
            }
        }
    }

    /// Paced, bounded page load with linear backoff between attempts.
    async fn load(&mut self, url: &Url) -> std::result::Result<(), NavigationFailure> {
        let ctx = self.ctx;
        let nav = &ctx.navigation;
        let mut attempt = 0;
        loop {
            ctx.pacer.pause().await;
            debug!("{}: loading {url} (attempt {})", self.city.slug, attempt + 1);
            match bounded(url, nav.page_timeout, self.session.goto(url.as_str())).await {
                Ok(()) => return Ok(()),
                Err(failure) if attempt < nav.retries => {
                    attempt += 1;
                    warn!("{}: {failure}, retrying ({attempt}/{})", self.city.slug, nav.retries);
                    tokio::time::sleep(nav.page_delay * attempt).await;
                }
                Err(failure) => return Err(failure),
            }
        }
    }
}

async fn bounded<T>(
    url: &Url,
    timeout: Duration,
    fut: impl Future<Output = std::result::Result<T, DriverError>>,
) -> std::result::Result<T, NavigationFailure> {
    match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(source)) => Err(NavigationFailure::Driver {
            url: url.to_string(),
            source,
        }),
        Err(_) => Err(NavigationFailure::Timeout {
            url: url.to_string(),
            after: timeout,
        }),
    }
}

fn parse_results(selectors: &PageSelectors, html: &str, page_url: &Url) -> ResultsPage {
    let doc = Html::parse_document(html);
    let cards = doc
        .select(&selectors.card)
        .map(|card| CardStub {
            html: card.html(),
            listing_id: card
                .value()
                .attr("listno")
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string),
        })
        .collect();

    let next = doc
        .select(&selectors.anchor)
        .filter(is_next_link)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| is_followable_href(href))
        .find_map(|href| page_url.join(href.trim()).ok());
    if let Some(next) = &next {
        debug!("next page link: {next}");
    }

    ResultsPage { cards, next }
}

fn is_next_link(anchor: &ElementRef) -> bool {
    let el = anchor.value();
    if el.classes().any(|c| c == "next") || el.attr("rel") == Some("next") {
        return true;
    }
    let text = anchor.text().collect::<String>();
    matches!(text.trim(), "Next" | "»" | "Next »" | "Next ›")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_url() -> Url {
        Url::parse("https://fixture.test/provo-homes").unwrap()
    }

    #[test]
    fn results_keep_dom_order_and_listing_ids() {
        let html = r#"<html><body>
            <div class="property___card" listno="1">a</div>
            <div class="property___card" listno=" ">b</div>
            <div class="property___card" listno="3">c</div>
        </body></html>"#;
        let page = parse_results(&PageSelectors::new().unwrap(), html, &page_url());
        let ids: Vec<_> = page.cards.iter().map(|c| c.listing_id.clone()).collect();
        assert_eq!(ids, vec![Some("1".into()), None, Some("3".into())]);
        assert!(page.cards[1].html.contains(">b<"));
        assert!(page.next.is_none());
    }

    #[test]
    fn next_link_is_resolved_against_the_page() {
        let html = r#"<html><body>
            <a href="/about">About</a>
            <a href="javascript:void(0)" class="next">Next</a>
            <a href="/provo-homes/page-2">Next</a>
        </body></html>"#;
        let page = parse_results(&PageSelectors::new().unwrap(), html, &page_url());
        assert_eq!(
            page.next.unwrap().as_str(),
            "https://fixture.test/provo-homes/page-2"
        );
    }

    #[test]
    fn rel_next_and_guillemet_links_count() {
        let selectors = PageSelectors::new().unwrap();
        let rel = r#"<a rel="next" href="p2">more</a>"#;
        let guillemet = r#"<a href="p3"> » </a>"#;
        assert!(parse_results(&selectors, rel, &page_url()).next.is_some());
        assert!(parse_results(&selectors, guillemet, &page_url()).next.is_some());
    }
}
