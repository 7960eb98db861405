//! InfoMoney latest-news crawler.
//!
//! Drives the [InfoMoney](https://www.infomoney.com.br/ultimas-noticias/)
//! listing, which renders a page of cards and grows through a "load more"
//! button. The crawl navigates, paginates via [`ensure_loaded`], snapshots
//! the rendered page, and hands the HTML to [`parse_listing`] — a pure
//! function, so parsing is testable against static fixtures.
//!
//! # Card shape
//!
//! The listing uses Tailwind utility classes as its only stable structure.
//! Cards are `div`s carrying `basis-1/4`, `px-6` and `md:px-0`; inside each
//! card the headline anchor sits under `md:line-clamp-3`, the category under
//! `line-clamp-1`, and the relative publication time under
//! `text-wl-neutral-500`. Field extraction is independently fault-tolerant:
//! a missing sub-element leaves that field `None`.

use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use thirtyfour::prelude::*;
use tracing::{debug, info, instrument};
use url::Url;

use crate::browser::{BrowserConfig, BrowserSession};
use crate::dates;
use crate::errors::EtlError;
use crate::models::{ExtractionBatch, RawNewsItem};
use crate::scrapers::{ensure_loaded, FeedPage, FEED_POLL, FEED_WAIT};

/// Listing page the crawl starts from.
pub const LISTING_URL: &str = "https://www.infomoney.com.br/ultimas-noticias/";
/// Origin used to absolutize root-relative article links.
pub const ORIGIN: &str = "https://www.infomoney.com.br";

const ITEM_CONTAINER_XPATH: &str = "//div[contains(@class, 'basis-1/4') \
    and contains(@class, 'px-6') \
    and contains(@class, 'md:px-0')]";
const LOAD_MORE_XPATH: &str = "//button[contains(@class, 'flex items-center') \
    and contains(@class, 'justify-center') \
    and contains(@class, 'rounded-full')]";

static ITEM_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"div[class~="basis-1/4"][class~="px-6"][class~="md:px-0"]"#)
        .expect("valid item selector")
});
static CATEGORY_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"div[class~="line-clamp-1"] div[class~="text-sm"]"#)
        .expect("valid category selector")
});
static HEADLINE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"div[class~="md:line-clamp-3"] a[class~="hover:underline"]"#)
        .expect("valid headline selector")
});
static POSTED_AT_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"div[class~="text-wl-neutral-500"]"#).expect("valid posted-at selector")
});

static BASE_URL: Lazy<Url> = Lazy::new(|| Url::parse(ORIGIN).expect("valid origin"));

/// Crawl settings for the listing.
#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    pub browser: BrowserConfig,
    /// Minimum number of cards to load before parsing.
    pub min_items: usize,
}

/// The InfoMoney listing as seen through a live WebDriver session.
pub struct InfoMoneyFeed<'a> {
    driver: &'a WebDriver,
}

impl FeedPage for InfoMoneyFeed<'_> {
    async fn item_count(&mut self) -> Result<usize, EtlError> {
        Ok(self
            .driver
            .find_all(By::XPath(ITEM_CONTAINER_XPATH))
            .await?
            .len())
    }

    async fn trigger_load_more(&mut self, wait: Duration) -> Result<bool, EtlError> {
        let button = match self
            .driver
            .query(By::XPath(LOAD_MORE_XPATH))
            .wait(wait, FEED_POLL)
            .and_clickable()
            .first()
            .await
        {
            Ok(button) => button,
            Err(_) => return Ok(false),
        };

        // Overlays sometimes swallow the direct click; a scripted click
        // bypasses hit-testing.
        if let Err(err) = button.click().await {
            debug!(error = %err, "direct click failed; forcing scripted click");
            self.driver
                .execute("arguments[0].click();", vec![button.to_json()?])
                .await?;
        }

        // Nudge lazy rendering below the fold.
        let _ = self
            .driver
            .execute("window.scrollBy(0, 1000);", Vec::new())
            .await;

        Ok(true)
    }
}

/// Crawls the listing into an [`ExtractionBatch`].
pub struct InfoMoneyCrawler {
    config: CrawlerConfig,
}

impl InfoMoneyCrawler {
    pub fn new(config: CrawlerConfig) -> Self {
        Self { config }
    }

    /// Run one crawl: establish a session, paginate, snapshot, parse.
    ///
    /// The session is released on every exit path; only establishment
    /// failure is fatal, everything past it degrades to partial results.
    #[instrument(level = "info", skip_all)]
    pub async fn crawl(&self) -> Result<ExtractionBatch, EtlError> {
        let session = BrowserSession::connect(&self.config.browser).await?;
        let outcome = self.crawl_listing(&session).await;
        session.quit().await;
        outcome
    }

    async fn crawl_listing(&self, session: &BrowserSession) -> Result<ExtractionBatch, EtlError> {
        let extracted_at = Local::now().naive_local();

        session.goto(LISTING_URL).await?;
        let mut feed = InfoMoneyFeed {
            driver: session.driver(),
        };
        ensure_loaded(&mut feed, self.config.min_items, FEED_WAIT, FEED_POLL).await?;

        let html = session.page_source().await?;
        let items = parse_listing(&html, Local::now().naive_local());
        info!(count = items.len(), "parsed listing cards");

        Ok(ExtractionBatch {
            extracted_at,
            items,
        })
    }
}

/// Parse a rendered listing snapshot into raw news items.
///
/// Pure and deterministic given `now` (the anchor for relative publication
/// times). Cards missing a headline or link are dropped here; everything
/// else is left for the validator.
pub fn parse_listing(html: &str, now: NaiveDateTime) -> Vec<RawNewsItem> {
    let document = Html::parse_document(html);
    let mut items = Vec::new();

    for container in document.select(&ITEM_SELECTOR) {
        let item = RawNewsItem {
            category: select_text(container, &CATEGORY_SELECTOR),
            title: select_text(container, &HEADLINE_SELECTOR),
            url: extract_url(container),
            posted_at: extract_posted_at(container, now),
        };

        let has_core_fields = matches!(
            (item.title.as_deref(), item.url.as_deref()),
            (Some(title), Some(url)) if !title.is_empty() && !url.is_empty()
        );
        if has_core_fields {
            items.push(item);
        } else {
            debug!("listing card missing headline or link; skipped");
        }
    }

    items
}

fn select_text(container: ElementRef<'_>, selector: &Selector) -> Option<String> {
    container
        .select(selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|text| !text.is_empty())
}

fn extract_url(container: ElementRef<'_>) -> Option<String> {
    let href = container
        .select(&HEADLINE_SELECTOR)
        .next()
        .and_then(|anchor| anchor.value().attr("href"))?;

    if href.starts_with('/') {
        BASE_URL.join(href).ok().map(|url| url.to_string())
    } else {
        Some(href.to_string())
    }
}

fn extract_posted_at(container: ElementRef<'_>, now: NaiveDateTime) -> Option<String> {
    select_text(container, &POSTED_AT_SELECTOR).map(|text| dates::resolve(&text, now))
}
