//! # Mercado ETL
//!
//! Ingests Brazilian financial news and market-price data into a DuckDB
//! analytical store through a uniform Extract→Transform→Load pipeline.
//!
//! ## Pipelines
//!
//! - **News**: drives a browser session against the InfoMoney latest-news
//!   listing, paginating via its "load more" control, then parses, validates,
//!   and appends the records to the `news` table.
//! - **Market**: pulls six months of daily bars for one instrument from a
//!   public chart API, derives percent change and moving averages, and
//!   appends them to the `prices` table.
//!
//! Both pipelines share the generic three-stage runner in [`pipeline`]; they
//! differ only in their capability implementations.
//!
//! ## Usage
//!
//! ```sh
//! mercado_etl                # run every pipeline
//! mercado_etl --news         # news crawl only
//! mercado_etl --market       # market prices only
//! ```

use clap::Parser;
use std::error::Error;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod browser;
mod cli;
mod dates;
mod errors;
mod market;
mod models;
mod news;
mod pipeline;
mod scrapers;

use browser::BrowserConfig;
use cli::Cli;
use market::store::PriceStore;
use market::transform::PriceTransformer;
use market::ChartExtractor;
use news::store::NewsStore;
use news::{NewsExtractor, NewsTransformer};
use pipeline::Pipeline;
use scrapers::infomoney::CrawlerConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("mercado_etl starting up");

    let args = Cli::parse();
    let run_all = !args.news && !args.market;

    if args.news || run_all {
        run_news_pipeline(&args).await?;
    }
    if args.market || run_all {
        run_market_pipeline(&args).await?;
    }

    let elapsed = start_time.elapsed();
    info!(
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "execution complete"
    );
    Ok(())
}

/// Crawl the news listing and append the validated records to the store.
///
/// A `false` load result is reported and tolerated; only stage errors
/// (session establishment above all) abort the process.
async fn run_news_pipeline(args: &Cli) -> Result<(), Box<dyn Error>> {
    let crawler_config = CrawlerConfig {
        browser: BrowserConfig {
            webdriver_url: args.webdriver_url.clone(),
            headless: args.headless,
        },
        min_items: args.min_items,
    };
    let store = NewsStore::new(&args.db_path);

    let mut pipeline = Pipeline::new(
        "news",
        NewsExtractor::new(crawler_config),
        NewsTransformer,
        store,
    );
    let loaded = pipeline.run().await?;
    if !loaded {
        warn!("news pipeline finished but the load stage reported failure");
    }

    let store = NewsStore::new(&args.db_path);
    match store.total_records() {
        Ok(total) => info!(total, "news rows in store"),
        Err(err) => warn!(error = %err, "could not read back news row count"),
    }
    if let Ok(rows) = store.recent_news(5) {
        for row in rows {
            debug!(
                id = row.id,
                category = row.category.as_deref().unwrap_or("-"),
                title = %row.title,
                "recent row"
            );
        }
    }
    Ok(())
}

/// Fetch daily bars for the configured symbol and append them to the store.
async fn run_market_pipeline(args: &Cli) -> Result<(), Box<dyn Error>> {
    let mut pipeline = Pipeline::new(
        "market",
        ChartExtractor::new(args.symbol.as_str())?,
        PriceTransformer,
        PriceStore::new(&args.db_path),
    );
    let loaded = pipeline.run().await?;
    if !loaded {
        warn!("market pipeline finished but the load stage reported failure");
    }

    let store = PriceStore::new(&args.db_path);
    match store.total_prices() {
        Ok(total) => info!(total, "price rows in store"),
        Err(err) => warn!(error = %err, "could not read back price row count"),
    }
    Ok(())
}
