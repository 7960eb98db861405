//! Command-line interface definitions.
//!
//! Two independent boolean flags select which pipeline(s) to run; passing
//! neither runs them all. Connection settings can come from flags or from
//! the environment.

use clap::Parser;

/// Command-line arguments for the ETL runner.
///
/// # Examples
///
/// ```sh
/// # Run everything against the default store
/// mercado_etl
///
/// # Only the news crawl, headless, against a custom store
/// mercado_etl --news --headless --db-path /var/lib/etl/etl.duckdb
///
/// # Only the market pipeline for another instrument
/// mercado_etl --market --symbol ETH-USD
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Run only the news crawling pipeline
    #[arg(long)]
    pub news: bool,

    /// Run only the market price pipeline
    #[arg(long)]
    pub market: bool,

    /// DuckDB database file shared by both pipelines
    #[arg(long, env = "DB_PATH", default_value = "data/etl.duckdb")]
    pub db_path: String,

    /// WebDriver endpoint used to drive the news site
    #[arg(long, env = "WEBDRIVER_URL", default_value = "http://localhost:9515")]
    pub webdriver_url: String,

    /// Run the browser without a visible window
    #[arg(long)]
    pub headless: bool,

    /// Minimum number of listing cards to load before parsing
    #[arg(long, default_value_t = 100)]
    pub min_items: usize,

    /// Instrument symbol for the market pipeline
    #[arg(long, env = "MARKET_SYMBOL", default_value = "BTC-USD")]
    pub symbol: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_flags_selects_nothing_explicitly() {
        let cli = Cli::parse_from(["mercado_etl"]);
        assert!(!cli.news);
        assert!(!cli.market);
        assert_eq!(cli.db_path, "data/etl.duckdb");
        assert_eq!(cli.webdriver_url, "http://localhost:9515");
        assert_eq!(cli.min_items, 100);
        assert_eq!(cli.symbol, "BTC-USD");
    }

    #[test]
    fn pipeline_flags_are_independent() {
        let cli = Cli::parse_from(["mercado_etl", "--news"]);
        assert!(cli.news);
        assert!(!cli.market);

        let cli = Cli::parse_from(["mercado_etl", "--news", "--market"]);
        assert!(cli.news);
        assert!(cli.market);
    }

    #[test]
    fn options_override_defaults() {
        let cli = Cli::parse_from([
            "mercado_etl",
            "--market",
            "--symbol",
            "ETH-USD",
            "--db-path",
            "/tmp/etl.duckdb",
            "--min-items",
            "40",
        ]);
        assert_eq!(cli.symbol, "ETH-USD");
        assert_eq!(cli.db_path, "/tmp/etl.duckdb");
        assert_eq!(cli.min_items, 40);
    }
}
