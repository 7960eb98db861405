//! Market-price pipeline capabilities.
//!
//! The market pipeline reuses the same three-stage runner as the news
//! pipeline with API-backed implementations: [`ChartExtractor`] pulls daily
//! bars from a Yahoo-style chart endpoint, [`transform::PriceTransformer`]
//! enriches them, and [`store::PriceStore`] persists instruments and prices.

use chrono::DateTime;
use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::browser::USER_AGENT;
use crate::errors::EtlError;
use crate::models::{PriceBar, PriceSeries};
use crate::pipeline::Extract;

pub mod store;
pub mod transform;

const CHART_ENDPOINT: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const RANGE: &str = "6mo";
const INTERVAL: &str = "1d";

/// Extract capability backed by the public chart API.
pub struct ChartExtractor {
    symbol: String,
    client: reqwest::Client,
}

impl ChartExtractor {
    pub fn new(symbol: impl Into<String>) -> Result<Self, EtlError> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            symbol: symbol.into(),
            client,
        })
    }
}

impl Extract for ChartExtractor {
    type Batch = PriceSeries;

    #[instrument(level = "info", skip_all, fields(symbol = %self.symbol))]
    async fn do_extract(&mut self) -> Result<PriceSeries, EtlError> {
        let url = format!(
            "{CHART_ENDPOINT}/{}?range={RANGE}&interval={INTERVAL}",
            self.symbol
        );

        let body = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let payload: ChartResponse = serde_json::from_str(&body)
            .map_err(|err| EtlError::Payload(format!("chart response decode failed: {err}")))?;
        let series = into_series(&self.symbol, payload)?;

        if series.bars.is_empty() {
            warn!("chart API returned no bars");
        } else {
            info!(count = series.bars.len(), "price extraction complete");
        }
        Ok(series)
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<Quote>,
    #[serde(default)]
    adjclose: Vec<AdjClose>,
}

/// Per-field arrays, index-aligned with `timestamp`. The API pads missing
/// sessions with nulls, hence `Option` throughout.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Quote {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<i64>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AdjClose {
    adjclose: Vec<Option<f64>>,
}

fn into_series(symbol: &str, payload: ChartResponse) -> Result<PriceSeries, EtlError> {
    let result = payload
        .chart
        .result
        .and_then(|mut results| (!results.is_empty()).then(|| results.remove(0)))
        .ok_or_else(|| EtlError::Payload("chart response carried no result".to_string()))?;

    let quote = result
        .indicators
        .quote
        .into_iter()
        .next()
        .ok_or_else(|| EtlError::Payload("chart response carried no quote block".to_string()))?;
    let adjclose = result.indicators.adjclose.into_iter().next();

    let mut bars = Vec::with_capacity(result.timestamp.len());
    for (index, unix) in result.timestamp.iter().enumerate() {
        let Some(moment) = DateTime::from_timestamp(*unix, 0) else {
            warn!(unix, "skipping bar with out-of-range timestamp");
            continue;
        };
        bars.push(PriceBar {
            date: moment.date_naive(),
            open: value_at(&quote.open, index),
            high: value_at(&quote.high, index),
            low: value_at(&quote.low, index),
            close: value_at(&quote.close, index),
            adj_close: adjclose
                .as_ref()
                .map(|adj| value_at(&adj.adjclose, index))
                .unwrap_or(None),
            volume: value_at(&quote.volume, index),
        });
    }

    Ok(PriceSeries {
        symbol: symbol.to_string(),
        bars,
    })
}

fn value_at<T: Copy>(values: &[Option<T>], index: usize) -> Option<T> {
    values.get(index).copied().flatten()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_a_chart_payload() {
        let body = r#"{
            "chart": {
                "result": [{
                    "meta": {"symbol": "BTC-USD"},
                    "timestamp": [1730505600, 1730592000],
                    "indicators": {
                        "quote": [{
                            "open": [100.0, 102.5],
                            "high": [105.0, 103.0],
                            "low": [99.0, null],
                            "close": [102.0, null],
                            "volume": [1200, null]
                        }],
                        "adjclose": [{"adjclose": [101.5, null]}]
                    }
                }],
                "error": null
            }
        }"#;

        let payload: ChartResponse = serde_json::from_str(body).unwrap();
        let series = into_series("BTC-USD", payload).unwrap();

        assert_eq!(series.symbol, "BTC-USD");
        assert_eq!(series.bars.len(), 2);
        assert_eq!(series.bars[0].close, Some(102.0));
        assert_eq!(series.bars[0].adj_close, Some(101.5));
        assert_eq!(series.bars[1].close, None);
        assert_eq!(series.bars[1].volume, None);
        assert_eq!(series.bars[0].date.to_string(), "2024-11-02");
    }

    #[test]
    fn missing_result_is_a_payload_error() {
        let body = r#"{"chart": {"result": null, "error": {"code": "Not Found"}}}"#;
        let payload: ChartResponse = serde_json::from_str(body).unwrap();
        let err = into_series("NOPE", payload).unwrap_err();
        assert!(matches!(err, EtlError::Payload(_)));
    }

    #[test]
    fn missing_adjclose_block_is_tolerated() {
        let body = r#"{
            "chart": {
                "result": [{
                    "timestamp": [1730505600],
                    "indicators": {"quote": [{"close": [10.0]}]}
                }]
            }
        }"#;

        let payload: ChartResponse = serde_json::from_str(body).unwrap();
        let series = into_series("X", payload).unwrap();
        assert_eq!(series.bars.len(), 1);
        assert_eq!(series.bars[0].adj_close, None);
        assert_eq!(series.bars[0].open, None);
    }
}
