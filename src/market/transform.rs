//! Price-series enrichment.
//!
//! Mirrors the shape of the news validator on the market side: a pure
//! transform that drops unusable bars and derives the columns the store
//! persists — percent change against the previous close and 7/30-bar moving
//! averages, plus a keep-last dedup by session date.

use itertools::Itertools;
use tracing::info;

use crate::errors::EtlError;
use crate::models::{PriceRow, PriceSeries, PriceTable};
use crate::pipeline::Transform;

const SHORT_WINDOW: usize = 7;
const LONG_WINDOW: usize = 30;

pub struct PriceTransformer;

impl Transform for PriceTransformer {
    type Input = PriceSeries;
    type Output = PriceTable;

    fn do_transform(&self, series: PriceSeries) -> Result<PriceTable, EtlError> {
        let total = series.bars.len();

        let bars: Vec<_> = series
            .bars
            .into_iter()
            .filter(|bar| bar.close.is_some())
            .collect();
        let closes: Vec<f64> = bars.iter().filter_map(|bar| bar.close).collect();

        let rows: Vec<PriceRow> = bars
            .into_iter()
            .enumerate()
            .map(|(index, bar)| PriceRow {
                date: bar.date,
                open: bar.open,
                high: bar.high,
                low: bar.low,
                close: closes[index],
                adj_close: bar.adj_close,
                volume: bar.volume,
                pct_change: pct_change(&closes, index),
                ma_7d: window_mean(&closes, index, SHORT_WINDOW),
                ma_30d: window_mean(&closes, index, LONG_WINDOW),
            })
            .collect();

        // Keep the last occurrence of each session date.
        let deduped: Vec<PriceRow> = rows
            .into_iter()
            .rev()
            .unique_by(|row| row.date)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();

        info!(
            total,
            usable = deduped.len(),
            "price series transformed"
        );

        Ok(PriceTable {
            symbol: series.symbol,
            rows: deduped,
        })
    }
}

/// Fractional change vs the previous close; the first bar reports 0.0.
fn pct_change(closes: &[f64], index: usize) -> f64 {
    if index == 0 {
        return 0.0;
    }
    let previous = closes[index - 1];
    if previous == 0.0 {
        return 0.0;
    }
    (closes[index] - previous) / previous
}

/// Mean of the `window` closes ending at `index`, rounded to two decimals;
/// `None` until the window has filled.
fn window_mean(closes: &[f64], index: usize, window: usize) -> Option<f64> {
    if index + 1 < window {
        return None;
    }
    let slice = &closes[index + 1 - window..=index];
    let mean = slice.iter().sum::<f64>() / window as f64;
    Some((mean * 100.0).round() / 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PriceBar;
    use chrono::NaiveDate;

    fn bar(date: &str, close: Option<f64>) -> PriceBar {
        PriceBar {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            open: close,
            high: close,
            low: close,
            close,
            adj_close: close,
            volume: Some(100),
        }
    }

    fn series(bars: Vec<PriceBar>) -> PriceSeries {
        PriceSeries {
            symbol: "BTC-USD".to_string(),
            bars,
        }
    }

    #[test]
    fn bars_without_close_are_dropped() {
        let table = PriceTransformer
            .do_transform(series(vec![
                bar("2025-10-01", Some(10.0)),
                bar("2025-10-02", None),
                bar("2025-10-03", Some(11.0)),
            ]))
            .unwrap();

        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1].close, 11.0);
    }

    #[test]
    fn pct_change_is_relative_to_previous_close() {
        let table = PriceTransformer
            .do_transform(series(vec![
                bar("2025-10-01", Some(100.0)),
                bar("2025-10-02", Some(110.0)),
                bar("2025-10-03", Some(99.0)),
            ]))
            .unwrap();

        assert_eq!(table.rows[0].pct_change, 0.0);
        assert!((table.rows[1].pct_change - 0.10).abs() < 1e-9);
        assert!((table.rows[2].pct_change - (-0.10)).abs() < 1e-9);
    }

    #[test]
    fn moving_average_waits_for_its_window() {
        let bars: Vec<PriceBar> = (1..=8)
            .map(|day| bar(&format!("2025-10-{day:02}"), Some(day as f64)))
            .collect();

        let table = PriceTransformer.do_transform(series(bars)).unwrap();

        assert_eq!(table.rows[5].ma_7d, None);
        // Mean of 1..=7 is 4.0; of 2..=8 is 5.0.
        assert_eq!(table.rows[6].ma_7d, Some(4.0));
        assert_eq!(table.rows[7].ma_7d, Some(5.0));
        assert!(table.rows.iter().all(|row| row.ma_30d.is_none()));
    }

    #[test]
    fn duplicate_dates_keep_the_last_bar() {
        let table = PriceTransformer
            .do_transform(series(vec![
                bar("2025-10-01", Some(10.0)),
                bar("2025-10-02", Some(20.0)),
                bar("2025-10-02", Some(21.0)),
            ]))
            .unwrap();

        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1].close, 21.0);
    }

    #[test]
    fn empty_series_transforms_to_empty_table() {
        let table = PriceTransformer.do_transform(series(vec![])).unwrap();
        assert!(table.rows.is_empty());
    }
}
