//! Data models for news batches, price series, and persisted rows.
//!
//! This module defines the data structures passed between pipeline stages:
//! - [`RawNewsItem`]: one listing card as parsed from the rendered page
//! - [`ExtractionBatch`] / [`TransformedBatch`]: the news stage payloads
//! - [`NewsRow`]: a persisted news record as read back from the store
//! - [`PriceBar`] / [`PriceSeries`] / [`PriceRow`] / [`PriceTable`]: the
//!   market-data stage payloads
//!
//! Batches are plain owned values; each stage consumes its input and produces
//! a fresh value, so nothing here is mutated across stage boundaries.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Number of records a stage payload carries, used by the pipeline runner
/// for its per-stage count logs.
pub trait RecordCount {
    fn record_count(&self) -> usize;
}

/// A single news listing card as extracted from the rendered page.
///
/// Every field is optional: the parser extracts each one independently and a
/// missing sub-element yields `None` rather than dropping the whole card.
/// The validator decides which cards survive into the transformed batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawNewsItem {
    /// Editorial category shown on the card (e.g. "Mercados").
    pub category: Option<String>,
    /// Headline text.
    pub title: Option<String>,
    /// Absolute article URL.
    pub url: Option<String>,
    /// Publication time: either `%Y-%m-%d %H:%M:%S` when the relative phrase
    /// resolved, or the original text when it did not.
    pub posted_at: Option<String>,
}

/// The output of the extract stage: the parsed cards plus when the page
/// snapshot was taken. Immutable once produced.
#[derive(Debug, Clone)]
pub struct ExtractionBatch {
    pub extracted_at: NaiveDateTime,
    pub items: Vec<RawNewsItem>,
}

impl RecordCount for ExtractionBatch {
    fn record_count(&self) -> usize {
        self.items.len()
    }
}

/// Provenance counters carried alongside a transformed batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchMetadata {
    pub total_original: usize,
    pub total_valid: usize,
    pub total_filtered: usize,
    pub extracted_at: NaiveDateTime,
    pub transformed_at: NaiveDateTime,
}

/// The output of the transform stage: the surviving records, in their
/// original order, plus the filter counters.
#[derive(Debug, Clone)]
pub struct TransformedBatch {
    pub items: Vec<RawNewsItem>,
    pub metadata: BatchMetadata,
}

impl RecordCount for TransformedBatch {
    fn record_count(&self) -> usize {
        self.items.len()
    }
}

/// A persisted news record, as returned by the store's query surface.
#[derive(Debug, Clone)]
pub struct NewsRow {
    /// Sequence-generated surrogate key.
    pub id: i64,
    pub imported_at: NaiveDateTime,
    pub category: Option<String>,
    pub title: String,
    pub url: String,
    /// NULL when the publication time never resolved to a timestamp.
    pub news_timestamp: Option<NaiveDateTime>,
}

/// One raw daily bar from the chart API. All value fields are optional
/// because the API pads missing sessions with nulls.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub adj_close: Option<f64>,
    pub volume: Option<i64>,
}

/// The market extract stage payload: raw bars for one instrument.
#[derive(Debug, Clone)]
pub struct PriceSeries {
    pub symbol: String,
    pub bars: Vec<PriceBar>,
}

impl RecordCount for PriceSeries {
    fn record_count(&self) -> usize {
        self.bars.len()
    }
}

/// One enriched daily bar, ready for persistence. `close` is guaranteed
/// present; the moving averages stay `None` until their window fills.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceRow {
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: f64,
    pub adj_close: Option<f64>,
    pub volume: Option<i64>,
    pub pct_change: f64,
    pub ma_7d: Option<f64>,
    pub ma_30d: Option<f64>,
}

/// The market transform stage payload.
#[derive(Debug, Clone)]
pub struct PriceTable {
    pub symbol: String,
    pub rows: Vec<PriceRow>,
}

impl RecordCount for PriceTable {
    fn record_count(&self) -> usize {
        self.rows.len()
    }
}
