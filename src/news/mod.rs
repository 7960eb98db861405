//! News pipeline capabilities: extraction and validation.
//!
//! [`NewsExtractor`] wraps the InfoMoney crawler behind the [`Extract`]
//! capability; [`NewsTransformer`] is the strict validator that turns an
//! [`ExtractionBatch`] into a [`TransformedBatch`]. Persistence lives in
//! [`store`].

use chrono::Local;
use tracing::{debug, error, info, instrument, warn};

use crate::errors::EtlError;
use crate::models::{BatchMetadata, ExtractionBatch, RawNewsItem, TransformedBatch};
use crate::pipeline::{Extract, Transform};
use crate::scrapers::infomoney::{CrawlerConfig, InfoMoneyCrawler};

pub mod store;

/// Extract capability backed by the InfoMoney crawler.
pub struct NewsExtractor {
    crawler: InfoMoneyCrawler,
}

impl NewsExtractor {
    pub fn new(config: CrawlerConfig) -> Self {
        Self {
            crawler: InfoMoneyCrawler::new(config),
        }
    }
}

impl Extract for NewsExtractor {
    type Batch = ExtractionBatch;

    #[instrument(level = "info", skip_all)]
    async fn do_extract(&mut self) -> Result<ExtractionBatch, EtlError> {
        let batch = match self.crawler.crawl().await {
            Ok(batch) => batch,
            Err(err) => {
                error!(error = %err, "news extraction failed");
                return Err(err);
            }
        };

        if batch.items.is_empty() {
            warn!("crawler returned no listing cards");
        } else {
            info!(count = batch.items.len(), "news extraction complete");
        }
        Ok(batch)
    }
}

/// Fields a record must populate to survive validation.
///
/// Category is treated as mandatory here even though the store column is
/// nullable and the parser only pre-filters on headline and link.
/// TODO: decide whether uncategorized cards should survive validation; today
/// they are filtered, which silently drops cards from sections without a
/// category chip.
const REQUIRED_FIELDS: [&str; 4] = ["category", "title", "url", "posted_at"];

/// Strict validator over an extraction batch.
///
/// A record passes only when every required field is present and non-blank
/// after trimming. The filter preserves order, synthesizes nothing, and
/// never raises for individual invalid records.
pub struct NewsTransformer;

impl NewsTransformer {
    fn is_valid(item: &RawNewsItem) -> bool {
        Self::missing_fields(item).is_empty()
    }

    fn missing_fields(item: &RawNewsItem) -> Vec<&'static str> {
        let values = [&item.category, &item.title, &item.url, &item.posted_at];
        REQUIRED_FIELDS
            .iter()
            .zip(values)
            .filter(|(_, value)| {
                value
                    .as_deref()
                    .map(str::trim)
                    .is_none_or(|trimmed| trimmed.is_empty())
            })
            .map(|(name, _)| *name)
            .collect()
    }
}

impl Transform for NewsTransformer {
    type Input = ExtractionBatch;
    type Output = TransformedBatch;

    fn do_transform(&self, batch: ExtractionBatch) -> Result<TransformedBatch, EtlError> {
        let total_original = batch.items.len();
        info!(count = total_original, "validating extracted records");

        let mut valid = Vec::with_capacity(total_original);
        let mut filtered = 0usize;

        for (index, item) in batch.items.into_iter().enumerate() {
            if Self::is_valid(&item) {
                valid.push(item);
            } else {
                filtered += 1;
                debug!(
                    index,
                    missing = ?Self::missing_fields(&item),
                    "record filtered: required fields missing"
                );
            }
        }

        let metadata = BatchMetadata {
            total_original,
            total_valid: valid.len(),
            total_filtered: filtered,
            extracted_at: batch.extracted_at,
            transformed_at: Local::now().naive_local(),
        };
        info!(
            valid = metadata.total_valid,
            filtered = metadata.total_filtered,
            "validation complete"
        );

        Ok(TransformedBatch {
            items: valid,
            metadata,
        })
    }
}
