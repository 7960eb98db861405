//! Append-only DuckDB persistence for news records.
//!
//! The store owns the `news` table and its `news_id_seq` sequence. Schema
//! setup is idempotent DDL, safe to run before every operation. Rows are
//! never updated or deleted here; each load appends the whole batch in one
//! multi-row INSERT. Every operation opens its own connection and lets it
//! close on drop — the file is single-writer, single-process.
//!
//! # Failure reporting
//!
//! [`NewsStore::do_load`] reports persistence failure as `false` after
//! logging, never by raising; the read-only query surface returns `Result`
//! like everything else. Callers of the load path must check the boolean.

use std::path::PathBuf;

use chrono::Local;
use duckdb::{params, params_from_iter, Connection};
use tracing::{error, info, instrument};

use crate::dates::TIMESTAMP_FORMAT;
use crate::errors::EtlError;
use crate::models::{NewsRow, RawNewsItem, TransformedBatch};
use crate::pipeline::Load;

const SELECT_COLUMNS: &str = "id, imported_at, category, title, url, news_timestamp";

/// DuckDB-backed news store, addressed by database file path.
pub struct NewsStore {
    db_path: PathBuf,
}

impl NewsStore {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    fn open(&self) -> Result<Connection, EtlError> {
        if let Some(parent) = self.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(&self.db_path)?;
        Self::ensure_schema(&conn)?;
        Ok(conn)
    }

    /// Create the sequence and table if absent. Safe to call repeatedly.
    pub fn ensure_schema(conn: &Connection) -> Result<(), EtlError> {
        conn.execute_batch(
            "CREATE SEQUENCE IF NOT EXISTS news_id_seq START 1;
             CREATE TABLE IF NOT EXISTS news (
                 id INTEGER DEFAULT nextval('news_id_seq') PRIMARY KEY,
                 imported_at TIMESTAMP,
                 category VARCHAR,
                 title VARCHAR,
                 url VARCHAR,
                 news_timestamp TIMESTAMP
             );",
        )?;
        Ok(())
    }

    fn write_batch(&self, batch: &TransformedBatch) -> Result<usize, EtlError> {
        let conn = self.open()?;
        let imported_at = Local::now().naive_local().format(TIMESTAMP_FORMAT).to_string();
        Self::insert_items(&conn, &imported_at, &batch.items)
    }

    /// Append all items in one statement. Unresolved publication times go
    /// through `TRY_CAST`, landing as NULL instead of failing the batch.
    fn insert_items(
        conn: &Connection,
        imported_at: &str,
        items: &[RawNewsItem],
    ) -> Result<usize, EtlError> {
        let row_placeholder = "(CAST(? AS TIMESTAMP), ?, ?, ?, TRY_CAST(? AS TIMESTAMP))";
        let placeholders = vec![row_placeholder; items.len()].join(", ");
        let sql = format!(
            "INSERT INTO news (imported_at, category, title, url, news_timestamp) \
             VALUES {placeholders}"
        );

        let mut values: Vec<Option<String>> = Vec::with_capacity(items.len() * 5);
        for item in items {
            values.push(Some(imported_at.to_string()));
            values.push(item.category.clone());
            values.push(item.title.clone());
            values.push(item.url.clone());
            values.push(item.posted_at.clone());
        }

        let inserted = conn.execute(&sql, params_from_iter(values))?;
        Ok(inserted)
    }

    /// Total number of persisted rows.
    pub fn total_records(&self) -> Result<i64, EtlError> {
        let conn = self.open()?;
        let total = conn.query_row("SELECT count(*) FROM news", [], |row| row.get(0))?;
        Ok(total)
    }

    /// Most recently imported rows, newest first.
    pub fn recent_news(&self, limit: usize) -> Result<Vec<NewsRow>, EtlError> {
        let conn = self.open()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM news ORDER BY imported_at DESC LIMIT {limit}"
        ))?;
        let rows = stmt
            .query_map([], Self::row_from)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Rows for one category, newest first, optionally limited.
    pub fn news_by_category(
        &self,
        category: &str,
        limit: Option<usize>,
    ) -> Result<Vec<NewsRow>, EtlError> {
        let conn = self.open()?;
        let mut sql = format!(
            "SELECT {SELECT_COLUMNS} FROM news WHERE category = ? ORDER BY imported_at DESC"
        );
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![category], Self::row_from)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn row_from(row: &duckdb::Row<'_>) -> Result<NewsRow, duckdb::Error> {
        Ok(NewsRow {
            id: row.get(0)?,
            imported_at: row.get(1)?,
            category: row.get(2)?,
            title: row.get(3)?,
            url: row.get(4)?,
            news_timestamp: row.get(5)?,
        })
    }
}

impl Load for NewsStore {
    type Input = TransformedBatch;

    /// Append a transformed batch.
    ///
    /// An empty batch is not an error: nothing is written and the load
    /// reports success. Persistence failures are logged and reported as
    /// `false`; they never raise.
    #[instrument(level = "info", skip_all, fields(db_path = %self.db_path.display()))]
    async fn do_load(&self, batch: TransformedBatch) -> bool {
        if batch.items.is_empty() {
            info!("no valid records to persist");
            return true;
        }

        match self.write_batch(&batch) {
            Ok(rows) => {
                info!(
                    rows,
                    total_original = batch.metadata.total_original,
                    total_valid = batch.metadata.total_valid,
                    total_filtered = batch.metadata.total_filtered,
                    "news batch persisted"
                );
                true
            }
            Err(err) => {
                error!(error = %err, "news batch load failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BatchMetadata;
    use chrono::NaiveDateTime;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> NewsStore {
        NewsStore::new(dir.path().join("news.duckdb"))
    }

    fn item(category: &str, title: &str, url: &str, posted_at: &str) -> RawNewsItem {
        RawNewsItem {
            category: Some(category.to_string()),
            title: Some(title.to_string()),
            url: Some(url.to_string()),
            posted_at: Some(posted_at.to_string()),
        }
    }

    fn batch(items: Vec<RawNewsItem>) -> TransformedBatch {
        let ts = NaiveDateTime::parse_from_str("2025-11-02 14:00:00", TIMESTAMP_FORMAT).unwrap();
        let valid = items.len();
        TransformedBatch {
            metadata: BatchMetadata {
                total_original: valid,
                total_valid: valid,
                total_filtered: 0,
                extracted_at: ts,
                transformed_at: ts,
            },
            items,
        }
    }

    #[tokio::test]
    async fn empty_batch_loads_successfully_and_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        assert!(store.do_load(batch(vec![])).await);
        assert_eq!(store.total_records().unwrap(), 0);
    }

    #[tokio::test]
    async fn load_appends_exactly_the_batch() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let loaded = store
            .do_load(batch(vec![
                item("Mercados", "um", "https://x/1", "2025-11-02 13:00:00"),
                item("Economia", "dois", "https://x/2", "2025-11-02 12:00:00"),
                item("Mercados", "três", "https://x/3", "2025-11-02 11:00:00"),
            ]))
            .await;
        assert!(loaded);
        assert_eq!(store.total_records().unwrap(), 3);

        let mut ids: Vec<i64> = store
            .recent_news(10)
            .unwrap()
            .iter()
            .map(|row| row.id)
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn surrogate_keys_keep_ascending_across_loads() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        store
            .do_load(batch(vec![item("A", "um", "https://x/1", "2025-11-02 13:00:00")]))
            .await;
        store
            .do_load(batch(vec![item("A", "dois", "https://x/2", "2025-11-02 13:05:00")]))
            .await;

        let mut ids: Vec<i64> = store
            .recent_news(10)
            .unwrap()
            .iter()
            .map(|row| row.id)
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn unresolved_publication_time_lands_as_null() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        store
            .do_load(batch(vec![
                item("Mercados", "um", "https://x/1", "2025-11-02 13:00:00"),
                item("Mercados", "dois", "https://x/2", "em breve"),
            ]))
            .await;

        let rows = store.recent_news(10).unwrap();
        let resolved = rows.iter().find(|r| r.title == "um").unwrap();
        let unresolved = rows.iter().find(|r| r.title == "dois").unwrap();
        assert!(resolved.news_timestamp.is_some());
        assert!(unresolved.news_timestamp.is_none());
    }

    #[tokio::test]
    async fn category_filter_matches_exactly() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        store
            .do_load(batch(vec![
                item("Mercados", "um", "https://x/1", "2025-11-02 13:00:00"),
                item("Economia", "dois", "https://x/2", "2025-11-02 12:00:00"),
                item("Mercados", "três", "https://x/3", "2025-11-02 11:00:00"),
            ]))
            .await;

        let rows = store.news_by_category("Mercados", None).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.category.as_deref() == Some("Mercados")));

        let limited = store.news_by_category("Mercados", Some(1)).unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn validated_batch_flows_into_the_store_end_to_end() {
        use crate::models::ExtractionBatch;
        use crate::news::NewsTransformer;
        use crate::pipeline::Transform;

        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let extracted = ExtractionBatch {
            extracted_at: NaiveDateTime::parse_from_str("2025-11-02 14:00:00", TIMESTAMP_FORMAT)
                .unwrap(),
            items: vec![
                item("Mercados", "um", "https://x/1", "2025-11-02 13:00:00"),
                RawNewsItem {
                    category: Some("Mercados".to_string()),
                    title: None,
                    url: Some("https://x/2".to_string()),
                    posted_at: Some("2025-11-02 12:00:00".to_string()),
                },
                item("Economia", "três", "https://x/3", "2025-11-02 11:00:00"),
            ],
        };

        let transformed = NewsTransformer.do_transform(extracted).unwrap();
        assert_eq!(transformed.metadata.total_valid, 2);
        assert_eq!(transformed.metadata.total_filtered, 1);

        assert!(store.do_load(transformed).await);
        assert_eq!(store.total_records().unwrap(), 2);
    }

    #[tokio::test]
    async fn schema_setup_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        // Every operation runs the DDL; interleaving reads and writes must
        // never trip on an existing table or sequence.
        assert_eq!(store.total_records().unwrap(), 0);
        store
            .do_load(batch(vec![item("A", "um", "https://x/1", "2025-11-02 13:00:00")]))
            .await;
        assert_eq!(store.total_records().unwrap(), 1);
    }
}
