//! DuckDB persistence for instruments and daily prices.
//!
//! Two sequence-keyed tables: `instruments` (one row per symbol, ensured
//! before the first price lands) and `prices` (append-only daily bars).
//! Like the news store, every operation opens its own connection, runs the
//! idempotent DDL, and reports load failures through its boolean result.

use std::path::PathBuf;

use duckdb::{params, Connection, ToSql};
use tracing::{error, info, instrument};

use crate::errors::EtlError;
use crate::models::PriceTable;
use crate::pipeline::Load;

/// DuckDB-backed price store, addressed by database file path.
pub struct PriceStore {
    db_path: PathBuf,
}

impl PriceStore {
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

    /// Create sequences and tables if absent. Safe to call repeatedly.
    pub fn ensure_schema(conn: &Connection) -> Result<(), EtlError> {
        conn.execute_batch(
            "CREATE SEQUENCE IF NOT EXISTS instruments_id_seq START 1;
             CREATE SEQUENCE IF NOT EXISTS prices_id_seq START 1;
             CREATE TABLE IF NOT EXISTS instruments (
                 id INTEGER DEFAULT nextval('instruments_id_seq') PRIMARY KEY,
                 symbol VARCHAR UNIQUE,
                 name VARCHAR,
                 sector VARCHAR,
                 created_at TIMESTAMP DEFAULT current_timestamp
             );
             CREATE TABLE IF NOT EXISTS prices (
                 id INTEGER DEFAULT nextval('prices_id_seq') PRIMARY KEY,
                 symbol VARCHAR,
                 date DATE,
                 open DOUBLE,
                 high DOUBLE,
                 low DOUBLE,
                 close DOUBLE,
                 adj_close DOUBLE,
                 volume BIGINT,
                 pct_change DOUBLE,
                 ma_7d DOUBLE,
                 ma_30d DOUBLE
             );",
        )?;
        Ok(())
    }

    fn ensure_instrument(conn: &Connection, symbol: &str) -> Result<(), EtlError> {
        let existing: i64 = conn.query_row(
            "SELECT count(*) FROM instruments WHERE symbol = ?",
            params![symbol],
            |row| row.get(0),
        )?;
        if existing == 0 {
            conn.execute(
                "INSERT INTO instruments (symbol, name) VALUES (?, ?)",
                params![symbol, symbol],
            )?;
            info!(symbol, "registered new instrument");
        }
        Ok(())
    }

    fn write_table(&self, table: &PriceTable) -> Result<usize, EtlError> {
        let conn = self.open()?;
        Self::ensure_instrument(&conn, &table.symbol)?;

        let row_placeholder = "(?, CAST(? AS DATE), ?, ?, ?, ?, ?, ?, ?, ?, ?)";
        let placeholders = vec![row_placeholder; table.rows.len()].join(", ");
        let sql = format!(
            "INSERT INTO prices (symbol, date, open, high, low, close, adj_close, \
             volume, pct_change, ma_7d, ma_30d) VALUES {placeholders}"
        );

        let mut values: Vec<Box<dyn ToSql>> = Vec::with_capacity(table.rows.len() * 11);
        for row in &table.rows {
            values.push(Box::new(table.symbol.clone()));
            values.push(Box::new(row.date.to_string()));
            values.push(Box::new(row.open));
            values.push(Box::new(row.high));
            values.push(Box::new(row.low));
            values.push(Box::new(row.close));
            values.push(Box::new(row.adj_close));
            values.push(Box::new(row.volume));
            values.push(Box::new(row.pct_change));
            values.push(Box::new(row.ma_7d));
            values.push(Box::new(row.ma_30d));
        }
        let param_refs: Vec<&dyn ToSql> = values.iter().map(|value| value.as_ref()).collect();

        let inserted = conn.execute(&sql, param_refs.as_slice())?;
        Ok(inserted)
    }

    /// Total number of persisted price rows.
    pub fn total_prices(&self) -> Result<i64, EtlError> {
        let conn = self.open()?;
        let total = conn.query_row("SELECT count(*) FROM prices", [], |row| row.get(0))?;
        Ok(total)
    }

    /// Number of registered instruments.
    pub fn total_instruments(&self) -> Result<i64, EtlError> {
        let conn = self.open()?;
        let total = conn.query_row("SELECT count(*) FROM instruments", [], |row| row.get(0))?;
        Ok(total)
    }
}

impl Load for PriceStore {
    type Input = PriceTable;

    /// Append a price table.
    ///
    /// Unlike the news store, an empty input reports `false`: a price run
    /// that produced no bars means the upstream window yielded nothing to
    /// persist, and that outcome is surfaced to the caller.
    #[instrument(level = "info", skip_all, fields(db_path = %self.db_path.display()))]
    async fn do_load(&self, table: PriceTable) -> bool {
        if table.rows.is_empty() {
            error!(symbol = %table.symbol, "no price rows to persist");
            return false;
        }

        match self.write_table(&table) {
            Ok(rows) => {
                info!(rows, symbol = %table.symbol, "price table persisted");
                true
            }
            Err(err) => {
                error!(error = %err, symbol = %table.symbol, "price load failed");
                false
            }
        }
    }
}
