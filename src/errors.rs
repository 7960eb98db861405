//! Error types shared across the ETL pipelines.
//!
//! Stage implementations return [`EtlError`]; only the load stage reports
//! failure through its boolean result instead (see [`crate::pipeline::Load`]).

use thiserror::Error;

/// Failures that can abort an extract or transform stage.
#[derive(Debug, Error)]
pub enum EtlError {
    /// The WebDriver session could not be established or driven.
    #[error("webdriver session failure: {0}")]
    Session(#[from] thirtyfour::error::WebDriverError),

    /// An HTTP request to an upstream API failed.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A DuckDB operation failed.
    #[error("store failure: {0}")]
    Store(#[from] duckdb::Error),

    /// Filesystem preparation for the store failed.
    #[error("io failure: {0}")]
    Io(#[from] std::io::Error),

    /// An upstream payload did not have the expected shape.
    #[error("malformed upstream payload: {0}")]
    Payload(String),
}
