//! Runtime configuration from environment variables

use std::env;

/// Configuration for the ingestion pipeline.
///
/// Loaded from environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Path to the SQLite database file
    pub db_path: String,

    /// Directory containing numbered .sql schema files
    pub schema_dir: String,

    /// Base URL of the Fiscal Data API service
    pub api_base_url: String,

    /// Rows requested per upstream page
    pub page_size: u32,

    /// Polite delay between upstream page requests (milliseconds)
    pub page_delay_ms: u64,

    /// Per-request timeout for upstream page fetches (seconds)
    pub fetch_timeout_secs: u64,

    /// SQLite busy timeout (milliseconds)
    pub db_busy_timeout_ms: u64,

    /// Directory for side-channel raw-row snapshots
    pub snapshot_dir: String,
}

impl PipelineConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `FISCALFLOW_DB_PATH` (default: data/fiscalflow.db)
    /// - `FISCALFLOW_SCHEMA_DIR` (default: sql)
    /// - `FISCALFLOW_API_BASE_URL` (default: https://api.fiscaldata.treasury.gov/services/api/fiscal_service)
    /// - `FISCALFLOW_PAGE_SIZE` (default: 100)
    /// - `FISCALFLOW_PAGE_DELAY_MS` (default: 250)
    /// - `FISCALFLOW_FETCH_TIMEOUT_SECS` (default: 30)
    /// - `FISCALFLOW_DB_BUSY_TIMEOUT_MS` (default: 5000)
    /// - `FISCALFLOW_SNAPSHOT_DIR` (default: data/snapshots)
    pub fn from_env() -> Self {
        Self {
            db_path: env::var("FISCALFLOW_DB_PATH")
                .unwrap_or_else(|_| "data/fiscalflow.db".to_string()),

            schema_dir: env::var("FISCALFLOW_SCHEMA_DIR").unwrap_or_else(|_| "sql".to_string()),

            api_base_url: env::var("FISCALFLOW_API_BASE_URL").unwrap_or_else(|_| {
                "https://api.fiscaldata.treasury.gov/services/api/fiscal_service".to_string()
            }),

            page_size: env::var("FISCALFLOW_PAGE_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(100),

            page_delay_ms: env::var("FISCALFLOW_PAGE_DELAY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(250),

            fetch_timeout_secs: env::var("FISCALFLOW_FETCH_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),

            db_busy_timeout_ms: env::var("FISCALFLOW_DB_BUSY_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5_000),

            snapshot_dir: env::var("FISCALFLOW_SNAPSHOT_DIR")
                .unwrap_or_else(|_| "data/snapshots".to_string()),
        }
    }
}
