//! Single-Day Ingestion Binary
//!
//! Fetches one date's Daily Treasury Statement rows, derives the tariff
//! and total-deposit metrics, and applies the upsert+delta protocol.
//! Intended to be invoked by an external scheduler once per publication
//! day.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release --bin ingest_daily -- --date 2025-04-15
//! ```
//!
//! ## Environment Variables
//!
//! - FISCALFLOW_TARGET_DATE - Date to ingest when --date is absent
//!   (default: yesterday, UTC)
//! - FISCALFLOW_DB_PATH - SQLite database path (default: data/fiscalflow.db)
//! - FISCALFLOW_SCHEMA_DIR - Schema file directory (default: sql)
//! - FISCALFLOW_API_BASE_URL - Fiscal Data service base URL
//! - FISCALFLOW_SNAPSHOT_DIR - Side-channel snapshot directory
//! - RUST_LOG - Logging level (optional, default: info)
//!
//! Exit status: 0 on success or a no-data day, non-zero on fetch or
//! persistence failure.

use chrono::{NaiveDate, Utc};
use fiscalflow::pipeline::config::PipelineConfig;
use fiscalflow::pipeline::db::FiscalDb;
use fiscalflow::pipeline::fiscal_api::FiscalDataClient;
use fiscalflow::pipeline::ingestion::{ingest_single_day, IngestOutcome};
use std::env;
use std::time::Duration;

fn resolve_target_date() -> Result<NaiveDate, String> {
    let args: Vec<String> = env::args().collect();
    if let Some(idx) = args.iter().position(|a| a == "--date") {
        let raw = args
            .get(idx + 1)
            .ok_or_else(|| "--date requires a value (YYYY-MM-DD)".to_string())?;
        return raw
            .parse()
            .map_err(|_| format!("Invalid --date value: {}", raw));
    }

    if let Ok(raw) = env::var("FISCALFLOW_TARGET_DATE") {
        return raw
            .parse()
            .map_err(|_| format!("Invalid FISCALFLOW_TARGET_DATE: {}", raw));
    }

    let today = Utc::now().date_naive();
    Ok(today.pred_opt().unwrap_or(today))
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = PipelineConfig::from_env();

    let target = match resolve_target_date() {
        Ok(date) => date,
        Err(msg) => {
            log::error!("❌ {}", msg);
            std::process::exit(2);
        }
    };

    log::info!("🚀 Starting fiscalflow daily ingestion");
    log::info!("   ├─ Target date: {}", target);
    log::info!("   ├─ Database: {}", config.db_path);
    log::info!("   └─ API: {}", config.api_base_url);

    let client = match FiscalDataClient::new(
        &config.api_base_url,
        Duration::from_secs(config.fetch_timeout_secs),
    ) {
        Ok(client) => client,
        Err(e) => {
            log::error!("❌ Failed to build API client: {}", e);
            std::process::exit(1);
        }
    };

    let mut db = match FiscalDb::open(
        &config.db_path,
        &config.schema_dir,
        Duration::from_millis(config.db_busy_timeout_ms),
    ) {
        Ok(db) => db,
        Err(e) => {
            log::error!("❌ Failed to open database: {}", e);
            std::process::exit(1);
        }
    };

    match ingest_single_day(&client, &mut db, &config, target).await {
        Ok(IngestOutcome::Ingested { delta, .. }) => {
            log::info!(
                "✅ Done: rollups moved by {:+} tariff / {:+} deposits",
                delta.tariff,
                delta.deposit
            );
        }
        Ok(IngestOutcome::NoData { date }) => {
            log::info!("✅ Done: no statement published for {}", date);
        }
        Err(e) => {
            log::error!("❌ Ingestion failed: {}", e);
            std::process::exit(1);
        }
    }
}
