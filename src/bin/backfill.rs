//! Backfill Binary - Historical Range Ingestion
//!
//! Fetches every Daily Treasury Statement row in a date range, upserts
//! absolute daily values date by date, and rebuilds the rollups when the
//! range is done. Per-date failures are reported and side-channeled, not
//! fatal.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release --bin backfill -- --start 2025-01-01 --end 2025-03-31
//! ```
//!
//! ## Environment Variables
//!
//! - FISCALFLOW_BACKFILL_START / FISCALFLOW_BACKFILL_END - Range bounds
//!   when the flags are absent
//! - FISCALFLOW_DB_PATH - SQLite database path (default: data/fiscalflow.db)
//! - FISCALFLOW_API_BASE_URL - Fiscal Data service base URL
//! - FISCALFLOW_PAGE_SIZE - Rows per upstream page (default: 100)
//! - FISCALFLOW_PAGE_DELAY_MS - Delay between page requests (default: 250)
//! - RUST_LOG - Logging level (optional, default: info)
//!
//! Exit status: 0 when the fetch and rollup rebuild succeeded (even with
//! per-date failures in the report), non-zero otherwise.

use chrono::NaiveDate;
use fiscalflow::pipeline::backfill::run_backfill;
use fiscalflow::pipeline::config::PipelineConfig;
use fiscalflow::pipeline::db::FiscalDb;
use fiscalflow::pipeline::fiscal_api::FiscalDataClient;
use std::env;
use std::time::Duration;

fn flag_or_env(flag: &str, var: &str) -> Result<NaiveDate, String> {
    let args: Vec<String> = env::args().collect();
    let raw = if let Some(idx) = args.iter().position(|a| a == flag) {
        args.get(idx + 1)
            .cloned()
            .ok_or_else(|| format!("{} requires a value (YYYY-MM-DD)", flag))?
    } else {
        env::var(var).map_err(|_| format!("Missing {} flag (or {} env var)", flag, var))?
    };

    raw.parse().map_err(|_| format!("Invalid date: {}", raw))
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = PipelineConfig::from_env();

    let (start, end) = match (
        flag_or_env("--start", "FISCALFLOW_BACKFILL_START"),
        flag_or_env("--end", "FISCALFLOW_BACKFILL_END"),
    ) {
        (Ok(start), Ok(end)) if start <= end => (start, end),
        (Ok(start), Ok(end)) => {
            log::error!("❌ Start {} is after end {}", start, end);
            std::process::exit(2);
        }
        (Err(msg), _) | (_, Err(msg)) => {
            log::error!("❌ {}", msg);
            std::process::exit(2);
        }
    };

    log::info!("🚀 Starting fiscalflow backfill");
    log::info!("   ├─ Range: {} .. {}", start, end);
    log::info!("   ├─ Database: {}", config.db_path);
    log::info!("   └─ Page size: {} (delay {}ms)", config.page_size, config.page_delay_ms);

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

    match run_backfill(&client, &mut db, &config, start, end).await {
        Ok(report) => {
            log::info!(
                "✅ Backfill report: {}/{} dates upserted",
                report.succeeded,
                report.attempted
            );
            for date in &report.failed_dates {
                log::warn!("   ├─ Failed (preserved for replay): {}", date);
            }
        }
        Err(e) => {
            log::error!("❌ Backfill failed: {}", e);
            std::process::exit(1);
        }
    }
}
