//! Recompute Binary - Manual Rollup Rebuild
//!
//! Discards and rebuilds the monthly and yearly rollup tables from the
//! stored daily records. Safe to run at any time; the rebuild is a
//! single transaction.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release --bin recompute
//! ```

use fiscalflow::pipeline::config::PipelineConfig;
use fiscalflow::pipeline::db::FiscalDb;
use std::time::Duration;

fn main() {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = PipelineConfig::from_env();

    log::info!("🚀 Rebuilding rollups from {}", config.db_path);

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

    if let Err(e) = db.rebuild_rollups() {
        log::error!("❌ Recompute failed: {}", e);
        std::process::exit(1);
    }
}
