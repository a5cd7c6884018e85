pub mod pipeline;

pub use pipeline::backfill::{run_backfill, BackfillReport};
pub use pipeline::classifier::classify_rows;
pub use pipeline::config::PipelineConfig;
pub use pipeline::db::FiscalDb;
pub use pipeline::error::PipelineError;
pub use pipeline::fiscal_api::{FiscalDataClient, TreasuryDataSource};
pub use pipeline::ingestion::{ingest_single_day, IngestOutcome};
pub use pipeline::types::{DailyMetrics, DailyRecord, RollupDelta, TreasuryRow};
