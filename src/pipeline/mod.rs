//! # Treasury Cash-Flow Ingestion Pipeline
//!
//! Ingests Daily Treasury Statement disclosures and maintains derived
//! metrics with incrementally-updated rollups:
//! - Fetches deposit/withdrawal rows from the Fiscal Data API (paginated)
//! - Classifies each day's rows into two metrics: customs tariff receipts
//!   and total operating deposits (integer millions)
//! - Upserts one daily record per calendar date (latest value wins)
//! - Applies (new - old) deltas to monthly and yearly rollup rows
//! - Rebuilds rollups from scratch after bulk backfills
//!
//! ## Architecture: Delta-Maintained Rollups
//!
//! **Key principle:** `daily_records` is the single source of truth.
//! Rollups are derived caches that must never diverge from it.
//!
//! 1. Single-day ingestion reads the previous daily values and writes the
//!    new ones inside one transaction
//! 2. The signed difference is applied to the owning month and year rows
//!    in that same transaction (zero deltas skip the write)
//! 3. Backfill writes absolute daily values only, then triggers a full
//!    rollup rebuild before it reports success
//! 4. `FiscalDb::rebuild_rollups` re-sums everything and is the
//!    correctness oracle for the incremental path
//!
//! Failure story: a date whose upsert fails has its raw source rows
//! written to a local side-channel snapshot so it can be replayed without
//! re-fetching from the upstream API.
//!
//! ## Module Organization
//!
//! - `types` - Source rows, derived metrics, persisted record shapes
//! - `normalizer` - Free-text amount coercion to integer millions
//! - `classifier` - Tariff/total-deposit extraction with exclusion rules
//! - `db` - SQLite store: upsert+delta transaction, rollup rebuild
//! - `fiscal_api` - Paginated Fiscal Data client behind a source trait
//! - `ingestion` - Single-day fetch -> classify -> upsert chain
//! - `backfill` - Date-range orchestration with per-date isolation
//! - `persistence` - Side-channel raw-row snapshots for manual replay
//! - `reader` - Read-only queries for the serving layer
//! - `config` - Environment-driven runtime configuration
//! - `error` - Pipeline error taxonomy

pub mod backfill;
pub mod classifier;
pub mod config;
pub mod db;
pub mod error;
pub mod fiscal_api;
pub mod ingestion;
pub mod normalizer;
pub mod persistence;
pub mod reader;
pub mod types;

pub use backfill::{run_backfill, BackfillReport};
pub use classifier::{classify_rows, MatchRule, RuleField};
pub use config::PipelineConfig;
pub use db::FiscalDb;
pub use error::PipelineError;
pub use fiscal_api::{fetch_range, FetchError, FiscalDataClient, TransactionPage, TreasuryDataSource};
pub use ingestion::{ingest_single_day, IngestOutcome};
pub use types::{DailyMetrics, DailyRecord, MonthlyRollup, RollupDelta, TreasuryRow, YearlyRollup};
