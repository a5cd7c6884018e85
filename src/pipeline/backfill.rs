//! Historical backfill over a date range
//!
//! Fetches the whole range page-by-page, groups rows by their native
//! date, and upserts each date independently with absolute values - the
//! delta protocol is bypassed, so the run ends with a full rollup
//! rebuild. The rebuild happens unconditionally inside `run_backfill`:
//! a finished backfill with stale rollups is not an observable state.
//!
//! Per-date failures never abort the range. A failed date is logged, its
//! raw rows preserved to the side channel, and the run continues; the
//! report carries the success/failure tally.

use super::classifier::classify_rows;
use super::config::PipelineConfig;
use super::db::FiscalDb;
use super::error::PipelineError;
use super::fiscal_api::{fetch_range, TreasuryDataSource};
use super::persistence;
use super::types::TreasuryRow;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::time::Duration;

/// Outcome tally for one backfill run.
#[derive(Debug, Clone)]
pub struct BackfillReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed_dates: Vec<NaiveDate>,
}

impl BackfillReport {
    pub fn all_succeeded(&self) -> bool {
        self.failed_dates.is_empty()
    }
}

/// Backfill every published date in [start, end].
///
/// Errors only on a failed range fetch or a failed rollup rebuild;
/// per-date upsert failures land in the report instead.
pub async fn run_backfill(
    source: &dyn TreasuryDataSource,
    db: &mut FiscalDb,
    config: &PipelineConfig,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<BackfillReport, PipelineError> {
    log::info!("🚀 Backfilling {} .. {}", start, end);

    let rows = fetch_range(
        source,
        start,
        end,
        config.page_size,
        Duration::from_millis(config.page_delay_ms),
    )
    .await
    .map_err(|source| PipelineError::UpstreamFetch { start, end, source })?;

    // BTreeMap keeps the distinct dates in ascending order
    let mut by_date: BTreeMap<NaiveDate, Vec<TreasuryRow>> = BTreeMap::new();
    for row in rows {
        by_date.entry(row.record_date).or_default().push(row);
    }

    let attempted = by_date.len();
    let mut succeeded = 0usize;
    let mut failed_dates = Vec::new();

    log::info!("📊 {} distinct dates fetched", attempted);

    for (date, day_rows) in &by_date {
        match upsert_one_date(db, *date, day_rows) {
            Ok(()) => succeeded += 1,
            Err(err) => {
                log::error!("❌ Backfill failed for {}: {}", date, err);
                match persistence::save_raw_rows(&config.snapshot_dir, *date, day_rows) {
                    Ok(path) => {
                        log::warn!("💾 Raw rows for {} preserved at {}", date, path.display())
                    }
                    Err(snap_err) => {
                        log::error!("❌ Could not preserve raw rows for {}: {}", date, snap_err)
                    }
                }
                failed_dates.push(*date);
            }
        }
    }

    // Absolute writes left the rollups stale; rebuilding is part of the
    // backfill contract, not a follow-up the operator might forget
    db.rebuild_rollups()?;

    log::info!(
        "✅ Backfill complete: {}/{} dates upserted, {} failed",
        succeeded,
        attempted,
        failed_dates.len()
    );

    Ok(BackfillReport {
        attempted,
        succeeded,
        failed_dates,
    })
}

fn upsert_one_date(
    db: &mut FiscalDb,
    date: NaiveDate,
    rows: &[TreasuryRow],
) -> Result<(), PipelineError> {
    let metrics = classify_rows(rows);
    let raw_payload = serde_json::to_string(rows)?;

    db.upsert_day_absolute(date, &metrics, &raw_payload)?;

    log::info!(
        "   ├─ {} tariff={:?} deposits={:?} ({} rows)",
        date,
        metrics.tariff_value,
        metrics.total_deposit_value,
        rows.len()
    );
    Ok(())
}
