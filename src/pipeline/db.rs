//! SQLite store for daily records and delta-maintained rollups
//!
//! `daily_records` is the single source of truth; `monthly_rollups` and
//! `yearly_rollups` are derived caches. The upsert-plus-delta path runs
//! inside one IMMEDIATE transaction so two overlapping ingestions of the
//! same date cannot both read the same "old" values and double-apply a
//! delta.

use super::error::PipelineError;
use super::types::{
    month_bucket, DailyMetrics, DailyRecord, MonthlyRollup, PreviousValues, RollupDelta,
    YearlyRollup,
};
use chrono::{Datelike, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Run schema migrations from SQL files
///
/// Reads all .sql files from the specified directory in sorted order and
/// executes them. Every file must use "IF NOT EXISTS" clauses so the
/// loader stays idempotent.
pub fn run_schema_migrations(conn: &mut Connection, schema_dir: &str) -> Result<(), PipelineError> {
    let schema_path = Path::new(schema_dir);

    if !schema_path.exists() {
        return Err(PipelineError::SchemaDir(schema_dir.to_string()));
    }

    // WAL mode so the serving layer can read while ingestion writes
    conn.pragma_update(None, "journal_mode", "WAL")
        .map_err(persist_err("migration", None))?;

    let mut sql_files: Vec<_> = fs::read_dir(schema_path)
        .map_err(PipelineError::SchemaIo)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().extension().and_then(|s| s.to_str()) == Some("sql"))
        .collect();

    sql_files.sort_by_key(|entry| entry.file_name());

    log::info!("🔧 Running schema migrations from: {}", schema_dir);

    for entry in sql_files {
        let path = entry.path();
        let sql_content = fs::read_to_string(&path).map_err(PipelineError::SchemaIo)?;

        conn.execute_batch(&sql_content)
            .map_err(persist_err("migration", None))?;

        log::info!("   └─ ✅ {}", path.file_name().unwrap_or_default().to_string_lossy());
    }

    Ok(())
}

/// Connection owner for all pipeline reads and writes.
pub struct FiscalDb {
    conn: Connection,
}

impl FiscalDb {
    /// Open (or create) the database, apply pragmas and schema.
    pub fn open(
        db_path: &str,
        schema_dir: &str,
        busy_timeout: Duration,
    ) -> Result<Self, PipelineError> {
        let mut conn = Connection::open(db_path).map_err(persist_err("open", None))?;

        conn.busy_timeout(busy_timeout)
            .map_err(persist_err("open", None))?;

        run_schema_migrations(&mut conn, schema_dir)?;

        Ok(Self { conn })
    }

    /// Borrow the underlying connection for read-only queries.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Single-day ingestion write: upsert the daily record and apply the
    /// (new - old) delta to the owning month and year rollups, all in one
    /// IMMEDIATE transaction.
    ///
    /// Returns the applied delta. A zero delta skips the rollup writes
    /// entirely (rerun of unchanged data).
    pub fn ingest_day(
        &mut self,
        date: NaiveDate,
        metrics: &DailyMetrics,
        raw_payload: &str,
    ) -> Result<RollupDelta, PipelineError> {
        let now = Utc::now().timestamp();

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(persist_err("ingest", Some(date)))?;

        let previous = read_previous(&tx, date).map_err(persist_err("ingest", Some(date)))?;

        upsert_daily(&tx, date, metrics, raw_payload, now)
            .map_err(persist_err("ingest", Some(date)))?;

        let delta = RollupDelta::between(metrics, &previous);
        if !delta.is_zero() {
            apply_rollup_delta(&tx, date, delta, now)
                .map_err(persist_err("ingest", Some(date)))?;
        }

        tx.commit().map_err(persist_err("ingest", Some(date)))?;
        Ok(delta)
    }

    /// Backfill write: upsert the daily record with absolute values and
    /// leave the rollups alone. The caller owes a `rebuild_rollups` before
    /// the rollups can be trusted again.
    pub fn upsert_day_absolute(
        &mut self,
        date: NaiveDate,
        metrics: &DailyMetrics,
        raw_payload: &str,
    ) -> Result<PreviousValues, PipelineError> {
        let now = Utc::now().timestamp();

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(persist_err("backfill upsert", Some(date)))?;

        let previous =
            read_previous(&tx, date).map_err(persist_err("backfill upsert", Some(date)))?;

        upsert_daily(&tx, date, metrics, raw_payload, now)
            .map_err(persist_err("backfill upsert", Some(date)))?;

        tx.commit()
            .map_err(persist_err("backfill upsert", Some(date)))?;
        Ok(previous)
    }

    /// Full recompute: atomically discard both rollup tables and rebuild
    /// them by re-summing every daily record (nulls as 0).
    ///
    /// This is the correctness oracle the incremental path must always
    /// agree with.
    pub fn rebuild_rollups(&mut self) -> Result<(), PipelineError> {
        let now = Utc::now().timestamp();

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(persist_err("recompute", None))?;

        tx.execute("DELETE FROM monthly_rollups", [])
            .map_err(persist_err("recompute", None))?;
        tx.execute("DELETE FROM yearly_rollups", [])
            .map_err(persist_err("recompute", None))?;

        tx.execute(
            r#"
            INSERT INTO monthly_rollups (month, tariff_sum, deposit_sum, updated_at)
            SELECT date(record_date, 'start of month'),
                   SUM(COALESCE(tariff_value, 0)),
                   SUM(COALESCE(total_deposit_value, 0)),
                   ?1
            FROM daily_records
            GROUP BY date(record_date, 'start of month')
            "#,
            params![now],
        )
        .map_err(persist_err("recompute", None))?;

        tx.execute(
            r#"
            INSERT INTO yearly_rollups (year, tariff_sum, deposit_sum, updated_at)
            SELECT CAST(strftime('%Y', record_date) AS INTEGER),
                   SUM(COALESCE(tariff_value, 0)),
                   SUM(COALESCE(total_deposit_value, 0)),
                   ?1
            FROM daily_records
            GROUP BY strftime('%Y', record_date)
            "#,
            params![now],
        )
        .map_err(persist_err("recompute", None))?;

        tx.commit().map_err(persist_err("recompute", None))?;

        log::info!("✅ Rollups rebuilt from daily records");
        Ok(())
    }

    /// Fetch one daily record, if stored.
    pub fn daily_record(&self, date: NaiveDate) -> Result<Option<DailyRecord>, PipelineError> {
        self.conn
            .query_row(
                "SELECT record_date, tariff_value, total_deposit_value, fetched_at
                 FROM daily_records WHERE record_date = ?1",
                params![date],
                |row| {
                    Ok(DailyRecord {
                        record_date: row.get(0)?,
                        tariff_value: row.get(1)?,
                        total_deposit_value: row.get(2)?,
                        fetched_at: row.get(3)?,
                    })
                },
            )
            .optional()
            .map_err(persist_err("daily read", Some(date)))
    }

    /// Fetch one monthly rollup row, if present.
    pub fn monthly_rollup(&self, month: NaiveDate) -> Result<Option<MonthlyRollup>, PipelineError> {
        self.conn
            .query_row(
                "SELECT month, tariff_sum, deposit_sum, updated_at
                 FROM monthly_rollups WHERE month = ?1",
                params![month],
                |row| {
                    Ok(MonthlyRollup {
                        month: row.get(0)?,
                        tariff_sum: row.get(1)?,
                        deposit_sum: row.get(2)?,
                        updated_at: row.get(3)?,
                    })
                },
            )
            .optional()
            .map_err(persist_err("monthly read", None))
    }

    /// Fetch one yearly rollup row, if present.
    pub fn yearly_rollup(&self, year: i32) -> Result<Option<YearlyRollup>, PipelineError> {
        self.conn
            .query_row(
                "SELECT year, tariff_sum, deposit_sum, updated_at
                 FROM yearly_rollups WHERE year = ?1",
                params![year],
                |row| {
                    Ok(YearlyRollup {
                        year: row.get(0)?,
                        tariff_sum: row.get(1)?,
                        deposit_sum: row.get(2)?,
                        updated_at: row.get(3)?,
                    })
                },
            )
            .optional()
            .map_err(persist_err("yearly read", None))
    }

    #[cfg(test)]
    pub(crate) fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }
}

fn persist_err(
    stage: &'static str,
    date: Option<NaiveDate>,
) -> impl FnOnce(rusqlite::Error) -> PipelineError {
    move |source| PipelineError::Persistence { stage, date, source }
}

/// Previous daily values for delta computation; `0/0` semantics when no
/// prior row existed are handled by `RollupDelta::between`.
fn read_previous(conn: &Connection, date: NaiveDate) -> Result<PreviousValues, rusqlite::Error> {
    let row = conn
        .query_row(
            "SELECT tariff_value, total_deposit_value FROM daily_records WHERE record_date = ?1",
            params![date],
            |row| Ok((row.get::<_, Option<i64>>(0)?, row.get::<_, Option<i64>>(1)?)),
        )
        .optional()?;

    Ok(match row {
        Some((tariff, deposit)) => PreviousValues {
            tariff_value: tariff,
            total_deposit_value: deposit,
            existed: true,
        },
        None => PreviousValues {
            tariff_value: None,
            total_deposit_value: None,
            existed: false,
        },
    })
}

fn upsert_daily(
    conn: &Connection,
    date: NaiveDate,
    metrics: &DailyMetrics,
    raw_payload: &str,
    fetched_at: i64,
) -> Result<(), rusqlite::Error> {
    conn.execute(
        r#"
        INSERT INTO daily_records (
            record_date, tariff_value, total_deposit_value, raw_payload, fetched_at
        ) VALUES (?1, ?2, ?3, ?4, ?5)
        ON CONFLICT(record_date) DO UPDATE SET
            tariff_value = excluded.tariff_value,
            total_deposit_value = excluded.total_deposit_value,
            raw_payload = excluded.raw_payload,
            fetched_at = excluded.fetched_at
        "#,
        params![
            date,
            metrics.tariff_value,
            metrics.total_deposit_value,
            raw_payload,
            fetched_at,
        ],
    )?;
    Ok(())
}

/// Increment the owning month and year rollups by the delta, creating
/// either row with the delta as its initial value when absent.
fn apply_rollup_delta(
    conn: &Connection,
    date: NaiveDate,
    delta: RollupDelta,
    updated_at: i64,
) -> Result<(), rusqlite::Error> {
    conn.execute(
        r#"
        INSERT INTO monthly_rollups (month, tariff_sum, deposit_sum, updated_at)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT(month) DO UPDATE SET
            tariff_sum = tariff_sum + excluded.tariff_sum,
            deposit_sum = deposit_sum + excluded.deposit_sum,
            updated_at = excluded.updated_at
        "#,
        params![month_bucket(date), delta.tariff, delta.deposit, updated_at],
    )?;

    conn.execute(
        r#"
        INSERT INTO yearly_rollups (year, tariff_sum, deposit_sum, updated_at)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT(year) DO UPDATE SET
            tariff_sum = tariff_sum + excluded.tariff_sum,
            deposit_sum = deposit_sum + excluded.deposit_sum,
            updated_at = excluded.updated_at
        "#,
        params![date.year(), delta.tariff, delta.deposit, updated_at],
    )?;

    Ok(())
}
