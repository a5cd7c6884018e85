//! Read-only queries for the serving layer
//!
//! The HTTP layer in front of this crate is a thin SQL-to-JSON
//! translator; these functions are the SQL side of that contract. All
//! derived annotations (cumulative sums, percentage shares) are computed
//! here so every consumer sees the same arithmetic.

use super::db::FiscalDb;
use super::error::PipelineError;
use super::types::{DailyRecord, MonthlyRollup, YearlyRollup};
use chrono::Datelike;
use rusqlite::{params, OptionalExtension};

const MIN_YEAR: i32 = 1900;
const MAX_YEAR: i32 = 2100;

/// Reject year parameters outside the plausible publication window.
pub fn validate_year(year: i32) -> Result<(), PipelineError> {
    if (MIN_YEAR..=MAX_YEAR).contains(&year) {
        Ok(())
    } else {
        Err(PipelineError::InvalidYear(year))
    }
}

/// Most recent daily record plus its year's rollup (the rollup can be
/// absent right after a fresh backfill of daily rows only).
#[derive(Debug, Clone)]
pub struct LatestSnapshot {
    pub daily: DailyRecord,
    pub year_rollup: Option<YearlyRollup>,
}

/// One daily record annotated with the running tariff total for its year.
#[derive(Debug, Clone)]
pub struct DailyWithCumulative {
    pub record: DailyRecord,
    pub cumulative_tariff: i64,
}

/// One monthly rollup annotated with tariff receipts as a percentage of
/// deposits.
#[derive(Debug, Clone)]
pub struct MonthlyWithShare {
    pub rollup: MonthlyRollup,
    pub tariff_share_pct: f64,
}

/// The most recent daily record, if any.
pub fn latest_daily_snapshot(db: &FiscalDb) -> Result<Option<LatestSnapshot>, PipelineError> {
    let daily = db
        .connection()
        .query_row(
            "SELECT record_date, tariff_value, total_deposit_value, fetched_at
             FROM daily_records ORDER BY record_date DESC LIMIT 1",
            [],
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
        .map_err(|source| PipelineError::Persistence {
            stage: "latest read",
            date: None,
            source,
        })?;

    match daily {
        Some(daily) => {
            let year_rollup = db.yearly_rollup(daily.record_date.year())?;
            Ok(Some(LatestSnapshot { daily, year_rollup }))
        }
        None => Ok(None),
    }
}

/// A year's daily records ordered by date, each carrying the cumulative
/// tariff sum up to and including that date (nulls as 0).
pub fn daily_records_for_year(
    db: &FiscalDb,
    year: i32,
) -> Result<Vec<DailyWithCumulative>, PipelineError> {
    validate_year(year)?;

    // Dates are stored as ISO text, so lexicographic range bounds work
    let lo = format!("{:04}-01-01", year);
    let hi = format!("{:04}-12-31", year);

    let mut stmt = db
        .connection()
        .prepare(
            "SELECT record_date, tariff_value, total_deposit_value, fetched_at
             FROM daily_records
             WHERE record_date >= ?1 AND record_date <= ?2
             ORDER BY record_date ASC",
        )
        .map_err(read_err)?;

    let records = stmt
        .query_map(params![lo, hi], |row| {
            Ok(DailyRecord {
                record_date: row.get(0)?,
                tariff_value: row.get(1)?,
                total_deposit_value: row.get(2)?,
                fetched_at: row.get(3)?,
            })
        })
        .map_err(read_err)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(read_err)?;

    let mut running = 0i64;
    let annotated = records
        .into_iter()
        .map(|record| {
            running += record.tariff_value.unwrap_or(0);
            DailyWithCumulative {
                record,
                cumulative_tariff: running,
            }
        })
        .collect();

    Ok(annotated)
}

/// A year's monthly rollups ordered by month, each carrying the tariff
/// share of deposits in percent (0 when the month's deposits are 0).
pub fn monthly_rollups_for_year(
    db: &FiscalDb,
    year: i32,
) -> Result<Vec<MonthlyWithShare>, PipelineError> {
    validate_year(year)?;

    let lo = format!("{:04}-01-01", year);
    let hi = format!("{:04}-12-31", year);

    let mut stmt = db
        .connection()
        .prepare(
            "SELECT month, tariff_sum, deposit_sum, updated_at
             FROM monthly_rollups
             WHERE month >= ?1 AND month <= ?2
             ORDER BY month ASC",
        )
        .map_err(read_err)?;

    let rollups = stmt
        .query_map(params![lo, hi], |row| {
            Ok(MonthlyRollup {
                month: row.get(0)?,
                tariff_sum: row.get(1)?,
                deposit_sum: row.get(2)?,
                updated_at: row.get(3)?,
            })
        })
        .map_err(read_err)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(read_err)?;

    let annotated = rollups
        .into_iter()
        .map(|rollup| {
            let tariff_share_pct = if rollup.deposit_sum == 0 {
                0.0
            } else {
                rollup.tariff_sum as f64 / rollup.deposit_sum as f64 * 100.0
            };
            MonthlyWithShare {
                rollup,
                tariff_share_pct,
            }
        })
        .collect();

    Ok(annotated)
}

fn read_err(source: rusqlite::Error) -> PipelineError {
    PipelineError::Persistence {
        stage: "serving read",
        date: None,
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::DailyMetrics;
    use chrono::NaiveDate;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    fn open_test_db() -> (NamedTempFile, FiscalDb) {
        let temp_file = NamedTempFile::new().unwrap();
        let db_path = temp_file.path().to_str().unwrap();
        let db = FiscalDb::open(db_path, "sql", Duration::from_millis(500)).unwrap();
        (temp_file, db)
    }

    fn ingest(db: &mut FiscalDb, date: &str, tariff: Option<i64>, deposit: Option<i64>) {
        let metrics = DailyMetrics {
            tariff_value: tariff,
            total_deposit_value: deposit,
        };
        db.ingest_day(date.parse().unwrap(), &metrics, "[]").unwrap();
    }

    #[test]
    fn test_year_validation_bounds() {
        assert!(validate_year(2025).is_ok());
        assert!(validate_year(1900).is_ok());
        assert!(validate_year(2100).is_ok());
        assert!(matches!(validate_year(1899), Err(PipelineError::InvalidYear(1899))));
        assert!(matches!(validate_year(20255), Err(PipelineError::InvalidYear(_))));
        assert!(matches!(validate_year(-3), Err(PipelineError::InvalidYear(_))));
    }

    #[test]
    fn test_latest_snapshot_includes_year_rollup() {
        let (_temp, mut db) = open_test_db();
        ingest(&mut db, "2025-04-14", Some(100), Some(500));
        ingest(&mut db, "2025-04-15", Some(200), Some(600));

        let snapshot = latest_daily_snapshot(&db).unwrap().unwrap();
        assert_eq!(
            snapshot.daily.record_date,
            NaiveDate::from_ymd_opt(2025, 4, 15).unwrap()
        );
        assert_eq!(snapshot.daily.tariff_value, Some(200));

        let rollup = snapshot.year_rollup.unwrap();
        assert_eq!(rollup.tariff_sum, 300);
        assert_eq!(rollup.deposit_sum, 1100);
    }

    #[test]
    fn test_latest_snapshot_on_empty_db() {
        let (_temp, db) = open_test_db();
        assert!(latest_daily_snapshot(&db).unwrap().is_none());
    }

    #[test]
    fn test_daily_cumulative_ordering_and_nulls() {
        let (_temp, mut db) = open_test_db();
        // Out-of-order ingestion; cumulative must follow date order
        ingest(&mut db, "2025-02-03", Some(20), Some(200));
        ingest(&mut db, "2025-01-02", Some(10), Some(100));
        ingest(&mut db, "2025-01-03", None, Some(150));
        // Different year must not leak in
        ingest(&mut db, "2024-12-31", Some(999), Some(999));

        let rows = daily_records_for_year(&db, 2025).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].record.record_date.to_string(), "2025-01-02");
        assert_eq!(rows[0].cumulative_tariff, 10);
        assert_eq!(rows[1].cumulative_tariff, 10); // null adds nothing
        assert_eq!(rows[2].cumulative_tariff, 30);
    }

    #[test]
    fn test_monthly_share_with_zero_denominator() {
        let (_temp, mut db) = open_test_db();
        ingest(&mut db, "2025-01-15", Some(50), Some(200));
        ingest(&mut db, "2025-02-12", Some(30), Some(0));

        let months = monthly_rollups_for_year(&db, 2025).unwrap();
        assert_eq!(months.len(), 2);
        assert!((months[0].tariff_share_pct - 25.0).abs() < 1e-9);
        assert_eq!(months[1].tariff_share_pct, 0.0);
    }

    #[test]
    fn test_invalid_year_rejected_by_queries() {
        let (_temp, db) = open_test_db();
        assert!(daily_records_for_year(&db, 99999).is_err());
        assert!(monthly_rollups_for_year(&db, 12).is_err());
    }
}
