//! Single-day ingestion chain
//!
//! Fetch -> classify -> normalize -> atomic upsert+delta. An empty
//! upstream response is a valid empty state (`NoData`), not an error.
//! A persistence failure preserves the fetched rows to the side channel
//! before propagating, so the date can be replayed without another fetch.

use super::classifier::classify_rows;
use super::config::PipelineConfig;
use super::db::FiscalDb;
use super::error::PipelineError;
use super::fiscal_api::{fetch_range, TreasuryDataSource};
use super::persistence;
use super::types::{DailyMetrics, RollupDelta};
use chrono::NaiveDate;
use std::time::Duration;

/// Result of a single-day run.
#[derive(Debug, Clone, Copy)]
pub enum IngestOutcome {
    /// Metrics stored; `delta` is what the rollups moved by.
    Ingested {
        date: NaiveDate,
        metrics: DailyMetrics,
        delta: RollupDelta,
    },
    /// The source published nothing for this date (weekend, holiday, or
    /// not yet released).
    NoData { date: NaiveDate },
}

/// Run the single-day ingestion path for one calendar date.
pub async fn ingest_single_day(
    source: &dyn TreasuryDataSource,
    db: &mut FiscalDb,
    config: &PipelineConfig,
    date: NaiveDate,
) -> Result<IngestOutcome, PipelineError> {
    log::info!("🚀 Ingesting daily statement for {}", date);

    let rows = fetch_range(
        source,
        date,
        date,
        config.page_size,
        Duration::from_millis(config.page_delay_ms),
    )
    .await
    .map_err(|source| PipelineError::UpstreamFetch {
        start: date,
        end: date,
        source,
    })?;

    if rows.is_empty() {
        log::info!("ℹ️  No rows published for {} - nothing to store", date);
        return Ok(IngestOutcome::NoData { date });
    }

    let metrics = classify_rows(&rows);
    let raw_payload = serde_json::to_string(&rows)?;

    match db.ingest_day(date, &metrics, &raw_payload) {
        Ok(delta) => {
            log::info!(
                "✅ {} ingested: tariff={:?} deposits={:?} | rollup delta {:+}/{:+}",
                date,
                metrics.tariff_value,
                metrics.total_deposit_value,
                delta.tariff,
                delta.deposit
            );
            Ok(IngestOutcome::Ingested { date, metrics, delta })
        }
        Err(err) => {
            // Best-effort preservation; the original error is the one
            // that matters to the caller
            match persistence::save_raw_rows(&config.snapshot_dir, date, &rows) {
                Ok(path) => {
                    log::warn!("💾 Raw rows for {} preserved at {}", date, path.display())
                }
                Err(snap_err) => {
                    log::error!("❌ Could not preserve raw rows for {}: {}", date, snap_err)
                }
            }
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::fiscal_api::{FetchError, PageMeta, TransactionPage};
    use crate::pipeline::types::TreasuryRow;
    use async_trait::async_trait;
    use tempfile::{tempdir, NamedTempFile};

    struct FixedSource {
        rows: Vec<TreasuryRow>,
    }

    #[async_trait]
    impl TreasuryDataSource for FixedSource {
        async fn fetch_page(
            &self,
            _start: NaiveDate,
            _end: NaiveDate,
            _page_number: u32,
            _page_size: u32,
        ) -> Result<TransactionPage, FetchError> {
            Ok(TransactionPage {
                meta: PageMeta {
                    count: self.rows.len() as u32,
                    total_count: self.rows.len() as u64,
                    total_pages: 1,
                },
                data: self.rows.clone(),
            })
        }
    }

    fn deposit_row(date: NaiveDate, catg: &str, amount: &str) -> TreasuryRow {
        TreasuryRow {
            record_date: date,
            transaction_type: "Deposits".to_string(),
            transaction_catg: catg.to_string(),
            account_type: "Treasury General Account (TGA)".to_string(),
            transaction_today_amt: amount.to_string(),
        }
    }

    fn test_config(db_path: &str, snapshot_dir: &str) -> PipelineConfig {
        PipelineConfig {
            db_path: db_path.to_string(),
            schema_dir: "sql".to_string(),
            api_base_url: "http://unused".to_string(),
            page_size: 100,
            page_delay_ms: 0,
            fetch_timeout_secs: 5,
            db_busy_timeout_ms: 500,
            snapshot_dir: snapshot_dir.to_string(),
        }
    }

    fn open_test_db(path: &str) -> FiscalDb {
        FiscalDb::open(path, "sql", Duration::from_millis(500)).unwrap()
    }

    #[tokio::test]
    async fn test_ingests_and_stores_metrics() {
        let temp_file = NamedTempFile::new().unwrap();
        let snap_dir = tempdir().unwrap();
        let db_path = temp_file.path().to_str().unwrap();
        let mut db = open_test_db(db_path);
        let config = test_config(db_path, snap_dir.path().to_str().unwrap());
        let date = NaiveDate::from_ymd_opt(2025, 4, 15).unwrap();

        let source = FixedSource {
            rows: vec![
                deposit_row(date, "Customs and Certain Excise Taxes", "123"),
                deposit_row(date, "Total Deposits (Table II)", "900"),
            ],
        };

        let outcome = ingest_single_day(&source, &mut db, &config, date).await.unwrap();

        match outcome {
            IngestOutcome::Ingested { metrics, delta, .. } => {
                assert_eq!(metrics.tariff_value, Some(123));
                assert_eq!(metrics.total_deposit_value, Some(900));
                assert_eq!(delta, RollupDelta { tariff: 123, deposit: 900 });
            }
            IngestOutcome::NoData { .. } => panic!("expected data"),
        }

        let stored = db.daily_record(date).unwrap().unwrap();
        assert_eq!(stored.tariff_value, Some(123));
    }

    #[tokio::test]
    async fn test_empty_response_is_no_data() {
        let temp_file = NamedTempFile::new().unwrap();
        let snap_dir = tempdir().unwrap();
        let db_path = temp_file.path().to_str().unwrap();
        let mut db = open_test_db(db_path);
        let config = test_config(db_path, snap_dir.path().to_str().unwrap());
        let date = NaiveDate::from_ymd_opt(2025, 4, 13).unwrap();

        let source = FixedSource { rows: vec![] };

        let outcome = ingest_single_day(&source, &mut db, &config, date).await.unwrap();
        assert!(matches!(outcome, IngestOutcome::NoData { .. }));
        assert!(db.daily_record(date).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_persistence_failure_preserves_raw_rows() {
        let temp_file = NamedTempFile::new().unwrap();
        let snap_dir = tempdir().unwrap();
        let db_path = temp_file.path().to_str().unwrap();
        let mut db = open_test_db(db_path);
        let config = test_config(db_path, snap_dir.path().to_str().unwrap());
        let date = NaiveDate::from_ymd_opt(2025, 4, 15).unwrap();

        // Force the daily upsert to fail for this date
        db.connection_mut()
            .execute_batch(
                "CREATE TRIGGER reject_date BEFORE INSERT ON daily_records
                 WHEN NEW.record_date = '2025-04-15'
                 BEGIN SELECT RAISE(ABORT, 'injected failure'); END;",
            )
            .unwrap();

        let source = FixedSource {
            rows: vec![deposit_row(date, "Taxes - Corporate Income", "400")],
        };

        let result = ingest_single_day(&source, &mut db, &config, date).await;
        assert!(matches!(result, Err(PipelineError::Persistence { .. })));

        let saved = persistence::load_raw_rows(config.snapshot_dir.as_str(), date)
            .unwrap()
            .unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].transaction_catg, "Taxes - Corporate Income");
    }
}
