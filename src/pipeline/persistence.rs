//! Side-channel snapshots of raw source rows
//!
//! When an upsert fails, the fetched rows for that date are written to
//! local durable storage so the date can be replayed later without
//! re-fetching from the upstream source.

use super::error::PipelineError;
use super::types::TreasuryRow;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// On-disk snapshot wrapper: the rows plus when they were saved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRowSnapshot {
    pub record_date: NaiveDate,
    pub saved_at: i64,
    pub rows: Vec<TreasuryRow>,
}

fn snapshot_path(dir: &str, date: NaiveDate) -> PathBuf {
    Path::new(dir).join(format!("raw_rows_{}.json", date))
}

/// Save one date's raw rows to the snapshot directory, creating it if
/// needed. Returns the written path.
pub fn save_raw_rows(
    dir: &str,
    date: NaiveDate,
    rows: &[TreasuryRow],
) -> Result<PathBuf, PipelineError> {
    fs::create_dir_all(dir).map_err(|source| PipelineError::SideChannel { date, source })?;

    let snapshot = RawRowSnapshot {
        record_date: date,
        saved_at: chrono::Utc::now().timestamp(),
        rows: rows.to_vec(),
    };

    let path = snapshot_path(dir, date);
    let json = serde_json::to_string_pretty(&snapshot)?;
    fs::write(&path, json).map_err(|source| PipelineError::SideChannel { date, source })?;

    log::debug!("Saved {} raw rows to {}", rows.len(), path.display());
    Ok(path)
}

/// Load a previously saved snapshot for a date. Missing file is a normal
/// empty state, not an error.
pub fn load_raw_rows(
    dir: &str,
    date: NaiveDate,
) -> Result<Option<Vec<TreasuryRow>>, PipelineError> {
    let path = snapshot_path(dir, date);
    if !path.exists() {
        log::info!("No snapshot file found: {}", path.display());
        return Ok(None);
    }

    let json =
        fs::read_to_string(&path).map_err(|source| PipelineError::SideChannel { date, source })?;
    let snapshot: RawRowSnapshot = serde_json::from_str(&json)?;

    log::info!(
        "Loaded {} raw rows for {} from {}",
        snapshot.rows.len(),
        snapshot.record_date,
        path.display()
    );
    Ok(Some(snapshot.rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn make_row(catg: &str, amount: &str) -> TreasuryRow {
        TreasuryRow {
            record_date: NaiveDate::from_ymd_opt(2025, 4, 15).unwrap(),
            transaction_type: "Deposits".to_string(),
            transaction_catg: catg.to_string(),
            account_type: "Treasury General Account (TGA)".to_string(),
            transaction_today_amt: amount.to_string(),
        }
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let dir_str = dir.path().to_str().unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 4, 15).unwrap();

        let rows = vec![
            make_row("Customs and Certain Excise Taxes", "123"),
            make_row("Taxes - Corporate Income", "456"),
        ];

        let path = save_raw_rows(dir_str, date, &rows).unwrap();
        assert!(path.exists());

        let loaded = load_raw_rows(dir_str, date).unwrap().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].transaction_catg, "Customs and Certain Excise Taxes");
        assert_eq!(loaded[1].transaction_today_amt, "456");
    }

    #[test]
    fn test_missing_snapshot_is_none() {
        let dir = tempdir().unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 4, 15).unwrap();

        let loaded = load_raw_rows(dir.path().to_str().unwrap(), date).unwrap();
        assert!(loaded.is_none());
    }
}
