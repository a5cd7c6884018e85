//! Core data structures for the ingestion pipeline

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// One disclosure line from the Daily Treasury Statement
/// (Table II, Deposits and Withdrawals of Operating Cash).
///
/// Amounts arrive as free text, already denominated in millions. The
/// category field is free text and is sometimes the literal string
/// "null" for subtotal lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreasuryRow {
    pub record_date: NaiveDate,
    pub transaction_type: String,
    pub transaction_catg: String,
    pub account_type: String,
    pub transaction_today_amt: String,
}

/// The two derived metrics for one calendar day, in integer millions.
///
/// `None` means "no applicable data" (e.g. no customs row published that
/// day). A measured total of zero is `Some(0)`, never `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyMetrics {
    pub tariff_value: Option<i64>,
    pub total_deposit_value: Option<i64>,
}

/// One persisted row of `daily_records`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyRecord {
    pub record_date: NaiveDate,
    pub tariff_value: Option<i64>,
    pub total_deposit_value: Option<i64>,
    pub fetched_at: i64,
}

/// One persisted row of `monthly_rollups`, keyed by the first day of the
/// month.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyRollup {
    pub month: NaiveDate,
    pub tariff_sum: i64,
    pub deposit_sum: i64,
    pub updated_at: i64,
}

/// One persisted row of `yearly_rollups`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YearlyRollup {
    pub year: i32,
    pub tariff_sum: i64,
    pub deposit_sum: i64,
    pub updated_at: i64,
}

/// The daily values in place before an upsert overwrote them.
///
/// `0/0` with `existed == false` when no prior row was stored for the
/// date, so delta arithmetic can treat first ingestion and correction
/// uniformly.
#[derive(Debug, Clone, Copy)]
pub struct PreviousValues {
    pub tariff_value: Option<i64>,
    pub total_deposit_value: Option<i64>,
    pub existed: bool,
}

/// Signed (new - old) difference for both metrics, nulls as 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollupDelta {
    pub tariff: i64,
    pub deposit: i64,
}

impl RollupDelta {
    pub fn between(new: &DailyMetrics, old: &PreviousValues) -> Self {
        Self {
            tariff: new.tariff_value.unwrap_or(0) - old.tariff_value.unwrap_or(0),
            deposit: new.total_deposit_value.unwrap_or(0)
                - old.total_deposit_value.unwrap_or(0),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.tariff == 0 && self.deposit == 0
    }
}

/// First day of the month owning `date` (the monthly rollup key).
pub fn month_bucket(date: NaiveDate) -> NaiveDate {
    date.with_day(1).expect("day 1 is valid for every month")
}
