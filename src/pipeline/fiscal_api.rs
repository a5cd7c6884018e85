//! Fiscal Data API Integration
//!
//! Paginated client for the Daily Treasury Statement
//! "Deposits and Withdrawals of Operating Cash" dataset.
//!
//! ## API Reference
//!
//! Endpoint: `{base}/v1/accounting/dts/deposits_withdrawals_operating_cash`
//! Query: record_date range filter, ascending sort, `page[number]` /
//! `page[size]` pagination. Each record carries the calendar date, a
//! free-text category, an account-type label, a transaction-type label
//! and the signed textual amount for "today".
//!
//! Fetching is deliberately serial with a polite delay between page
//! requests - the upstream API expects it, and ordering matters for the
//! short-page stop signal.

use super::types::TreasuryRow;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug)]
pub enum FetchError {
    Http(reqwest::Error),
    BadStatus(u16),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Http(err)
    }
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::Http(e) => write!(f, "HTTP error: {}", e),
            FetchError::BadStatus(code) => write!(f, "Unexpected status: {}", code),
        }
    }
}

impl std::error::Error for FetchError {}

/// Pagination metadata returned alongside every page.
#[derive(Debug, Clone, Deserialize)]
pub struct PageMeta {
    pub count: u32,
    #[serde(rename = "total-count")]
    pub total_count: u64,
    #[serde(rename = "total-pages")]
    pub total_pages: u32,
}

/// One page of disclosure rows.
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionPage {
    pub data: Vec<TreasuryRow>,
    pub meta: PageMeta,
}

/// Seam over the upstream source so the backfill and ingestion paths can
/// be driven by a mock in tests.
#[async_trait]
pub trait TreasuryDataSource: Send + Sync {
    /// Fetch one page of rows whose record_date falls in [start, end].
    /// Page numbers are 1-based.
    async fn fetch_page(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        page_number: u32,
        page_size: u32,
    ) -> Result<TransactionPage, FetchError>;
}

const DTS_ENDPOINT: &str = "/v1/accounting/dts/deposits_withdrawals_operating_cash";
const DTS_FIELDS: &str =
    "record_date,transaction_type,transaction_catg,account_type,transaction_today_amt";

/// HTTP client for the Fiscal Data service.
pub struct FiscalDataClient {
    client: reqwest::Client,
    base_url: String,
}

impl FiscalDataClient {
    /// Create a client with a bounded per-request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl TreasuryDataSource for FiscalDataClient {
    async fn fetch_page(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        page_number: u32,
        page_size: u32,
    ) -> Result<TransactionPage, FetchError> {
        let url = format!(
            "{}{}?fields={}&filter=record_date:gte:{},record_date:lte:{}&sort=record_date&page[number]={}&page[size]={}",
            self.base_url, DTS_ENDPOINT, DTS_FIELDS, start, end, page_number, page_size
        );

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(FetchError::BadStatus(response.status().as_u16()));
        }

        let page: TransactionPage = response.json().await?;
        Ok(page)
    }
}

/// Fetch every row in [start, end], walking pages serially.
///
/// Stops when the declared total-page count is reached or a page comes
/// back shorter than the requested size, whichever fires first. Sleeps
/// `page_delay` between page requests (not after the last one).
pub async fn fetch_range(
    source: &dyn TreasuryDataSource,
    start: NaiveDate,
    end: NaiveDate,
    page_size: u32,
    page_delay: Duration,
) -> Result<Vec<TreasuryRow>, FetchError> {
    let mut rows = Vec::new();
    let mut page_number = 1u32;

    loop {
        let page = source.fetch_page(start, end, page_number, page_size).await?;
        let received = page.data.len();
        rows.extend(page.data);

        log::debug!(
            "📄 Page {}/{}: {} rows ({} total)",
            page_number,
            page.meta.total_pages,
            received,
            rows.len()
        );

        let count_exhausted = page.meta.total_pages != 0 && page_number >= page.meta.total_pages;
        let short_page = (received as u32) < page_size;
        if count_exhausted || short_page {
            break;
        }

        page_number += 1;
        tokio::time::sleep(page_delay).await;
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Mock source serving a fixed set of pages.
    struct PagedSource {
        pages: Vec<TransactionPage>,
    }

    fn make_row(date: &str, catg: &str) -> TreasuryRow {
        TreasuryRow {
            record_date: date.parse().unwrap(),
            transaction_type: "Deposits".to_string(),
            transaction_catg: catg.to_string(),
            account_type: "Treasury General Account (TGA)".to_string(),
            transaction_today_amt: "1".to_string(),
        }
    }

    fn make_page(rows: Vec<TreasuryRow>, total_pages: u32) -> TransactionPage {
        TransactionPage {
            meta: PageMeta {
                count: rows.len() as u32,
                total_count: 0,
                total_pages,
            },
            data: rows,
        }
    }

    #[async_trait]
    impl TreasuryDataSource for PagedSource {
        async fn fetch_page(
            &self,
            _start: NaiveDate,
            _end: NaiveDate,
            page_number: u32,
            _page_size: u32,
        ) -> Result<TransactionPage, FetchError> {
            Ok(self.pages[(page_number - 1) as usize].clone())
        }
    }

    #[tokio::test]
    async fn test_stops_at_declared_page_count() {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();

        // Two full pages, declared total of 2 - must not request page 3
        let source = PagedSource {
            pages: vec![
                make_page(vec![make_row("2025-01-02", "a"), make_row("2025-01-03", "b")], 2),
                make_page(vec![make_row("2025-01-06", "c"), make_row("2025-01-07", "d")], 2),
            ],
        };

        let rows = fetch_range(&source, start, end, 2, Duration::from_millis(0))
            .await
            .unwrap();
        assert_eq!(rows.len(), 4);
    }

    #[tokio::test]
    async fn test_stops_on_short_page() {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();

        // Declared count is wrong (3) but the second page is short
        let source = PagedSource {
            pages: vec![
                make_page(vec![make_row("2025-01-02", "a"), make_row("2025-01-03", "b")], 3),
                make_page(vec![make_row("2025-01-06", "c")], 3),
            ],
        };

        let rows = fetch_range(&source, start, end, 2, Duration::from_millis(0))
            .await
            .unwrap();
        assert_eq!(rows.len(), 3);
    }

    #[tokio::test]
    async fn test_empty_first_page_yields_no_rows() {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();

        let source = PagedSource {
            pages: vec![make_page(vec![], 1)],
        };

        let rows = fetch_range(&source, start, end, 100, Duration::from_millis(0))
            .await
            .unwrap();
        assert!(rows.is_empty());
    }
}
