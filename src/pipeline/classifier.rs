//! Row classification: tariff and total-deposit extraction
//!
//! Given one day's disclosure rows, picks out the customs tariff line and
//! the total-deposit aggregate. The source publishes an authoritative
//! "Total Deposits" line on most days; when it is missing the total is
//! reconstructed by summing individual deposit lines, skipping the
//! summary/aggregate lines that would double-count.
//!
//! The aggregate detection is a table of match rules (phrase + matched
//! field) rather than hardcoded tests, so an upstream category rename is
//! a table edit, not a logic change.

use super::normalizer::{normalize_amount, parse_amount, to_millions};
use super::types::{DailyMetrics, TreasuryRow};

/// Which row field a match rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleField {
    Category,
    AccountType,
    Either,
}

/// One aggregate/summary detection rule. Phrases are matched as
/// case-insensitive substrings and must be stored lowercase.
#[derive(Debug, Clone, Copy)]
pub struct MatchRule {
    pub field: RuleField,
    pub phrase: &'static str,
}

impl MatchRule {
    fn matches(&self, row: &TreasuryRow) -> bool {
        let category = row.transaction_catg.to_lowercase();
        let account = row.account_type.to_lowercase();
        match self.field {
            RuleField::Category => category.contains(self.phrase),
            RuleField::AccountType => account.contains(self.phrase),
            RuleField::Either => category.contains(self.phrase) || account.contains(self.phrase),
        }
    }
}

/// Summary lines the upstream source mixes in with individual deposit
/// rows. Any row matching one of these is skipped by the fallback sum.
pub const AGGREGATE_EXCLUSION_RULES: &[MatchRule] = &[
    MatchRule { field: RuleField::Either, phrase: "public debt" },
    MatchRule { field: RuleField::Either, phrase: "public debt cash issues" },
    MatchRule { field: RuleField::Either, phrase: "table iii" },
    MatchRule { field: RuleField::Either, phrase: "table iiia" },
    MatchRule { field: RuleField::Either, phrase: "table iiib" },
    MatchRule { field: RuleField::Either, phrase: "treasury general account total" },
    MatchRule { field: RuleField::Either, phrase: "total deposits" },
    MatchRule { field: RuleField::Either, phrase: "total withdrawals" },
    MatchRule { field: RuleField::Either, phrase: "deposits total" },
    MatchRule { field: RuleField::Either, phrase: "public debt issues" },
    MatchRule { field: RuleField::Either, phrase: "total, deposits" },
];

/// Classify one day's rows into the two derived metrics, using the
/// default exclusion rule table.
pub fn classify_rows(rows: &[TreasuryRow]) -> DailyMetrics {
    classify_rows_with_rules(rows, AGGREGATE_EXCLUSION_RULES)
}

/// Classify with a caller-supplied exclusion rule table.
pub fn classify_rows_with_rules(rows: &[TreasuryRow], rules: &[MatchRule]) -> DailyMetrics {
    DailyMetrics {
        tariff_value: extract_tariff(rows),
        total_deposit_value: extract_total_deposits(rows, rules),
    }
}

/// First row whose category mentions customs duties. Absent row (or an
/// unparseable amount) yields `None` - there is no measured tariff that
/// day.
fn extract_tariff(rows: &[TreasuryRow]) -> Option<i64> {
    rows.iter()
        .find(|row| row.transaction_catg.to_lowercase().contains("customs"))
        .and_then(|row| normalize_amount(&row.transaction_today_amt))
}

/// Total operating deposits, in priority order:
///
/// 1. The source's own "Total Deposits" line (whole-word match), used
///    verbatim - it is the published aggregate.
/// 2. Fallback: sum every deposit-type row not flagged as a summary line
///    by the exclusion rules. Zero contributing rows is a measured total
///    of zero, `Some(0)`, not an absence.
fn extract_total_deposits(rows: &[TreasuryRow], rules: &[MatchRule]) -> Option<i64> {
    if let Some(row) = rows
        .iter()
        .find(|row| contains_word_bounded(&row.transaction_catg, "total deposits"))
    {
        return normalize_amount(&row.transaction_today_amt);
    }

    let mut sum = 0.0;
    for row in rows {
        if !row.transaction_type.to_lowercase().contains("deposit") {
            continue;
        }
        if rules.iter().any(|rule| rule.matches(row)) {
            continue;
        }
        if let Some(amount) = parse_amount(&row.transaction_today_amt) {
            sum += amount;
        }
    }

    Some(to_millions(sum))
}

/// Case-insensitive whole-word phrase search: the match may not be
/// bordered by an alphanumeric character on either side, so
/// "Total Deposits (Table II)" matches but "Subtotal Deposits" does not.
///
/// `phrase` must be lowercase ASCII.
fn contains_word_bounded(haystack: &str, phrase: &str) -> bool {
    let hay = haystack.to_lowercase();
    let mut from = 0;
    while let Some(pos) = hay[from..].find(phrase) {
        let start = from + pos;
        let end = start + phrase.len();

        let bounded_left = hay[..start]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric());
        let bounded_right = hay[end..].chars().next().map_or(true, |c| !c.is_alphanumeric());

        if bounded_left && bounded_right {
            return true;
        }
        from = start + 1;
    }
    false
}
