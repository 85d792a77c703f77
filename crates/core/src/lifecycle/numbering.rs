//! Human-readable document numbers.
//!
//! Numbers look like `SAL-20260301-0001`: a per-kind prefix, the document
//! date, and a per-day sequence. The next sequence is one past the highest
//! already used; collisions between concurrent writers are resolved by
//! retrying after a short random sleep.

use std::ops::RangeInclusive;

use chrono::NaiveDate;
use tradebook_shared::NumberingConfig;

use super::status::DocumentKind;

/// Prefix for journal entry numbers.
pub const JOURNAL_PREFIX: &str = "JV";

/// Number prefix of a document kind.
#[must_use]
pub const fn number_prefix(kind: DocumentKind) -> &'static str {
    match kind {
        DocumentKind::Sale => "SAL",
        DocumentKind::Purchase => "PUR",
        DocumentKind::SaleReturn => "SRT",
        DocumentKind::PurchaseReturn => "PRT",
        DocumentKind::CashIn => "CIN",
        DocumentKind::CashOut => "COT",
        DocumentKind::Transfer => "TRF",
        DocumentKind::StockAdjustment => "ADJ",
        DocumentKind::Payment => "PAY",
    }
}

/// Common start of every number for `prefix` on `date`, e.g. `SAL-20260301-`.
#[must_use]
pub fn number_stem(prefix: &str, date: NaiveDate) -> String {
    format!("{prefix}-{}-", date.format("%Y%m%d"))
}

/// Formats a full number.
#[must_use]
pub fn format_number(prefix: &str, date: NaiveDate, sequence: u32) -> String {
    format!("{}{sequence:04}", number_stem(prefix, date))
}

/// Sequence part of `number` if it starts with `stem`.
#[must_use]
pub fn parse_sequence(number: &str, stem: &str) -> Option<u32> {
    number.strip_prefix(stem)?.parse().ok()
}

/// Next sequence after the numbers already used under `stem`.
///
/// Sequences are compared numerically, so `10000` follows `9999`.
#[must_use]
pub fn next_sequence<'a>(existing: impl IntoIterator<Item = &'a str>, stem: &str) -> u32 {
    existing
        .into_iter()
        .filter_map(|n| parse_sequence(n, stem))
        .max()
        .map_or(1, |max| max.saturating_add(1))
}

/// Sleep window, in milliseconds, between numbering attempts.
#[must_use]
pub fn backoff_range(config: &NumberingConfig) -> RangeInclusive<u64> {
    let low = config.min_backoff_ms.min(config.max_backoff_ms);
    let high = config.min_backoff_ms.max(config.max_backoff_ms);
    low..=high
}

#[cfg(test)]
mod tests {
    use super::*;

    fn march_first() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number("SAL", march_first(), 1), "SAL-20260301-0001");
        assert_eq!(format_number(JOURNAL_PREFIX, march_first(), 12345), "JV-20260301-12345");
    }

    #[test]
    fn test_prefixes_are_distinct() {
        let kinds = [
            DocumentKind::Sale,
            DocumentKind::Purchase,
            DocumentKind::SaleReturn,
            DocumentKind::PurchaseReturn,
            DocumentKind::CashIn,
            DocumentKind::CashOut,
            DocumentKind::Transfer,
            DocumentKind::StockAdjustment,
            DocumentKind::Payment,
        ];
        let mut prefixes: Vec<&str> = kinds.iter().map(|k| number_prefix(*k)).collect();
        prefixes.push(JOURNAL_PREFIX);
        prefixes.sort_unstable();
        prefixes.dedup();
        assert_eq!(prefixes.len(), kinds.len() + 1);
    }

    #[test]
    fn test_next_sequence() {
        let stem = number_stem("PUR", march_first());
        assert_eq!(next_sequence(std::iter::empty(), &stem), 1);
        assert_eq!(
            next_sequence(["PUR-20260301-0002", "PUR-20260301-0007"], &stem),
            8
        );
        assert_eq!(
            next_sequence(["PUR-20260301-9999", "PUR-20260301-10000"], &stem),
            10001
        );
        // Other days and malformed numbers are ignored.
        assert_eq!(
            next_sequence(["PUR-20260302-0040", "PUR-20260301-x"], &stem),
            1
        );
    }

    #[test]
    fn test_backoff_range() {
        let config = NumberingConfig::default();
        assert_eq!(backoff_range(&config), 5..=50);

        let inverted = NumberingConfig {
            max_attempts: 3,
            min_backoff_ms: 40,
            max_backoff_ms: 10,
        };
        assert_eq!(backoff_range(&inverted), 10..=40);
    }
}
