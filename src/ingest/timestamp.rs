//! Normalization of free-form time expressions into date ranges.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::TimestampRange;

static EXACT_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid date regex"));
static BARE_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}$").expect("valid year regex"));
static QUARTER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:Q([1-4])\s*(\d{4})|(\d{4})-Q([1-4]))$").expect("valid quarter regex")
});

/// Parses a time expression into a date range.
///
/// Recognized forms, first match wins: `YYYY-MM-DD`, `YYYY`, `Qn YYYY` and
/// `YYYY-Qn`. Anything else yields the unbounded range. Never fails.
pub fn parse_timestamp_range(text: &str) -> TimestampRange {
    let text = text.trim();

    if EXACT_DATE.is_match(text) {
        return TimestampRange::day(text);
    }

    if BARE_YEAR.is_match(text) {
        return TimestampRange::new(Some(format!("{text}-01-01")), Some(format!("{text}-12-31")));
    }

    if let Some(caps) = QUARTER.captures(text) {
        let quarter = caps.get(1).or_else(|| caps.get(4));
        let year = caps.get(2).or_else(|| caps.get(3));
        if let (Some(quarter), Some(year)) = (quarter, year) {
            if let Ok(quarter) = quarter.as_str().parse::<u32>() {
                let start_month = 3 * (quarter - 1) + 1;
                let end_month = start_month + 2;
                let year = year.as_str();
                return TimestampRange::new(
                    Some(format!("{year}-{start_month:02}-01")),
                    // Quarter ends are always day 31, even for 30-day months.
                    Some(format!("{year}-{end_month:02}-31")),
                );
            }
        }
    }

    TimestampRange::unbounded()
}
