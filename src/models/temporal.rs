//! Date ranges attached to relations and questions.
//!
//! Dates are ISO `YYYY-MM-DD` strings compared lexicographically. They are
//! not calendar-validated: a quarter always ends on day 31 of its last month.

use serde::{Deserialize, Serialize};

/// A possibly half-open date range. Both bounds absent means unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimestampRange {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl TimestampRange {
    pub fn new(start_date: Option<String>, end_date: Option<String>) -> Self {
        Self {
            start_date,
            end_date,
        }
    }

    /// A single-day range.
    pub fn day(date: impl Into<String>) -> Self {
        let date = date.into();
        Self::new(Some(date.clone()), Some(date))
    }

    /// The unconstrained sentinel.
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn is_unbounded(&self) -> bool {
        self.start_date.is_none() && self.end_date.is_none()
    }

    /// Whether `self` (an edge interval) overlaps `window`.
    ///
    /// A missing bound on either side is open on that side, so an edge with
    /// no dates passes any window and every edge passes an unbounded window.
    pub fn overlaps(&self, window: &TimestampRange) -> bool {
        if window.is_unbounded() {
            return true;
        }
        if let (Some(window_start), Some(end)) = (&window.start_date, &self.end_date) {
            if end < window_start {
                return false;
            }
        }
        if let (Some(window_end), Some(start)) = (&window.end_date, &self.start_date) {
            if start > window_end {
                return false;
            }
        }
        true
    }

    /// Permissive union: earliest start and latest end across all ranges.
    ///
    /// Unbounded ranges contribute nothing; the union of none is unbounded.
    pub fn union<'a>(ranges: impl IntoIterator<Item = &'a TimestampRange>) -> TimestampRange {
        let mut start: Option<&String> = None;
        let mut end: Option<&String> = None;
        for range in ranges {
            if let Some(s) = &range.start_date {
                if start.map_or(true, |current| s < current) {
                    start = Some(s);
                }
            }
            if let Some(e) = &range.end_date {
                if end.map_or(true, |current| e > current) {
                    end = Some(e);
                }
            }
        }
        TimestampRange::new(start.cloned(), end.cloned())
    }
}

impl std::fmt::Display for TimestampRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} to {}",
            self.start_date.as_deref().unwrap_or("-"),
            self.end_date.as_deref().unwrap_or("-")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(start: Option<&str>, end: Option<&str>) -> TimestampRange {
        TimestampRange::new(start.map(String::from), end.map(String::from))
    }

    #[test]
    fn test_unbounded_window_accepts_everything() {
        let window = TimestampRange::unbounded();
        assert!(TimestampRange::unbounded().overlaps(&window));
        assert!(TimestampRange::day("1990-01-01").overlaps(&window));
    }

    #[test]
    fn test_overlap_edges() {
        let window = range(Some("2021-01-01"), Some("2021-03-31"));
        assert!(TimestampRange::day("2021-02-14").overlaps(&window));
        assert!(TimestampRange::day("2021-03-31").overlaps(&window));
        assert!(!TimestampRange::day("2020-12-31").overlaps(&window));
        assert!(!TimestampRange::day("2021-04-01").overlaps(&window));
        assert!(range(Some("2020-06-01"), Some("2021-01-01")).overlaps(&window));
    }

    #[test]
    fn test_missing_bounds_are_open() {
        let window = range(Some("2021-01-01"), None);
        assert!(range(None, Some("2021-06-01")).overlaps(&window));
        assert!(!range(None, Some("2020-06-01")).overlaps(&window));
        assert!(TimestampRange::unbounded().overlaps(&window));

        let window = range(None, Some("2021-01-01"));
        assert!(range(Some("2020-01-01"), None).overlaps(&window));
        assert!(!range(Some("2022-01-01"), None).overlaps(&window));
    }

    #[test]
    fn test_union_takes_earliest_and_latest() {
        let ranges = vec![
            range(Some("2021-04-01"), Some("2021-06-31")),
            TimestampRange::unbounded(),
            range(Some("2020-01-01"), Some("2020-12-31")),
        ];
        assert_eq!(
            TimestampRange::union(&ranges),
            range(Some("2020-01-01"), Some("2021-06-31"))
        );
        assert!(TimestampRange::union(&[]).is_unbounded());
    }
}
