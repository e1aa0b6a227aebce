//! Query window planning for one sync span.

use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// A contiguous date sub-range used as the unit of one remote query.
/// Both ends are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// Span above which yearly windows are used. The remote source is
/// latency-dominated, not row-count-dominated, so fewer round trips win on
/// long spans.
const YEARLY_WINDOW_THRESHOLD_DAYS: i64 = 730;

/// Span above which 30-day windows are used instead of equal chunks.
const MONTHLY_WINDOW_THRESHOLD_DAYS: i64 = 365;

/// Maximum window count for short spans.
const MAX_SHORT_SPAN_WINDOWS: i64 = 12;

/// Slice the span [from, to] into ordered, contiguous, non-overlapping
/// windows, oldest first.
///
/// Policy: spans over ~2 years get ~1-year windows; 1-2 year spans get
/// 30-day windows; shorter spans get at most 12 roughly equal chunks. No
/// window has zero length and the union of the output exactly covers the
/// input span.
pub fn plan_windows(from: NaiveDate, to: NaiveDate) -> Result<Vec<DateWindow>> {
    if from > to {
        return Err(Error::InvalidInput(format!(
            "Window span start {} is after end {}",
            from, to
        )));
    }

    let span_days = (to - from).num_days() + 1;
    let mut windows = Vec::new();

    if span_days > YEARLY_WINDOW_THRESHOLD_DAYS {
        let mut cursor = from;
        while cursor <= to {
            let next_year = cursor
                .checked_add_months(Months::new(12))
                .ok_or_else(|| Error::InvalidInput(format!("Date overflow at {}", cursor)))?;
            let end = (next_year - Days::new(1)).min(to);
            windows.push(DateWindow { start: cursor, end });
            cursor = end + Days::new(1);
        }
        return Ok(windows);
    }

    let chunk_days = if span_days > MONTHLY_WINDOW_THRESHOLD_DAYS {
        30
    } else {
        let count = span_days.min(MAX_SHORT_SPAN_WINDOWS);
        // Ceiling division so the final window is the short one.
        (span_days + count - 1) / count
    };

    let mut cursor = from;
    while cursor <= to {
        let end = (cursor + Days::new(chunk_days as u64 - 1)).min(to);
        windows.push(DateWindow { start: cursor, end });
        cursor = end + Days::new(1);
    }
    Ok(windows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("date")
    }

    fn assert_covers(windows: &[DateWindow], from: NaiveDate, to: NaiveDate) {
        assert!(!windows.is_empty());
        assert_eq!(windows.first().expect("first").start, from);
        assert_eq!(windows.last().expect("last").end, to);
        for pair in windows.windows(2) {
            assert_eq!(
                pair[1].start,
                pair[0].end + Days::new(1),
                "windows must be contiguous and non-overlapping"
            );
        }
        for window in windows {
            assert!(window.days() >= 1, "no zero-length windows");
        }
    }

    #[test]
    fn five_year_span_yields_yearly_windows() {
        let from = date("2021-04-01");
        let to = date("2026-03-31");
        let windows = plan_windows(from, to).expect("plan");
        assert_eq!(windows.len(), 5);
        assert_covers(&windows, from, to);
        assert_eq!(windows[0].end, date("2022-03-31"));
        assert_eq!(windows[4].start, date("2025-04-01"));
    }

    #[test]
    fn eighteen_month_span_yields_thirty_day_windows() {
        let from = date("2024-01-01");
        let to = date("2025-06-30");
        let windows = plan_windows(from, to).expect("plan");
        assert_covers(&windows, from, to);
        for window in &windows[..windows.len() - 1] {
            assert_eq!(window.days(), 30);
        }
        assert!(windows.last().expect("last").days() <= 30);
    }

    #[test]
    fn short_span_yields_at_most_twelve_chunks() {
        let from = date("2024-01-01");
        let to = date("2024-06-30");
        let windows = plan_windows(from, to).expect("plan");
        assert!(windows.len() <= 12);
        assert_covers(&windows, from, to);
    }

    #[test]
    fn tiny_span_yields_one_window_per_day_at_most() {
        let from = date("2024-05-01");
        let to = date("2024-05-03");
        let windows = plan_windows(from, to).expect("plan");
        assert!(windows.len() <= 3);
        assert_covers(&windows, from, to);
    }

    #[test]
    fn single_day_span_is_one_window() {
        let day = date("2024-02-29");
        let windows = plan_windows(day, day).expect("plan");
        assert_eq!(windows, vec![DateWindow { start: day, end: day }]);
    }

    #[test]
    fn inverted_span_is_rejected() {
        let result = plan_windows(date("2024-06-01"), date("2024-05-01"));
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn exact_two_year_span_uses_thirty_day_windows() {
        let from = date("2023-01-01");
        let to = date("2024-12-30");
        let windows = plan_windows(from, to).expect("plan");
        assert_covers(&windows, from, to);
        assert_eq!(windows[0].days(), 30);
        assert!(windows.len() > 12);
    }
}
