//! Time-period keys for bucketing snapshots
//!
//! Two timestamps share a key iff they fall in the same calendar bucket for
//! the frequency. All timestamps are UTC.
//!
//! Runs only see the closed `Frequency` set and use `period_key`.
//! `period_key_for_label` is a compatibility helper for callers holding a
//! raw label (tooling, imported listings); it keeps the full-timestamp key
//! for labels outside that set.

use crate::frequency::{Frequency, FREQUENTLY_INTERVAL_MINUTES};
use chrono::{DateTime, Datelike, Timelike, Utc};

/// Canonical bucket identifier for `ts` under `frequency`
pub fn period_key(ts: DateTime<Utc>, frequency: Frequency) -> String {
    match frequency {
        Frequency::Frequently => {
            let minute = (ts.minute() / FREQUENTLY_INTERVAL_MINUTES) * FREQUENTLY_INTERVAL_MINUTES;
            format!("{} {:02}:{:02}", ts.format("%Y-%m-%d"), ts.hour(), minute)
        }
        Frequency::Hourly => ts.format("%Y-%m-%d %H").to_string(),
        Frequency::Daily => ts.format("%Y-%m-%d").to_string(),
        Frequency::Weekly => {
            let week = ts.iso_week();
            format!("{:04}-W{:02}", week.year(), week.week())
        }
        Frequency::Monthly => ts.format("%Y-%m").to_string(),
        Frequency::Yearly => ts.format("%Y").to_string(),
    }
}

/// Bucket identifier for a raw frequency label
///
/// Unrecognized labels get a second-precision key, so every snapshot is
/// its own bucket.
pub fn period_key_for_label(ts: DateTime<Utc>, label: &str) -> String {
    match label.parse::<Frequency>() {
        Ok(frequency) => period_key(ts, frequency),
        Err(_) => ts.format("%Y-%m-%d %H:%M:%S").to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_key_shapes() {
        let ts = at(2026, 1, 25, 14, 30, 45);
        assert_eq!(period_key(ts, Frequency::Frequently), "2026-01-25 14:30");
        assert_eq!(period_key(ts, Frequency::Hourly), "2026-01-25 14");
        assert_eq!(period_key(ts, Frequency::Daily), "2026-01-25");
        assert_eq!(period_key(ts, Frequency::Weekly), "2026-W04");
        assert_eq!(period_key(ts, Frequency::Monthly), "2026-01");
        assert_eq!(period_key(ts, Frequency::Yearly), "2026");
    }

    #[test]
    fn test_frequently_floors_to_interval() {
        assert_eq!(period_key(at(2026, 1, 25, 14, 0, 0), Frequency::Frequently), "2026-01-25 14:00");
        assert_eq!(period_key(at(2026, 1, 25, 14, 14, 59), Frequency::Frequently), "2026-01-25 14:00");
        assert_eq!(period_key(at(2026, 1, 25, 14, 15, 0), Frequency::Frequently), "2026-01-25 14:15");
        assert_eq!(period_key(at(2026, 1, 25, 14, 59, 59), Frequency::Frequently), "2026-01-25 14:45");
    }

    #[test]
    fn test_hourly_same_hour_same_key() {
        let start = at(2026, 1, 25, 14, 0, 0);
        let expected = period_key(start, Frequency::Hourly);
        for secs in (0..3600).step_by(7) {
            let ts = start + Duration::seconds(secs);
            assert_eq!(period_key(ts, Frequency::Hourly), expected);
        }
        let next = start + Duration::hours(1);
        assert_ne!(period_key(next, Frequency::Hourly), expected);
        assert_ne!(period_key(start - Duration::seconds(1), Frequency::Hourly), expected);
    }

    #[test]
    fn test_day_boundaries() {
        let evening = period_key(at(2026, 1, 25, 23, 59, 59), Frequency::Daily);
        let morning = period_key(at(2026, 1, 25, 0, 0, 0), Frequency::Daily);
        let next = period_key(at(2026, 1, 26, 0, 0, 0), Frequency::Daily);
        assert_eq!(evening, morning);
        assert_ne!(evening, next);
    }

    #[test]
    fn test_weekly_follows_iso_weeks() {
        // Sunday closes ISO week 4, Monday opens week 5
        assert_eq!(period_key(at(2026, 1, 25, 10, 0, 0), Frequency::Weekly), "2026-W04");
        assert_eq!(period_key(at(2026, 1, 26, 10, 0, 0), Frequency::Weekly), "2026-W05");
        assert_eq!(period_key(at(2026, 2, 2, 10, 0, 0), Frequency::Weekly), "2026-W06");
    }

    #[test]
    fn test_weekly_uses_iso_year_at_year_edges() {
        assert_eq!(period_key(at(2024, 12, 30, 12, 0, 0), Frequency::Weekly), "2025-W01");
        assert_eq!(period_key(at(2021, 1, 1, 12, 0, 0), Frequency::Weekly), "2020-W53");
    }

    #[test]
    fn test_month_and_year_boundaries() {
        assert_eq!(period_key(at(2026, 1, 31, 23, 59, 59), Frequency::Monthly), "2026-01");
        assert_eq!(period_key(at(2026, 2, 1, 0, 0, 0), Frequency::Monthly), "2026-02");
        assert_eq!(period_key(at(2026, 12, 31, 23, 59, 59), Frequency::Yearly), "2026");
        assert_eq!(period_key(at(2027, 1, 1, 0, 0, 0), Frequency::Yearly), "2027");
    }

    #[test]
    fn test_unrecognized_label_falls_back_to_full_timestamp() {
        let ts = at(2026, 1, 25, 14, 30, 45);
        assert_eq!(period_key_for_label(ts, "fortnightly"), "2026-01-25 14:30:45");
        assert_eq!(period_key_for_label(ts, ""), "2026-01-25 14:30:45");
        assert_eq!(period_key_for_label(ts, "daily"), "2026-01-25");
    }
}
