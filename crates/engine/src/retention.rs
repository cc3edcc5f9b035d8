//! Retention policies

use autosnap_core::Frequency;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Upper bound for a retention window, far beyond any sane configuration
const MAX_WINDOW_SECS: i64 = 100_000 * 366 * 24 * 60 * 60;

/// Retention policy configuration
///
/// A count of 0 disables a frequency: nothing new is created and every
/// existing snapshot of it is removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetentionPolicy {
    /// 15-minute snapshots to keep (default: unmanaged)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequently: Option<u32>,
    /// Hourly snapshots to keep (default: 24)
    pub hourly: u32,
    /// Daily snapshots to keep (default: 7)
    pub daily: u32,
    /// Weekly snapshots to keep (default: 4)
    pub weekly: u32,
    /// Monthly snapshots to keep (default: 12)
    pub monthly: u32,
    /// Yearly snapshots to keep (default: 3)
    pub yearly: u32,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            frequently: None,
            hourly: 24,
            daily: 7,
            weekly: 4,
            monthly: 12,
            yearly: 3,
        }
    }
}

impl RetentionPolicy {
    /// Configured count, or None if the frequency is not managed at all
    pub fn max_count(&self, frequency: Frequency) -> Option<u32> {
        match frequency {
            Frequency::Frequently => self.frequently,
            Frequency::Hourly => Some(self.hourly),
            Frequency::Daily => Some(self.daily),
            Frequency::Weekly => Some(self.weekly),
            Frequency::Monthly => Some(self.monthly),
            Frequency::Yearly => Some(self.yearly),
        }
    }

    /// Frequencies processed on every run, shortest first
    pub fn frequencies(&self) -> Vec<Frequency> {
        Frequency::ALL
            .into_iter()
            .filter(|f| self.max_count(*f).is_some())
            .collect()
    }

    /// Managed but retired (count 0)
    pub fn is_disabled(&self, frequency: Frequency) -> bool {
        self.max_count(frequency) == Some(0)
    }

    /// Oldest creation time still inside the retention window
    ///
    /// `now - count × period_length`. Unmanaged and disabled frequencies
    /// retain nothing, so the cutoff is `now`.
    pub fn max_retained_date(&self, frequency: Frequency, now: DateTime<Utc>) -> DateTime<Utc> {
        let count = i64::from(self.max_count(frequency).unwrap_or(0));
        let window_secs = frequency
            .period_length()
            .num_seconds()
            .saturating_mul(count)
            .min(MAX_WINDOW_SECS);
        now.checked_sub_signed(Duration::seconds(window_secs))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Oldest creation time that still counts as covering the current period
    pub fn freshness_boundary(&self, frequency: Frequency, now: DateTime<Utc>) -> DateTime<Utc> {
        now - frequency.period_length()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 25, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_defaults() {
        let policy = RetentionPolicy::default();
        assert_eq!(policy.max_count(Frequency::Hourly), Some(24));
        assert_eq!(policy.max_count(Frequency::Yearly), Some(3));
        assert_eq!(policy.max_count(Frequency::Frequently), None);
        assert_eq!(policy.frequencies(), Frequency::STANDARD.to_vec());
    }

    #[test]
    fn test_frequently_opt_in() {
        let policy = RetentionPolicy { frequently: Some(4), ..Default::default() };
        assert_eq!(policy.frequencies()[0], Frequency::Frequently);
        assert_eq!(policy.frequencies().len(), 6);
    }

    #[test]
    fn test_max_retained_date() {
        let policy = RetentionPolicy::default();
        let now = now();
        assert_eq!(policy.max_retained_date(Frequency::Hourly, now), now - Duration::hours(24));
        assert_eq!(policy.max_retained_date(Frequency::Daily, now), now - Duration::days(7));
        assert_eq!(policy.max_retained_date(Frequency::Weekly, now), now - Duration::days(28));
        assert_eq!(policy.max_retained_date(Frequency::Monthly, now), now - Duration::days(12 * 28));
        assert_eq!(policy.max_retained_date(Frequency::Yearly, now), now - Duration::days(3 * 364));
        assert_eq!(policy.max_retained_date(Frequency::Frequently, now), now);
    }

    #[test]
    fn test_freshness_boundary() {
        let policy = RetentionPolicy::default();
        let now = now();
        assert_eq!(policy.freshness_boundary(Frequency::Hourly, now), now - Duration::hours(1));
        assert_eq!(policy.freshness_boundary(Frequency::Daily, now), now - Duration::hours(24));
        assert_eq!(policy.freshness_boundary(Frequency::Weekly, now), now - Duration::days(7));
        assert_eq!(policy.freshness_boundary(Frequency::Monthly, now), now - Duration::days(28));
        assert_eq!(policy.freshness_boundary(Frequency::Yearly, now), now - Duration::days(364));
    }

    #[test]
    fn test_disabled_frequency() {
        let policy = RetentionPolicy { weekly: 0, ..Default::default() };
        assert!(policy.is_disabled(Frequency::Weekly));
        assert!(!policy.is_disabled(Frequency::Daily));
        assert!(!policy.is_disabled(Frequency::Frequently));
        assert!(policy.frequencies().contains(&Frequency::Weekly));
        assert_eq!(policy.max_retained_date(Frequency::Weekly, now()), now());
    }

    #[test]
    fn test_huge_counts_do_not_overflow() {
        let policy = RetentionPolicy { yearly: u32::MAX, ..Default::default() };
        let cutoff = policy.max_retained_date(Frequency::Yearly, now());
        assert!(cutoff < now());
    }

    #[test]
    fn test_deserialize_partial_table() {
        let policy: RetentionPolicy = serde_json::from_str(r#"{"daily": 14}"#).unwrap();
        assert_eq!(policy.daily, 14);
        assert_eq!(policy.hourly, 24);
        assert!(serde_json::from_str::<RetentionPolicy>(r#"{"fortnightly": 2}"#).is_err());
    }
}
