//! Retention frequencies

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Width of a `frequently` bucket in minutes
pub const FREQUENTLY_INTERVAL_MINUTES: u32 = 15;

/// A named retention tier
///
/// The set is closed: snapshot names carrying any other suffix are not
/// managed by autosnap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    /// Sub-hourly tier (fixed 15 minute buckets)
    Frequently,
    Hourly,
    Daily,
    /// ISO-8601 weeks
    Weekly,
    Monthly,
    Yearly,
}

/// Error returned when a label is not a known frequency
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown frequency '{0}' (expected one of: frequently, hourly, daily, weekly, monthly, yearly)")]
pub struct ParseFrequencyError(pub String);

impl Frequency {
    /// All recognized frequencies, shortest period first
    pub const ALL: [Frequency; 6] = [
        Frequency::Frequently,
        Frequency::Hourly,
        Frequency::Daily,
        Frequency::Weekly,
        Frequency::Monthly,
        Frequency::Yearly,
    ];

    /// The tiers managed by default
    pub const STANDARD: [Frequency; 5] = [
        Frequency::Hourly,
        Frequency::Daily,
        Frequency::Weekly,
        Frequency::Monthly,
        Frequency::Yearly,
    ];

    /// Label used in snapshot names and configuration
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Frequently => "frequently",
            Frequency::Hourly => "hourly",
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
            Frequency::Yearly => "yearly",
        }
    }

    /// Fixed length of one period
    ///
    /// Months count as 4 weeks and years as 52 weeks. Bucketing still uses
    /// real calendar periods; only retention cutoffs use these lengths.
    pub fn period_length(&self) -> Duration {
        match self {
            Frequency::Frequently => Duration::minutes(FREQUENTLY_INTERVAL_MINUTES as i64),
            Frequency::Hourly => Duration::hours(1),
            Frequency::Daily => Duration::days(1),
            Frequency::Weekly => Duration::weeks(1),
            Frequency::Monthly => Duration::weeks(4),
            Frequency::Yearly => Duration::weeks(52),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = ParseFrequencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "frequently" => Ok(Frequency::Frequently),
            "hourly" => Ok(Frequency::Hourly),
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            "yearly" => Ok(Frequency::Yearly),
            other => Err(ParseFrequencyError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_round_trip() {
        for freq in Frequency::ALL {
            assert_eq!(freq.as_str().parse::<Frequency>().unwrap(), freq);
        }
    }

    #[test]
    fn test_unknown_label_rejected() {
        let err = "biweekly".parse::<Frequency>().unwrap_err();
        assert_eq!(err, ParseFrequencyError("biweekly".to_string()));
        assert!("Hourly".parse::<Frequency>().is_err());
        assert!("".parse::<Frequency>().is_err());
    }

    #[test]
    fn test_period_lengths() {
        assert_eq!(Frequency::Frequently.period_length(), Duration::minutes(15));
        assert_eq!(Frequency::Hourly.period_length(), Duration::hours(1));
        assert_eq!(Frequency::Daily.period_length(), Duration::hours(24));
        assert_eq!(Frequency::Weekly.period_length(), Duration::days(7));
        assert_eq!(Frequency::Monthly.period_length(), Duration::days(28));
        assert_eq!(Frequency::Yearly.period_length(), Duration::days(364));
    }

    #[test]
    fn test_serde_uses_lowercase_labels() {
        let json = serde_json::to_string(&Frequency::Weekly).unwrap();
        assert_eq!(json, "\"weekly\"");
        let parsed: Frequency = serde_json::from_str("\"yearly\"").unwrap();
        assert_eq!(parsed, Frequency::Yearly);
    }
}
