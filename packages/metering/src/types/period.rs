//! Billing periods: the (year, month) bucket a run extracts for.

use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// A calendar month in UTC, the unit watermark state is keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BillingPeriod {
    pub year: i32,
    pub month: u32,
}

impl BillingPeriod {
    /// The period containing the given instant.
    pub fn containing(ts: DateTime<Utc>) -> Self {
        Self {
            year: ts.year(),
            month: ts.month(),
        }
    }

    /// First instant of the period.
    pub fn start(&self) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(self.year, self.month, 1, 0, 0, 0)
            .single()
            .unwrap_or_else(|| panic!("invalid billing period {}-{}", self.year, self.month))
    }

    /// Four-digit year label used in query predicates and log context.
    pub fn year_str(&self) -> String {
        format!("{:04}", self.year)
    }

    /// Zero-padded month label used in query predicates and log context.
    pub fn month_str(&self) -> String {
        format!("{:02}", self.month)
    }
}

impl std::fmt::Display for BillingPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_containing_and_start() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 15, 10, 30, 0).unwrap();
        let period = BillingPeriod::containing(ts);
        assert_eq!(period, BillingPeriod { year: 2024, month: 3 });
        assert_eq!(
            period.start(),
            Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_labels_are_zero_padded() {
        let period = BillingPeriod { year: 2024, month: 3 };
        assert_eq!(period.year_str(), "2024");
        assert_eq!(period.month_str(), "03");
        assert_eq!(period.to_string(), "2024-03");
    }
}
