//! Absolute and relative dates used by age predicates

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use std::fmt;

use crate::check_date::format_check_date;

/// Largest accepted shift of a relative date, in days (10 000 years)
pub const MAX_RELATIVE_DAYS: f64 = 3_652_500.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateUnit {
    Years,
    Months,
    Weeks,
    Days,
}

impl DateUnit {
    pub fn in_days(&self) -> f64 {
        match self {
            DateUnit::Years => 365.25,
            DateUnit::Months => 30.5,
            DateUnit::Weeks => 7.0,
            DateUnit::Days => 1.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DateUnit::Years => "years",
            DateUnit::Months => "months",
            DateUnit::Weeks => "weeks",
            DateUnit::Days => "days",
        }
    }
}

/// A threshold date, either fixed or relative to now
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DateFilter {
    /// `today`, optionally shifted; negative amounts lie in the past
    Relative { amount: f64, unit: DateUnit },
    Fixed(NaiveDate),
}

impl DateFilter {
    pub fn today() -> Self {
        DateFilter::Relative {
            amount: 0.0,
            unit: DateUnit::Days,
        }
    }

    pub fn relative(amount: f64, unit: DateUnit) -> Self {
        DateFilter::Relative { amount, unit }
    }

    /// Shift from now in days; `None` for fixed dates
    pub fn delta_days(&self) -> Option<f64> {
        match self {
            DateFilter::Relative { amount, unit } => Some(amount * unit.in_days()),
            DateFilter::Fixed(_) => None,
        }
    }

    /// Calendar day (UTC) this filter resolves to at `now`.
    ///
    /// Shifts beyond the representable range saturate to the earliest or
    /// latest date.
    pub fn date_at(&self, now: DateTime<Utc>) -> NaiveDate {
        match self {
            DateFilter::Fixed(date) => *date,
            DateFilter::Relative { amount, unit } => {
                let days = amount * unit.in_days();
                let saturated = if days < 0.0 {
                    NaiveDate::MIN
                } else {
                    NaiveDate::MAX
                };
                if !days.is_finite() {
                    return saturated;
                }
                TimeDelta::try_seconds((days * 86_400.0).round() as i64)
                    .and_then(|delta| now.checked_add_signed(delta))
                    .map(|date| date.date_naive())
                    .unwrap_or(saturated)
            }
        }
    }
}

fn format_amount(amount: f64) -> String {
    if amount.fract() == 0.0 {
        format!("{}", amount as i64)
    } else {
        format!("{}", amount)
    }
}

impl fmt::Display for DateFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateFilter::Fixed(date) => f.write_str(&format_check_date(*date)),
            DateFilter::Relative { amount, .. } if *amount == 0.0 => f.write_str("today"),
            DateFilter::Relative { amount, unit } => {
                let sign = if *amount < 0.0 { '-' } else { '+' };
                write!(
                    f,
                    "today {}{} {}",
                    sign,
                    format_amount(amount.abs()),
                    unit.as_str()
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_relative_years() {
        let now = Utc.with_ymd_and_hms(2020, 6, 1, 12, 0, 0).unwrap();
        let date = DateFilter::relative(-8.0, DateUnit::Years).date_at(now);
        assert_eq!(date, NaiveDate::from_ymd_opt(2012, 6, 1).unwrap());
    }

    #[test]
    fn test_huge_shift_saturates() {
        let now = Utc.with_ymd_and_hms(2020, 6, 1, 12, 0, 0).unwrap();
        let past = DateFilter::relative(-1_000_000.0, DateUnit::Years).date_at(now);
        assert_eq!(past, NaiveDate::MIN);
        let future = DateFilter::relative(f64::MAX, DateUnit::Days).date_at(now);
        assert_eq!(future, NaiveDate::MAX);
    }

    #[test]
    fn test_display() {
        assert_eq!(DateFilter::today().to_string(), "today");
        assert_eq!(
            DateFilter::relative(-8.0, DateUnit::Years).to_string(),
            "today -8 years"
        );
        assert_eq!(
            DateFilter::relative(1.5, DateUnit::Weeks).to_string(),
            "today +1.5 weeks"
        );
        let fixed = DateFilter::Fixed(NaiveDate::from_ymd_opt(2000, 11, 11).unwrap());
        assert_eq!(fixed.to_string(), "2000-11-11");
    }
}
