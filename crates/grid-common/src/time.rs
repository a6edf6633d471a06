//! Time handling utilities for meteorological data.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A closed time range for selections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, dt: &DateTime<Utc>) -> bool {
        dt >= &self.start && dt <= &self.end
    }
}

/// Seconds since the Unix epoch, including the sub-second part.
pub fn epoch_seconds(dt: &DateTime<Utc>) -> f64 {
    dt.timestamp() as f64 + f64::from(dt.timestamp_subsec_nanos()) * 1e-9
}

/// Day of the year, 1-based (1..=365, or 1..=366 in leap years).
pub fn day_of_year(dt: &DateTime<Utc>) -> u32 {
    dt.ordinal()
}

/// Gregorian leap year test.
pub fn is_leap_year(year: i32) -> bool {
    NaiveDate::from_ymd_opt(year, 2, 29).is_some()
}

pub fn days_in_year(year: i32) -> u32 {
    if is_leap_year(year) {
        366
    } else {
        365
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_day_of_year() {
        let jan1 = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        let dec31_leap = Utc.with_ymd_and_hms(2024, 12, 31, 18, 0, 0).unwrap();
        assert_eq!(day_of_year(&jan1), 1);
        assert_eq!(day_of_year(&dec31_leap), 366);
    }

    #[test]
    fn test_leap_years() {
        assert!(is_leap_year(2000));
        assert!(is_leap_year(2024));
        assert!(!is_leap_year(1900));
        assert!(!is_leap_year(2023));
        assert_eq!(days_in_year(2024), 366);
        assert_eq!(days_in_year(2023), 365);
    }

    #[test]
    fn test_epoch_seconds() {
        let dt = Utc.with_ymd_and_hms(1970, 1, 1, 1, 0, 0).unwrap();
        assert_eq!(epoch_seconds(&dt), 3600.0);
    }

    #[test]
    fn test_time_range_contains() {
        let start = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 16, 0, 0, 0).unwrap();
        let range = TimeRange::new(start, end);
        assert!(range.contains(&start));
        assert!(range.contains(&end));
        assert!(!range.contains(&Utc.with_ymd_and_hms(2024, 1, 17, 0, 0, 0).unwrap()));
    }
}
