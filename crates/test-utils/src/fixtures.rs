//! Common test fixtures for grid-math tests.
//!
//! This module provides pre-defined values that represent common
//! scenarios in meteorological grid processing.

/// Common vertical coordinates.
pub mod levels {
    /// Mandatory pressure levels (hPa), surface first.
    pub const MANDATORY_HPA: [f64; 6] = [1000.0, 850.0, 700.0, 500.0, 300.0, 200.0];

    /// A short pressure column for small volumes (hPa).
    pub const SHORT_COLUMN_HPA: [f64; 3] = [1000.0, 850.0, 700.0];

    /// Height levels (m) for height-based volumes.
    pub const HEIGHTS_M: [f64; 4] = [0.0, 1000.0, 3000.0, 5000.0];
}

/// Common horizontal grid specifications for testing.
pub mod grid {
    /// GFS global grid (0.25 degree resolution)
    pub const GFS_GLOBAL: GridSpec = GridSpec {
        nx: 1440,
        ny: 721,
        first_x: 0.0,
        step_x: 0.25,
        first_y: -90.0,
        step_y: 0.25,
    };

    /// Small geographic patch around 45N used for metric derivative checks.
    pub const MIDLATITUDE_PATCH: GridSpec = GridSpec {
        nx: 5,
        ny: 5,
        first_x: -2.0,
        step_x: 1.0,
        first_y: 43.0,
        step_y: 1.0,
    };

    /// Projected 5x5 grid with unit spacing.
    pub const UNIT_PROJECTED: GridSpec = GridSpec {
        nx: 5,
        ny: 5,
        first_x: -2.0,
        step_x: 1.0,
        first_y: -2.0,
        step_y: 1.0,
    };

    /// Regular grid specification: `first + n * step` along each axis.
    #[derive(Debug, Clone, Copy)]
    pub struct GridSpec {
        pub nx: usize,
        pub ny: usize,
        pub first_x: f64,
        pub step_x: f64,
        pub first_y: f64,
        pub step_y: f64,
    }

    impl GridSpec {
        /// Returns the total number of horizontal points.
        pub fn size(&self) -> usize {
            self.nx * self.ny
        }

        pub fn x_values(&self) -> Vec<f64> {
            (0..self.nx).map(|i| self.first_x + i as f64 * self.step_x).collect()
        }

        pub fn y_values(&self) -> Vec<f64> {
            (0..self.ny).map(|j| self.first_y + j as f64 * self.step_y).collect()
        }
    }
}

/// Common time values for testing.
pub mod time {
    use chrono::{DateTime, Duration, TimeZone, Utc};

    /// A fixed reference time for tests (2024-01-15T12:00:00Z)
    pub fn reference_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0)
            .single()
            .unwrap_or_else(|| DateTime::<Utc>::UNIX_EPOCH)
    }

    /// `count` times spaced `step_hours` apart from the reference time.
    pub fn hourly_times(count: usize, step_hours: i64) -> Vec<DateTime<Utc>> {
        let start = reference_time();
        (0..count)
            .map(|n| start + Duration::hours(step_hours * n as i64))
            .collect()
    }

    /// Noon of every day of `year`, Jan 1 through Dec 31.
    pub fn daily_times(year: i32) -> Vec<DateTime<Utc>> {
        let Some(start) = Utc.with_ymd_and_hms(year, 1, 1, 12, 0, 0).single() else {
            return Vec::new();
        };
        let days = if chrono::NaiveDate::from_ymd_opt(year, 2, 29).is_some() {
            366
        } else {
            365
        };
        (0..days).map(|d| start + Duration::days(d)).collect()
    }

    /// Common forecast hours
    pub const FORECAST_HOURS: [u32; 8] = [0, 1, 3, 6, 12, 24, 48, 120];
}

/// Reference values of the atmosphere used as expectations.
pub mod atmosphere {
    /// Standard-atmosphere height (m) of 500 hPa.
    pub const Z500_M: f64 = 5574.0;
    /// Saturation vapor pressure over water at 20 C (hPa).
    pub const ES_20C_HPA: f64 = 23.37;
    /// Coriolis parameter at 45 degrees (s-1).
    pub const CORIOLIS_45: f64 = 1.0313e-4;
}
