//! Common types and utilities shared across the grid workspace.

pub mod error;
pub mod time;
pub mod units;

pub use error::{UnitError, UnitResult};
pub use time::{day_of_year, days_in_year, epoch_seconds, is_leap_year, TimeRange};
pub use units::{Conversion, Dimension, QuantityTag, Unit};
