//! Bracketing search over monotonic profiles.
//!
//! Vertical profiles (pressure, height, theta) run in either direction
//! depending on the data, so the direction is detected from the end points
//! and a single binary search handles both.

use serde::{Deserialize, Serialize};

/// Direction of a monotonic sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Increasing,
    Decreasing,
}

impl Direction {
    /// Detect the direction of `values` from its end points.
    ///
    /// Single-element and constant sequences count as increasing. Returns
    /// `None` when an end point is NaN.
    pub fn detect(values: &[f64]) -> Option<Self> {
        let first = *values.first()?;
        let last = *values.last()?;
        if first.is_nan() || last.is_nan() {
            return None;
        }
        if last < first {
            Some(Self::Decreasing)
        } else {
            Some(Self::Increasing)
        }
    }
}

/// Two neighbouring indices enclosing a target value.
///
/// `value = values[lower] + fraction * (values[upper] - values[lower])`.
/// An exact match has `fraction == 0.0` and `lower` pointing at the match.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bracket {
    pub lower: usize,
    pub upper: usize,
    pub fraction: f64,
}

impl Bracket {
    /// Whether the target coincides with `values[lower]`.
    pub fn is_exact(&self) -> bool {
        self.fraction == 0.0
    }

    /// Linearly interpolate a paired sequence at this bracket.
    pub fn interpolate(&self, paired: &[f64]) -> f64 {
        let lo = paired[self.lower];
        if self.is_exact() {
            return lo;
        }
        let hi = paired[self.upper];
        lo + self.fraction * (hi - lo)
    }
}

/// Find the bracket around `target` in a monotonic sequence.
///
/// Returns `None` for NaN targets, empty input and targets outside the
/// sequence's `[min, max]`.
pub fn find_bracket(values: &[f64], target: f64) -> Option<Bracket> {
    if target.is_nan() {
        return None;
    }
    let direction = Direction::detect(values)?;
    let n = values.len();
    let (first, last) = (values[0], values[n - 1]);
    let (min, max) = match direction {
        Direction::Increasing => (first, last),
        Direction::Decreasing => (last, first),
    };
    if target < min || target > max {
        return None;
    }
    if n == 1 {
        return Some(Bracket {
            lower: 0,
            upper: 0,
            fraction: 0.0,
        });
    }

    // invariant: target lies between values[lo] and values[hi]
    let (mut lo, mut hi) = (0usize, n - 1);
    while hi - lo > 1 {
        let mid = lo + (hi - lo) / 2;
        let below = match direction {
            Direction::Increasing => values[mid] <= target,
            Direction::Decreasing => values[mid] >= target,
        };
        if below {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    if values[lo] == target {
        return Some(Bracket {
            lower: lo,
            upper: hi,
            fraction: 0.0,
        });
    }
    if values[hi] == target {
        return Some(Bracket {
            lower: hi,
            upper: hi,
            fraction: 0.0,
        });
    }

    let span = values[hi] - values[lo];
    let fraction = if span == 0.0 || span.is_nan() {
        0.0
    } else {
        (target - values[lo]) / span
    };
    if fraction.is_nan() {
        return None;
    }
    Some(Bracket {
        lower: lo,
        upper: hi,
        fraction,
    })
}

/// Interpolate the coordinate paired with `profile` at which the profile
/// reaches `target`.
///
/// Out-of-range targets give NaN; an exact match returns the paired
/// coordinate of that sample unchanged.
pub fn linear_interpolate_height(profile: &[f64], coordinates: &[f64], target: f64) -> f64 {
    if profile.len() != coordinates.len() {
        return f64::NAN;
    }
    match find_bracket(profile, target) {
        Some(bracket) => bracket.interpolate(coordinates),
        None => f64::NAN,
    }
}
