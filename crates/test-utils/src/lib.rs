//! Shared test utilities for the grid-math workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Approximate comparison macros for `f32`/`f64` samples
//! - Synthetic buffers (flows, temperature and theta profiles) laid out
//!   x fastest, then y, then z
//! - Common fixtures (pressure levels, reference times, atmosphere values)
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{assert_approx_eq, create_rotational_flow, fixtures};
//! ```

pub mod fixtures;
pub mod generators;

// Re-export commonly used items at the crate root
pub use fixtures::*;
pub use generators::*;

/// Macro for approximate floating-point equality assertions.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(1.0001_f64, 1.0_f64, 0.001_f64); // passes
/// assert_approx_eq!(1.1_f32, 1.0_f32, 0.001_f32);    // fails
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if !(diff <= epsilon) {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}

/// Macro for approximate equality of two sample slices.
///
/// NaN is considered equal to NaN at the same position, so masked output
/// can be compared directly.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_samples_approx_eq;
///
/// assert_samples_approx_eq!(&[1.0001_f32, f32::NAN], &[1.0_f32, f32::NAN], 0.001);
/// ```
#[macro_export]
macro_rules! assert_samples_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left = $left;
        let right = $right;
        assert_eq!(left.len(), right.len(), "sample counts differ");
        for (i, (&l, &r)) in left.iter().zip(right.iter()).enumerate() {
            let (l, r) = (l as f64, r as f64);
            if l.is_nan() || r.is_nan() {
                assert!(
                    l.is_nan() && r.is_nan(),
                    "NaN mismatch at index {}: {} vs {}",
                    i,
                    l,
                    r
                );
                continue;
            }
            let diff = (l - r).abs();
            if diff > $epsilon as f64 {
                panic!(
                    "assertion failed at index {}: `{:?}` vs `{:?}` (diff {:?})",
                    i, l, r, diff
                );
            }
        }
    }};
}
