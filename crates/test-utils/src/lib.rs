//! Shared test utilities for the spectral synthesis workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Synthetic atmosphere generators
//! - An in-memory cube loader and raw cube files on disk
//! - Temporary output locations
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
//! use test_utils::{synthetic_cubes, MemoryLoader};
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
        if diff > epsilon {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}

/// Element-wise approximate equality of two arrays of the same shape.
///
/// NaN compares equal to NaN, so unwritten fill values can be checked too.
///
/// ```ignore
/// use test_utils::assert_arrays_close;
///
/// assert_arrays_close!(serial.view(), distributed.view(), 1e-6);
/// ```
#[macro_export]
macro_rules! assert_arrays_close {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left = $left;
        let right = $right;
        assert_eq!(left.shape(), right.shape(), "array shapes differ");
        for (i, (a, b)) in left.iter().zip(right.iter()).enumerate() {
            let a = *a as f64;
            let b = *b as f64;
            if a.is_nan() && b.is_nan() {
                continue;
            }
            let diff = (a - b).abs();
            if !(diff <= $epsilon as f64) {
                panic!(
                    "arrays differ at flat index {}: {:?} vs {:?} (diff {:?})",
                    i, a, b, diff
                );
            }
        }
    }};
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    #[test]
    fn test_assert_approx_eq_passes() {
        assert_approx_eq!(1.0001, 1.0, 0.001);
        assert_approx_eq!(0.0, 0.0, 0.0001);
        assert_approx_eq!(-5.5, -5.500001, 0.0001);
    }

    #[test]
    #[should_panic(expected = "assertion failed")]
    fn test_assert_approx_eq_fails() {
        assert_approx_eq!(1.1, 1.0, 0.001);
    }

    #[test]
    fn test_assert_arrays_close_treats_nan_as_equal() {
        let a = array![1.0_f32, f32::NAN, 3.0];
        let b = array![1.0_f32, f32::NAN, 3.000001];
        assert_arrays_close!(a.view(), b.view(), 1e-4);
    }

    #[test]
    #[should_panic(expected = "arrays differ")]
    fn test_assert_arrays_close_fails() {
        let a = array![1.0_f64, 2.0];
        let b = array![1.0_f64, 2.5];
        assert_arrays_close!(a.view(), b.view(), 1e-3);
    }
}
