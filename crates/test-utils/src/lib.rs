//! Shared test utilities for the agro-climatic pipeline workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Scratch directories and store paths
//! - Synthetic cubes, grids and daily series
//! - Small NetCDF files written on the fly
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```

pub mod fixtures;
pub mod generators;
pub mod paths;

// Re-export commonly used items at the crate root
pub use fixtures::*;
pub use generators::*;
pub use paths::*;

/// Assert two values are within `epsilon` of each other, as `f64`.
///
/// Used for rainfall totals and degree days, where unit conversion
/// (flux to mm, Kelvin to Celsius) leaves rounding noise.
///
/// ```ignore
/// assert_approx_eq!(total_mm, 94.0, 1e-6);
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($actual:expr, $expected:expr, $epsilon:expr) => {{
        let actual = $actual as f64;
        let expected = $expected as f64;
        let epsilon = $epsilon as f64;
        if !((actual - expected).abs() <= epsilon) {
            panic!(
                "values differ by more than {}: actual {}, expected {}",
                epsilon, actual, expected
            );
        }
    }};
}
