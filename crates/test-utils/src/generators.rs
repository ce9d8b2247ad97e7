//! Synthetic data generators with predictable, verifiable patterns.

use chrono::NaiveDate;
use climate_common::{DailySeries, GridAxis};

/// Seconds per day, the flux-to-depth factor for precipitation.
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Shorthand for a calendar date in tests.
pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid test date")
}

/// Regular grid with `rows` latitudes from `lat0` and `cols` longitudes
/// from `lon0`, both ascending by `step` degrees.
pub fn regular_grid(rows: usize, cols: usize, lat0: f64, lon0: f64, step: f64) -> GridAxis {
    GridAxis::regular(
        (0..rows).map(|i| lat0 + i as f64 * step).collect(),
        (0..cols).map(|j| lon0 + j as f64 * step).collect(),
    )
}

/// Slice whose cell values encode their position: `t * 1000 + row * 10 + col`.
///
/// Unambiguous while `cols < 10` and `rows < 100`.
pub fn pattern_slice(t: usize, rows: usize, cols: usize) -> Vec<Option<f64>> {
    let mut data = Vec::with_capacity(rows * cols);
    for row in 0..rows {
        for col in 0..cols {
            data.push(Some(pattern_value(t, row, col)));
        }
    }
    data
}

/// Value stored by [`pattern_slice`] at a cell.
pub fn pattern_value(t: usize, row: usize, col: usize) -> f64 {
    (t * 1000 + row * 10 + col) as f64
}

/// Convert daily depths (mm/day) to precipitation flux (kg m-2 s-1).
pub fn mm_to_flux(depths: &[f64]) -> Vec<f64> {
    depths.iter().map(|mm| mm / SECONDS_PER_DAY).collect()
}

/// Convert Celsius temperatures to Kelvin.
pub fn celsius_to_kelvin(temps: &[f64]) -> Vec<f64> {
    temps.iter().map(|c| c + 273.15).collect()
}

/// Consecutive daily series starting at `start`.
pub fn daily_series(start: NaiveDate, values: &[f64]) -> DailySeries {
    DailySeries::from_values(start, values)
}

/// Daily rainfall flux series from mm/day depths.
pub fn rainfall_series(start: NaiveDate, depths_mm: &[f64]) -> DailySeries {
    DailySeries::from_values(start, &mm_to_flux(depths_mm))
}
