//! Common test fixtures: in-memory cubes and small NetCDF files.

use std::path::Path;

use chrono::NaiveDate;
use climate_common::{RepresentativePoint, SeriesKey};
use netcdf_parser::MemoryCube;

use crate::generators::{pattern_slice, regular_grid};

/// Identifying columns used across store and ingestion tests.
pub fn sample_key(variable: &str) -> SeriesKey {
    SeriesKey::new(variable, "ssp370", "CNRM-ESM2-1", "CNRM-ALADIN64E1", "r1")
}

/// Two target points inside the grid built by [`pattern_cube`].
pub fn sample_points() -> Vec<RepresentativePoint> {
    vec![
        RepresentativePoint::new("north-east", 48.42, 1.31, "test"),
        RepresentativePoint::new("south-west", 48.02, 1.04, "test"),
    ]
}

/// `days` daily slices over a `rows x cols` grid at 0.1 degree spacing from
/// (48.0, 1.0), filled with [`pattern_slice`] values.
pub fn pattern_cube(variable: &str, rows: usize, cols: usize, days: usize, start: NaiveDate) -> MemoryCube {
    let slices = (0..days).map(|t| pattern_slice(t, rows, cols)).collect();
    MemoryCube::daily(variable, regular_grid(rows, cols, 48.0, 1.0, 0.1), start, slices)
        .expect("consistent pattern cube")
}

/// Description of a NetCDF file to write with [`write_netcdf_cube`].
#[derive(Debug, Clone)]
pub struct CubeFile {
    pub variable: String,
    pub rows: usize,
    pub cols: usize,
    /// 1D latitudes (len `rows`) or 2D row-major latitudes when `curvilinear`
    pub lats: Vec<f64>,
    pub lons: Vec<f64>,
    pub curvilinear: bool,
    pub time_units: String,
    pub calendar: String,
    pub times: Vec<f64>,
    /// Time-major, then row-major over `(row, col)`
    pub values: Vec<f32>,
    pub fill_value: Option<f32>,
    /// Store the variable as `(time, lon, lat)`
    pub transposed: bool,
}

impl CubeFile {
    /// Regular grid at 0.1 degree spacing from (48.0, 1.0) with pattern values.
    pub fn pattern(variable: &str, rows: usize, cols: usize, days: usize) -> Self {
        let values = (0..days)
            .flat_map(|t| pattern_slice(t, rows, cols))
            .map(|v| v.unwrap_or(f64::NAN) as f32)
            .collect();
        Self {
            variable: variable.to_string(),
            rows,
            cols,
            lats: (0..rows).map(|i| 48.0 + i as f64 * 0.1).collect(),
            lons: (0..cols).map(|j| 1.0 + j as f64 * 0.1).collect(),
            curvilinear: false,
            time_units: "days since 2030-01-01 00:00:00".to_string(),
            calendar: "standard".to_string(),
            times: (0..days).map(|t| t as f64 + 0.5).collect(),
            values,
            fill_value: None,
            transposed: false,
        }
    }
}

/// Write a small `(time, y, x)` cube to `path`.
pub fn write_netcdf_cube(path: &Path, cube: &CubeFile) -> Result<(), netcdf::Error> {
    let mut file = netcdf::create(path)?;

    let (y_dim, x_dim) = if cube.curvilinear { ("y", "x") } else { ("lat", "lon") };
    file.add_dimension("time", cube.times.len())?;
    file.add_dimension(y_dim, cube.rows)?;
    file.add_dimension(x_dim, cube.cols)?;

    {
        let mut time_var = file.add_variable::<f64>("time", &["time"])?;
        time_var.put_attribute("units", cube.time_units.as_str())?;
        time_var.put_attribute("calendar", cube.calendar.as_str())?;
        time_var.put_values(&cube.times, ..)?;
    }

    {
        let coord_dims: &[&str] = if cube.curvilinear { &[y_dim, x_dim] } else { &[y_dim] };
        let mut lat_var = file.add_variable::<f64>("lat", coord_dims)?;
        lat_var.put_attribute("units", "degrees_north")?;
        lat_var.put_values(&cube.lats, ..)?;
    }

    {
        let coord_dims: &[&str] = if cube.curvilinear { &[y_dim, x_dim] } else { &[x_dim] };
        let mut lon_var = file.add_variable::<f64>("lon", coord_dims)?;
        lon_var.put_attribute("units", "degrees_east")?;
        lon_var.put_values(&cube.lons, ..)?;
    }

    {
        let data_dims: [&str; 3] = if cube.transposed {
            ["time", x_dim, y_dim]
        } else {
            ["time", y_dim, x_dim]
        };
        let mut var = file.add_variable::<f32>(&cube.variable, &data_dims)?;
        if let Some(fill) = cube.fill_value {
            var.put_attribute("_FillValue", fill)?;
        }
        let values = if cube.transposed {
            transpose_slices(&cube.values, cube.rows, cube.cols)
        } else {
            cube.values.clone()
        };
        var.put_values(&values, ..)?;
    }

    Ok(())
}

/// Reorder each `(row, col)` slice into `(col, row)`.
fn transpose_slices(values: &[f32], rows: usize, cols: usize) -> Vec<f32> {
    let cells = rows * cols;
    let mut out = Vec::with_capacity(values.len());
    for slice in values.chunks(cells) {
        for col in 0..cols {
            for row in 0..rows {
                out.push(slice[row * cols + col]);
            }
        }
    }
    out
}
