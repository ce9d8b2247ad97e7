//! Native NetCDF cube reading using the netcdf library.
//!
//! [`NetCdfCube`] resolves the data variable through an alias list, reads
//! and decodes the coordinate and time axes once at open, and then serves
//! one hyperslab per timestep. The slice layout is classified once into a
//! [`SliceAccess`] strategy instead of being re-probed on every read.

use std::path::{Path, PathBuf};
use std::sync::Once;

use climate_common::GridAxis;
use tracing::{debug, warn};

use crate::calendar::TimeDecoder;
use crate::cube::{CubeSource, Slice2D, TimeStep};
use crate::error::{NetCdfError, NetCdfResult};

const TIME_NAMES: &[&str] = &["time", "t"];
const LAT_NAMES: &[&str] = &["lat", "latitude", "nav_lat"];
const LON_NAMES: &[&str] = &["lon", "longitude", "nav_lon"];

/// Silence HDF5's automatic error printing to stderr.
///
/// The HDF5 C library prints diagnostics even when a missing optional
/// attribute is handled on the Rust side. Safe to call more than once.
pub fn silence_hdf5_errors() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: H5Eset_auto2 accepts a null handler to disable printing.
        unsafe {
            hdf5_metno_sys::h5e::H5Eset_auto2(
                hdf5_metno_sys::h5e::H5E_DEFAULT,
                None,
                std::ptr::null_mut(),
            );
        }
    });
}

/// How a timestep slice is pulled out of the data variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceAccess {
    /// Variable laid out `(time, y, x)`: one hyperslab is already row-major.
    Direct,
    /// Any other supported layout. The slice is read with explicit extents
    /// and reordered to `(y, x)`.
    Generic {
        /// A singleton axis (height, level) sits between time and space.
        level_axis: bool,
        /// Spatial axes are stored `(x, y)`.
        transposed: bool,
    },
}

/// Packing and masking attributes of the data variable.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Packing {
    scale_factor: f64,
    add_offset: f64,
    fill_value: Option<f64>,
    missing_value: Option<f64>,
}

impl Packing {
    fn unpack(&self, raw: f64) -> Option<f64> {
        if !raw.is_finite() || Some(raw) == self.fill_value || Some(raw) == self.missing_value {
            return None;
        }
        let value = raw * self.scale_factor + self.add_offset;
        value.is_finite().then_some(value)
    }
}

/// A NetCDF file opened for streaming one timestep at a time.
pub struct NetCdfCube {
    file: netcdf::File,
    path: PathBuf,
    variable: String,
    grid: GridAxis,
    times: Vec<TimeStep>,
    access: SliceAccess,
    packing: Packing,
}

impl std::fmt::Debug for NetCdfCube {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetCdfCube")
            .field("path", &self.path)
            .field("variable", &self.variable)
            .field("shape", &self.grid.shape())
            .field("timesteps", &self.times.len())
            .field("access", &self.access)
            .finish()
    }
}

impl NetCdfCube {
    /// Open a source and select the first variable in `aliases` that exists.
    pub fn open(path: &Path, aliases: &[String]) -> NetCdfResult<Self> {
        silence_hdf5_errors();

        if !path.exists() {
            return Err(NetCdfError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} does not exist", path.display()),
            )));
        }

        let file = netcdf::open(path).map_err(|e| NetCdfError::Open {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let variable = aliases
            .iter()
            .find(|name| file.variable(name).is_some())
            .cloned()
            .ok_or_else(|| NetCdfError::VariableNotFound {
                aliases: aliases.to_vec(),
            })?;

        let (grid, lat_dims) = read_grid(&file)?;
        let times = read_time_axis(&file)?;

        let (access, packing) = {
            let var = file
                .variable(&variable)
                .ok_or_else(|| NetCdfError::MissingData(variable.clone()))?;
            let dims: Vec<(String, usize)> = var
                .dimensions()
                .iter()
                .map(|d| (d.name(), d.len()))
                .collect();
            let access = classify_layout(&dims, &grid, &lat_dims, times.len())?;
            let packing = Packing {
                scale_factor: get_f64_attr(&var, "scale_factor").unwrap_or(1.0),
                add_offset: get_f64_attr(&var, "add_offset").unwrap_or(0.0),
                fill_value: get_f64_attr(&var, "_FillValue"),
                missing_value: get_f64_attr(&var, "missing_value"),
            };
            (access, packing)
        };

        debug!(
            path = %path.display(),
            variable = %variable,
            shape = ?grid.shape(),
            timesteps = times.len(),
            access = ?access,
            "Opened NetCDF cube"
        );

        Ok(Self {
            file,
            path: path.to_path_buf(),
            variable,
            grid,
            times,
            access,
            packing,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn access(&self) -> SliceAccess {
        self.access
    }
}

impl CubeSource for NetCdfCube {
    fn variable_name(&self) -> &str {
        &self.variable
    }

    fn variable_names(&self) -> Vec<String> {
        self.file.variables().map(|v| v.name()).collect()
    }

    fn grid_axis(&self) -> &GridAxis {
        &self.grid
    }

    fn time_axis(&self) -> &[TimeStep] {
        &self.times
    }

    fn read_timestep(&self, index: usize) -> NetCdfResult<Slice2D> {
        if index >= self.times.len() {
            return Err(NetCdfError::TimestepOutOfRange {
                index,
                len: self.times.len(),
            });
        }
        let var = self
            .file
            .variable(&self.variable)
            .ok_or_else(|| NetCdfError::MissingData(self.variable.clone()))?;

        let read_err = |e: netcdf::Error| NetCdfError::Read {
            index,
            message: e.to_string(),
        };
        let (rows, cols) = self.grid.shape();

        let raw: Vec<f64> = match self.access {
            SliceAccess::Direct => var.get_values::<f64, _>((index, .., ..)).map_err(read_err)?,
            SliceAccess::Generic { level_axis, transposed } => {
                let raw = if level_axis {
                    var.get_values::<f64, _>((index, 0usize, .., ..)).map_err(read_err)?
                } else {
                    var.get_values::<f64, _>((index, .., ..)).map_err(read_err)?
                };
                if transposed {
                    transpose(&raw, cols, rows)
                } else {
                    raw
                }
            }
        };

        if raw.len() != rows * cols {
            return Err(NetCdfError::Read {
                index,
                message: format!("read {} values, expected {}", raw.len(), rows * cols),
            });
        }

        Ok(Slice2D {
            rows,
            cols,
            values: raw.into_iter().map(|v| self.packing.unpack(v)).collect(),
        })
    }
}

/// Read coordinate variables into a grid axis. Also returns the dimension
/// names of the latitude variable, used to recognise the data layout.
fn read_grid(file: &netcdf::File) -> NetCdfResult<(GridAxis, Vec<String>)> {
    let lat_var = find_variable(file, LAT_NAMES)
        .ok_or_else(|| NetCdfError::MissingData("latitude coordinate".to_string()))?;
    let lon_var = find_variable(file, LON_NAMES)
        .ok_or_else(|| NetCdfError::MissingData("longitude coordinate".to_string()))?;

    let lats = read_coordinate(&lat_var)?;
    let lons = read_coordinate(&lon_var)?;

    let lat_dims: Vec<(String, usize)> = lat_var
        .dimensions()
        .iter()
        .map(|d| (d.name(), d.len()))
        .collect();
    let lon_ndims = lon_var.dimensions().len();

    let grid = match (lat_dims.len(), lon_ndims) {
        (1, 1) => GridAxis::regular(lats, lons),
        (2, 2) => GridAxis::curvilinear(lat_dims[0].1, lat_dims[1].1, lats, lons)?,
        (a, b) => {
            return Err(NetCdfError::InvalidFormat(format!(
                "unsupported coordinate ranks: lat {}D, lon {}D",
                a, b
            )))
        }
    };
    let mut names: Vec<String> = lat_dims.into_iter().map(|(name, _)| name).collect();
    if lon_ndims == 1 {
        names.extend(lon_var.dimensions().iter().map(|d| d.name()));
    }
    Ok((grid, names))
}

fn read_coordinate(var: &netcdf::Variable) -> NetCdfResult<Vec<f64>> {
    var.get_values::<f64, _>(..)
        .map_err(|e| NetCdfError::InvalidFormat(format!("{}: {}", var.name(), e)))
}

fn read_time_axis(file: &netcdf::File) -> NetCdfResult<Vec<TimeStep>> {
    let time_var = find_variable(file, TIME_NAMES)
        .ok_or_else(|| NetCdfError::MissingData("time coordinate".to_string()))?;
    let units = get_string_attr(&time_var, "units")
        .ok_or_else(|| NetCdfError::MissingData("time units".to_string()))?;
    let calendar = get_string_attr(&time_var, "calendar");
    let decoder = TimeDecoder::from_attributes(&units, calendar.as_deref())?;

    let raw: Vec<f64> = time_var
        .get_values::<f64, _>(..)
        .map_err(|e| NetCdfError::InvalidFormat(format!("time: {}", e)))?;

    if raw.windows(2).any(|w| w[1] <= w[0]) {
        warn!(units = %units, "Time axis is not strictly increasing");
    }

    Ok(raw
        .iter()
        .enumerate()
        .map(|(index, value)| TimeStep {
            index,
            date: decoder.decode(*value),
        })
        .collect())
}

/// Decide how a timestep slice maps onto the grid.
///
/// `lat_dims` holds the latitude-like dimension name first, then the
/// longitude-like one.
fn classify_layout(
    dims: &[(String, usize)],
    grid: &GridAxis,
    lat_dims: &[String],
    timesteps: usize,
) -> NetCdfResult<SliceAccess> {
    let (rows, cols) = grid.shape();
    let layout = || {
        dims.iter()
            .map(|(n, l)| format!("{}={}", n, l))
            .collect::<Vec<_>>()
            .join(", ")
    };

    match dims.first() {
        Some((_, len)) if *len == timesteps => {}
        _ => {
            return Err(NetCdfError::InvalidFormat(format!(
                "time must be the leading dimension ({})",
                layout()
            )))
        }
    }

    let (level_axis, spatial) = match dims.len() {
        3 => (false, &dims[1..]),
        4 if dims[1].1 == 1 => (true, &dims[2..]),
        _ => {
            return Err(NetCdfError::InvalidFormat(format!(
                "unsupported variable layout ({})",
                layout()
            )))
        }
    };

    let (first, second) = (&spatial[0], &spatial[1]);
    let named_y = lat_dims.first().map(|n| n == &first.0).unwrap_or(false);
    let named_x = lat_dims.get(1).map(|n| n == &first.0).unwrap_or(false);

    let transposed = if named_y || (!named_x && (first.1, second.1) == (rows, cols)) {
        false
    } else if named_x || (first.1, second.1) == (cols, rows) {
        true
    } else {
        return Err(NetCdfError::InvalidFormat(format!(
            "spatial dimensions ({}) do not match grid {}x{}",
            layout(),
            rows,
            cols
        )));
    };

    let expected = if transposed { (cols, rows) } else { (rows, cols) };
    if (first.1, second.1) != expected {
        return Err(NetCdfError::InvalidFormat(format!(
            "spatial dimensions ({}) do not match grid {}x{}",
            layout(),
            rows,
            cols
        )));
    }

    Ok(match (level_axis, transposed) {
        (false, false) => SliceAccess::Direct,
        (level_axis, transposed) => SliceAccess::Generic {
            level_axis,
            transposed,
        },
    })
}

/// Reorder a row-major `(a, b)` buffer into row-major `(b, a)`.
fn transpose(values: &[f64], a: usize, b: usize) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    for j in 0..b {
        for i in 0..a {
            out.push(values[i * b + j]);
        }
    }
    out
}

fn find_variable<'f>(file: &'f netcdf::File, names: &[&str]) -> Option<netcdf::Variable<'f>> {
    names.iter().find_map(|name| file.variable(name))
}

/// Check if a variable has an attribute with the given name.
/// This avoids HDF5 error spam when checking for optional attributes.
fn has_attr(var: &netcdf::Variable, name: &str) -> bool {
    var.attributes().any(|attr| attr.name() == name)
}

/// Helper to get f64 attribute.
fn get_f64_attr(var: &netcdf::Variable, name: &str) -> Option<f64> {
    if !has_attr(var, name) {
        return None;
    }
    let attr_value = var.attribute_value(name)?.ok()?;
    f64::try_from(attr_value).ok()
}

/// Helper to get string attribute.
fn get_string_attr(var: &netcdf::Variable, name: &str) -> Option<String> {
    if !has_attr(var, name) {
        return None;
    }
    match var.attribute_value(name)?.ok()? {
        netcdf::AttributeValue::Str(s) => Some(s),
        _ => None,
    }
}
