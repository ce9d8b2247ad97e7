//! Streaming reader for gridded climate-projection cubes.
//!
//! A cube is a `(time, y, x)` variable with a 1D or 2D latitude/longitude
//! coordinate system and a CF time axis. Readers expose one 2D slice per
//! timestep so a multi-decade daily cube never has to fit in memory.
//!
//! # Example
//!
//! ```ignore
//! use climate_common::VariableAliases;
//! use netcdf_parser::{CubeSource, NetCdfCube};
//!
//! let aliases = VariableAliases::default();
//! let cube = NetCdfCube::open(path, &aliases.candidates("pr"))?;
//! for index in cube.timestep_indices(None) {
//!     let slice = cube.read_timestep(index)?;
//!     // ...
//! }
//! ```

pub mod calendar;
pub mod cube;
pub mod error;
pub mod native;

pub use calendar::{Calendar, TimeDecoder, TimeUnit, TimeUnits};
pub use cube::{CubeSource, MemoryCube, Slice2D, TimeStep};
pub use error::{NetCdfError, NetCdfResult};
pub use native::{silence_hdf5_errors, NetCdfCube, SliceAccess};
