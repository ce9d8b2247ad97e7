//! Error types for NetCDF cube reading.

use climate_common::{ClimateError, ErrorCategory};
use thiserror::Error;

/// Result type for NetCDF parser operations.
pub type NetCdfResult<T> = Result<T, NetCdfError>;

/// Error types for NetCDF cube reading.
#[derive(Error, Debug)]
pub enum NetCdfError {
    /// File I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Source could not be opened by the NetCDF library
    #[error("Failed to open '{path}': {message}")]
    Open { path: String, message: String },

    /// None of the acceptable names for a variable exist in the source
    #[error("Variable not found, tried aliases {aliases:?}")]
    VariableNotFound { aliases: Vec<String> },

    /// Missing required variable, dimension or attribute
    #[error("Missing required data: {0}")]
    MissingData(String),

    /// Invalid data format or layout
    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    /// A single timestep could not be read
    #[error("Failed to read timestep {index}: {message}")]
    Read { index: usize, message: String },

    /// A single timestep has no usable calendar date
    #[error("Failed to decode time at index {index}: {message}")]
    TimeDecode { index: usize, message: String },

    #[error("Timestep {index} out of range (cube has {len})")]
    TimestepOutOfRange { index: usize, len: usize },

    #[error(transparent)]
    Grid(#[from] ClimateError),
}

impl NetCdfError {
    /// Errors confined to one timestep; the rest of the cube is still usable.
    pub fn is_timestep_local(&self) -> bool {
        matches!(
            self,
            NetCdfError::Read { .. } | NetCdfError::TimeDecode { .. }
        )
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            NetCdfError::IoError(_) | NetCdfError::Open { .. } => ErrorCategory::NotFound,
            NetCdfError::VariableNotFound { .. }
            | NetCdfError::MissingData(_)
            | NetCdfError::InvalidFormat(_)
            | NetCdfError::TimestepOutOfRange { .. } => ErrorCategory::InvalidRequest,
            NetCdfError::Read { .. } | NetCdfError::TimeDecode { .. } => ErrorCategory::Internal,
            NetCdfError::Grid(err) => err.category(),
        }
    }
}
