//! Error types for the ingestion crate.

use climate_common::{ClimateError, ErrorCategory};
use netcdf_parser::NetCdfError;
use thiserror::Error;

/// Errors that abort an ingestion run.
///
/// Failures confined to one timestep never surface here; they are logged
/// and counted in the run summary.
#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("Source error: {0}")]
    Source(#[from] NetCdfError),

    #[error("Store error: {0}")]
    Store(#[from] ClimateError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl IngestionError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            IngestionError::Source(err) => err.category(),
            IngestionError::Store(err) => err.category(),
            IngestionError::InvalidConfig(_) => ErrorCategory::InvalidRequest,
        }
    }

    /// Whether a later retry could succeed without changing the request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, IngestionError::Store(err) if err.is_retryable())
    }
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestionError>;
