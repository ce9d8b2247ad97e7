//! Error types shared by the pipeline crates.

use thiserror::Error;

/// Result type alias using ClimateError.
pub type ClimateResult<T> = Result<T, ClimateError>;

/// How a consumer-facing layer should present a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The request itself was invalid (4xx-equivalent).
    InvalidRequest,
    /// A named resource does not exist.
    NotFound,
    /// The backing store or source is unavailable right now.
    Unavailable,
    /// Anything else.
    Internal,
}

impl ErrorCategory {
    /// Get the HTTP status code for this category.
    pub fn http_status_code(&self) -> u16 {
        match self {
            ErrorCategory::InvalidRequest => 400,
            ErrorCategory::NotFound => 404,
            ErrorCategory::Unavailable => 503,
            ErrorCategory::Internal => 500,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::InvalidRequest => "invalid_request",
            ErrorCategory::NotFound => "not_found",
            ErrorCategory::Unavailable => "unavailable",
            ErrorCategory::Internal => "internal",
        }
    }
}

/// Primary error type for grid, store and series operations.
#[derive(Debug, Error)]
pub enum ClimateError {
    // === Input Errors ===
    #[error("Grid has no cells")]
    EmptyGrid,

    #[error("Grid coordinate arrays do not match shape: expected {expected} values, got {actual}")]
    GridShapeMismatch { expected: usize, actual: usize },

    #[error("Malformed row {index}: invalid field '{field}'")]
    MalformedRow { index: usize, field: &'static str },

    #[error("Invalid parameter value for '{param}': {message}")]
    InvalidParameter { param: String, message: String },

    #[error("Unsupported aggregation bucket: {0}")]
    UnsupportedBucket(String),

    #[error("Unsupported aggregation function: {0}")]
    UnsupportedAggregate(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    // === Store Errors ===
    #[error("Store '{path}' is locked by another writer")]
    StoreLocked { path: String },

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl ClimateError {
    /// Helper to create an invalid parameter error.
    pub fn invalid_parameter(param: impl Into<String>, message: impl Into<String>) -> Self {
        ClimateError::InvalidParameter {
            param: param.into(),
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            ClimateError::EmptyGrid
            | ClimateError::GridShapeMismatch { .. }
            | ClimateError::MalformedRow { .. }
            | ClimateError::InvalidParameter { .. }
            | ClimateError::UnsupportedBucket(_)
            | ClimateError::UnsupportedAggregate(_)
            | ClimateError::InvalidDate(_)
            | ClimateError::Config(_) => ErrorCategory::InvalidRequest,

            ClimateError::StoreLocked { .. } | ClimateError::StoreUnavailable(_) => {
                ErrorCategory::Unavailable
            }

            ClimateError::Database(_) => ErrorCategory::Internal,
        }
    }

    /// Get the HTTP status code for this error.
    pub fn http_status_code(&self) -> u16 {
        self.category().http_status_code()
    }

    /// Whether retrying the same call later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClimateError::StoreLocked { .. })
    }
}

impl From<serde_yaml::Error> for ClimateError {
    fn from(err: serde_yaml::Error) -> Self {
        ClimateError::Config(format!("YAML error: {}", err))
    }
}

impl From<std::io::Error> for ClimateError {
    fn from(err: std::io::Error) -> Self {
        ClimateError::StoreUnavailable(err.to_string())
    }
}
