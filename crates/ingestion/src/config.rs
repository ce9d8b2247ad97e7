//! Ingestion configuration.
//!
//! Tuning knobs for a run plus the optional YAML files holding the
//! representative points and the variable alias table.

use std::env;
use std::path::PathBuf;

use climate_common::{PointRegistry, VariableAliases};
use serde::{Deserialize, Serialize};

use crate::error::{IngestionError, Result};

/// Rows written per store batch unless configured otherwise.
pub const DEFAULT_BATCH_SIZE: usize = 5000;

/// Per-run ingestion options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestOptions {
    /// Rows buffered before each store write
    pub batch_size: usize,
    /// Warn when the series already has rows (never aborts)
    pub precheck_existing: bool,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            precheck_existing: true,
        }
    }
}

impl IngestOptions {
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(IngestionError::InvalidConfig(
                "batch_size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Environment-level ingestion configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestConfig {
    pub options: IngestOptions,
    /// YAML representative-point registry; built-in points when absent
    pub points_file: Option<PathBuf>,
    /// YAML variable alias table; built-in aliases when absent
    pub aliases_file: Option<PathBuf>,
}

impl IngestConfig {
    /// Load configuration from environment variables.
    ///
    /// Reads `AGROCLIM_BATCH_SIZE`, `AGROCLIM_PRECHECK`,
    /// `AGROCLIM_POINTS_FILE` and `AGROCLIM_ALIASES_FILE`.
    pub fn from_env() -> Result<Self> {
        let batch_size = match env::var("AGROCLIM_BATCH_SIZE") {
            Ok(raw) => raw.trim().parse::<usize>().map_err(|e| {
                IngestionError::InvalidConfig(format!("AGROCLIM_BATCH_SIZE '{}': {}", raw, e))
            })?,
            Err(_) => DEFAULT_BATCH_SIZE,
        };
        let precheck_existing = env::var("AGROCLIM_PRECHECK")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let config = Self {
            options: IngestOptions {
                batch_size,
                precheck_existing,
            },
            points_file: env::var("AGROCLIM_POINTS_FILE").ok().map(PathBuf::from),
            aliases_file: env::var("AGROCLIM_ALIASES_FILE").ok().map(PathBuf::from),
        };
        config.options.validate()?;
        Ok(config)
    }

    pub fn load_points(&self) -> Result<PointRegistry> {
        match &self.points_file {
            Some(path) => Ok(PointRegistry::load(path)?),
            None => Ok(PointRegistry::default()),
        }
    }

    pub fn load_aliases(&self) -> Result<VariableAliases> {
        match &self.aliases_file {
            Some(path) => Ok(VariableAliases::load(path)?),
            None => Ok(VariableAliases::default()),
        }
    }
}
