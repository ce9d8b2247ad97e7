//! Climate cube ingestion library.
//!
//! Streams a (time, y, x) cube into the point store one timestep at a time.
//!
//! # Modes
//!
//! - **Point-filtered**: target points are resolved once against the
//!   source grid and only those cells are extracted per timestep. This is
//!   the usual mode.
//! - **Full-grid**: every cell of every selected timestep is stored.
//!
//! Re-running an ingestion is always safe: the store skips keys it already
//! holds, so a second run reports zero inserted rows.

pub mod config;
pub mod error;
mod ingester;

// Re-exports
pub use config::{IngestConfig, IngestOptions, DEFAULT_BATCH_SIZE};
pub use error::{IngestionError, Result};
pub use ingester::{open_source, IngestRequest, IngestSummary, Ingester, ResolvedPoint};
pub use tokio_util::sync::CancellationToken;
