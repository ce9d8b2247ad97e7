//! Storage for ingested climate observations.
//!
//! Provides:
//! - [`PointStore`]: an append-only, point-time keyed SQLite table with
//!   idempotent batch insert, tolerance-window queries and bucketed
//!   aggregation
//! - [`ObservationSink`]: the write-side seam used by the ingestion crate
//! - a single-writer lock so concurrent writer processes fail fast

pub mod lock;
pub mod point_store;
pub mod query;
pub mod sink;

pub use lock::WriterLock;
pub use point_store::{AccessMode, PointStore, StoreStats, DEFAULT_CHUNK_SIZE};
pub use query::{AggregateFn, AggregatePoint, CellSeries, SpatialQuery, DEFAULT_TOLERANCE};
pub use sink::ObservationSink;
