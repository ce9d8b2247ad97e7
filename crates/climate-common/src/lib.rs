//! Common types and utilities shared across the agro-climatic pipeline crates.

pub mod aliases;
pub mod bbox;
pub mod error;
pub mod grid;
pub mod observation;
pub mod points;
pub mod series;
pub mod time;

pub use aliases::VariableAliases;
pub use bbox::BoundingBox;
pub use error::{ClimateError, ClimateResult, ErrorCategory};
pub use grid::{GridAxis, ResolvedCell};
pub use observation::{ObservationRow, SeriesKey};
pub use points::{PointRegistry, RepresentativePoint};
pub use series::DailySeries;
pub use time::{DateRange, SeasonalWindow, TimeBucket, YearRange};
