//! Stored observation facts and their identifying columns.

use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The categorical columns identifying one ingested series:
/// variable, experiment, global model, regional model and ensemble member.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeriesKey {
    pub variable: String,
    pub experiment: String,
    pub gcm: String,
    pub rcm: String,
    pub member: String,
}

impl SeriesKey {
    pub fn new(
        variable: impl Into<String>,
        experiment: impl Into<String>,
        gcm: impl Into<String>,
        rcm: impl Into<String>,
        member: impl Into<String>,
    ) -> Self {
        Self {
            variable: variable.into(),
            experiment: experiment.into(),
            gcm: gcm.into(),
            rcm: rcm.into(),
            member: member.into(),
        }
    }

    /// Same key for a different ensemble member.
    pub fn with_member(&self, member: impl Into<String>) -> Self {
        Self {
            member: member.into(),
            ..self.clone()
        }
    }

    /// First empty field, if any.
    pub fn missing_field(&self) -> Option<&'static str> {
        [
            ("variable", &self.variable),
            ("experiment", &self.experiment),
            ("gcm", &self.gcm),
            ("rcm", &self.rcm),
            ("member", &self.member),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}/{}",
            self.variable, self.experiment, self.gcm, self.rcm, self.member
        )
    }
}

/// One stored fact: a value of a series at a grid cell on a date.
///
/// `lat`/`lon` are the resolved grid-cell coordinates, never the requested
/// target coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationRow {
    pub key: Arc<SeriesKey>,
    pub lat: f64,
    pub lon: f64,
    pub date: NaiveDate,
    pub value: f64,
}

impl ObservationRow {
    pub fn new(key: Arc<SeriesKey>, lat: f64, lon: f64, date: NaiveDate, value: f64) -> Self {
        Self {
            key,
            lat,
            lon,
            date,
            value,
        }
    }

    /// Name of the first invalid field, if the row cannot be stored.
    pub fn invalid_field(&self) -> Option<&'static str> {
        if let Some(field) = self.key.missing_field() {
            return Some(field);
        }
        if !self.lat.is_finite() {
            return Some("lat");
        }
        if !self.lon.is_finite() {
            return Some("lon");
        }
        if !self.value.is_finite() {
            return Some("value");
        }
        None
    }
}
