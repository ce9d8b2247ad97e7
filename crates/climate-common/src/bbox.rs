//! Bounding box used as the spatial tolerance window of store queries.

use serde::{Deserialize, Serialize};

use crate::error::{ClimateError, ClimateResult};

/// A geographic bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_lat: f64, min_lon: f64, max_lat: f64, max_lon: f64) -> Self {
        Self {
            min_lat,
            min_lon,
            max_lat,
            max_lon,
        }
    }

    /// Box spanning `±tolerance` degrees on each axis independently.
    ///
    /// This is a box, not a radius: at high latitudes a degree of longitude
    /// covers much less ground than a degree of latitude.
    pub fn around(lat: f64, lon: f64, tolerance: f64) -> ClimateResult<Self> {
        if !lat.is_finite() || !lon.is_finite() {
            return Err(ClimateError::invalid_parameter(
                "center",
                format!("non-finite coordinate ({}, {})", lat, lon),
            ));
        }
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(ClimateError::invalid_parameter(
                "tolerance",
                format!("must be a non-negative number, got {}", tolerance),
            ));
        }
        Ok(Self::new(
            lat - tolerance,
            lon - tolerance,
            lat + tolerance,
            lon + tolerance,
        ))
    }

    /// Check whether a coordinate falls inside the box (edges included).
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lon >= self.min_lon && lon <= self.max_lon
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lon + self.max_lon) / 2.0,
        )
    }
}
