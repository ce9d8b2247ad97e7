//! Unit conversions applied to stored values before evaluation.

use serde::{Deserialize, Serialize};

/// Seconds per day; converts a precipitation flux (kg m-2 s-1) to mm/day.
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Offset between Kelvin and degrees Celsius.
pub const KELVIN_OFFSET: f64 = 273.15;

/// Fixed affine conversion of a daily value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitConversion {
    #[default]
    Identity,
    /// Precipitation flux to daily depth in mm
    FluxToDepth,
    KelvinToCelsius,
    /// `value * scale + offset`
    Linear { scale: f64, offset: f64 },
}

impl UnitConversion {
    #[inline]
    pub fn apply(&self, value: f64) -> f64 {
        match self {
            UnitConversion::Identity => value,
            UnitConversion::FluxToDepth => value * SECONDS_PER_DAY,
            UnitConversion::KelvinToCelsius => value - KELVIN_OFFSET,
            UnitConversion::Linear { scale, offset } => value * scale + offset,
        }
    }

    /// Conversion from the stored unit of a logical variable to the unit
    /// indicators are expressed in (mm/day, degrees Celsius).
    pub fn for_variable(variable: &str) -> Self {
        match variable {
            "pr" => UnitConversion::FluxToDepth,
            "tas" | "tasmax" | "tasmin" => UnitConversion::KelvinToCelsius,
            _ => UnitConversion::Identity,
        }
    }
}
