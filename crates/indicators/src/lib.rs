//! Agro-climatic indicators computed from daily point series.
//!
//! Inputs are [`climate_common::DailySeries`] in stored units (precipitation
//! flux in kg m-2 s-1, temperatures in Kelvin); conversions happen here.
//!
//! - [`engine`]: primitive and named indicators
//! - [`composite`]: potential score and risk indicators
//! - [`viability`]: crop viability across ensemble members

pub mod composite;
pub mod engine;
pub mod units;
pub mod viability;

pub use composite::{
    drought_risk, excess_water_risk, heat_wave_days, potential_score, ExcessWaterParams,
    ExcessWaterRisk, PotentialParams, PotentialScore,
};
pub use engine::{
    consecutive_dry_days, degree_days, growing_degree_days, hot_days, max_7day_rainfall_mm,
    max_consecutive_run, non_workable_days, period_total, rainfall_total_mm,
    sliding_window_extremum, sliding_window_sums, threshold_day_count, Comparison, Extremum,
    DRY_DAY_MM, HEAT_WAVE_C, HOT_DAY_C, NON_WORKABLE_MM,
};
pub use units::{UnitConversion, KELVIN_OFFSET, SECONDS_PER_DAY};
pub use viability::{
    corn_viability, corn_viability_by_year, cover_crop_feasibility, CornCriteria,
    CornMemberMetrics, CornViability, CoverCropFeasibility, CoverCropParams, CropCalendar,
    MemberSeries, WindowFeasibility,
};
