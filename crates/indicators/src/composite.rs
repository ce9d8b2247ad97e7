//! Composite agro-climatic scores.
//!
//! These combine primitive indicators with linear ramps and an unweighted
//! average or additive penalties. The weighting is an illustrative
//! heuristic, not a calibrated agronomic model.

use climate_common::{ClimateError, ClimateResult, DailySeries};
use serde::{Deserialize, Serialize};

use crate::engine::{
    consecutive_dry_days, growing_degree_days, hot_days, max_7day_rainfall_mm, non_workable_days,
    rainfall_total_mm, HEAT_WAVE_C, HOT_DAY_C,
};

/// Thresholds for [`potential_score`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PotentialParams {
    /// Rainfall (mm) over the period for a full rain score
    pub min_rainfall_mm: f64,
    /// Degree days for a full heat-accumulation score
    pub degree_days_threshold: f64,
    /// Base temperature for degree days (degrees C)
    pub base_temperature_c: f64,
    /// Hot days (> 30 C) tolerated before the penalty starts
    pub max_hot_days: u32,
}

impl Default for PotentialParams {
    fn default() -> Self {
        Self {
            min_rainfall_mm: 300.0,
            degree_days_threshold: 1500.0,
            base_temperature_c: 0.0,
            max_hot_days: 10,
        }
    }
}

impl PotentialParams {
    pub fn validate(&self) -> ClimateResult<()> {
        positive("min_rainfall_mm", self.min_rainfall_mm)?;
        positive("degree_days_threshold", self.degree_days_threshold)?;
        positive("max_hot_days", self.max_hot_days as f64)
    }
}

/// Thresholds for [`excess_water_risk`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExcessWaterParams {
    /// Largest acceptable 7-day rainfall (mm)
    pub max_7day_rainfall_mm: f64,
    /// Non-workable days tolerated over the period
    pub non_workable_days: u32,
}

impl Default for ExcessWaterParams {
    fn default() -> Self {
        Self {
            max_7day_rainfall_mm: 50.0,
            non_workable_days: 20,
        }
    }
}

impl ExcessWaterParams {
    pub fn validate(&self) -> ClimateResult<()> {
        positive("max_7day_rainfall_mm", self.max_7day_rainfall_mm)?;
        positive("non_workable_days", self.non_workable_days as f64)
    }
}

/// Potential score with its sub-scores, all from one period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PotentialScore {
    /// 0..=100
    pub score: f64,
    pub rainfall_mm: f64,
    pub degree_days: f64,
    pub hot_days: usize,
    pub rainfall_score: f64,
    pub degree_days_score: f64,
    pub hot_days_score: f64,
}

/// Excess-water risk with the inputs that drive it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExcessWaterRisk {
    /// 0..=100
    pub risk: f64,
    pub max_7day_rainfall_mm: f64,
    pub non_workable_days: usize,
}

fn positive(param: &str, value: f64) -> ClimateResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ClimateError::invalid_parameter(
            param,
            format!("must be positive, got {}", value),
        ))
    }
}

/// `value / threshold` clipped to `[0, 1]`.
#[inline]
fn ramp(value: f64, threshold: f64) -> f64 {
    (value / threshold).clamp(0.0, 1.0)
}

/// `(value - threshold) / threshold * 50` above the threshold, else 0.
#[inline]
fn excess_penalty(value: f64, threshold: f64) -> f64 {
    if value > threshold {
        (value - threshold) / threshold * 50.0
    } else {
        0.0
    }
}

/// Agro-climatic potential (0..=100) from rainfall, daily mean temperature
/// and daily maximum temperature over the same period.
///
/// Mean of three sub-scores, times 100:
/// - rain: `clip(total / min_rainfall, 0, 1)`
/// - degree days: `clip(dd / threshold, 0, 1)`
/// - hot days: 1 up to `max_hot_days`, then `max(0, 1 - (hot - max) / max)`
///
/// `None` when rainfall or temperature is missing for the period.
pub fn potential_score(
    pr: &DailySeries,
    tas: &DailySeries,
    tasmax: &DailySeries,
    params: &PotentialParams,
) -> ClimateResult<Option<PotentialScore>> {
    params.validate()?;

    let (Some(rainfall_mm), Some(degree_days)) = (
        rainfall_total_mm(pr),
        growing_degree_days(tas, params.base_temperature_c),
    ) else {
        return Ok(None);
    };
    if tasmax.is_empty() {
        return Ok(None);
    }
    let hot = hot_days(tasmax, HOT_DAY_C);

    let rainfall_score = ramp(rainfall_mm, params.min_rainfall_mm);
    let degree_days_score = ramp(degree_days, params.degree_days_threshold);
    let max_hot = params.max_hot_days as f64;
    let hot_days_score = if hot as f64 <= max_hot {
        1.0
    } else {
        (1.0 - (hot as f64 - max_hot) / max_hot).clamp(0.0, 1.0)
    };

    Ok(Some(PotentialScore {
        score: (rainfall_score + degree_days_score + hot_days_score) / 3.0 * 100.0,
        rainfall_mm,
        degree_days,
        hot_days: hot,
        rainfall_score,
        degree_days_score,
        hot_days_score,
    }))
}

/// Drought risk: the longest dry spell in days. `None` without data.
pub fn drought_risk(pr: &DailySeries) -> Option<usize> {
    if pr.is_empty() {
        return None;
    }
    Some(consecutive_dry_days(pr))
}

/// Excess-water risk (0..=100): additive penalties for the largest 7-day
/// rainfall and the count of non-workable days beyond their thresholds.
///
/// `None` when fewer than 7 days of rainfall are available.
pub fn excess_water_risk(
    pr: &DailySeries,
    params: &ExcessWaterParams,
) -> ClimateResult<Option<ExcessWaterRisk>> {
    params.validate()?;

    let Some(max_7day) = max_7day_rainfall_mm(pr) else {
        return Ok(None);
    };
    let wet_days = non_workable_days(pr);

    let risk = excess_penalty(max_7day, params.max_7day_rainfall_mm)
        + excess_penalty(wet_days as f64, params.non_workable_days as f64);

    Ok(Some(ExcessWaterRisk {
        risk: risk.clamp(0.0, 100.0),
        max_7day_rainfall_mm: max_7day,
        non_workable_days: wet_days,
    }))
}

/// Heat-wave days: daily maximum above 35 C. `None` without data.
pub fn heat_wave_days(tasmax: &DailySeries) -> Option<usize> {
    if tasmax.is_empty() {
        return None;
    }
    Some(hot_days(tasmax, HEAT_WAVE_C))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{assert_approx_eq, celsius_to_kelvin, daily_series, date, rainfall_series};

    #[test]
    fn test_potential_full_marks() {
        let start = date(2030, 4, 1);
        let pr = rainfall_series(start, &[10.0; 40]);
        let tas = daily_series(start, &celsius_to_kelvin(&[20.0; 40]));
        let tasmax = daily_series(start, &celsius_to_kelvin(&[25.0; 40]));
        let params = PotentialParams {
            min_rainfall_mm: 300.0,
            degree_days_threshold: 500.0,
            base_temperature_c: 0.0,
            max_hot_days: 5,
        };

        let score = potential_score(&pr, &tas, &tasmax, &params).unwrap().unwrap();
        assert_approx_eq!(score.score, 100.0, 1e-9);
        assert_approx_eq!(score.rainfall_mm, 400.0, 1e-6);
        assert_eq!(score.hot_days, 0);
    }

    #[test]
    fn test_potential_partial_scores() {
        let start = date(2030, 6, 1);
        let pr = rainfall_series(start, &[5.0; 30]);
        let tas = daily_series(start, &celsius_to_kelvin(&[10.0; 30]));
        let mut tmax = vec![25.0; 30];
        tmax[..15].fill(32.0);
        let tasmax = daily_series(start, &celsius_to_kelvin(&tmax));
        let params = PotentialParams {
            min_rainfall_mm: 300.0,
            degree_days_threshold: 600.0,
            base_temperature_c: 0.0,
            max_hot_days: 10,
        };

        let score = potential_score(&pr, &tas, &tasmax, &params).unwrap().unwrap();
        assert_approx_eq!(score.rainfall_score, 0.5, 1e-9);
        assert_approx_eq!(score.degree_days_score, 0.5, 1e-6);
        assert_approx_eq!(score.hot_days_score, 0.5, 1e-9);
        assert_approx_eq!(score.score, 50.0, 1e-4);
    }

    #[test]
    fn test_potential_undefined_without_data() {
        let start = date(2030, 6, 1);
        let tas = daily_series(start, &[290.0; 3]);
        let result = potential_score(&DailySeries::new(), &tas, &tas, &PotentialParams::default());
        assert_eq!(result.unwrap(), None);
    }

    #[test]
    fn test_invalid_params_rejected() {
        let params = PotentialParams {
            min_rainfall_mm: 0.0,
            ..Default::default()
        };
        let empty = DailySeries::new();
        assert!(matches!(
            potential_score(&empty, &empty, &empty, &params),
            Err(ClimateError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_excess_water_penalties() {
        let start = date(2030, 11, 1);
        let mut depths = vec![0.0; 30];
        depths[..7].fill(15.0);
        let pr = rainfall_series(start, &depths);
        let params = ExcessWaterParams {
            max_7day_rainfall_mm: 70.0,
            non_workable_days: 5,
        };

        let risk = excess_water_risk(&pr, &params).unwrap().unwrap();
        assert_eq!(risk.non_workable_days, 7);
        // 7-day: (105 - 70) / 70 * 50 = 25; days: (7 - 5) / 5 * 50 = 20
        assert_approx_eq!(risk.risk, 45.0, 1e-6);
    }

    #[test]
    fn test_excess_water_is_capped() {
        let pr = rainfall_series(date(2030, 11, 1), &[100.0; 30]);
        let risk = excess_water_risk(&pr, &ExcessWaterParams::default()).unwrap().unwrap();
        assert_eq!(risk.risk, 100.0);
    }

    #[test]
    fn test_drought_and_heat_waves() {
        let start = date(2030, 7, 1);
        let pr = rainfall_series(start, &[0.0, 0.0, 0.0, 4.0, 0.0]);
        assert_eq!(drought_risk(&pr), Some(3));
        assert_eq!(drought_risk(&DailySeries::new()), None);

        let tasmax = daily_series(start, &celsius_to_kelvin(&[34.0, 36.0, 37.0]));
        assert_eq!(heat_wave_days(&tasmax), Some(2));
    }
}
