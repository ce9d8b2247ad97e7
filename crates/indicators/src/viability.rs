//! Crop viability across ensemble members.
//!
//! Each member's rainfall series is reduced to a few window metrics for a
//! year, then the share of members meeting the criteria is reported. A
//! member whose metrics are undefined (too few days in a window) is left
//! out of the denominator. Members are evaluated in parallel.

use climate_common::{ClimateError, ClimateResult, DailySeries, SeasonalWindow, YearRange};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::engine::{period_total, sliding_window_extremum, Extremum};
use crate::units::UnitConversion;

/// Daily precipitation flux of one ensemble member.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberSeries {
    pub member: String,
    pub pr: DailySeries,
}

impl MemberSeries {
    pub fn new(member: impl Into<String>, pr: DailySeries) -> Self {
        Self {
            member: member.into(),
            pr,
        }
    }
}

/// Sowing, growth and harvest windows of a crop within a year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropCalendar {
    pub sowing: SeasonalWindow,
    pub growth: SeasonalWindow,
    pub harvest: SeasonalWindow,
}

impl CropCalendar {
    /// Grain corn in northern France.
    pub fn corn() -> Self {
        Self {
            sowing: SeasonalWindow::new("semis_mais", "Semis maïs", (4, 15), (5, 31)),
            growth: SeasonalWindow::new("croissance_mais", "Croissance maïs", (6, 1), (8, 31)),
            harvest: SeasonalWindow::new("recolte_mais", "Récolte maïs", (9, 1), (10, 31)),
        }
    }
}

impl Default for CropCalendar {
    fn default() -> Self {
        Self::corn()
    }
}

/// Rainfall criteria for corn, in mm.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CornCriteria {
    /// Minimum total over the sowing window
    pub sowing_min_total_mm: f64,
    /// Minimum of 60-day sums over the growth window (curve 1)
    pub growth_min_60d_mm: f64,
    /// Minimum of 30-day sums over the growth window (curve 2)
    pub growth_min_30d_mm: f64,
    /// Maximum allowed for the minimum 15-day sum over the harvest window
    pub harvest_max_15d_mm: f64,
}

impl Default for CornCriteria {
    fn default() -> Self {
        Self {
            sowing_min_total_mm: 100.0,
            growth_min_60d_mm: 100.0,
            growth_min_30d_mm: 20.0,
            harvest_max_15d_mm: 10.0,
        }
    }
}

/// Window metrics of one member for one year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CornMemberMetrics {
    pub member: String,
    pub sowing_total_mm: Option<f64>,
    pub growth_min_60d_mm: Option<f64>,
    pub growth_min_30d_mm: Option<f64>,
    pub harvest_min_15d_mm: Option<f64>,
}

impl CornMemberMetrics {
    fn is_complete(&self) -> bool {
        self.sowing_total_mm.is_some()
            && self.growth_min_60d_mm.is_some()
            && self.growth_min_30d_mm.is_some()
            && self.harvest_min_15d_mm.is_some()
    }

    /// (curve 1, curve 2) pass flags; `None` when any metric is undefined.
    fn passes(&self, criteria: &CornCriteria) -> Option<(bool, bool)> {
        let sowing = self.sowing_total_mm? >= criteria.sowing_min_total_mm;
        let growth_60 = self.growth_min_60d_mm? >= criteria.growth_min_60d_mm;
        let growth_30 = self.growth_min_30d_mm? >= criteria.growth_min_30d_mm;
        let harvest = self.harvest_min_15d_mm? <= criteria.harvest_max_15d_mm;
        Some((
            sowing && growth_60 && harvest,
            sowing && growth_30 && harvest,
        ))
    }
}

/// Corn viability for one year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CornViability {
    pub year: i32,
    /// Members with every metric defined
    pub valid_members: usize,
    /// Percent of valid members passing sowing, 60-day growth and harvest
    pub percentage_curve1: f64,
    /// Percent of valid members passing sowing, 30-day growth and harvest
    pub percentage_curve2: f64,
    pub members: Vec<CornMemberMetrics>,
}

/// Cover-crop settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverCropParams {
    /// Intercrop window
    pub window: SeasonalWindow,
    /// Sliding-window lengths in days
    pub window_days: Vec<usize>,
    /// Rainfall per 30 days (mm), scaled to each window length
    pub monthly_threshold_mm: f64,
}

impl Default for CoverCropParams {
    fn default() -> Self {
        Self {
            window: SeasonalWindow::new("interculture_ete", "Interculture été", (7, 1), (9, 15)),
            window_days: vec![21, 42],
            monthly_threshold_mm: 25.0,
        }
    }
}

/// Feasibility for one sliding-window length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowFeasibility {
    pub window_days: usize,
    /// `monthly_threshold * window_days / 30`
    pub threshold_mm: f64,
    pub valid_members: usize,
    pub percentage: f64,
    /// Minimum window sum per member, `None` when undefined
    pub member_minima: Vec<(String, Option<f64>)>,
}

/// Cover-crop feasibility for one year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverCropFeasibility {
    pub year: i32,
    pub windows: Vec<WindowFeasibility>,
}

/// Percentage rounded to one decimal; 0 when there is nothing to count.
fn percentage(passed: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (passed as f64 / total as f64 * 1000.0).round() / 10.0
}

fn corn_member_metrics(
    member: &MemberSeries,
    calendar: &CropCalendar,
    year: i32,
) -> ClimateResult<CornMemberMetrics> {
    let depth = UnitConversion::FluxToDepth;
    let sowing = member.pr.between(&calendar.sowing.for_year(year)?);
    let growth = member.pr.between(&calendar.growth.for_year(year)?);
    let harvest = member.pr.between(&calendar.harvest.for_year(year)?);

    Ok(CornMemberMetrics {
        member: member.member.clone(),
        sowing_total_mm: period_total(&sowing, depth),
        growth_min_60d_mm: sliding_window_extremum(&growth, 60, Extremum::Min, depth),
        growth_min_30d_mm: sliding_window_extremum(&growth, 30, Extremum::Min, depth),
        harvest_min_15d_mm: sliding_window_extremum(&harvest, 15, Extremum::Min, depth),
    })
}

/// Share of members for which corn is viable in `year`.
pub fn corn_viability(
    members: &[MemberSeries],
    calendar: &CropCalendar,
    criteria: &CornCriteria,
    year: i32,
) -> ClimateResult<CornViability> {
    let metrics: Vec<CornMemberMetrics> = members
        .par_iter()
        .map(|m| corn_member_metrics(m, calendar, year))
        .collect::<ClimateResult<_>>()?;

    let mut valid = 0;
    let mut curve1 = 0;
    let mut curve2 = 0;
    for (pass1, pass2) in metrics.iter().filter_map(|m| m.passes(criteria)) {
        valid += 1;
        curve1 += pass1 as usize;
        curve2 += pass2 as usize;
    }
    debug!(
        year,
        members = metrics.len(),
        complete = metrics.iter().filter(|m| m.is_complete()).count(),
        "Evaluated corn viability"
    );

    Ok(CornViability {
        year,
        valid_members: valid,
        percentage_curve1: percentage(curve1, valid),
        percentage_curve2: percentage(curve2, valid),
        members: metrics,
    })
}

/// [`corn_viability`] for every year of a range.
pub fn corn_viability_by_year(
    members: &[MemberSeries],
    calendar: &CropCalendar,
    criteria: &CornCriteria,
    years: YearRange,
) -> ClimateResult<Vec<CornViability>> {
    (years.start..=years.end)
        .map(|year| corn_viability(members, calendar, criteria, year))
        .collect()
}

/// Share of members whose driest window in the intercrop period still
/// receives the scaled monthly threshold.
pub fn cover_crop_feasibility(
    members: &[MemberSeries],
    params: &CoverCropParams,
    year: i32,
) -> ClimateResult<CoverCropFeasibility> {
    if params.window_days.iter().any(|w| *w == 0) {
        return Err(ClimateError::invalid_parameter(
            "window_days",
            "window lengths must be positive",
        ));
    }
    let range = params.window.for_year(year)?;

    let windows = params
        .window_days
        .iter()
        .map(|&window_days| {
            let threshold_mm = params.monthly_threshold_mm * window_days as f64 / 30.0;
            let member_minima: Vec<(String, Option<f64>)> = members
                .par_iter()
                .map(|m| {
                    let min = sliding_window_extremum(
                        &m.pr.between(&range),
                        window_days,
                        Extremum::Min,
                        UnitConversion::FluxToDepth,
                    );
                    (m.member.clone(), min)
                })
                .collect();

            let defined: Vec<f64> = member_minima.iter().filter_map(|(_, v)| *v).collect();
            let passed = defined.iter().filter(|v| **v >= threshold_mm).count();
            WindowFeasibility {
                window_days,
                threshold_mm,
                valid_members: defined.len(),
                percentage: percentage(passed, defined.len()),
                member_minima,
            }
        })
        .collect();

    Ok(CoverCropFeasibility { year, windows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{date, rainfall_series};

    /// Member with a constant daily depth from March to November.
    fn member(name: &str, mm_per_day: f64) -> MemberSeries {
        MemberSeries::new(name, rainfall_series(date(2030, 3, 1), &[mm_per_day; 275]))
    }

    #[test]
    fn test_percentage_rounding() {
        assert_eq!(percentage(1, 3), 33.3);
        assert_eq!(percentage(2, 3), 66.7);
        assert_eq!(percentage(0, 0), 0.0);
    }

    #[test]
    fn test_corn_metrics_constant_rain() {
        let metrics = corn_member_metrics(&member("r1", 2.0), &CropCalendar::corn(), 2030).unwrap();
        // Sowing window 04-15..05-31 has 47 days.
        assert!((metrics.sowing_total_mm.unwrap() - 94.0).abs() < 1e-6);
        assert!((metrics.growth_min_60d_mm.unwrap() - 120.0).abs() < 1e-6);
        assert!((metrics.harvest_min_15d_mm.unwrap() - 30.0).abs() < 1e-6);
    }

    #[test]
    fn test_short_member_is_not_counted() {
        let short = MemberSeries::new("r9", rainfall_series(date(2030, 4, 15), &[5.0; 30]));
        let result = corn_viability(&[short], &CropCalendar::corn(), &CornCriteria::default(), 2030).unwrap();
        assert_eq!(result.valid_members, 0);
        assert_eq!(result.percentage_curve1, 0.0);
    }
}
