//! Primitive indicators over a daily series.
//!
//! All functions are pure. Callers restrict the series to a period first
//! with [`DailySeries::between`]. "Undefined" results (insufficient data)
//! are `None`; counts over an empty series are zero.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use climate_common::{ClimateError, DailySeries};
use serde::{Deserialize, Serialize};

use crate::units::UnitConversion;

/// Daily depth below which a day is dry (mm/day).
pub const DRY_DAY_MM: f64 = 0.1;

/// Daily depth above which field work is impossible (mm/day).
pub const NON_WORKABLE_MM: f64 = 2.0;

/// Daily maximum temperature above which a day is hot (degrees C).
pub const HOT_DAY_C: f64 = 30.0;

/// Daily maximum temperature above which a day counts toward heat waves.
pub const HEAT_WAVE_C: f64 = 35.0;

/// Comparison between a daily value and a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
}

impl Comparison {
    #[inline]
    pub fn holds(&self, value: f64, threshold: f64) -> bool {
        match self {
            Comparison::Greater => value > threshold,
            Comparison::GreaterOrEqual => value >= threshold,
            Comparison::Less => value < threshold,
            Comparison::LessOrEqual => value <= threshold,
        }
    }
}

impl FromStr for Comparison {
    type Err = ClimateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            ">" | "gt" => Ok(Comparison::Greater),
            ">=" | "ge" => Ok(Comparison::GreaterOrEqual),
            "<" | "lt" => Ok(Comparison::Less),
            "<=" | "le" => Ok(Comparison::LessOrEqual),
            other => Err(ClimateError::invalid_parameter(
                "comparison",
                format!("unknown comparison '{}'", other),
            )),
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            Comparison::Greater => ">",
            Comparison::GreaterOrEqual => ">=",
            Comparison::Less => "<",
            Comparison::LessOrEqual => "<=",
        };
        write!(f, "{}", op)
    }
}

/// Which end of a distribution to keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Extremum {
    Min,
    Max,
}

/// Sum of converted values. `None` for an empty series.
pub fn period_total(series: &DailySeries, conversion: UnitConversion) -> Option<f64> {
    if series.is_empty() {
        return None;
    }
    Some(series.values().map(|v| conversion.apply(v)).sum())
}

/// Number of days whose converted value satisfies `comparison` against
/// `threshold`.
pub fn threshold_day_count(
    series: &DailySeries,
    comparison: Comparison,
    threshold: f64,
    conversion: UnitConversion,
) -> usize {
    series
        .values()
        .filter(|v| comparison.holds(conversion.apply(*v), threshold))
        .count()
}

/// Longest run of calendar-consecutive days satisfying `predicate`.
///
/// A missing day breaks the run even when every present day matches.
/// Returns 0 for an empty series.
pub fn max_consecutive_run<F>(series: &DailySeries, predicate: F) -> usize
where
    F: Fn(f64) -> bool,
{
    let mut longest = 0;
    let mut current = 0;
    let mut previous: Option<NaiveDate> = None;

    for (date, value) in series.iter() {
        let adjacent = previous.and_then(|p| p.succ_opt()) == Some(*date);
        if !predicate(*value) {
            current = 0;
        } else if adjacent {
            current += 1;
        } else {
            current = 1;
        }
        longest = longest.max(current);
        previous = Some(*date);
    }
    longest
}

/// Sum of `max(0, value - base)` over converted values. `None` for an empty
/// series.
pub fn degree_days(series: &DailySeries, base: f64, conversion: UnitConversion) -> Option<f64> {
    if series.is_empty() {
        return None;
    }
    Some(
        series
            .values()
            .map(|v| (conversion.apply(v) - base).max(0.0))
            .sum(),
    )
}

/// Sums of every contiguous `window`-point run, by index adjacency.
///
/// `None` when the series holds fewer than `window` points or `window` is 0.
pub fn sliding_window_sums(
    series: &DailySeries,
    window: usize,
    conversion: UnitConversion,
) -> Option<Vec<f64>> {
    if window == 0 || series.len() < window {
        return None;
    }
    let values: Vec<f64> = series.values().map(|v| conversion.apply(v)).collect();
    Some(values.windows(window).map(|w| w.iter().sum()).collect())
}

/// Minimum or maximum of all `window`-day sums.
///
/// `None` when fewer than `window` points exist; no partial sums.
pub fn sliding_window_extremum(
    series: &DailySeries,
    window: usize,
    extremum: Extremum,
    conversion: UnitConversion,
) -> Option<f64> {
    let sums = sliding_window_sums(series, window, conversion)?;
    let pick: fn(f64, f64) -> f64 = match extremum {
        Extremum::Min => f64::min,
        Extremum::Max => f64::max,
    };
    sums.into_iter().reduce(pick)
}

// ============================================================================
// Named indicators on stored units (pr in kg m-2 s-1, temperatures in K)
// ============================================================================

/// Total rainfall in mm.
pub fn rainfall_total_mm(pr: &DailySeries) -> Option<f64> {
    period_total(pr, UnitConversion::FluxToDepth)
}

/// Longest spell of days below [`DRY_DAY_MM`].
pub fn consecutive_dry_days(pr: &DailySeries) -> usize {
    max_consecutive_run(pr, |v| UnitConversion::FluxToDepth.apply(v) < DRY_DAY_MM)
}

/// Days with maximum temperature strictly above `threshold_c`.
pub fn hot_days(tasmax: &DailySeries, threshold_c: f64) -> usize {
    threshold_day_count(
        tasmax,
        Comparison::Greater,
        threshold_c,
        UnitConversion::KelvinToCelsius,
    )
}

/// Largest 7-day rainfall total in mm.
pub fn max_7day_rainfall_mm(pr: &DailySeries) -> Option<f64> {
    sliding_window_extremum(pr, 7, Extremum::Max, UnitConversion::FluxToDepth)
}

/// Days with more than [`NON_WORKABLE_MM`] of rain.
pub fn non_workable_days(pr: &DailySeries) -> usize {
    threshold_day_count(
        pr,
        Comparison::Greater,
        NON_WORKABLE_MM,
        UnitConversion::FluxToDepth,
    )
}

/// Growing degree days above `base_c` from daily mean temperature.
pub fn growing_degree_days(tas: &DailySeries, base_c: f64) -> Option<f64> {
    degree_days(tas, base_c, UnitConversion::KelvinToCelsius)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{assert_approx_eq, daily_series, date};

    fn rain() -> Vec<f64> {
        let mut values = vec![10.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        values.extend(std::iter::repeat(10.0).take(14));
        values
    }

    #[test]
    fn test_gap_breaks_run() {
        let series = DailySeries::from_pairs(vec![
            (date(2030, 7, 1), 0.0),
            (date(2030, 7, 2), 0.0),
            (date(2030, 7, 4), 0.0),
            (date(2030, 7, 5), 0.0),
            (date(2030, 7, 6), 0.0),
        ]);
        assert_eq!(max_consecutive_run(&series, |v| v < 0.1), 3);
    }

    #[test]
    fn test_failing_day_resets_run() {
        let series = daily_series(date(2030, 7, 1), &[0.0, 0.0, 5.0, 0.0]);
        assert_eq!(max_consecutive_run(&series, |v| v < 0.1), 2);
        assert_eq!(max_consecutive_run(&DailySeries::new(), |v| v < 0.1), 0);
    }

    #[test]
    fn test_single_full_window() {
        let series = daily_series(date(2030, 4, 15), &rain());
        let sums = sliding_window_sums(&series, 21, UnitConversion::Identity).unwrap();
        assert_eq!(sums, vec![rain().iter().sum::<f64>()]);
    }

    #[test]
    fn test_min_window_matches_brute_force() {
        let values = rain();
        let series = daily_series(date(2030, 4, 15), &values);
        let brute = (0..=values.len() - 10)
            .map(|i| values[i..i + 10].iter().sum::<f64>())
            .fold(f64::INFINITY, f64::min);

        let min = sliding_window_extremum(&series, 10, Extremum::Min, UnitConversion::Identity);
        assert_eq!(min, Some(brute));
        assert_eq!(min, Some(40.0));
    }

    #[test]
    fn test_short_series_is_undefined() {
        let series = daily_series(date(2030, 4, 15), &[1.0; 20]);
        assert_eq!(
            sliding_window_extremum(&series, 21, Extremum::Min, UnitConversion::Identity),
            None
        );
        assert_eq!(
            sliding_window_extremum(&series, 0, Extremum::Max, UnitConversion::Identity),
            None
        );
    }

    #[test]
    fn test_degree_days_never_negative() {
        let series = daily_series(date(2030, 5, 1), &[5.0, 10.0, 12.5, 20.0, -3.0]);
        let dd = degree_days(&series, 10.0, UnitConversion::Identity).unwrap();
        assert_approx_eq!(dd, 12.5, 1e-12);
        assert_eq!(degree_days(&DailySeries::new(), 10.0, UnitConversion::Identity), None);
    }

    #[test]
    fn test_threshold_counts() {
        let series = daily_series(date(2030, 5, 1), &[1.0, 2.0, 3.0, 2.0]);
        assert_eq!(threshold_day_count(&series, Comparison::Greater, 2.0, UnitConversion::Identity), 1);
        assert_eq!(threshold_day_count(&series, Comparison::GreaterOrEqual, 2.0, UnitConversion::Identity), 3);
        assert_eq!(threshold_day_count(&series, Comparison::Less, 2.0, UnitConversion::Identity), 1);
        assert_eq!(threshold_day_count(&series, Comparison::LessOrEqual, 2.0, UnitConversion::Identity), 3);
    }

    #[test]
    fn test_comparison_parse() {
        assert_eq!(">=".parse::<Comparison>().unwrap(), Comparison::GreaterOrEqual);
        assert_eq!("lt".parse::<Comparison>().unwrap(), Comparison::Less);
        assert!("~".parse::<Comparison>().is_err());
    }

    #[test]
    fn test_period_total_with_flux() {
        let series = daily_series(date(2030, 6, 1), &[1.0; 30]);
        assert_eq!(period_total(&series, UnitConversion::FluxToDepth), Some(2_592_000.0));
        assert_eq!(period_total(&DailySeries::new(), UnitConversion::Identity), None);
    }

    #[test]
    fn test_hot_days_in_kelvin() {
        let tasmax = daily_series(date(2030, 7, 1), &test_utils::celsius_to_kelvin(&[29.0, 31.0, 36.0]));
        assert_eq!(hot_days(&tasmax, HOT_DAY_C), 2);
        assert_eq!(hot_days(&tasmax, HEAT_WAVE_C), 1);
    }

    #[test]
    fn test_rain_indicators() {
        let pr = test_utils::rainfall_series(date(2030, 10, 1), &[0.0, 0.0, 0.05, 3.0, 10.0, 0.0, 0.0, 2.5]);
        assert_eq!(consecutive_dry_days(&pr), 3);
        assert_eq!(non_workable_days(&pr), 3);
        assert_approx_eq!(rainfall_total_mm(&pr).unwrap(), 15.55, 1e-9);
        assert_approx_eq!(max_7day_rainfall_mm(&pr).unwrap(), 15.55, 1e-9);
    }
}
