//! Query parameters, results and the nearest-wins collapse.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use climate_common::{BoundingBox, ClimateError, ClimateResult, DailySeries};
use serde::{Deserialize, Serialize};

/// Default spatial tolerance in degrees.
pub const DEFAULT_TOLERANCE: f64 = 0.05;

/// Spatial part of a query: a center and a `±tolerance` degree box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpatialQuery {
    pub lat: f64,
    pub lon: f64,
    pub tolerance: f64,
}

impl SpatialQuery {
    pub fn new(lat: f64, lon: f64, tolerance: f64) -> Self {
        Self { lat, lon, tolerance }
    }

    pub fn around(lat: f64, lon: f64) -> Self {
        Self::new(lat, lon, DEFAULT_TOLERANCE)
    }

    pub fn bbox(&self) -> ClimateResult<BoundingBox> {
        BoundingBox::around(self.lat, self.lon, self.tolerance)
    }

    /// Degree-space distance from the center.
    pub fn distance_to(&self, lat: f64, lon: f64) -> f64 {
        ((lat - self.lat).powi(2) + (lon - self.lon).powi(2)).sqrt()
    }
}

/// Aggregation function applied per bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateFn {
    Sum,
    Mean,
    Min,
    Max,
    Count,
}

impl AggregateFn {
    /// SQL expression over the `value` column, always yielding REAL.
    pub(crate) fn sql(&self) -> &'static str {
        match self {
            AggregateFn::Sum => "SUM(value)",
            AggregateFn::Mean => "AVG(value)",
            AggregateFn::Min => "MIN(value)",
            AggregateFn::Max => "MAX(value)",
            AggregateFn::Count => "CAST(COUNT(value) AS REAL)",
        }
    }
}

impl FromStr for AggregateFn {
    type Err = ClimateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sum" => Ok(AggregateFn::Sum),
            "mean" | "avg" => Ok(AggregateFn::Mean),
            "min" => Ok(AggregateFn::Min),
            "max" => Ok(AggregateFn::Max),
            "count" => Ok(AggregateFn::Count),
            other => Err(ClimateError::UnsupportedAggregate(other.to_string())),
        }
    }
}

impl fmt::Display for AggregateFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AggregateFn::Sum => "sum",
            AggregateFn::Mean => "mean",
            AggregateFn::Min => "min",
            AggregateFn::Max => "max",
            AggregateFn::Count => "count",
        };
        write!(f, "{}", name)
    }
}

/// One aggregated bucket, taken from the nearest matching cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatePoint {
    pub bucket: String,
    pub value: f64,
    pub lat: f64,
    pub lon: f64,
    pub distance: f64,
}

/// Daily series of one stored grid cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellSeries {
    pub lat: f64,
    pub lon: f64,
    pub distance: f64,
    pub series: DailySeries,
}

/// Keep, per group key, the row nearest to the query center.
///
/// Rows must arrive ordered by `(lat, lon)` within each group; on equal
/// distance the earlier row is kept.
pub(crate) fn nearest_per_group<K: Ord, T>(
    spatial: &SpatialQuery,
    rows: impl IntoIterator<Item = (K, f64, f64, T)>,
) -> BTreeMap<K, (f64, f64, f64, T)> {
    let mut best: BTreeMap<K, (f64, f64, f64, T)> = BTreeMap::new();
    for (key, lat, lon, value) in rows {
        let distance = spatial.distance_to(lat, lon);
        match best.get(&key) {
            Some((_, _, current, _)) if distance >= *current => {}
            _ => {
                best.insert(key, (lat, lon, distance, value));
            }
        }
    }
    best
}

/// Group `(lat, lon, date, value)` rows into per-cell series, nearest first.
pub(crate) fn group_cells(
    spatial: &SpatialQuery,
    rows: Vec<(f64, f64, NaiveDate, f64)>,
) -> Vec<CellSeries> {
    let mut cells: BTreeMap<(u64, u64), (f64, f64, Vec<(NaiveDate, f64)>)> = BTreeMap::new();
    for (lat, lon, date, value) in rows {
        cells
            .entry((lat.to_bits(), lon.to_bits()))
            .or_insert_with(|| (lat, lon, Vec::new()))
            .2
            .push((date, value));
    }

    let mut out: Vec<CellSeries> = cells
        .into_values()
        .map(|(lat, lon, pairs)| CellSeries {
            lat,
            lon,
            distance: spatial.distance_to(lat, lon),
            series: DailySeries::from_pairs(pairs),
        })
        .collect();
    out.sort_by(|a, b| {
        a.distance
            .total_cmp(&b.distance)
            .then(a.lat.total_cmp(&b.lat))
            .then(a.lon.total_cmp(&b.lon))
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 6, day).unwrap()
    }

    #[test]
    fn test_aggregate_fn_parse() {
        assert_eq!("AVG".parse::<AggregateFn>().unwrap(), AggregateFn::Mean);
        assert_eq!("count".parse::<AggregateFn>().unwrap(), AggregateFn::Count);
        assert!(matches!(
            "median".parse::<AggregateFn>(),
            Err(ClimateError::UnsupportedAggregate(_))
        ));
    }

    #[test]
    fn test_nearest_per_group() {
        let spatial = SpatialQuery::new(48.0, 1.0, 0.1);
        let rows = vec![
            (d(1), 47.95, 1.0, 10.0),
            (d(1), 48.01, 1.0, 20.0),
            (d(2), 47.95, 1.0, 11.0),
        ];
        let best = nearest_per_group(&spatial, rows);
        assert_eq!(best.len(), 2);
        assert_eq!(best[&d(1)].3, 20.0);
        assert_eq!(best[&d(2)].3, 11.0);
    }

    #[test]
    fn test_nearest_tie_keeps_first() {
        let spatial = SpatialQuery::new(48.0, 1.0, 0.1);
        let rows = vec![(d(1), 47.5, 1.0, 1.0), (d(1), 48.5, 1.0, 2.0)];
        let best = nearest_per_group(&spatial, rows);
        assert_eq!(best[&d(1)].3, 1.0);
    }

    #[test]
    fn test_group_cells_orders_by_distance() {
        let spatial = SpatialQuery::new(48.0, 1.0, 0.1);
        let rows = vec![
            (47.92, 1.0, d(1), 1.0),
            (48.01, 1.0, d(1), 2.0),
            (48.01, 1.0, d(2), 3.0),
        ];
        let cells = group_cells(&spatial, rows);
        assert_eq!(cells.len(), 2);
        assert_eq!(cells[0].lat, 48.01);
        assert_eq!(cells[0].series.len(), 2);
        assert_eq!(cells[1].series.len(), 1);
    }
}
