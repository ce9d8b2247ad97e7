//! Per-point daily series returned by store queries.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::time::DateRange;

/// Date-ordered `(date, value)` pairs with no duplicate dates.
///
/// Missing days are allowed; consumers must not assume contiguity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailySeries {
    points: Vec<(NaiveDate, f64)>,
}

impl DailySeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from pairs in any order. For duplicate dates the first
    /// occurrence in input order is kept.
    pub fn from_pairs(mut pairs: Vec<(NaiveDate, f64)>) -> Self {
        // Stable sort keeps input order within equal dates.
        pairs.sort_by_key(|(date, _)| *date);
        pairs.dedup_by_key(|(date, _)| *date);
        Self { points: pairs }
    }

    /// Build from consecutive days starting at `start`.
    pub fn from_values(start: NaiveDate, values: &[f64]) -> Self {
        let points = start
            .iter_days()
            .zip(values.iter().copied())
            .collect();
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[(NaiveDate, f64)] {
        &self.points
    }

    pub fn iter(&self) -> impl Iterator<Item = &(NaiveDate, f64)> {
        self.points.iter()
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|(_, v)| *v)
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|(d, _)| *d)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|(d, _)| *d)
    }

    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        self.points
            .binary_search_by_key(&date, |(d, _)| *d)
            .ok()
            .map(|idx| self.points[idx].1)
    }

    /// Sub-series restricted to an inclusive date range.
    pub fn between(&self, range: &DateRange) -> DailySeries {
        let start = self.points.partition_point(|(d, _)| *d < range.start);
        let end = self.points.partition_point(|(d, _)| *d <= range.end);
        DailySeries {
            points: self.points[start..end].to_vec(),
        }
    }
}
