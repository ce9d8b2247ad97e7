//! Date ranges, seasonal windows and aggregation buckets.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{ClimateError, ClimateResult};

/// Inclusive range of calendar years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub start: i32,
    pub end: i32,
}

impl YearRange {
    pub fn new(start: i32, end: i32) -> ClimateResult<Self> {
        if start > end {
            return Err(ClimateError::invalid_parameter(
                "year_range",
                format!("start year {} is after end year {}", start, end),
            ));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        (self.start..=self.end).contains(&date.year())
    }
}

/// Inclusive range of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> ClimateResult<Self> {
        if start > end {
            return Err(ClimateError::InvalidDate(format!(
                "range start {} is after end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// Parse two `YYYY-MM-DD` strings.
    pub fn parse(start: &str, end: &str) -> ClimateResult<Self> {
        Self::new(parse_date(start)?, parse_date(end)?)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Number of days covered, both ends included.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(s: &str) -> ClimateResult<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| ClimateError::InvalidDate(s.to_string()))
}

/// A month/day window repeated every year, such as a sowing period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonalWindow {
    pub id: String,
    pub name: String,
    pub start: (u32, u32),
    pub end: (u32, u32),
}

impl SeasonalWindow {
    pub fn new(id: &str, name: &str, start: (u32, u32), end: (u32, u32)) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            start,
            end,
        }
    }

    /// Concrete date range of this window in a given year.
    pub fn for_year(&self, year: i32) -> ClimateResult<DateRange> {
        let date = |(month, day): (u32, u32)| {
            NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
                ClimateError::InvalidDate(format!("{}-{:02}-{:02}", year, month, day))
            })
        };
        DateRange::new(date(self.start)?, date(self.end)?)
    }

    /// Agricultural period presets.
    pub fn presets() -> Vec<SeasonalWindow> {
        vec![
            SeasonalWindow::new("post_semis_ete", "Post-semis été", (4, 15), (6, 30)),
            SeasonalWindow::new("interculture_ete", "Interculture été", (7, 1), (9, 15)),
            SeasonalWindow::new("interculture_hiver", "Interculture hiver", (9, 16), (11, 30)),
            SeasonalWindow::new("semis_ble", "Semis blé", (10, 1), (11, 15)),
        ]
    }

    pub fn preset(id: &str) -> Option<SeasonalWindow> {
        Self::presets().into_iter().find(|w| w.id == id)
    }
}

/// Calendar unit used to group aggregated values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeBucket {
    Month,
    Year,
}

impl TimeBucket {
    /// SQLite `strftime` pattern producing the bucket key.
    pub fn strftime_pattern(&self) -> &'static str {
        match self {
            TimeBucket::Month => "%Y-%m",
            TimeBucket::Year => "%Y",
        }
    }

    /// Bucket key of a date, matching [`Self::strftime_pattern`].
    pub fn key_for(&self, date: NaiveDate) -> String {
        date.format(self.strftime_pattern()).to_string()
    }
}

impl FromStr for TimeBucket {
    type Err = ClimateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "month" | "monthly" => Ok(TimeBucket::Month),
            "year" | "yearly" | "annual" => Ok(TimeBucket::Year),
            other => Err(ClimateError::UnsupportedBucket(other.to_string())),
        }
    }
}

impl fmt::Display for TimeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeBucket::Month => write!(f, "month"),
            TimeBucket::Year => write!(f, "year"),
        }
    }
}
