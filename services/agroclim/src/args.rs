//! Command-line arguments.

use std::path::PathBuf;

use chrono::{Datelike, NaiveDate};
use clap::{Args, Parser, Subcommand, ValueEnum};
use climate_common::{
    time::parse_date, ClimateError, ClimateResult, DateRange, PointRegistry, SeriesKey, TimeBucket,
    YearRange,
};
use storage::{AggregateFn, SpatialQuery, DEFAULT_TOLERANCE};

#[derive(Parser, Debug)]
#[command(name = "agroclim")]
#[command(about = "Climate projection ingestion and agro-climatic indicators")]
pub struct Cli {
    /// SQLite store path
    #[arg(long, env = "AGROCLIM_DB", default_value = "agroclim.db", global = true)]
    pub db: PathBuf,

    /// YAML representative-point registry
    #[arg(long, env = "AGROCLIM_POINTS_FILE", global = true)]
    pub points_file: Option<PathBuf>,

    /// YAML variable alias table
    #[arg(long, env = "AGROCLIM_ALIASES_FILE", global = true)]
    pub aliases_file: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info", global = true)]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Ingest a NetCDF cube into the store
    Ingest(IngestArgs),
    /// Summarize what the store holds
    Stats,
    /// Print the daily series at a point
    Series(SeriesArgs),
    /// Aggregate a series per month or year
    Aggregate(AggregateArgs),
    /// Compute an agro-climatic indicator at a point
    Indicators(IndicatorArgs),
}

/// Model run columns shared by every series.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[arg(long)]
    pub experiment: String,
    #[arg(long)]
    pub gcm: String,
    #[arg(long)]
    pub rcm: String,
    #[arg(long)]
    pub member: String,
}

impl RunArgs {
    pub fn key(&self, variable: &str) -> SeriesKey {
        SeriesKey::new(variable, &self.experiment, &self.gcm, &self.rcm, &self.member)
    }
}

/// Query location: a named point or explicit coordinates.
#[derive(Args, Debug, Clone)]
pub struct LocationArgs {
    /// Representative point name
    #[arg(long, conflicts_with_all = ["lat", "lon"])]
    pub point: Option<String>,
    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    pub lat: Option<f64>,
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    pub lon: Option<f64>,
    /// Half-width of the matching box in degrees
    #[arg(long, default_value_t = DEFAULT_TOLERANCE)]
    pub tolerance: f64,
}

impl LocationArgs {
    pub fn spatial(&self, registry: &PointRegistry) -> ClimateResult<SpatialQuery> {
        let (lat, lon) = match (&self.point, self.lat, self.lon) {
            (Some(name), _, _) => {
                let point = registry.find(name).ok_or_else(|| {
                    ClimateError::invalid_parameter("point", format!("unknown point '{}'", name))
                })?;
                (point.lat, point.lon)
            }
            (None, Some(lat), Some(lon)) => (lat, lon),
            _ => {
                return Err(ClimateError::invalid_parameter(
                    "point",
                    "either --point or both --lat and --lon are required",
                ))
            }
        };
        Ok(SpatialQuery::new(lat, lon, self.tolerance))
    }

    /// Label used in output.
    pub fn label(&self) -> String {
        match (&self.point, self.lat, self.lon) {
            (Some(name), _, _) => name.clone(),
            (None, Some(lat), Some(lon)) => format!("{},{}", lat, lon),
            _ => String::new(),
        }
    }
}

/// Optional inclusive date filter.
#[derive(Args, Debug, Clone)]
pub struct DateArgs {
    /// First date, YYYY-MM-DD
    #[arg(long, requires = "end")]
    pub start: Option<String>,
    /// Last date, YYYY-MM-DD
    #[arg(long, requires = "start")]
    pub end: Option<String>,
}

impl DateArgs {
    pub fn range(&self) -> ClimateResult<Option<DateRange>> {
        match (&self.start, &self.end) {
            (Some(start), Some(end)) => DateRange::parse(start, end).map(Some),
            (None, None) => Ok(None),
            _ => Err(ClimateError::invalid_parameter(
                "dates",
                "--start and --end must be given together",
            )),
        }
    }
}

#[derive(Args, Debug)]
pub struct IngestArgs {
    /// NetCDF file to read
    #[arg(long)]
    pub file: PathBuf,

    /// Logical variable name (pr, tas, tasmax, ...)
    #[arg(long)]
    pub variable: String,

    #[command(flatten)]
    pub run: RunArgs,

    /// `all`, a region, or comma-separated point names
    #[arg(long, default_value = "all", conflicts_with = "full_grid")]
    pub points: String,

    /// Store every grid cell instead of the representative points
    #[arg(long)]
    pub full_grid: bool,

    #[arg(long)]
    pub start_year: Option<i32>,

    #[arg(long)]
    pub end_year: Option<i32>,

    /// Rows per store batch
    #[arg(long, env = "AGROCLIM_BATCH_SIZE")]
    pub batch_size: Option<usize>,
}

impl IngestArgs {
    pub fn years(&self) -> ClimateResult<Option<YearRange>> {
        match (self.start_year, self.end_year) {
            (Some(start), Some(end)) => YearRange::new(start, end).map(Some),
            (Some(year), None) | (None, Some(year)) => YearRange::new(year, year).map(Some),
            (None, None) => Ok(None),
        }
    }
}

#[derive(Args, Debug)]
pub struct SeriesArgs {
    #[arg(long)]
    pub variable: String,

    #[command(flatten)]
    pub run: RunArgs,

    #[command(flatten)]
    pub location: LocationArgs,

    #[command(flatten)]
    pub dates: DateArgs,

    /// One series per matched grid cell instead of the nearest-wins merge
    #[arg(long)]
    pub cells: bool,
}

#[derive(Args, Debug)]
pub struct AggregateArgs {
    #[arg(long)]
    pub variable: String,

    #[command(flatten)]
    pub run: RunArgs,

    #[command(flatten)]
    pub location: LocationArgs,

    #[command(flatten)]
    pub dates: DateArgs,

    /// month or year
    #[arg(long, default_value = "month")]
    pub bucket: TimeBucket,

    /// sum, mean, min, max or count
    #[arg(long, default_value = "sum")]
    pub function: AggregateFn,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorKind {
    Potential,
    Drought,
    ExcessWater,
    HeatWaves,
    Corn,
    CoverCrop,
}

impl IndicatorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndicatorKind::Potential => "potential",
            IndicatorKind::Drought => "drought",
            IndicatorKind::ExcessWater => "excess-water",
            IndicatorKind::HeatWaves => "heat-waves",
            IndicatorKind::Corn => "corn",
            IndicatorKind::CoverCrop => "cover-crop",
        }
    }
}

#[derive(Args, Debug)]
pub struct IndicatorArgs {
    #[arg(long, value_enum)]
    pub indicator: IndicatorKind,

    #[command(flatten)]
    pub run: RunArgs,

    #[command(flatten)]
    pub location: LocationArgs,

    /// First date, YYYY-MM-DD
    #[arg(long)]
    pub start: String,

    /// Last date, YYYY-MM-DD
    #[arg(long)]
    pub end: String,

    /// Rainfall (mm) for a full rain score
    #[arg(long)]
    pub min_rainfall: Option<f64>,

    /// Degree days for a full heat-accumulation score
    #[arg(long)]
    pub degree_days_threshold: Option<f64>,

    /// Base temperature for degree days (C)
    #[arg(long, allow_negative_numbers = true)]
    pub base_temperature: Option<f64>,

    /// Hot days tolerated before the penalty starts
    #[arg(long)]
    pub max_hot_days: Option<u32>,

    /// Largest acceptable 7-day rainfall (mm)
    #[arg(long)]
    pub max_7day_rainfall: Option<f64>,

    /// Non-workable days tolerated
    #[arg(long)]
    pub non_workable_days: Option<u32>,

    /// Cover-crop sliding windows in days
    #[arg(long, value_delimiter = ',')]
    pub window_days: Option<Vec<usize>>,

    /// Cover-crop rainfall per 30 days (mm)
    #[arg(long)]
    pub monthly_threshold: Option<f64>,
}

impl IndicatorArgs {
    pub fn range(&self) -> ClimateResult<DateRange> {
        DateRange::new(parse_date(&self.start)?, parse_date(&self.end)?)
    }

    /// Calendar years touched by the date range.
    pub fn years(&self) -> ClimateResult<YearRange> {
        let range = self.range()?;
        YearRange::new(range.start.year(), range.end.year())
    }

    /// Whole calendar years covering the date range.
    pub fn year_span(&self) -> ClimateResult<DateRange> {
        let years = self.years()?;
        let first = NaiveDate::from_ymd_opt(years.start, 1, 1)
            .ok_or_else(|| ClimateError::InvalidDate(years.start.to_string()))?;
        let last = NaiveDate::from_ymd_opt(years.end, 12, 31)
            .ok_or_else(|| ClimateError::InvalidDate(years.end.to_string()))?;
        DateRange::new(first, last)
    }
}
