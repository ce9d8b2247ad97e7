//! Streaming access to a (time, y, x) data cube.

use chrono::NaiveDate;
use climate_common::{GridAxis, YearRange};

use crate::error::{NetCdfError, NetCdfResult};

/// One entry of a cube's time axis.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeStep {
    pub index: usize,
    /// Decoded date, or why it could not be decoded.
    pub date: Result<NaiveDate, String>,
}

/// One timestep's 2D spatial slice, row-major over the grid's `(row, col)`.
///
/// Missing, masked and fill cells are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct Slice2D {
    pub rows: usize,
    pub cols: usize,
    pub values: Vec<Option<f64>>,
}

impl Slice2D {
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.values[row * self.cols + col]
    }

    /// Number of cells holding a value.
    pub fn valid_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }
}

/// A gridded source that can be read one timestep at a time.
pub trait CubeSource {
    /// Physical name of the variable selected at open time.
    fn variable_name(&self) -> &str;

    /// All variable names in the source.
    fn variable_names(&self) -> Vec<String>;

    fn grid_axis(&self) -> &GridAxis;

    fn time_axis(&self) -> &[TimeStep];

    /// Read a single timestep. Never touches neighbouring timesteps.
    fn read_timestep(&self, index: usize) -> NetCdfResult<Slice2D>;

    fn timestep_count(&self) -> usize {
        self.time_axis().len()
    }

    /// Timestep indices whose date falls inside `years`, computed in one
    /// pass over the decoded axis. Undecodable timesteps are kept so the
    /// caller can report them.
    fn timestep_indices(&self, years: Option<YearRange>) -> Vec<usize> {
        self.time_axis()
            .iter()
            .filter(|step| match (&step.date, years) {
                (Ok(date), Some(range)) => range.contains(*date),
                _ => true,
            })
            .map(|step| step.index)
            .collect()
    }
}

/// Cube held fully in memory.
#[derive(Debug, Clone)]
pub struct MemoryCube {
    variable: String,
    grid: GridAxis,
    times: Vec<TimeStep>,
    slices: Vec<Vec<Option<f64>>>,
}

impl MemoryCube {
    pub fn new(
        variable: &str,
        grid: GridAxis,
        times: Vec<TimeStep>,
        slices: Vec<Vec<Option<f64>>>,
    ) -> NetCdfResult<Self> {
        if times.len() != slices.len() {
            return Err(NetCdfError::InvalidFormat(format!(
                "{} time entries for {} slices",
                times.len(),
                slices.len()
            )));
        }
        let cells = grid.cell_count();
        if let Some(bad) = slices.iter().position(|s| s.len() != cells) {
            return Err(NetCdfError::InvalidFormat(format!(
                "slice {} has {} cells, grid has {}",
                bad,
                slices[bad].len(),
                cells
            )));
        }
        Ok(Self {
            variable: variable.to_string(),
            grid,
            times,
            slices,
        })
    }

    /// Cube with one slice per consecutive day starting at `start`.
    pub fn daily(
        variable: &str,
        grid: GridAxis,
        start: NaiveDate,
        slices: Vec<Vec<Option<f64>>>,
    ) -> NetCdfResult<Self> {
        let times = start
            .iter_days()
            .take(slices.len())
            .enumerate()
            .map(|(index, date)| TimeStep {
                index,
                date: Ok(date),
            })
            .collect();
        Self::new(variable, grid, times, slices)
    }
}

impl CubeSource for MemoryCube {
    fn variable_name(&self) -> &str {
        &self.variable
    }

    fn variable_names(&self) -> Vec<String> {
        vec![self.variable.clone()]
    }

    fn grid_axis(&self) -> &GridAxis {
        &self.grid
    }

    fn time_axis(&self) -> &[TimeStep] {
        &self.times
    }

    fn read_timestep(&self, index: usize) -> NetCdfResult<Slice2D> {
        let values = self
            .slices
            .get(index)
            .ok_or(NetCdfError::TimestepOutOfRange {
                index,
                len: self.slices.len(),
            })?;
        let (rows, cols) = self.grid.shape();
        Ok(Slice2D {
            rows,
            cols,
            values: values
                .iter()
                .map(|v| v.filter(|x| x.is_finite()))
                .collect(),
        })
    }
}
