//! Grid coordinate systems and nearest-cell resolution.
//!
//! A [`GridAxis`] is materialized once per source and then reused to resolve
//! every target point, so coordinate arrays are never re-read per point or
//! per timestep.

use serde::{Deserialize, Serialize};

use crate::error::{ClimateError, ClimateResult};
use crate::points::RepresentativePoint;

/// Spatial coordinates of a gridded source.
///
/// Cells are addressed as `(row, col)` where rows follow the latitude-like
/// dimension. Values of a 2D slice are stored row-major in the same order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GridAxisRepr")]
pub enum GridAxis {
    /// Axis-aligned grid: cell `(i, j)` sits at `(lats[i], lons[j])`.
    Regular { lats: Vec<f64>, lons: Vec<f64> },
    /// Curvilinear grid: each cell has its own coordinate pair, row-major.
    Curvilinear {
        rows: usize,
        cols: usize,
        lats: Vec<f64>,
        lons: Vec<f64>,
    },
}

/// Unchecked wire form of [`GridAxis`].
#[derive(Deserialize)]
enum GridAxisRepr {
    Regular {
        lats: Vec<f64>,
        lons: Vec<f64>,
    },
    Curvilinear {
        rows: usize,
        cols: usize,
        lats: Vec<f64>,
        lons: Vec<f64>,
    },
}

impl TryFrom<GridAxisRepr> for GridAxis {
    type Error = ClimateError;

    fn try_from(repr: GridAxisRepr) -> ClimateResult<Self> {
        match repr {
            GridAxisRepr::Regular { lats, lons } => Ok(GridAxis::regular(lats, lons)),
            GridAxisRepr::Curvilinear {
                rows,
                cols,
                lats,
                lons,
            } => GridAxis::curvilinear(rows, cols, lats, lons),
        }
    }
}

/// A target resolved onto the grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolvedCell {
    pub row: usize,
    pub col: usize,
    /// Latitude of the grid cell (not of the requested target)
    pub lat: f64,
    /// Longitude of the grid cell
    pub lon: f64,
    /// Euclidean distance in degree space between target and cell
    pub distance: f64,
}

impl GridAxis {
    /// Create an axis-aligned grid from 1D coordinate vectors.
    pub fn regular(lats: Vec<f64>, lons: Vec<f64>) -> Self {
        GridAxis::Regular { lats, lons }
    }

    /// Create a curvilinear grid from row-major 2D coordinate arrays.
    pub fn curvilinear(
        rows: usize,
        cols: usize,
        lats: Vec<f64>,
        lons: Vec<f64>,
    ) -> ClimateResult<Self> {
        let expected = rows * cols;
        for actual in [lats.len(), lons.len()] {
            if actual != expected {
                return Err(ClimateError::GridShapeMismatch { expected, actual });
            }
        }
        Ok(GridAxis::Curvilinear {
            rows,
            cols,
            lats,
            lons,
        })
    }

    /// Grid shape as `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        match self {
            GridAxis::Regular { lats, lons } => (lats.len(), lons.len()),
            GridAxis::Curvilinear { rows, cols, .. } => (*rows, *cols),
        }
    }

    /// Total number of grid cells.
    pub fn cell_count(&self) -> usize {
        let (rows, cols) = self.shape();
        rows * cols
    }

    pub fn is_empty(&self) -> bool {
        self.cell_count() == 0
    }

    /// Get the 1D row-major index for a cell.
    pub fn flat_index(&self, row: usize, col: usize) -> usize {
        row * self.shape().1 + col
    }

    /// Coordinates of a cell, or `None` if out of range.
    pub fn coordinate(&self, row: usize, col: usize) -> Option<(f64, f64)> {
        let (rows, cols) = self.shape();
        if row >= rows || col >= cols {
            return None;
        }
        match self {
            GridAxis::Regular { lats, lons } => Some((lats[row], lons[col])),
            GridAxis::Curvilinear { lats, lons, .. } => {
                let idx = row * cols + col;
                Some((lats[idx], lons[idx]))
            }
        }
    }

    /// Resolve a target coordinate to the nearest grid cell.
    ///
    /// Ties go to the first cell in row-major scan order. Cells with
    /// non-finite coordinates are never selected.
    pub fn resolve(&self, lat: f64, lon: f64) -> ClimateResult<ResolvedCell> {
        if self.is_empty() {
            return Err(ClimateError::EmptyGrid);
        }

        let (row, col) = match self {
            // Independent per-axis search; the combined Euclidean minimum
            // separates on an axis-aligned grid.
            GridAxis::Regular { lats, lons } => {
                let row = nearest_index(lats, lat).ok_or(ClimateError::EmptyGrid)?;
                let col = nearest_index(lons, lon).ok_or(ClimateError::EmptyGrid)?;
                (row, col)
            }
            GridAxis::Curvilinear {
                cols, lats, lons, ..
            } => {
                let mut best: Option<(usize, f64)> = None;
                for (idx, (cell_lat, cell_lon)) in lats.iter().zip(lons.iter()).enumerate() {
                    let d2 = squared_distance(lat, lon, *cell_lat, *cell_lon);
                    if !d2.is_finite() {
                        continue;
                    }
                    match best {
                        Some((_, best_d2)) if d2 >= best_d2 => {}
                        _ => best = Some((idx, d2)),
                    }
                }
                let (idx, _) = best.ok_or(ClimateError::EmptyGrid)?;
                (idx / cols, idx % cols)
            }
        };

        let (cell_lat, cell_lon) = self.coordinate(row, col).ok_or(ClimateError::EmptyGrid)?;
        Ok(ResolvedCell {
            row,
            col,
            lat: cell_lat,
            lon: cell_lon,
            distance: squared_distance(lat, lon, cell_lat, cell_lon).sqrt(),
        })
    }

    /// Resolve a batch of named points against this grid.
    pub fn resolve_all<'p>(
        &self,
        points: &'p [RepresentativePoint],
    ) -> ClimateResult<Vec<(&'p RepresentativePoint, ResolvedCell)>> {
        points
            .iter()
            .map(|p| self.resolve(p.lat, p.lon).map(|cell| (p, cell)))
            .collect()
    }
}

fn squared_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dlat = lat1 - lat2;
    let dlon = lon1 - lon2;
    dlat * dlat + dlon * dlon
}

/// Linear scan for the closest finite value; first index wins ties.
fn nearest_index(values: &[f64], target: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, v) in values.iter().enumerate() {
        let d = (v - target).abs();
        if !d.is_finite() {
            continue;
        }
        match best {
            Some((_, best_d)) if d >= best_d => {}
            _ => best = Some((idx, d)),
        }
    }
    best.map(|(idx, _)| idx)
}
