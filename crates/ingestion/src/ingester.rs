//! Grid-to-point ingestion driver.

use std::path::Path;
use std::sync::Arc;

use climate_common::{
    ClimateError, GridAxis, ObservationRow, RepresentativePoint, ResolvedCell, SeriesKey,
    VariableAliases, YearRange,
};
use netcdf_parser::{CubeSource, NetCdfCube, NetCdfError};
use serde::Serialize;
use storage::ObservationSink;
use tokio_util::sync::CancellationToken;
use tracing::{debug, field, info, instrument, warn, Span};
use uuid::Uuid;

use crate::config::IngestOptions;
use crate::error::{IngestionError, Result};

/// What to ingest from a source.
#[derive(Debug, Clone)]
pub struct IngestRequest {
    /// Identifying columns; `variable` is the logical name stored in rows
    pub key: SeriesKey,
    /// Target points, or `None` to ingest every grid cell
    pub points: Option<Vec<RepresentativePoint>>,
    /// Inclusive year filter on decoded dates
    pub years: Option<YearRange>,
}

impl IngestRequest {
    pub fn new(key: SeriesKey) -> Self {
        Self {
            key,
            points: None,
            years: None,
        }
    }

    pub fn with_points(mut self, points: Vec<RepresentativePoint>) -> Self {
        self.points = Some(points);
        self
    }

    pub fn with_years(mut self, years: YearRange) -> Self {
        self.years = Some(years);
        self
    }
}

/// A target point and the grid cell it was resolved to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedPoint {
    pub name: String,
    pub target_lat: f64,
    pub target_lon: f64,
    pub cell: ResolvedCell,
}

/// Outcome of an ingestion run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestSummary {
    pub run_id: Uuid,
    /// Physical variable name read from the source
    pub source_variable: String,
    /// Rows newly written to the store
    pub rows_inserted: u64,
    /// Rows produced from the source, including ones already stored
    pub rows_emitted: u64,
    pub timesteps_read: usize,
    /// Timesteps skipped because their date or slice could not be decoded
    pub timesteps_skipped: usize,
    /// Distinct grid cells extracted per timestep
    pub cells_per_timestep: usize,
    /// The run stopped early on cancellation
    pub cancelled: bool,
    /// Empty in full-grid mode
    pub points: Vec<ResolvedPoint>,
}

/// Grid cell extracted on every timestep.
#[derive(Debug, Clone, Copy)]
struct TargetCell {
    row: usize,
    col: usize,
    lat: f64,
    lon: f64,
}

/// Open the NetCDF cube holding a logical variable.
///
/// The physical variable is the first of `aliases.candidates(variable)`
/// present in the file.
pub fn open_source(path: &Path, aliases: &VariableAliases, variable: &str) -> Result<NetCdfCube> {
    let cube = NetCdfCube::open(path, &aliases.candidates(variable))?;
    info!(
        path = %path.display(),
        variable = %cube.variable_name(),
        access = ?cube.access(),
        timesteps = cube.timestep_count(),
        "Opened source cube"
    );
    Ok(cube)
}

/// Drives a cube source into an observation sink.
pub struct Ingester<S: ObservationSink> {
    sink: Arc<S>,
    options: IngestOptions,
}

impl<S: ObservationSink> Ingester<S> {
    pub fn new(sink: Arc<S>, options: IngestOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self { sink, options })
    }

    pub fn options(&self) -> &IngestOptions {
        &self.options
    }

    pub fn sink(&self) -> &Arc<S> {
        &self.sink
    }

    /// Open a NetCDF file and ingest it.
    ///
    /// Open failures and a missing variable abort before anything is written.
    pub async fn ingest_path(
        &self,
        path: &Path,
        aliases: &VariableAliases,
        request: &IngestRequest,
        cancel: &CancellationToken,
    ) -> Result<IngestSummary> {
        let cube = open_source(path, aliases, &request.key.variable)?;
        self.ingest(&cube, request, cancel).await
    }

    /// Ingest any cube source.
    ///
    /// Target points are resolved once against the source grid. Timesteps
    /// are then read one at a time and rows flushed in fixed-size batches.
    /// Timesteps whose date or slice cannot be decoded are logged and
    /// skipped. Cancellation is checked before each timestep; rows from
    /// completed timesteps are still flushed.
    #[instrument(
        skip(self, source, request, cancel),
        fields(run_id = field::Empty, series = %request.key)
    )]
    pub async fn ingest(
        &self,
        source: &dyn CubeSource,
        request: &IngestRequest,
        cancel: &CancellationToken,
    ) -> Result<IngestSummary> {
        let run_id = Uuid::new_v4();
        Span::current().record("run_id", field::display(run_id));

        if let Some(missing) = request.key.missing_field() {
            return Err(IngestionError::InvalidConfig(format!(
                "series key field '{}' is empty",
                missing
            )));
        }

        let grid = source.grid_axis();
        if grid.is_empty() {
            return Err(NetCdfError::Grid(ClimateError::EmptyGrid).into());
        }

        let (targets, points) = match &request.points {
            Some(points) => resolve_targets(grid, points)?,
            None => (full_grid_targets(grid), Vec::new()),
        };
        for point in &points {
            debug!(
                point = %point.name,
                row = point.cell.row,
                col = point.cell.col,
                distance = point.cell.distance,
                "Resolved target point"
            );
        }

        if self.options.precheck_existing {
            let existing = self.sink.existing_rows(&request.key).await?;
            if existing > 0 {
                warn!(
                    existing,
                    "Series already has stored rows; existing keys will be skipped"
                );
            }
        }

        let indices = source.timestep_indices(request.years);
        info!(
            source_variable = %source.variable_name(),
            timesteps = indices.len(),
            cells = targets.len(),
            full_grid = request.points.is_none(),
            batch_size = self.options.batch_size,
            "Starting ingestion"
        );

        let key = Arc::new(request.key.clone());
        let batch_size = self.options.batch_size;
        let mut buffer: Vec<ObservationRow> = Vec::with_capacity(batch_size);
        let mut summary = IngestSummary {
            run_id,
            source_variable: source.variable_name().to_string(),
            rows_inserted: 0,
            rows_emitted: 0,
            timesteps_read: 0,
            timesteps_skipped: 0,
            cells_per_timestep: targets.len(),
            cancelled: false,
            points,
        };

        let time_axis = source.time_axis();
        for index in indices {
            if cancel.is_cancelled() {
                info!(index, "Ingestion cancelled");
                summary.cancelled = true;
                break;
            }

            let date = match time_axis.get(index).map(|step| &step.date) {
                Some(Ok(date)) => *date,
                Some(Err(message)) => {
                    warn!(index, error = %message, "Skipping timestep with undecodable date");
                    summary.timesteps_skipped += 1;
                    continue;
                }
                None => {
                    return Err(NetCdfError::TimestepOutOfRange {
                        index,
                        len: time_axis.len(),
                    }
                    .into())
                }
            };

            let slice = match source.read_timestep(index) {
                Ok(slice) => slice,
                Err(err) if err.is_timestep_local() => {
                    warn!(index, %date, error = %err, "Skipping unreadable timestep");
                    summary.timesteps_skipped += 1;
                    continue;
                }
                Err(err) => return Err(err.into()),
            };
            summary.timesteps_read += 1;

            for target in &targets {
                if let Some(value) = slice.get(target.row, target.col) {
                    if value.is_finite() {
                        buffer.push(ObservationRow::new(
                            key.clone(),
                            target.lat,
                            target.lon,
                            date,
                            value,
                        ));
                    }
                }
            }
            drop(slice);

            while buffer.len() >= batch_size {
                summary.rows_inserted += self.flush(&buffer[..batch_size]).await?;
                summary.rows_emitted += batch_size as u64;
                buffer.drain(..batch_size);
            }
        }

        if !buffer.is_empty() {
            summary.rows_inserted += self.flush(&buffer).await?;
            summary.rows_emitted += buffer.len() as u64;
        }

        info!(
            rows_inserted = summary.rows_inserted,
            rows_emitted = summary.rows_emitted,
            timesteps_read = summary.timesteps_read,
            timesteps_skipped = summary.timesteps_skipped,
            cancelled = summary.cancelled,
            "Ingestion finished"
        );
        Ok(summary)
    }

    async fn flush(&self, rows: &[ObservationRow]) -> Result<u64> {
        let inserted = self.sink.write_batch(rows).await?;
        debug!(rows = rows.len(), inserted, "Flushed batch");
        Ok(inserted)
    }
}

/// Resolve points once, collapsing points that land on the same cell.
fn resolve_targets(
    grid: &GridAxis,
    points: &[RepresentativePoint],
) -> Result<(Vec<TargetCell>, Vec<ResolvedPoint>)> {
    let resolved = grid.resolve_all(points).map_err(NetCdfError::Grid)?;

    let mut targets: Vec<TargetCell> = Vec::with_capacity(resolved.len());
    let mut out = Vec::with_capacity(resolved.len());
    for (point, cell) in resolved {
        if !targets.iter().any(|t| t.row == cell.row && t.col == cell.col) {
            targets.push(TargetCell {
                row: cell.row,
                col: cell.col,
                lat: cell.lat,
                lon: cell.lon,
            });
        }
        out.push(ResolvedPoint {
            name: point.name.clone(),
            target_lat: point.lat,
            target_lon: point.lon,
            cell,
        });
    }
    Ok((targets, out))
}

/// Every cell with finite coordinates, row-major.
fn full_grid_targets(grid: &GridAxis) -> Vec<TargetCell> {
    let (rows, cols) = grid.shape();
    let mut targets = Vec::with_capacity(rows * cols);
    for row in 0..rows {
        for col in 0..cols {
            if let Some((lat, lon)) = grid.coordinate(row, col) {
                if lat.is_finite() && lon.is_finite() {
                    targets.push(TargetCell { row, col, lat, lon });
                }
            }
        }
    }
    targets
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> GridAxis {
        GridAxis::regular(vec![48.0, 48.1, 48.2], vec![1.0, 1.1])
    }

    #[test]
    fn test_duplicate_points_share_a_cell() {
        let points = vec![
            RepresentativePoint::new("a", 48.01, 1.01, "x"),
            RepresentativePoint::new("b", 47.99, 0.99, "x"),
            RepresentativePoint::new("c", 48.2, 1.1, "x"),
        ];
        let (targets, resolved) = resolve_targets(&grid(), &points).unwrap();
        assert_eq!(targets.len(), 2);
        assert_eq!(resolved.len(), 3);
        assert_eq!((resolved[1].cell.row, resolved[1].cell.col), (0, 0));
        assert_eq!((targets[1].row, targets[1].col), (2, 1));
    }

    #[test]
    fn test_full_grid_skips_non_finite_cells() {
        let grid = GridAxis::curvilinear(1, 3, vec![48.0, f64::NAN, 48.0], vec![1.0, 1.1, 1.2])
            .unwrap();
        let targets = full_grid_targets(&grid);
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[1].col, 2);
    }
}
