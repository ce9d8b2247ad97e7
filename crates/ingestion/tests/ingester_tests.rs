//! End-to-end ingestion from in-memory and NetCDF cubes into the point store.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use climate_common::{ClimateResult, GridAxis, ObservationRow, SeriesKey, VariableAliases, YearRange};
use ingestion::{CancellationToken, IngestOptions, IngestRequest, Ingester, IngestionError};
use netcdf_parser::{CubeSource, MemoryCube, NetCdfError, NetCdfResult, Slice2D, TimeStep};
use storage::{ObservationSink, PointStore, SpatialQuery};
use test_utils::{
    date, netcdf_path, pattern_cube, pattern_value, regular_grid, sample_key, sample_points,
    scratch_dir, write_netcdf_cube, CubeFile,
};

async fn memory_ingester(options: IngestOptions) -> (Arc<PointStore>, Ingester<PointStore>) {
    let store = Arc::new(PointStore::open_memory().await.unwrap());
    let ingester = Ingester::new(store.clone(), options).unwrap();
    (store, ingester)
}

fn point_request(variable: &str) -> IngestRequest {
    IngestRequest::new(sample_key(variable)).with_points(sample_points())
}

/// Sink that records batch sizes and can cancel a token on first write.
#[derive(Default)]
struct RecordingSink {
    batches: Mutex<Vec<usize>>,
    cancel_on_write: Option<CancellationToken>,
}

#[async_trait]
impl ObservationSink for RecordingSink {
    async fn write_batch(&self, rows: &[ObservationRow]) -> ClimateResult<u64> {
        self.batches.lock().unwrap().push(rows.len());
        if let Some(token) = &self.cancel_on_write {
            token.cancel();
        }
        Ok(rows.len() as u64)
    }

    async fn existing_rows(&self, _key: &SeriesKey) -> ClimateResult<u64> {
        Ok(0)
    }
}

/// Source whose reads fail for one timestep.
struct FlakyCube {
    inner: MemoryCube,
    bad_index: usize,
}

impl CubeSource for FlakyCube {
    fn variable_name(&self) -> &str {
        self.inner.variable_name()
    }

    fn variable_names(&self) -> Vec<String> {
        self.inner.variable_names()
    }

    fn grid_axis(&self) -> &GridAxis {
        self.inner.grid_axis()
    }

    fn time_axis(&self) -> &[TimeStep] {
        self.inner.time_axis()
    }

    fn read_timestep(&self, index: usize) -> NetCdfResult<Slice2D> {
        if index == self.bad_index {
            return Err(NetCdfError::Read {
                index,
                message: "HDF error".to_string(),
            });
        }
        self.inner.read_timestep(index)
    }
}

// ============================================================================
// Point-filtered ingestion
// ============================================================================

#[tokio::test]
async fn test_ingestion_is_idempotent() {
    let (store, ingester) = memory_ingester(IngestOptions::default()).await;
    let cube = pattern_cube("pr", 5, 4, 10, date(2030, 1, 1));
    let request = point_request("pr");
    let cancel = CancellationToken::new();

    let first = ingester.ingest(&cube, &request, &cancel).await.unwrap();
    assert_eq!(first.rows_inserted, 20);
    assert_eq!(first.timesteps_read, 10);
    assert_eq!(first.cells_per_timestep, 2);

    let second = ingester.ingest(&cube, &request, &cancel).await.unwrap();
    assert_eq!(second.rows_inserted, 0);
    assert_eq!(second.rows_emitted, 20);
    assert_ne!(first.run_id, second.run_id);

    assert_eq!(store.count_existing(&request.key).await.unwrap(), 20);
}

#[tokio::test]
async fn test_rows_carry_resolved_cell_coordinates() {
    let (store, ingester) = memory_ingester(IngestOptions::default()).await;
    let cube = pattern_cube("pr", 5, 4, 3, date(2030, 1, 1));
    let request = point_request("pr");

    let summary = ingester
        .ingest(&cube, &request, &CancellationToken::new())
        .await
        .unwrap();
    let north_east = &summary.points[0];
    assert_eq!((north_east.cell.row, north_east.cell.col), (4, 3));
    assert_eq!(north_east.target_lat, 48.42);

    let series = store
        .query_series(
            &request.key,
            &SpatialQuery::around(north_east.cell.lat, north_east.cell.lon),
            None,
        )
        .await
        .unwrap();
    assert_eq!(series.len(), 3);
    assert_eq!(series.get(date(2030, 1, 2)), Some(pattern_value(1, 4, 3)));
}

#[tokio::test]
async fn test_points_on_same_cell_are_extracted_once() {
    let (_store, ingester) = memory_ingester(IngestOptions::default()).await;
    let cube = pattern_cube("tas", 5, 4, 2, date(2030, 1, 1));
    let mut points = sample_points();
    points.push(climate_common::RepresentativePoint::new("near-sw", 48.01, 1.01, "test"));
    let request = IngestRequest::new(sample_key("tas")).with_points(points);

    let summary = ingester
        .ingest(&cube, &request, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(summary.points.len(), 3);
    assert_eq!(summary.cells_per_timestep, 2);
    assert_eq!(summary.rows_inserted, 4);
}

#[tokio::test]
async fn test_year_filter_limits_timesteps() {
    let (_store, ingester) = memory_ingester(IngestOptions::default()).await;
    let cube = pattern_cube("pr", 5, 4, 4, date(2030, 12, 30));
    let request = point_request("pr").with_years(YearRange::new(2031, 2031).unwrap());

    let summary = ingester
        .ingest(&cube, &request, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(summary.timesteps_read, 2);
    assert_eq!(summary.rows_inserted, 4);
}

// ============================================================================
// Full-grid ingestion and missing values
// ============================================================================

#[tokio::test]
async fn test_full_grid_mode() {
    let (_store, ingester) = memory_ingester(IngestOptions::default()).await;
    let cube = pattern_cube("pr", 5, 4, 3, date(2030, 1, 1));
    let request = IngestRequest::new(sample_key("pr"));

    let summary = ingester
        .ingest(&cube, &request, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(summary.cells_per_timestep, 20);
    assert_eq!(summary.rows_inserted, 60);
    assert!(summary.points.is_empty());
}

#[tokio::test]
async fn test_missing_values_are_never_stored() {
    let (store, ingester) = memory_ingester(IngestOptions::default()).await;
    let grid = regular_grid(1, 3, 48.0, 1.0, 0.1);
    let cube = MemoryCube::daily(
        "pr",
        grid,
        date(2030, 1, 1),
        vec![
            vec![Some(1.0), None, Some(f64::NAN)],
            vec![Some(2.0), Some(3.0), None],
        ],
    )
    .unwrap();
    let request = IngestRequest::new(sample_key("pr"));

    let summary = ingester
        .ingest(&cube, &request, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(summary.rows_emitted, 3);
    assert_eq!(store.count_existing(&request.key).await.unwrap(), 3);
}

#[tokio::test]
async fn test_rows_flush_in_fixed_batches() {
    let sink = Arc::new(RecordingSink::default());
    let options = IngestOptions {
        batch_size: 3,
        precheck_existing: false,
    };
    let ingester = Ingester::new(sink.clone(), options).unwrap();
    let cube = pattern_cube("pr", 5, 4, 4, date(2030, 1, 1));

    let summary = ingester
        .ingest(&cube, &point_request("pr"), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(summary.rows_emitted, 8);
    assert_eq!(*sink.batches.lock().unwrap(), vec![3, 3, 2]);
}

// ============================================================================
// Failure handling and cancellation
// ============================================================================

#[tokio::test]
async fn test_undecodable_date_is_skipped() {
    let (_store, ingester) = memory_ingester(IngestOptions::default()).await;
    let grid = regular_grid(5, 4, 48.0, 1.0, 0.1);
    let times = vec![
        TimeStep { index: 0, date: Ok(date(2030, 2, 28)) },
        TimeStep { index: 1, date: Err("2030-02-30 is not a valid date".to_string()) },
        TimeStep { index: 2, date: Ok(date(2030, 3, 1)) },
    ];
    let slices = (0..3).map(|t| test_utils::pattern_slice(t, 5, 4)).collect();
    let cube = MemoryCube::new("pr", grid, times, slices).unwrap();

    let summary = ingester
        .ingest(&cube, &point_request("pr"), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(summary.timesteps_read, 2);
    assert_eq!(summary.timesteps_skipped, 1);
    assert_eq!(summary.rows_inserted, 4);
}

#[tokio::test]
async fn test_unreadable_timestep_is_skipped() {
    let (_store, ingester) = memory_ingester(IngestOptions::default()).await;
    let cube = FlakyCube {
        inner: pattern_cube("pr", 5, 4, 5, date(2030, 1, 1)),
        bad_index: 2,
    };

    let summary = ingester
        .ingest(&cube, &point_request("pr"), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(summary.timesteps_read, 4);
    assert_eq!(summary.timesteps_skipped, 1);
    assert_eq!(summary.rows_inserted, 8);
}

#[tokio::test]
async fn test_cancelled_before_start_writes_nothing() {
    let (store, ingester) = memory_ingester(IngestOptions::default()).await;
    let cube = pattern_cube("pr", 5, 4, 5, date(2030, 1, 1));
    let request = point_request("pr");
    let cancel = CancellationToken::new();
    cancel.cancel();

    let summary = ingester.ingest(&cube, &request, &cancel).await.unwrap();
    assert!(summary.cancelled);
    assert_eq!(summary.timesteps_read, 0);
    assert_eq!(store.count_existing(&request.key).await.unwrap(), 0);
}

#[tokio::test]
async fn test_cancellation_stops_at_timestep_boundary() {
    let cancel = CancellationToken::new();
    let sink = Arc::new(RecordingSink {
        batches: Mutex::new(Vec::new()),
        cancel_on_write: Some(cancel.clone()),
    });
    let options = IngestOptions {
        batch_size: 2,
        precheck_existing: false,
    };
    let ingester = Ingester::new(sink.clone(), options).unwrap();
    let cube = pattern_cube("pr", 5, 4, 10, date(2030, 1, 1));

    let summary = ingester.ingest(&cube, &point_request("pr"), &cancel).await.unwrap();
    assert!(summary.cancelled);
    assert_eq!(summary.timesteps_read, 1);
    assert_eq!(summary.rows_inserted, 2);
    assert_eq!(*sink.batches.lock().unwrap(), vec![2]);
}

#[tokio::test]
async fn test_empty_series_key_is_rejected() {
    let (_store, ingester) = memory_ingester(IngestOptions::default()).await;
    let cube = pattern_cube("pr", 5, 4, 1, date(2030, 1, 1));
    let request = IngestRequest::new(sample_key("pr").with_member(""));

    let err = ingester
        .ingest(&cube, &request, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, IngestionError::InvalidConfig(_)));
}

#[tokio::test]
async fn test_zero_batch_size_is_rejected() {
    let store = Arc::new(PointStore::open_memory().await.unwrap());
    let options = IngestOptions {
        batch_size: 0,
        precheck_existing: true,
    };
    assert!(matches!(
        Ingester::new(store, options),
        Err(IngestionError::InvalidConfig(_))
    ));
}

// ============================================================================
// NetCDF sources
// ============================================================================

#[tokio::test]
async fn test_ingest_netcdf_file() {
    let dir = scratch_dir();
    let path = netcdf_path(&dir, "pr_day");
    write_netcdf_cube(&path, &CubeFile::pattern("prAdjust", 5, 4, 3)).unwrap();

    let (store, ingester) = memory_ingester(IngestOptions::default()).await;
    let request = point_request("pr");
    let summary = ingester
        .ingest_path(&path, &VariableAliases::default(), &request, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.source_variable, "prAdjust");
    assert_eq!(summary.rows_inserted, 6);

    let south_west = &summary.points[1];
    let series = store
        .query_series(
            &request.key,
            &SpatialQuery::around(south_west.cell.lat, south_west.cell.lon),
            None,
        )
        .await
        .unwrap();
    assert_eq!(series.first_date(), Some(date(2030, 1, 1)));
    assert_eq!(series.get(date(2030, 1, 3)), Some(pattern_value(2, 0, 0)));
}

#[tokio::test]
async fn test_missing_variable_aborts_without_writes() {
    let dir = scratch_dir();
    let path = netcdf_path(&dir, "tas_day");
    write_netcdf_cube(&path, &CubeFile::pattern("tas", 5, 4, 3)).unwrap();

    let (store, ingester) = memory_ingester(IngestOptions::default()).await;
    let request = point_request("pr");
    let err = ingester
        .ingest_path(&path, &VariableAliases::default(), &request, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        IngestionError::Source(NetCdfError::VariableNotFound { .. })
    ));
    assert_eq!(store.count_existing(&request.key).await.unwrap(), 0);
}

#[tokio::test]
async fn test_missing_file_is_source_error() {
    let dir = scratch_dir();
    let (_store, ingester) = memory_ingester(IngestOptions::default()).await;

    let err = ingester
        .ingest_path(
            &netcdf_path(&dir, "absent"),
            &VariableAliases::default(),
            &point_request("pr"),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, IngestionError::Source(NetCdfError::IoError(_))));
}
