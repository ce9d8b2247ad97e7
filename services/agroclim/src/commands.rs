//! Subcommand handlers. Each prints its result as JSON on stdout.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use climate_common::{ClimateError, DateRange, DailySeries, PointRegistry, SeriesKey};
use indicators::{
    corn_viability_by_year, cover_crop_feasibility, drought_risk, excess_water_risk,
    heat_wave_days, potential_score, CornCriteria, CoverCropParams, CropCalendar,
    ExcessWaterParams, MemberSeries, PotentialParams,
};
use ingestion::{open_source, CancellationToken, IngestConfig, IngestRequest, Ingester};
use serde::Serialize;
use storage::{AccessMode, PointStore, SpatialQuery};
use tracing::{info, warn};

use crate::args::{AggregateArgs, IndicatorArgs, IndicatorKind, IngestArgs, SeriesArgs};

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[derive(Serialize)]
struct Location<'a> {
    name: String,
    #[serde(flatten)]
    query: &'a SpatialQuery,
}

#[derive(Serialize)]
struct SeriesReport<'a, T: Serialize> {
    key: &'a SeriesKey,
    location: Location<'a>,
    dates: Option<DateRange>,
    #[serde(flatten)]
    data: T,
}

#[derive(Serialize)]
struct IndicatorReport<'a, T: Serialize> {
    indicator: &'static str,
    experiment: &'a str,
    gcm: &'a str,
    rcm: &'a str,
    location: Location<'a>,
    start: NaiveDate,
    end: NaiveDate,
    result: T,
}

/// Ingest a NetCDF file, cancelling cooperatively on Ctrl-C.
///
/// The source is opened before the store so a bad file leaves no database
/// or lock file behind.
pub async fn ingest(
    db: &Path,
    config: &IngestConfig,
    registry: &PointRegistry,
    args: &IngestArgs,
) -> Result<()> {
    let mut options = config.options;
    if let Some(batch_size) = args.batch_size {
        options.batch_size = batch_size;
    }

    let mut request = IngestRequest::new(args.run.key(&args.variable));
    if !args.full_grid {
        let points = registry.select(&args.points).ok_or_else(|| {
            ClimateError::invalid_parameter("points", format!("unknown selector '{}'", args.points))
        })?;
        request = request.with_points(points);
    }
    if let Some(years) = args.years()? {
        request = request.with_years(years);
    }
    let aliases = config.load_aliases()?;
    let cube = open_source(&args.file, &aliases, &args.variable)?;

    let store = Arc::new(PointStore::open(db, AccessMode::ReadWrite).await?);
    let ingester = Ingester::new(Arc::clone(&store), options)?;

    let cancel = CancellationToken::new();
    let watcher = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current timestep");
            watcher.cancel();
        }
    });

    let summary = ingester.ingest(&cube, &request, &cancel).await?;
    info!(
        run_id = %summary.run_id,
        inserted = summary.rows_inserted,
        skipped = summary.timesteps_skipped,
        cancelled = summary.cancelled,
        "Ingestion finished"
    );

    drop(ingester);
    if let Ok(store) = Arc::try_unwrap(store) {
        store.close().await;
    }
    print_json(&summary)
}

pub async fn stats(db: &Path) -> Result<()> {
    let store = PointStore::open(db, AccessMode::ReadOnly).await?;
    let stats = store.stats().await?;
    store.close().await;
    print_json(&stats)
}

pub async fn series(db: &Path, registry: &PointRegistry, args: &SeriesArgs) -> Result<()> {
    let key = args.run.key(&args.variable);
    let spatial = args.location.spatial(registry)?;
    let dates = args.dates.range()?;
    let location = Location {
        name: args.location.label(),
        query: &spatial,
    };

    let store = PointStore::open(db, AccessMode::ReadOnly).await?;
    if args.cells {
        #[derive(Serialize)]
        struct Cells<T> {
            cells: T,
        }
        let cells = store.query_cells(&key, &spatial, dates.as_ref()).await?;
        print_json(&SeriesReport {
            key: &key,
            location,
            dates,
            data: Cells { cells },
        })?;
    } else {
        #[derive(Serialize)]
        struct Merged {
            series: DailySeries,
        }
        let series = store.query_series(&key, &spatial, dates.as_ref()).await?;
        print_json(&SeriesReport {
            key: &key,
            location,
            dates,
            data: Merged { series },
        })?;
    }
    store.close().await;
    Ok(())
}

pub async fn aggregate(
    db: &Path,
    registry: &PointRegistry,
    args: &AggregateArgs,
) -> Result<()> {
    #[derive(Serialize)]
    struct Buckets<T> {
        bucket: climate_common::TimeBucket,
        function: String,
        values: T,
    }

    let key = args.run.key(&args.variable);
    let spatial = args.location.spatial(registry)?;
    let dates = args.dates.range()?;

    let store = PointStore::open(db, AccessMode::ReadOnly).await?;
    let values = store
        .aggregate(&key, &spatial, dates.as_ref(), args.bucket, args.function)
        .await?;
    store.close().await;

    print_json(&SeriesReport {
        key: &key,
        location: Location {
            name: args.location.label(),
            query: &spatial,
        },
        dates,
        data: Buckets {
            bucket: args.bucket,
            function: args.function.to_string(),
            values,
        },
    })
}

fn potential_params(args: &IndicatorArgs) -> PotentialParams {
    let defaults = PotentialParams::default();
    PotentialParams {
        min_rainfall_mm: args.min_rainfall.unwrap_or(defaults.min_rainfall_mm),
        degree_days_threshold: args
            .degree_days_threshold
            .unwrap_or(defaults.degree_days_threshold),
        base_temperature_c: args.base_temperature.unwrap_or(defaults.base_temperature_c),
        max_hot_days: args.max_hot_days.unwrap_or(defaults.max_hot_days),
    }
}

fn excess_water_params(args: &IndicatorArgs) -> ExcessWaterParams {
    let defaults = ExcessWaterParams::default();
    ExcessWaterParams {
        max_7day_rainfall_mm: args.max_7day_rainfall.unwrap_or(defaults.max_7day_rainfall_mm),
        non_workable_days: args.non_workable_days.unwrap_or(defaults.non_workable_days),
    }
}

fn cover_crop_params(args: &IndicatorArgs) -> CoverCropParams {
    let defaults = CoverCropParams::default();
    CoverCropParams {
        window_days: args.window_days.clone().unwrap_or(defaults.window_days),
        monthly_threshold_mm: args
            .monthly_threshold
            .unwrap_or(defaults.monthly_threshold_mm),
        window: defaults.window,
    }
}

/// Rainfall of every stored ensemble member of the run at a location.
async fn ensemble_rainfall(
    store: &PointStore,
    key: &SeriesKey,
    spatial: &SpatialQuery,
    dates: &DateRange,
) -> Result<Vec<MemberSeries>> {
    let mut members = Vec::new();
    for member in store.list_members(key).await? {
        let series = store
            .query_series(&key.with_member(&member), spatial, Some(dates))
            .await?;
        members.push(MemberSeries::new(member, series));
    }
    info!(members = members.len(), "Loaded ensemble rainfall");
    Ok(members)
}

pub async fn indicators(
    db: &Path,
    registry: &PointRegistry,
    args: &IndicatorArgs,
) -> Result<()> {
    let spatial = args.location.spatial(registry)?;
    let range = args.range()?;
    let store = PointStore::open(db, AccessMode::ReadOnly).await?;
    let pr_key = args.run.key("pr");

    let result = match args.indicator {
        IndicatorKind::Potential => {
            let pr = store.query_series(&pr_key, &spatial, Some(&range)).await?;
            let tas = store
                .query_series(&args.run.key("tas"), &spatial, Some(&range))
                .await?;
            let tasmax = store
                .query_series(&args.run.key("tasmax"), &spatial, Some(&range))
                .await?;
            serde_json::to_value(potential_score(&pr, &tas, &tasmax, &potential_params(args))?)?
        }
        IndicatorKind::Drought => {
            let pr = store.query_series(&pr_key, &spatial, Some(&range)).await?;
            serde_json::to_value(drought_risk(&pr))?
        }
        IndicatorKind::ExcessWater => {
            let pr = store.query_series(&pr_key, &spatial, Some(&range)).await?;
            serde_json::to_value(excess_water_risk(&pr, &excess_water_params(args))?)?
        }
        IndicatorKind::HeatWaves => {
            let tasmax = store
                .query_series(&args.run.key("tasmax"), &spatial, Some(&range))
                .await?;
            serde_json::to_value(heat_wave_days(&tasmax))?
        }
        IndicatorKind::Corn => {
            let members = ensemble_rainfall(&store, &pr_key, &spatial, &args.year_span()?).await?;
            let years = args.years()?;
            let results = tokio::task::spawn_blocking(move || {
                corn_viability_by_year(
                    &members,
                    &CropCalendar::default(),
                    &CornCriteria::default(),
                    years,
                )
            })
            .await??;
            serde_json::to_value(results)?
        }
        IndicatorKind::CoverCrop => {
            let members = ensemble_rainfall(&store, &pr_key, &spatial, &args.year_span()?).await?;
            let years = args.years()?;
            let params = cover_crop_params(args);
            let results = tokio::task::spawn_blocking(move || {
                (years.start..=years.end)
                    .map(|year| cover_crop_feasibility(&members, &params, year))
                    .collect::<Result<Vec<_>, _>>()
            })
            .await??;
            serde_json::to_value(results)?
        }
    };
    store.close().await;

    print_json(&IndicatorReport {
        indicator: args.indicator.as_str(),
        experiment: &args.run.experiment,
        gcm: &args.run.gcm,
        rcm: &args.run.rcm,
        location: Location {
            name: args.location.label(),
            query: &spatial,
        },
        start: range.start,
        end: range.end,
        result,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::RunArgs;
    use storage::WriterLock;
    use test_utils::{netcdf_path, scratch_dir, store_path, write_netcdf_cube, CubeFile};

    fn ingest_args(file: std::path::PathBuf, variable: &str) -> IngestArgs {
        IngestArgs {
            file,
            variable: variable.to_string(),
            run: RunArgs {
                experiment: "rcp85".to_string(),
                gcm: "CNRM-CM5".to_string(),
                rcm: "ALADIN63".to_string(),
                member: "r1i1p1".to_string(),
            },
            points: "all".to_string(),
            full_grid: false,
            start_year: None,
            end_year: None,
            batch_size: None,
        }
    }

    #[tokio::test]
    async fn test_ingest_missing_file_leaves_no_store() {
        let dir = scratch_dir();
        let db = store_path(&dir);
        let args = ingest_args(netcdf_path(&dir, "absent"), "pr");

        let result = ingest(&db, &IngestConfig::default(), &PointRegistry::default(), &args).await;

        assert!(result.is_err());
        assert!(!db.exists());
        assert!(!WriterLock::lock_path(&db).exists());
    }

    #[tokio::test]
    async fn test_ingest_missing_variable_leaves_no_store() {
        let dir = scratch_dir();
        let db = store_path(&dir);
        let file = netcdf_path(&dir, "tas_day");
        write_netcdf_cube(&file, &CubeFile::pattern("tas", 3, 2, 2)).unwrap();

        let args = ingest_args(file, "pr");

        let err = ingest(&db, &IngestConfig::default(), &PointRegistry::default(), &args)
            .await
            .unwrap_err();

        assert!(err.downcast_ref::<ingestion::IngestionError>().is_some());
        assert!(!db.exists());
        assert!(!WriterLock::lock_path(&db).exists());
    }
}
