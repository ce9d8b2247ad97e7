//! Point-time keyed observation store using SQLite with sqlx.
//!
//! Rows are keyed by `(variable, experiment, gcm, rcm, member, lat, lon,
//! time)`. Inserts are idempotent (`INSERT OR IGNORE`), so re-ingesting a
//! source never duplicates facts. There is no update or delete path.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use climate_common::{
    ClimateError, ClimateResult, DailySeries, DateRange, ObservationRow, SeriesKey, TimeBucket,
};
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite};
use tracing::{debug, info, instrument};

use crate::lock::WriterLock;
use crate::query::{group_cells, nearest_per_group, AggregateFn, AggregatePoint, CellSeries, SpatialQuery};

/// Default number of rows committed per transaction.
pub const DEFAULT_CHUNK_SIZE: usize = 5000;

/// Rows per INSERT statement; 9 bound parameters each.
const ROWS_PER_STATEMENT: usize = 1000;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS climate_data (
    variable TEXT NOT NULL,
    experiment TEXT NOT NULL,
    gcm TEXT NOT NULL,
    rcm TEXT NOT NULL,
    member TEXT NOT NULL,
    lat REAL NOT NULL,
    lon REAL NOT NULL,
    time TEXT NOT NULL,
    value REAL NOT NULL,
    PRIMARY KEY (variable, experiment, gcm, rcm, member, lat, lon, time)
);
CREATE INDEX IF NOT EXISTS idx_spatial ON climate_data(lat, lon);
CREATE INDEX IF NOT EXISTS idx_temporal ON climate_data(time);
CREATE INDEX IF NOT EXISTS idx_variable ON climate_data(variable, experiment, gcm, rcm)
"#;

/// How a store is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Single writer; takes the exclusive writer lock.
    ReadWrite,
    /// Any number of readers; the database must already exist.
    ReadOnly,
}

/// Summary of store contents.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreStats {
    pub rows: u64,
    pub variables: Vec<String>,
    pub experiments: Vec<String>,
    pub models: Vec<(String, String)>,
    pub members: Vec<String>,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
}

/// Handle to the observation store. Construct once and pass by reference.
pub struct PointStore {
    pool: SqlitePool,
    mode: AccessMode,
    chunk_size: usize,
    path: Option<PathBuf>,
    _lock: Option<WriterLock>,
}

impl PointStore {
    /// Open or create the store at the given path.
    pub async fn open(path: &Path, mode: AccessMode) -> ClimateResult<Self> {
        let (options, lock) = match mode {
            AccessMode::ReadWrite => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)?;
                }
                let lock = WriterLock::acquire(path)?;
                let options = SqliteConnectOptions::new()
                    .filename(path)
                    .create_if_missing(true)
                    .journal_mode(SqliteJournalMode::Delete)
                    .busy_timeout(Duration::from_secs(5));
                (options, Some(lock))
            }
            AccessMode::ReadOnly => {
                if !path.exists() {
                    return Err(ClimateError::StoreUnavailable(format!(
                        "{} does not exist",
                        path.display()
                    )));
                }
                let options = SqliteConnectOptions::new()
                    .filename(path)
                    .read_only(true)
                    .busy_timeout(Duration::from_secs(5));
                (options, None)
            }
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| ClimateError::StoreUnavailable(format!("Failed to open store: {}", e)))?;

        let store = Self {
            pool,
            mode,
            chunk_size: DEFAULT_CHUNK_SIZE,
            path: Some(path.to_path_buf()),
            _lock: lock,
        };
        if mode == AccessMode::ReadWrite {
            store.migrate().await?;
        }

        info!(path = %path.display(), mode = ?mode, "Opened point store");
        Ok(store)
    }

    /// Open an in-memory store (for testing).
    pub async fn open_memory() -> ClimateResult<Self> {
        let options = SqliteConnectOptions::new()
            .filename(":memory:")
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| ClimateError::StoreUnavailable(e.to_string()))?;

        let store = Self {
            pool,
            mode: AccessMode::ReadWrite,
            chunk_size: DEFAULT_CHUNK_SIZE,
            path: None,
            _lock: None,
        };
        store.migrate().await?;
        Ok(store)
    }

    /// Set how many rows are committed per transaction.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    async fn migrate(&self) -> ClimateResult<()> {
        for statement in SCHEMA_SQL.split(';') {
            let trimmed = statement.trim();
            if !trimmed.is_empty() {
                sqlx::query(trimmed)
                    .execute(&self.pool)
                    .await
                    .map_err(db_error("migration"))?;
            }
        }
        Ok(())
    }

    /// Insert rows, skipping keys that already exist.
    ///
    /// Every row is validated before anything is written. Each chunk of
    /// `chunk_size` rows commits atomically. Returns the number of rows
    /// that were new.
    #[instrument(skip(self, rows), fields(rows = rows.len()))]
    pub async fn upsert_batch(&self, rows: &[ObservationRow]) -> ClimateResult<u64> {
        if self.mode == AccessMode::ReadOnly {
            return Err(ClimateError::invalid_parameter(
                "access_mode",
                "store is opened read-only",
            ));
        }
        for (index, row) in rows.iter().enumerate() {
            if let Some(field) = row.invalid_field() {
                return Err(ClimateError::MalformedRow { index, field });
            }
        }

        let mut inserted = 0u64;
        for chunk in rows.chunks(self.chunk_size) {
            let mut tx = self.pool.begin().await.map_err(db_error("begin"))?;
            for statement_rows in chunk.chunks(ROWS_PER_STATEMENT) {
                let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
                    "INSERT OR IGNORE INTO climate_data \
                     (variable, experiment, gcm, rcm, member, lat, lon, time, value) ",
                );
                builder.push_values(statement_rows, |mut b, row| {
                    b.push_bind(row.key.variable.as_str())
                        .push_bind(row.key.experiment.as_str())
                        .push_bind(row.key.gcm.as_str())
                        .push_bind(row.key.rcm.as_str())
                        .push_bind(row.key.member.as_str())
                        .push_bind(row.lat)
                        .push_bind(row.lon)
                        .push_bind(row.date)
                        .push_bind(row.value);
                });
                let result = builder
                    .build()
                    .execute(&mut *tx)
                    .await
                    .map_err(db_error("insert"))?;
                inserted += result.rows_affected();
            }
            tx.commit().await.map_err(db_error("commit"))?;
            debug!(chunk = chunk.len(), inserted, "Committed chunk");
        }
        Ok(inserted)
    }

    /// Number of rows stored for an exact series key.
    pub async fn count_existing(&self, key: &SeriesKey) -> ClimateResult<u64> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM climate_data
            WHERE variable = ? AND experiment = ? AND gcm = ? AND rcm = ? AND member = ?
            "#,
        )
        .bind(&key.variable)
        .bind(&key.experiment)
        .bind(&key.gcm)
        .bind(&key.rcm)
        .bind(&key.member)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("count"))?;
        Ok(count.max(0) as u64)
    }

    /// Ensemble members stored for a series, ignoring `key.member`.
    pub async fn list_members(&self, key: &SeriesKey) -> ClimateResult<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT DISTINCT member FROM climate_data
            WHERE variable = ? AND experiment = ? AND gcm = ? AND rcm = ?
            ORDER BY member
            "#,
        )
        .bind(&key.variable)
        .bind(&key.experiment)
        .bind(&key.gcm)
        .bind(&key.rcm)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("members"))?;
        Ok(rows.into_iter().map(|(m,)| m).collect())
    }

    /// Per-cell daily series for every stored cell inside the tolerance box,
    /// nearest cell first.
    pub async fn query_cells(
        &self,
        key: &SeriesKey,
        spatial: &SpatialQuery,
        dates: Option<&DateRange>,
    ) -> ClimateResult<Vec<CellSeries>> {
        let rows = self.fetch_rows(key, spatial, dates).await?;
        Ok(group_cells(spatial, rows))
    }

    /// Daily series at a point. When the tolerance box spans several stored
    /// cells, each date takes its value from the cell nearest the center.
    pub async fn query_series(
        &self,
        key: &SeriesKey,
        spatial: &SpatialQuery,
        dates: Option<&DateRange>,
    ) -> ClimateResult<DailySeries> {
        let rows = self.fetch_rows(key, spatial, dates).await?;
        let best = nearest_per_group(
            spatial,
            rows.into_iter().map(|(lat, lon, date, value)| (date, lat, lon, value)),
        );
        Ok(DailySeries::from_pairs(
            best.into_iter().map(|(date, (_, _, _, value))| (date, value)).collect(),
        ))
    }

    /// Aggregate values per calendar bucket.
    ///
    /// Grouping is by `(lat, lon, bucket)` first, then each bucket keeps the
    /// cell nearest the center, so a box spanning several cells never mixes
    /// their values.
    pub async fn aggregate(
        &self,
        key: &SeriesKey,
        spatial: &SpatialQuery,
        dates: Option<&DateRange>,
        bucket: TimeBucket,
        function: AggregateFn,
    ) -> ClimateResult<Vec<AggregatePoint>> {
        let bbox = spatial.bbox()?;
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT lat, lon, strftime('");
        builder
            .push(bucket.strftime_pattern())
            .push("', time) AS bucket, ")
            .push(function.sql())
            .push(" FROM climate_data WHERE ");
        push_filters(&mut builder, key, &bbox, dates);
        builder.push(" GROUP BY lat, lon, bucket ORDER BY bucket, lat, lon");

        let rows: Vec<(f64, f64, String, f64)> = builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("aggregate"))?;

        let best = nearest_per_group(
            spatial,
            rows.into_iter().map(|(lat, lon, bucket, value)| (bucket, lat, lon, value)),
        );
        Ok(best
            .into_iter()
            .map(|(bucket, (lat, lon, distance, value))| AggregatePoint {
                bucket,
                value,
                lat,
                lon,
                distance,
            })
            .collect())
    }

    /// Summary of what the store holds.
    pub async fn stats(&self) -> ClimateResult<StoreStats> {
        let (rows, first, last): (i64, Option<NaiveDate>, Option<NaiveDate>) =
            sqlx::query_as("SELECT COUNT(*), MIN(time), MAX(time) FROM climate_data")
                .fetch_one(&self.pool)
                .await
                .map_err(db_error("stats"))?;

        let models: Vec<(String, String)> =
            sqlx::query_as("SELECT DISTINCT gcm, rcm FROM climate_data ORDER BY gcm, rcm")
                .fetch_all(&self.pool)
                .await
                .map_err(db_error("stats"))?;

        Ok(StoreStats {
            rows: rows.max(0) as u64,
            variables: self.distinct_values("variable").await?,
            experiments: self.distinct_values("experiment").await?,
            models,
            members: self.distinct_values("member").await?,
            first_date: first,
            last_date: last,
        })
    }

    /// Close the pool and release the writer lock.
    pub async fn close(self) {
        self.pool.close().await;
    }

    async fn distinct_values(&self, column: &'static str) -> ClimateResult<Vec<String>> {
        let sql = format!("SELECT DISTINCT {0} FROM climate_data ORDER BY {0}", column);
        let values: Vec<(String,)> = sqlx::query_as(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("stats"))?;
        Ok(values.into_iter().map(|(v,)| v).collect())
    }

    async fn fetch_rows(
        &self,
        key: &SeriesKey,
        spatial: &SpatialQuery,
        dates: Option<&DateRange>,
    ) -> ClimateResult<Vec<(f64, f64, NaiveDate, f64)>> {
        let bbox = spatial.bbox()?;
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT lat, lon, time, value FROM climate_data WHERE ");
        push_filters(&mut builder, key, &bbox, dates);
        builder.push(" ORDER BY time, lat, lon");

        builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("query"))
    }
}

fn push_filters<'a>(
    builder: &mut QueryBuilder<'a, Sqlite>,
    key: &'a SeriesKey,
    bbox: &climate_common::BoundingBox,
    dates: Option<&DateRange>,
) {
    builder
        .push("variable = ")
        .push_bind(key.variable.as_str())
        .push(" AND experiment = ")
        .push_bind(key.experiment.as_str())
        .push(" AND gcm = ")
        .push_bind(key.gcm.as_str())
        .push(" AND rcm = ")
        .push_bind(key.rcm.as_str())
        .push(" AND member = ")
        .push_bind(key.member.as_str())
        .push(" AND lat BETWEEN ")
        .push_bind(bbox.min_lat)
        .push(" AND ")
        .push_bind(bbox.max_lat)
        .push(" AND lon BETWEEN ")
        .push_bind(bbox.min_lon)
        .push(" AND ")
        .push_bind(bbox.max_lon);
    if let Some(range) = dates {
        builder
            .push(" AND time BETWEEN ")
            .push_bind(range.start)
            .push(" AND ")
            .push_bind(range.end);
    }
}

/// Map a sqlx error to the store's error kinds.
fn db_error(context: &'static str) -> impl Fn(sqlx::Error) -> ClimateError {
    move |err| match &err {
        sqlx::Error::Database(db) if matches!(db.code().as_deref(), Some("5") | Some("6")) => {
            ClimateError::StoreLocked {
                path: format!("({}: {})", context, db.message()),
            }
        }
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
            ClimateError::StoreUnavailable(format!("{}: {}", context, err))
        }
        _ => ClimateError::Database(format!("{}: {}", context, err)),
    }
}
