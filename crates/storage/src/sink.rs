//! Write-side interface consumed by ingestion.

use async_trait::async_trait;
use climate_common::{ClimateResult, ObservationRow, SeriesKey};

use crate::point_store::PointStore;

/// Destination for ingested observation rows.
#[async_trait]
pub trait ObservationSink: Send + Sync {
    /// Insert rows idempotently, returning how many were new.
    async fn write_batch(&self, rows: &[ObservationRow]) -> ClimateResult<u64>;

    /// Number of rows already stored for a series.
    async fn existing_rows(&self, key: &SeriesKey) -> ClimateResult<u64>;
}

#[async_trait]
impl ObservationSink for PointStore {
    async fn write_batch(&self, rows: &[ObservationRow]) -> ClimateResult<u64> {
        self.upsert_batch(rows).await
    }

    async fn existing_rows(&self, key: &SeriesKey) -> ClimateResult<u64> {
        self.count_existing(key).await
    }
}
