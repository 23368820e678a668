//! Persistence seam between the inference engine and the database.
//!
//! The engine only ever talks to an [`EngineStore`]; the production
//! implementation wraps a sea-orm connection (or an open transaction, so a
//! whole pass commits atomically), and the test suite substitutes an
//! in-memory store. Alert dedup is an explicit [`InsertOutcome`] instead
//! of a caught storage error, so engine control flow never depends on
//! backend-specific failure shapes.

mod db;

pub use db::DbStore;

use chrono::{DateTime, Utc};

use crate::engine::lifecycle::CandidateAlert;
use crate::error::AppResult;

/// Result of inserting one candidate alert under the dedup constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// An active row with the same (from, to, type) already exists; the
    /// candidate is dropped. Expected and recoverable, never an error.
    AlreadyActive,
}

/// Most recent persisted reading of a sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatestReading {
    pub flow_rate: f64,
    pub battery_level: f64,
    pub time: DateTime<Utc>,
}

/// One derived smoothing row to append.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedRow {
    pub sensor_id: String,
    pub time: DateTime<Utc>,
    pub smoothed_flow: f64,
    pub flow_delta: f64,
}

#[allow(async_fn_in_trait)]
pub trait EngineStore {
    /// Latest persisted reading for a sensor, if any.
    async fn latest_reading(&self, sensor_id: &str) -> AppResult<Option<LatestReading>>;

    /// Smoothed values of the most recent processed rows, newest first, at
    /// most `window` entries.
    async fn recent_smoothed(&self, sensor_id: &str, window: usize) -> AppResult<Vec<f64>>;

    async fn append_processed(&mut self, row: ProcessedRow) -> AppResult<()>;

    /// Insert one candidate as an active alert, honoring the dedup key.
    async fn insert_alert(&mut self, candidate: &CandidateAlert) -> AppResult<InsertOutcome>;

    /// Transition every matching active alert to resolved; rows already
    /// resolved are untouched. Returns the number of rows changed.
    async fn resolve_alerts(&mut self, ids: &[i64]) -> AppResult<u64>;
}
