//! In-memory `EngineStore` used by the inference tests.

#![allow(dead_code)]

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use aqualert::engine::lifecycle::{CandidateAlert, DedupKey};
use aqualert::entity::enums::{AlertStatus, AlertType};
use aqualert::error::AppResult;
use aqualert::store::{EngineStore, InsertOutcome, LatestReading, ProcessedRow};

#[derive(Debug, Clone)]
pub struct StoredAlert {
    pub id: i64,
    pub candidate: CandidateAlert,
    pub status: AlertStatus,
}

impl StoredAlert {
    pub fn dedup_key(&self) -> DedupKey {
        self.candidate.dedup_key()
    }
}

/// Readings and processed rows are kept oldest-first; the store answers
/// newest-first queries the way the database implementation does.
#[derive(Debug, Default)]
pub struct MemStore {
    readings: HashMap<String, Vec<LatestReading>>,
    processed: HashMap<String, Vec<ProcessedRow>>,
    pub alerts: Vec<StoredAlert>,
    next_alert_id: i64,
}

impl MemStore {
    pub fn new() -> Self {
        Self {
            next_alert_id: 1,
            ..Self::default()
        }
    }

    pub fn seed_reading(&mut self, sensor_id: &str, flow_rate: f64, battery_level: f64) {
        self.seed_reading_at(sensor_id, flow_rate, battery_level, fixed_time());
    }

    pub fn seed_reading_at(
        &mut self,
        sensor_id: &str,
        flow_rate: f64,
        battery_level: f64,
        time: DateTime<Utc>,
    ) {
        self.readings
            .entry(sensor_id.to_string())
            .or_default()
            .push(LatestReading {
                flow_rate,
                battery_level,
                time,
            });
    }

    pub fn processed_rows(&self, sensor_id: &str) -> &[ProcessedRow] {
        self.processed.get(sensor_id).map_or(&[], Vec::as_slice)
    }

    pub fn active_alerts(&self) -> Vec<&StoredAlert> {
        self.alerts
            .iter()
            .filter(|a| a.status == AlertStatus::Active)
            .collect()
    }

    pub fn alerts_of_type(&self, alert_type: AlertType) -> Vec<&StoredAlert> {
        self.alerts
            .iter()
            .filter(|a| a.candidate.alert_type == alert_type)
            .collect()
    }
}

impl EngineStore for MemStore {
    async fn latest_reading(&self, sensor_id: &str) -> AppResult<Option<LatestReading>> {
        Ok(self
            .readings
            .get(sensor_id)
            .and_then(|rows| rows.last())
            .copied())
    }

    async fn recent_smoothed(&self, sensor_id: &str, window: usize) -> AppResult<Vec<f64>> {
        Ok(self
            .processed
            .get(sensor_id)
            .map(|rows| {
                rows.iter()
                    .rev()
                    .take(window)
                    .map(|r| r.smoothed_flow)
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn append_processed(&mut self, row: ProcessedRow) -> AppResult<()> {
        self.processed
            .entry(row.sensor_id.clone())
            .or_default()
            .push(row);
        Ok(())
    }

    async fn insert_alert(&mut self, candidate: &CandidateAlert) -> AppResult<InsertOutcome> {
        let key = candidate.dedup_key();
        let conflict = self
            .alerts
            .iter()
            .any(|a| a.status == AlertStatus::Active && a.dedup_key() == key);
        if conflict {
            return Ok(InsertOutcome::AlreadyActive);
        }

        self.alerts.push(StoredAlert {
            id: self.next_alert_id,
            candidate: candidate.clone(),
            status: AlertStatus::Active,
        });
        self.next_alert_id += 1;
        Ok(InsertOutcome::Inserted)
    }

    async fn resolve_alerts(&mut self, ids: &[i64]) -> AppResult<u64> {
        let mut changed = 0;
        for alert in &mut self.alerts {
            if ids.contains(&alert.id) && alert.status == AlertStatus::Active {
                alert.status = AlertStatus::Resolved;
                changed += 1;
            }
        }
        Ok(changed)
    }
}

pub fn fixed_time() -> DateTime<Utc> {
    DateTime::from_timestamp(1_754_000_000, 0).expect("valid timestamp")
}
