//! The leak-inference pass: smoothing stage, depth-first edge scoring over
//! the sensor forest, and the buffered alert commit.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::config::EngineConfig;
use crate::engine::lifecycle::{AlertBuffer, CandidateAlert};
use crate::engine::topology::Topology;
use crate::engine::{scoring, smoothing};
use crate::entity::enums::{AlertType, Severity};
use crate::error::AppResult;
use crate::store::{EngineStore, InsertOutcome, LatestReading, ProcessedRow};

/// One reading of an ingestion batch, defaults already applied.
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingReading {
    pub sensor_id: String,
    pub flow_rate: f64,
    pub battery_level: f64,
    pub time: DateTime<Utc>,
}

/// Counters reported by one traversal pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PassSummary {
    pub readings_processed: usize,
    pub sensors_visited: usize,
    pub edges_scored: usize,
    pub alerts_created: usize,
    pub alerts_deduplicated: usize,
}

pub struct InferenceEngine {
    cfg: EngineConfig,
}

impl InferenceEngine {
    #[must_use]
    pub fn new(cfg: EngineConfig) -> Self {
        Self { cfg }
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    /// Run one synchronous pass over an ingestion batch: append a
    /// processed row per reading, walk every sub-tree scoring each
    /// parent/child edge, then commit the buffered alerts through the
    /// store. The caller owns transaction scope and sub-tree locking.
    pub async fn run_pass<S: EngineStore>(
        &self,
        store: &mut S,
        topology: &Topology,
        batch: &[IncomingReading],
    ) -> AppResult<PassSummary> {
        let mut summary = PassSummary::default();

        // Smoothing stage. Readings are handled in batch order, so a
        // sensor reporting twice in one batch sees its first row inside
        // the window of the second.
        let mut batch_latest: HashMap<String, LatestReading> = HashMap::new();
        for reading in batch {
            let window = store
                .recent_smoothed(&reading.sensor_id, self.cfg.smoothing_window)
                .await?;
            let smoothed = smoothing::round3(smoothing::smoothed_flow(&window, reading.flow_rate));
            let delta = smoothing::round3(smoothing::flow_delta(smoothed, window.first().copied()));
            store
                .append_processed(ProcessedRow {
                    sensor_id: reading.sensor_id.clone(),
                    time: reading.time,
                    smoothed_flow: smoothed,
                    flow_delta: delta,
                })
                .await?;
            batch_latest.insert(
                reading.sensor_id.clone(),
                LatestReading {
                    flow_rate: reading.flow_rate,
                    battery_level: reading.battery_level,
                    time: reading.time,
                },
            );
            summary.readings_processed += 1;
        }

        // Traversal stage: explicit work-stack, visited set keyed by
        // sensor id. A missing reading skips the edge but never stops the
        // descent into the sub-tree below it.
        let mut buffer = AlertBuffer::new();
        let mut visited: HashSet<&str> = HashSet::new();
        let mut samples: HashMap<String, Option<LatestReading>> = HashMap::new();

        for root in topology.roots() {
            let mut stack: Vec<&str> = vec![root.as_str()];
            while let Some(node) = stack.pop() {
                if !visited.insert(node) {
                    continue;
                }
                summary.sensors_visited += 1;

                let parent_sample =
                    effective_sample(&*store, &mut samples, &batch_latest, node).await?;

                let children = topology.children_of(node);
                for child in children {
                    let child_sample =
                        effective_sample(&*store, &mut samples, &batch_latest, child).await?;
                    if let (Some(parent), Some(child_reading)) = (parent_sample, child_sample) {
                        summary.edges_scored += 1;
                        self.evaluate_edge(&mut buffer, node, child, parent, child_reading);
                    }
                }
                // Reverse push so children pop in ascending id order.
                stack.extend(children.iter().rev().map(String::as_str));
            }
        }

        // Commit stage: the whole pass's alerts go through the store
        // together; dedup conflicts are counted, never raised.
        for candidate in buffer.drain() {
            match store.insert_alert(&candidate).await? {
                InsertOutcome::Inserted => summary.alerts_created += 1,
                InsertOutcome::AlreadyActive => {
                    tracing::debug!(
                        sensor_from = %candidate.sensor_from,
                        sensor_to = %candidate.sensor_to,
                        alert_type = ?candidate.alert_type,
                        "Alert already active, skipping"
                    );
                    summary.alerts_deduplicated += 1;
                }
            }
        }

        tracing::debug!(
            readings = summary.readings_processed,
            visited = summary.sensors_visited,
            edges = summary.edges_scored,
            created = summary.alerts_created,
            deduplicated = summary.alerts_deduplicated,
            "Inference pass complete"
        );

        Ok(summary)
    }

    /// The per-edge rule block: fuzzy leak score, anomaly drop check, and
    /// the low-battery check on both endpoints.
    fn evaluate_edge(
        &self,
        buffer: &mut AlertBuffer,
        parent_id: &str,
        child_id: &str,
        parent: LatestReading,
        child: LatestReading,
    ) {
        let time = parent.time.max(child.time);

        let probability = scoring::leak_probability(
            &self.cfg,
            parent.flow_rate,
            parent.battery_level,
            child.flow_rate,
            child.battery_level,
        );
        if probability >= self.cfg.leak_emission_floor {
            buffer.push(CandidateAlert {
                sensor_from: parent_id.to_string(),
                sensor_to: child_id.to_string(),
                alert_type: AlertType::Leak,
                severity: scoring::severity_for(&self.cfg, probability),
                probability: scoring::round2(probability),
                time,
            });
        }

        if parent.flow_rate - child.flow_rate < -self.cfg.anomaly_flow_drop {
            buffer.push(CandidateAlert {
                sensor_from: parent_id.to_string(),
                sensor_to: child_id.to_string(),
                alert_type: AlertType::Anomaly,
                severity: Severity::Medium,
                probability: self.cfg.anomaly_probability,
                time,
            });
        }

        for (sensor_id, reading) in [(parent_id, parent), (child_id, child)] {
            if reading.battery_level < self.cfg.low_battery_threshold {
                buffer.push(CandidateAlert {
                    sensor_from: sensor_id.to_string(),
                    sensor_to: sensor_id.to_string(),
                    alert_type: AlertType::LowBattery,
                    severity: Severity::Low,
                    probability: self.cfg.low_battery_probability,
                    time: reading.time,
                });
            }
        }
    }
}

/// Effective reading for a sensor during traversal: a reading delivered in
/// the current batch wins over the latest persisted one. Memoized per pass
/// so shared sensors hit the store once.
async fn effective_sample<S: EngineStore>(
    store: &S,
    cache: &mut HashMap<String, Option<LatestReading>>,
    batch_latest: &HashMap<String, LatestReading>,
    sensor_id: &str,
) -> AppResult<Option<LatestReading>> {
    if let Some(hit) = cache.get(sensor_id) {
        return Ok(*hit);
    }
    let sample = match batch_latest.get(sensor_id) {
        Some(sample) => Some(*sample),
        None => store.latest_reading(sensor_id).await?,
    };
    cache.insert(sensor_id.to_string(), sample);
    Ok(sample)
}
