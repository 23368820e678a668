//! End-to-end engine passes against the in-memory store: leak scenarios,
//! alert dedup, traversal behavior, and lifecycle transitions.
//!
//! Run with: cargo test --test inference_test

mod common;

use aqualert::config::EngineConfig;
use aqualert::engine::topology::{Edge, Topology};
use aqualert::engine::{IncomingReading, InferenceEngine};
use aqualert::entity::enums::{AlertStatus, AlertType, Severity};
use aqualert::store::{EngineStore, InsertOutcome};

use common::{fixed_time, MemStore};

fn engine() -> InferenceEngine {
    InferenceEngine::new(EngineConfig::default())
}

fn topology(pairs: &[(&str, &str)]) -> Topology {
    let edges: Vec<Edge> = pairs.iter().map(|(p, c)| Edge::new(*p, *c)).collect();
    Topology::from_edges(&edges).expect("test topology is a valid forest")
}

fn reading(sensor_id: &str, flow_rate: f64, battery_level: f64) -> IncomingReading {
    IncomingReading {
        sensor_id: sensor_id.to_string(),
        flow_rate,
        battery_level,
        time: fixed_time(),
    }
}

#[tokio::test]
async fn high_discrepancy_pair_raises_high_severity_leak() {
    let mut store = MemStore::new();
    let topo = topology(&[("parent", "child")]);
    let batch = [reading("parent", 80.0, 100.0), reading("child", 20.0, 100.0)];

    let summary = engine()
        .run_pass(&mut store, &topo, &batch)
        .await
        .expect("pass succeeds");

    assert_eq!(summary.alerts_created, 1);
    let leaks = store.alerts_of_type(AlertType::Leak);
    assert_eq!(leaks.len(), 1);
    let leak = &leaks[0].candidate;
    assert_eq!(leak.sensor_from, "parent");
    assert_eq!(leak.sensor_to, "child");
    assert_eq!(leak.severity, Severity::High);
    assert!(leak.probability >= 70.0);
}

#[tokio::test]
async fn balanced_pair_raises_nothing() {
    let mut store = MemStore::new();
    let topo = topology(&[("parent", "child")]);
    let batch = [reading("parent", 50.0, 100.0), reading("child", 50.0, 100.0)];

    let summary = engine()
        .run_pass(&mut store, &topo, &batch)
        .await
        .expect("pass succeeds");

    assert_eq!(summary.edges_scored, 1);
    assert_eq!(summary.alerts_created, 0);
    assert!(store.alerts.is_empty());
}

#[tokio::test]
async fn weak_battery_always_raises_low_battery() {
    let mut store = MemStore::new();
    let topo = topology(&[("parent", "child")]);
    // Benign flows, weak parent battery
    let batch = [reading("parent", 10.0, 10.0), reading("child", 10.0, 100.0)];

    let summary = engine()
        .run_pass(&mut store, &topo, &batch)
        .await
        .expect("pass succeeds");

    assert_eq!(summary.alerts_created, 1);
    let low = store.alerts_of_type(AlertType::LowBattery);
    assert_eq!(low.len(), 1);
    let alert = &low[0].candidate;
    assert_eq!(alert.sensor_from, "parent");
    assert_eq!(alert.sensor_to, "parent");
    assert_eq!(alert.severity, Severity::Low);
    assert_eq!(alert.probability, 90.0);
}

#[tokio::test]
async fn low_battery_fires_independently_of_leak() {
    let mut store = MemStore::new();
    let topo = topology(&[("parent", "child")]);
    let batch = [reading("parent", 80.0, 10.0), reading("child", 20.0, 10.0)];

    engine()
        .run_pass(&mut store, &topo, &batch)
        .await
        .expect("pass succeeds");

    assert_eq!(store.alerts_of_type(AlertType::Leak).len(), 1);
    let low = store.alerts_of_type(AlertType::LowBattery);
    assert_eq!(low.len(), 2, "one per weak endpoint");
    assert!(low.iter().all(|a| a.candidate.sensor_from == a.candidate.sensor_to));
}

#[tokio::test]
async fn flow_gain_across_edge_raises_anomaly() {
    let mut store = MemStore::new();
    let topo = topology(&[("parent", "child")]);
    // Child flowing more than its parent by over the drop threshold
    let batch = [reading("parent", 10.0, 100.0), reading("child", 20.0, 100.0)];

    engine()
        .run_pass(&mut store, &topo, &batch)
        .await
        .expect("pass succeeds");

    let anomalies = store.alerts_of_type(AlertType::Anomaly);
    assert_eq!(anomalies.len(), 1);
    assert_eq!(anomalies[0].candidate.severity, Severity::Medium);
    assert_eq!(anomalies[0].candidate.probability, 85.0);
    assert!(store.alerts_of_type(AlertType::Leak).is_empty());
}

#[tokio::test]
async fn second_pass_deduplicates_against_active_alerts() {
    let mut store = MemStore::new();
    let topo = topology(&[("parent", "child")]);
    let batch = [reading("parent", 80.0, 100.0), reading("child", 20.0, 100.0)];

    let first = engine()
        .run_pass(&mut store, &topo, &batch)
        .await
        .expect("first pass succeeds");
    let second = engine()
        .run_pass(&mut store, &topo, &batch)
        .await
        .expect("second pass succeeds");

    assert_eq!(first.alerts_created, 1);
    assert_eq!(second.alerts_created, 0);
    assert_eq!(second.alerts_deduplicated, 1);
    assert_eq!(store.active_alerts().len(), 1);
}

#[tokio::test]
async fn resolving_frees_the_dedup_key_for_a_new_row() {
    let mut store = MemStore::new();
    let topo = topology(&[("parent", "child")]);
    let batch = [reading("parent", 80.0, 100.0), reading("child", 20.0, 100.0)];

    engine()
        .run_pass(&mut store, &topo, &batch)
        .await
        .expect("first pass succeeds");
    let resolved = store.resolve_alerts(&[1]).await.expect("resolve succeeds");
    assert_eq!(resolved, 1);

    let again = engine()
        .run_pass(&mut store, &topo, &batch)
        .await
        .expect("second pass succeeds");

    // A fresh leak after resolution becomes a new row, never a reopen
    assert_eq!(again.alerts_created, 1);
    assert_eq!(store.alerts.len(), 2);
    assert_eq!(store.active_alerts().len(), 1);
    assert_eq!(store.alerts[0].status, AlertStatus::Resolved);
}

#[tokio::test]
async fn forest_is_visited_once_per_node() {
    let mut store = MemStore::new();
    // Two sub-trees: a chain of four and a single pair; six nodes, four edges
    let topo = topology(&[("a", "b"), ("b", "c"), ("c", "d"), ("p", "q")]);
    let batch = [
        reading("a", 30.0, 100.0),
        reading("b", 30.0, 100.0),
        reading("c", 30.0, 100.0),
        reading("d", 30.0, 100.0),
        reading("p", 30.0, 100.0),
        reading("q", 30.0, 100.0),
    ];

    let summary = engine()
        .run_pass(&mut store, &topo, &batch)
        .await
        .expect("pass succeeds");

    assert_eq!(summary.readings_processed, 6);
    assert_eq!(summary.sensors_visited, 6);
    assert_eq!(summary.edges_scored, 4);
}

#[tokio::test]
async fn missing_reading_skips_the_edge_but_not_the_descent() {
    let mut store = MemStore::new();
    let topo = topology(&[("a", "b"), ("b", "c")]);
    // No reading anywhere for b, in the batch or persisted
    let batch = [reading("a", 80.0, 100.0), reading("c", 20.0, 100.0)];

    let summary = engine()
        .run_pass(&mut store, &topo, &batch)
        .await
        .expect("pass succeeds");

    assert_eq!(summary.sensors_visited, 3, "descent continues past b");
    assert_eq!(summary.edges_scored, 0, "both edges lack a b reading");
    assert!(store.alerts.is_empty());
}

#[tokio::test]
async fn batch_reading_wins_over_persisted_reading() {
    let mut store = MemStore::new();
    // Persisted child reading matches the parent; only the fresher batch
    // value makes the edge alert-worthy
    store.seed_reading("child", 80.0, 100.0);
    let topo = topology(&[("parent", "child")]);
    let batch = [reading("parent", 80.0, 100.0), reading("child", 20.0, 100.0)];

    engine()
        .run_pass(&mut store, &topo, &batch)
        .await
        .expect("pass succeeds");

    assert_eq!(store.alerts_of_type(AlertType::Leak).len(), 1);
}

#[tokio::test]
async fn persisted_reading_is_used_when_sensor_missing_from_batch() {
    let mut store = MemStore::new();
    store.seed_reading("child", 20.0, 100.0);
    let topo = topology(&[("parent", "child")]);
    let batch = [reading("parent", 80.0, 100.0)];

    let summary = engine()
        .run_pass(&mut store, &topo, &batch)
        .await
        .expect("pass succeeds");

    assert_eq!(summary.edges_scored, 1);
    assert_eq!(store.alerts_of_type(AlertType::Leak).len(), 1);
}

#[tokio::test]
async fn shared_endpoint_raises_one_low_battery_per_pass() {
    let mut store = MemStore::new();
    // b participates in two edges; its battery alert must not double up
    let topo = topology(&[("a", "b"), ("b", "c")]);
    let batch = [
        reading("a", 10.0, 100.0),
        reading("b", 10.0, 5.0),
        reading("c", 10.0, 100.0),
    ];

    engine()
        .run_pass(&mut store, &topo, &batch)
        .await
        .expect("pass succeeds");

    let low = store.alerts_of_type(AlertType::LowBattery);
    assert_eq!(low.len(), 1);
    assert_eq!(low[0].candidate.sensor_from, "b");
}

#[tokio::test]
async fn smoothing_appends_one_row_per_reading() {
    let mut store = MemStore::new();
    let topo = topology(&[]);

    // Bootstrap: no history, smoothed = raw, delta = 0
    engine()
        .run_pass(&mut store, &topo, &[reading("s", 10.0, 100.0)])
        .await
        .expect("pass succeeds");
    // The recurrence averages prior *smoothed* values, so the raw flow of
    // later readings no longer moves the smoothed series
    engine()
        .run_pass(&mut store, &topo, &[reading("s", 999.0, 100.0)])
        .await
        .expect("pass succeeds");
    engine()
        .run_pass(&mut store, &topo, &[reading("s", 20.0, 100.0)])
        .await
        .expect("pass succeeds");

    let rows = store.processed_rows("s");
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].smoothed_flow, 10.0);
    assert_eq!(rows[0].flow_delta, 0.0);
    assert_eq!(rows[1].smoothed_flow, 10.0);
    assert_eq!(rows[1].flow_delta, 0.0);
    assert_eq!(rows[2].smoothed_flow, 10.0);
    assert_eq!(rows[2].flow_delta, 0.0);
}

#[tokio::test]
async fn same_sensor_twice_in_one_batch_processes_sequentially() {
    let mut store = MemStore::new();
    let topo = topology(&[]);
    let batch = [reading("s", 12.0, 100.0), reading("s", 40.0, 100.0)];

    let summary = engine()
        .run_pass(&mut store, &topo, &batch)
        .await
        .expect("pass succeeds");

    assert_eq!(summary.readings_processed, 2);
    let rows = store.processed_rows("s");
    assert_eq!(rows.len(), 2);
    // Second reading sees the first row in its window
    assert_eq!(rows[1].smoothed_flow, 12.0);
}

#[tokio::test]
async fn store_contract_keeps_one_active_row_per_dedup_key() {
    let mut store = MemStore::new();
    let topo = topology(&[("parent", "child")]);
    let batch = [reading("parent", 80.0, 100.0), reading("child", 20.0, 100.0)];

    engine()
        .run_pass(&mut store, &topo, &batch)
        .await
        .expect("pass succeeds");
    let candidate = store.alerts[0].candidate.clone();

    let outcome = store
        .insert_alert(&candidate)
        .await
        .expect("insert succeeds");
    assert_eq!(outcome, InsertOutcome::AlreadyActive);
    assert_eq!(store.active_alerts().len(), 1);
}

#[tokio::test]
async fn bulk_resolve_counts_only_state_changes() {
    let mut store = MemStore::new();
    let topo = topology(&[("parent", "child")]);
    // Two distinct alerts: a leak and an anomaly on the same pair
    let batch = [reading("parent", 80.0, 100.0), reading("child", 20.0, 100.0)];
    engine()
        .run_pass(&mut store, &topo, &batch)
        .await
        .expect("first pass succeeds");
    let gain_batch = [reading("parent", 10.0, 100.0), reading("child", 20.0, 100.0)];
    engine()
        .run_pass(&mut store, &topo, &gain_batch)
        .await
        .expect("second pass succeeds");
    assert_eq!(store.alerts.len(), 2);

    // Pre-resolve id 2, then bulk-resolve both
    assert_eq!(store.resolve_alerts(&[2]).await.expect("resolve"), 1);
    let changed = store.resolve_alerts(&[1, 2]).await.expect("bulk resolve");

    assert_eq!(changed, 1, "only id 1 actually transitioned");
    assert!(store.alerts.iter().all(|a| a.status == AlertStatus::Resolved));
}

#[tokio::test]
async fn resolving_a_resolved_alert_is_a_noop_success() {
    let mut store = MemStore::new();
    let topo = topology(&[("parent", "child")]);
    let batch = [reading("parent", 80.0, 100.0), reading("child", 20.0, 100.0)];
    engine()
        .run_pass(&mut store, &topo, &batch)
        .await
        .expect("pass succeeds");

    assert_eq!(store.resolve_alerts(&[1]).await.expect("resolve"), 1);
    assert_eq!(store.resolve_alerts(&[1]).await.expect("resolve again"), 0);
    assert_eq!(store.alerts[0].status, AlertStatus::Resolved);
}
