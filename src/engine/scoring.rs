//! Pairwise fuzzy leak scoring.
//!
//! Each parent/child edge is scored with a weighted blend of three
//! logistic terms: combined flow magnitude, flow gap across the edge, and
//! inverted battery health. Weights sum to 1, so the blend stays strictly
//! inside (0, 100) for every finite input.

use crate::config::{EngineConfig, SigmoidParams};
use crate::entity::enums::Severity;

/// Standard logistic sigmoid, 0.5 exactly at the midpoint, increasing in
/// `x` for positive slope.
#[must_use]
pub fn sigmoid(x: f64, params: SigmoidParams) -> f64 {
    1.0 / (1.0 + (-params.slope * (x - params.midpoint)).exp())
}

/// Leak probability (0-100) for a parent reading (flow, battery) against a
/// child reading.
#[must_use]
pub fn leak_probability(
    cfg: &EngineConfig,
    parent_flow: f64,
    parent_battery: f64,
    child_flow: f64,
    child_battery: f64,
) -> f64 {
    let flow_score = sigmoid((parent_flow + child_flow) / 2.0, cfg.flow_sigmoid);
    let gap_score = sigmoid((parent_flow - child_flow).abs(), cfg.gap_sigmoid);
    let battery_score = 1.0 - sigmoid((parent_battery + child_battery) / 2.0, cfg.battery_sigmoid);

    100.0
        * (cfg.flow_weight * flow_score
            + cfg.gap_weight * gap_score
            + cfg.battery_weight * battery_score)
}

/// Band mapping for leak probabilities. The emission floor keeps the low
/// band unreachable for persisted leak alerts; the mapping stays total so
/// a lowered floor needs no code change.
#[must_use]
pub fn severity_for(cfg: &EngineConfig, probability: f64) -> Severity {
    if probability >= cfg.high_severity_floor {
        Severity::High
    } else if probability >= cfg.medium_severity_floor {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// Probabilities are stored as 2-decimal fixed point.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sigmoid_midpoint_is_half() {
        let params = SigmoidParams {
            midpoint: 50.0,
            slope: 0.1,
        };
        assert_eq!(sigmoid(50.0, params), 0.5);
    }

    #[test]
    fn sigmoid_is_monotonic() {
        let params = SigmoidParams {
            midpoint: 5.0,
            slope: 0.5,
        };
        let mut prev = sigmoid(-100.0, params);
        for step in -99..=100 {
            let next = sigmoid(f64::from(step), params);
            assert!(next > prev, "sigmoid not increasing at x={step}");
            prev = next;
        }
    }

    #[test]
    fn severity_bands() {
        let cfg = EngineConfig::default();
        assert_eq!(severity_for(&cfg, 10.0), Severity::Low);
        assert_eq!(severity_for(&cfg, 49.99), Severity::Low);
        assert_eq!(severity_for(&cfg, 50.0), Severity::Medium);
        assert_eq!(severity_for(&cfg, 69.99), Severity::Medium);
        assert_eq!(severity_for(&cfg, 70.0), Severity::High);
        assert_eq!(severity_for(&cfg, 100.0), Severity::High);
    }
}
