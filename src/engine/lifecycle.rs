//! Alert lifecycle: dedup keys, the per-pass candidate buffer, and the
//! active -> resolved transition rules.
//!
//! Per dedup key the state machine is `none -> active -> resolved`,
//! terminal. A fresh leak on the same pair after resolution becomes a new
//! row; an insert over an existing active row is reported as
//! `AlreadyActive` by the store and skipped.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::entity::enums::{AlertType, Severity};

/// At most one active alert may exist per key; the status component is
/// implicit (candidates are always born active).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DedupKey {
    pub sensor_from: String,
    pub sensor_to: String,
    pub alert_type: AlertType,
}

/// An alert produced by a traversal pass, not yet persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateAlert {
    pub sensor_from: String,
    pub sensor_to: String,
    pub alert_type: AlertType,
    pub severity: Severity,
    pub probability: f64,
    pub time: DateTime<Utc>,
}

impl CandidateAlert {
    #[must_use]
    pub fn dedup_key(&self) -> DedupKey {
        DedupKey {
            sensor_from: self.sensor_from.clone(),
            sensor_to: self.sensor_to.clone(),
            alert_type: self.alert_type,
        }
    }
}

/// Collects candidates across a whole traversal pass. One slot per dedup
/// key; the first candidate wins, so a sensor shared by several edges
/// raises a single low-battery alert per pass.
#[derive(Debug, Default)]
pub struct AlertBuffer {
    slots: BTreeMap<DedupKey, CandidateAlert>,
}

impl AlertBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, candidate: CandidateAlert) {
        self.slots.entry(candidate.dedup_key()).or_insert(candidate);
    }

    /// Candidates in key order, consuming the buffer.
    #[must_use]
    pub fn drain(self) -> Vec<CandidateAlert> {
        self.slots.into_values().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(from: &str, to: &str, alert_type: AlertType, probability: f64) -> CandidateAlert {
        CandidateAlert {
            sensor_from: from.to_string(),
            sensor_to: to.to_string(),
            alert_type,
            severity: Severity::Low,
            probability,
            time: DateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn buffer_keeps_one_candidate_per_key() {
        let mut buffer = AlertBuffer::new();
        buffer.push(candidate("s1", "s1", AlertType::LowBattery, 90.0));
        buffer.push(candidate("s1", "s1", AlertType::LowBattery, 90.0));
        buffer.push(candidate("s1", "s2", AlertType::Leak, 72.5));
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn same_pair_different_type_is_distinct() {
        let mut buffer = AlertBuffer::new();
        buffer.push(candidate("s1", "s2", AlertType::Leak, 72.5));
        buffer.push(candidate("s1", "s2", AlertType::Anomaly, 85.0));
        assert_eq!(buffer.len(), 2);
    }
}
