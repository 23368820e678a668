//! The leak-inference engine: topology validation, recursive flow
//! smoothing, pairwise sigmoid scoring, and alert lifecycle.

pub mod inference;
pub mod lifecycle;
pub mod scoring;
pub mod smoothing;
pub mod topology;

pub use inference::{IncomingReading, InferenceEngine, PassSummary};
pub use topology::{Edge, Topology, TopologyError};
