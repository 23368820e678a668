mod state;

pub use state::{AppState, RootLocks, TopologyCache, TOPOLOGY_CACHE_KEY};
