use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sea_orm::DatabaseConnection;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::config::Config;
use crate::engine::{InferenceEngine, Topology};

/// Single-entry cache for the validated topology. Rebuilt on expiry and
/// explicitly invalidated whenever edges or sensors change.
pub type TopologyCache = Cache<&'static str, Arc<Topology>>;

pub const TOPOLOGY_CACHE_KEY: &str = "forest";

/// Serializes ingestion passes per sub-tree. Two batches touching the same
/// root take the same lock; unrelated sub-trees proceed in parallel.
#[derive(Debug, Default)]
pub struct RootLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl RootLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the locks for a set of lock keys. Keys must be sorted and
    /// deduplicated by the caller; sorted acquisition keeps two batches
    /// with overlapping key sets from deadlocking.
    pub async fn acquire(&self, keys: &[String]) -> Vec<OwnedMutexGuard<()>> {
        let handles: Vec<Arc<Mutex<()>>> = {
            let mut map = self.locks.lock().await;
            keys.iter()
                .map(|key| Arc::clone(map.entry(key.clone()).or_default()))
                .collect()
        };

        let mut guards = Vec::with_capacity(handles.len());
        for handle in handles {
            guards.push(handle.lock_owned().await);
        }
        guards
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<Config>,
    pub engine: Arc<InferenceEngine>,
    pub topology_cache: TopologyCache,
    pub root_locks: Arc<RootLocks>,
}

impl AppState {
    pub fn new(db: DatabaseConnection, config: Config) -> Self {
        let cache: TopologyCache = Cache::builder()
            .max_capacity(1)
            .time_to_live(Duration::from_secs(config.topology_cache_ttl_seconds))
            .build();

        let engine = InferenceEngine::new(config.engine.clone());

        Self {
            db,
            config: Arc::new(config),
            engine: Arc::new(engine),
            topology_cache: cache,
            root_locks: Arc::new(RootLocks::new()),
        }
    }
}
