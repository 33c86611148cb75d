//! Wires configuration into a running coordinator.

use std::sync::Arc;

use tracing::info;

use arcdb_client::http::HttpStorageClientFactory;
use arcdb_client::StorageClientFactory;
use arcdb_cluster::{
    ClusterConfigRepository, ClusterTopology, InMemoryClusterConfigRepository, Router,
    ShardHealthMonitor, ShardRebalancer,
};
use arcdb_core::{ClusterConfig, CoordinatorConfig, CoreResult, ShardConfig};

use crate::registry::DatabaseRegistry;
use crate::state::AppState;

/// Builds the application state from configuration and an initial
/// membership snapshot.
#[must_use]
pub fn build_state(config: &CoordinatorConfig, initial: ClusterConfig) -> AppState {
    let clients: Arc<dyn StorageClientFactory> = Arc::new(HttpStorageClientFactory::new(
        config.shard.call_timeout(),
        config.shard.batch_timeout(),
    ));
    build_state_with_clients(config, initial, clients)
}

/// Builds the application state around a caller-supplied client
/// factory; tests inject the in-memory backend here.
#[must_use]
pub fn build_state_with_clients(
    config: &CoordinatorConfig,
    initial: ClusterConfig,
    clients: Arc<dyn StorageClientFactory>,
) -> AppState {
    let repository = Arc::new(InMemoryClusterConfigRepository::new(initial));
    let topology = Arc::new(ClusterTopology::new(repository.cluster_config()));
    let monitor = Arc::new(ShardHealthMonitor::new(topology.clone(), &config.health));
    let router = Arc::new(Router::new(
        topology.clone(),
        monitor.clone(),
        clients.clone(),
    ));
    let rebalancer = Arc::new(ShardRebalancer::new(
        clients.clone(),
        config.rebalancer.batch_size,
    ));

    AppState {
        repository,
        topology,
        monitor,
        router,
        rebalancer,
        clients,
        databases: Arc::new(DatabaseRegistry::new()),
    }
}

/// Starts the background loops: topology watcher and health monitor.
pub fn spawn_background_tasks(state: &AppState) {
    state.topology.spawn_watcher(state.repository.watch());
    state.monitor.spawn();
    info!("background tasks started");
}

/// Reads the seed membership from the file named by
/// `ARCDB_CLUSTER_SEED`, or starts with an empty ring.
pub fn load_seed_config() -> CoreResult<ClusterConfig> {
    let Ok(path) = std::env::var("ARCDB_CLUSTER_SEED") else {
        info!("no cluster seed configured, starting with an empty ring");
        return Ok(ClusterConfig::empty());
    };
    let raw = std::fs::read_to_string(&path)?;
    let shards: Vec<ShardConfig> = serde_json::from_str(&raw)?;
    info!(path, shards = shards.len(), "loaded cluster seed");
    ClusterConfig::new(shards)
}
