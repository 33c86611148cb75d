//! Shared state for the coordinator API.

use std::sync::Arc;

use arcdb_client::StorageClientFactory;
use arcdb_cluster::{
    ClusterTopology, InMemoryClusterConfigRepository, Router, ShardHealthMonitor, ShardRebalancer,
};

use crate::registry::DatabaseRegistry;

/// Everything a handler needs, cheap to clone per request.
#[derive(Clone)]
pub struct AppState {
    /// Membership source of truth.
    pub repository: Arc<InMemoryClusterConfigRepository>,
    /// Published ring + ownership snapshots.
    pub topology: Arc<ClusterTopology>,
    /// Availability annotations.
    pub monitor: Arc<ShardHealthMonitor>,
    /// Read/write/search routing.
    pub router: Arc<Router>,
    /// Key-range migration.
    pub rebalancer: Arc<ShardRebalancer>,
    /// Per-shard clients, shared with router and rebalancer.
    pub clients: Arc<dyn StorageClientFactory>,
    /// Registered databases.
    pub databases: Arc<DatabaseRegistry>,
}
