//! Cluster membership source.
//!
//! Membership changes flow exclusively through a repository: the health
//! monitor only annotates availability and never touches the config.

use arcdb_core::{ClusterConfig, ShardConfig};
use tokio::sync::watch;
use tracing::info;

/// Provides the current membership and notifies on change.
///
/// The backing store is deployment-specific (a ZooKeeper-shaped watcher
/// in production); [`InMemoryClusterConfigRepository`] serves embedded
/// setups and tests.
pub trait ClusterConfigRepository: Send + Sync {
    /// Current membership snapshot.
    fn cluster_config(&self) -> ClusterConfig;

    /// Current shard records, in configured order.
    fn shards(&self) -> Vec<ShardConfig> {
        self.cluster_config().shards().to_vec()
    }

    /// Subscribes to membership changes. The receiver always holds the
    /// latest snapshot.
    fn watch(&self) -> watch::Receiver<ClusterConfig>;
}

/// Repository keeping the membership in process memory.
pub struct InMemoryClusterConfigRepository {
    sender: watch::Sender<ClusterConfig>,
}

impl InMemoryClusterConfigRepository {
    /// Creates a repository seeded with `initial`.
    #[must_use]
    pub fn new(initial: ClusterConfig) -> Self {
        let (sender, _) = watch::channel(initial);
        Self { sender }
    }

    /// Publishes a new membership snapshot to all watchers.
    pub fn publish(&self, config: ClusterConfig) {
        info!(shards = config.shards().len(), "publishing cluster config");
        self.sender.send_replace(config);
    }
}

impl ClusterConfigRepository for InMemoryClusterConfigRepository {
    fn cluster_config(&self) -> ClusterConfig {
        self.sender.borrow().clone()
    }

    fn watch(&self) -> watch::Receiver<ClusterConfig> {
        self.sender.subscribe()
    }
}
