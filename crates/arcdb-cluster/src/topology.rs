//! Published topology snapshots.
//!
//! Ring and ownership are derived together from one membership snapshot
//! and published by swapping an `Arc`. A request clones the `Arc` once
//! and sees a consistent placement for its whole duration even if the
//! membership changes mid-flight.

use std::sync::Arc;

use arcdb_core::ClusterConfig;
use parking_lot::RwLock;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

use crate::ownership::ShardOwnership;
use crate::ring::HashRing;

/// One consistent view of the cluster.
#[derive(Debug, Clone)]
pub struct TopologySnapshot {
    pub config: ClusterConfig,
    pub ring: HashRing,
    pub ownership: ShardOwnership,
}

impl TopologySnapshot {
    /// Derives ring and ownership from a membership snapshot.
    #[must_use]
    pub fn from_config(config: ClusterConfig) -> Self {
        let ring = HashRing::new(&config);
        let ownership = ShardOwnership::from_ring(&ring);
        Self {
            config,
            ring,
            ownership,
        }
    }
}

/// Holder of the current snapshot.
///
/// The previous snapshot is retained so the rebalancer can consult the
/// placement that was in effect before the latest membership change.
pub struct ClusterTopology {
    current: RwLock<Arc<TopologySnapshot>>,
    previous: RwLock<Option<Arc<TopologySnapshot>>>,
}

impl ClusterTopology {
    /// Creates a topology from the initial membership.
    #[must_use]
    pub fn new(initial: ClusterConfig) -> Self {
        Self {
            current: RwLock::new(Arc::new(TopologySnapshot::from_config(initial))),
            previous: RwLock::new(None),
        }
    }

    /// Returns the current snapshot; callers hold it for the duration
    /// of one request.
    #[must_use]
    pub fn snapshot(&self) -> Arc<TopologySnapshot> {
        self.current.read().clone()
    }

    /// Snapshot that was current before the latest membership change.
    #[must_use]
    pub fn previous_snapshot(&self) -> Option<Arc<TopologySnapshot>> {
        self.previous.read().clone()
    }

    /// Rebuilds and publishes the snapshot for a new membership.
    pub fn install(&self, config: ClusterConfig) {
        let snapshot = Arc::new(TopologySnapshot::from_config(config));
        info!(
            shards = snapshot.ring.shards().len(),
            "installed new topology snapshot"
        );
        let mut current = self.current.write();
        *self.previous.write() = Some(current.clone());
        *current = snapshot;
    }

    /// Keeps the topology in sync with a membership watcher until the
    /// sender side is dropped.
    pub fn spawn_watcher(
        self: &Arc<Self>,
        mut receiver: watch::Receiver<ClusterConfig>,
    ) -> JoinHandle<()> {
        let topology = Arc::clone(self);
        tokio::spawn(async move {
            while receiver.changed().await.is_ok() {
                let config = receiver.borrow_and_update().clone();
                topology.install(config);
            }
        })
    }
}
