//! Shard health monitoring.
//!
//! A single background task probes every configured shard each
//! interval. Availability is the conjunction of the last probe result
//! and its freshness: if the monitor itself dies, records age out and
//! every shard eventually reads as unavailable, so routing never
//! trusts a stale-healthy map.
//!
//! The monitor only annotates availability. Membership changes flow
//! exclusively through the config repository.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use arcdb_core::{HealthConfig, ShardInfo};

use crate::topology::ClusterTopology;

/// Answers whether a shard may be routed to right now.
pub trait ShardAvailability: Send + Sync {
    /// True iff the shard's last probe was healthy and fresh.
    fn is_shard_available(&self, shard_id: &str) -> bool;
}

/// Outcome of the most recent probe of one shard.
#[derive(Debug, Clone, Copy)]
pub struct HealthRecord {
    pub healthy: bool,
    pub last_check: Instant,
}

/// Periodic prober of all configured shards.
pub struct ShardHealthMonitor {
    topology: Arc<ClusterTopology>,
    http: reqwest::Client,
    records: RwLock<HashMap<String, HealthRecord>>,
    interval: Duration,
    ttl: Duration,
    probe_timeout: Duration,
}

impl ShardHealthMonitor {
    /// Creates a monitor over the given topology. One pooled HTTP
    /// client serves every probe for the monitor's lifetime.
    #[must_use]
    pub fn new(topology: Arc<ClusterTopology>, config: &HealthConfig) -> Self {
        Self {
            topology,
            http: reqwest::Client::new(),
            records: RwLock::new(HashMap::new()),
            interval: config.interval(),
            ttl: config.ttl(),
            probe_timeout: config.probe_timeout(),
        }
    }

    /// Starts the probe loop. Ticks never overlap: a round that takes
    /// longer than the interval delays the next round.
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        let monitor = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(monitor.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                monitor.probe_all().await;
            }
        })
    }

    /// Probes every configured shard concurrently and records results.
    pub async fn probe_all(&self) {
        let snapshot = self.topology.snapshot();
        let probes = snapshot.ring.shards().iter().map(|shard| async move {
            let healthy = self.probe(shard).await;
            (shard.shard_id.clone(), healthy)
        });
        for (shard_id, healthy) in futures::future::join_all(probes).await {
            if !healthy {
                warn!(shard_id = %shard_id, "shard health probe failed");
            }
            self.record_probe(&shard_id, healthy);
        }
    }

    async fn probe(&self, shard: &ShardInfo) -> bool {
        let url = format!(
            "{}/api/v1/storage/health",
            shard.base_url.trim_end_matches('/')
        );
        match self
            .http
            .get(&url)
            .timeout(self.probe_timeout)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => {
                matches!(response.text().await.as_deref(), Ok("UP"))
            }
            Ok(response) => {
                debug!(shard_id = %shard.shard_id, status = %response.status(), "probe rejected");
                false
            }
            Err(err) => {
                debug!(shard_id = %shard.shard_id, error = %err, "probe failed");
                false
            }
        }
    }

    /// Records a probe outcome stamped with the current time.
    pub fn record_probe(&self, shard_id: &str, healthy: bool) {
        self.record_probe_at(shard_id, healthy, Instant::now());
    }

    fn record_probe_at(&self, shard_id: &str, healthy: bool, last_check: Instant) {
        self.records.write().insert(
            shard_id.to_string(),
            HealthRecord {
                healthy,
                last_check,
            },
        );
    }

    /// Last recorded probe for a shard, if any.
    #[must_use]
    pub fn record(&self, shard_id: &str) -> Option<HealthRecord> {
        self.records.read().get(shard_id).copied()
    }

    /// Ids of all currently available shards in the given list.
    #[must_use]
    pub fn available_ids(&self, shards: &[ShardInfo]) -> HashSet<String> {
        shards
            .iter()
            .filter(|s| self.is_shard_available(&s.shard_id))
            .map(|s| s.shard_id.clone())
            .collect()
    }
}

impl ShardAvailability for ShardHealthMonitor {
    fn is_shard_available(&self, shard_id: &str) -> bool {
        match self.record(shard_id) {
            Some(record) => record.healthy && record.last_check.elapsed() <= self.ttl,
            None => false,
        }
    }
}
