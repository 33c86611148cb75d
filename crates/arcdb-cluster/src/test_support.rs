//! Shared fixtures for cluster tests.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use arcdb_core::{ClusterConfig, ShardConfig, ShardStatus};

use crate::health::ShardAvailability;

/// Builds a validated cluster config from `(id, hash_key, status)`
/// triples.
pub fn cluster_config(specs: &[(&str, i64, ShardStatus)]) -> ClusterConfig {
    ClusterConfig::new(
        specs
            .iter()
            .map(|(id, key, status)| {
                ShardConfig::new(*id, format!("http://{id}:7451"), *key, *status).unwrap()
            })
            .collect(),
    )
    .unwrap()
}

/// Availability source with manually toggled shards.
pub struct StubAvailability {
    up: Mutex<HashSet<String>>,
}

impl StubAvailability {
    pub fn set_down(&self, shard_id: &str) {
        self.up.lock().remove(shard_id);
    }

    pub fn set_up(&self, shard_id: &str) {
        self.up.lock().insert(shard_id.to_string());
    }
}

impl ShardAvailability for StubAvailability {
    fn is_shard_available(&self, shard_id: &str) -> bool {
        self.up.lock().contains(shard_id)
    }
}

/// Creates a stub with the given shards up.
pub fn available(shard_ids: &[&str]) -> Arc<StubAvailability> {
    Arc::new(StubAvailability {
        up: Mutex::new(shard_ids.iter().map(ToString::to_string).collect()),
    })
}

/// Polls `condition` until it holds, failing the test after ~1s.
pub async fn wait_until(condition: impl Fn() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached within timeout");
}
