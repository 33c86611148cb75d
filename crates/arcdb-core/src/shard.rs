//! Shard membership types.
//!
//! `ShardConfig` is the persistent record kept in the cluster config
//! store; `ShardInfo` is the runtime view the ring and routers work
//! with. `ClusterConfig` is an immutable ordered snapshot of the whole
//! membership.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Lifecycle status of a shard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ShardStatus {
    /// Joined the ring and accepts writes, but is still being filled by
    /// the rebalancer and must not serve reads.
    New,
    /// Fully owns its arc of the ring.
    Active,
}

/// Persistent shard record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardConfig {
    /// Unique shard identifier.
    pub shard_id: String,

    /// Base URL of the storage node, e.g. `http://shard-1:7451`.
    pub base_url: String,

    /// Position of the shard on the hash ring.
    pub hash_key: i64,

    /// Lifecycle status.
    pub status: ShardStatus,
}

impl ShardConfig {
    /// Creates a shard record after validating its fields.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a blank shard id or base URL.
    pub fn new(
        shard_id: impl Into<String>,
        base_url: impl Into<String>,
        hash_key: i64,
        status: ShardStatus,
    ) -> CoreResult<Self> {
        let shard_id = shard_id.into();
        let base_url = base_url.into();
        if shard_id.trim().is_empty() {
            return Err(CoreError::invalid_argument("shard id must not be blank"));
        }
        if base_url.trim().is_empty() {
            return Err(CoreError::invalid_argument(
                "shard base url must not be blank",
            ));
        }
        Ok(Self {
            shard_id,
            base_url,
            hash_key,
            status,
        })
    }
}

/// Runtime view of a shard derived from its persistent record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardInfo {
    /// Unique shard identifier.
    pub shard_id: String,

    /// Base URL of the storage node.
    pub base_url: String,

    /// Position of the shard on the hash ring.
    pub hash_key: i64,

    /// Lifecycle status.
    pub status: ShardStatus,
}

impl ShardInfo {
    /// A shard accepts writes while `New` or `Active`: a joining shard
    /// owns new keys immediately so the rebalancer never has to migrate
    /// writes that landed after the membership change.
    #[must_use]
    pub fn is_active_for_write(&self) -> bool {
        matches!(self.status, ShardStatus::New | ShardStatus::Active)
    }

    /// A shard serves reads only once `Active`.
    #[must_use]
    pub fn is_active_for_read(&self) -> bool {
        self.status == ShardStatus::Active
    }
}

impl From<&ShardConfig> for ShardInfo {
    fn from(config: &ShardConfig) -> Self {
        Self {
            shard_id: config.shard_id.clone(),
            base_url: config.base_url.clone(),
            hash_key: config.hash_key,
            status: config.status,
        }
    }
}

/// Immutable ordered snapshot of cluster membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterConfig {
    shards: Vec<ShardConfig>,
}

impl ClusterConfig {
    /// Creates a membership snapshot.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` when two shards share a `hash_key`
    /// (a ring collision) or a `shard_id`.
    pub fn new(shards: Vec<ShardConfig>) -> CoreResult<Self> {
        let mut hash_keys = HashSet::with_capacity(shards.len());
        let mut shard_ids = HashSet::with_capacity(shards.len());
        for shard in &shards {
            if !hash_keys.insert(shard.hash_key) {
                return Err(CoreError::invalid_argument(format!(
                    "duplicate hash key {} on shard `{}`",
                    shard.hash_key, shard.shard_id
                )));
            }
            if !shard_ids.insert(shard.shard_id.as_str()) {
                return Err(CoreError::invalid_argument(format!(
                    "duplicate shard id `{}`",
                    shard.shard_id
                )));
            }
        }
        Ok(Self { shards })
    }

    /// An empty membership snapshot.
    #[must_use]
    pub fn empty() -> Self {
        Self { shards: Vec::new() }
    }

    /// Returns the shard records in configured order.
    #[must_use]
    pub fn shards(&self) -> &[ShardConfig] {
        &self.shards
    }

    /// Looks up a shard record by id.
    #[must_use]
    pub fn shard(&self, shard_id: &str) -> Option<&ShardConfig> {
        self.shards.iter().find(|s| s.shard_id == shard_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shard(id: &str, hash_key: i64) -> ShardConfig {
        ShardConfig::new(id, format!("http://{id}:7451"), hash_key, ShardStatus::Active).unwrap()
    }

    #[test]
    fn test_status_gates_reads_and_writes() {
        let mut info = ShardInfo::from(&shard("s1", 100));
        assert!(info.is_active_for_read());
        assert!(info.is_active_for_write());

        info.status = ShardStatus::New;
        assert!(!info.is_active_for_read());
        assert!(info.is_active_for_write());
    }

    #[test]
    fn test_blank_shard_id_rejected() {
        assert!(ShardConfig::new("", "http://s:1", 1, ShardStatus::Active).is_err());
    }

    #[test]
    fn test_duplicate_hash_key_rejected() {
        let result = ClusterConfig::new(vec![shard("s1", 100), shard("s2", 100)]);
        assert!(result.is_err());
    }

    #[test]
    fn test_duplicate_shard_id_rejected() {
        let result = ClusterConfig::new(vec![shard("s1", 100), shard("s1", 200)]);
        assert!(result.is_err());
    }

    #[test]
    fn test_lookup_by_id() {
        let config = ClusterConfig::new(vec![shard("s1", 100), shard("s2", 200)]).unwrap();
        assert_eq!(config.shard("s2").unwrap().hash_key, 200);
        assert!(config.shard("s3").is_none());
    }
}
