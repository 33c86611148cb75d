//! Primary → replica placement derived from ring order.

use std::collections::{BTreeSet, HashMap, HashSet};

use arcdb_core::ClusterConfig;

use crate::ring::HashRing;

/// Immutable placement mapping for one membership snapshot.
///
/// Every shard's data is replicated on its ring successor, so every
/// shard holds replicas sourced from its immediate predecessor. The
/// mapping is never mutated after construction; topology changes
/// publish a fresh instance.
#[derive(Debug, Clone, Default)]
pub struct ShardOwnership {
    replica_location: HashMap<String, String>,
    replica_sources: HashMap<String, BTreeSet<String>>,
}

impl ShardOwnership {
    /// Derives placement from a membership snapshot.
    #[must_use]
    pub fn from_config(config: &ClusterConfig) -> Self {
        Self::from_ring(&HashRing::new(config))
    }

    /// Derives placement from an already-built ring.
    #[must_use]
    pub fn from_ring(ring: &HashRing) -> Self {
        let mut replica_location = HashMap::new();
        let mut replica_sources: HashMap<String, BTreeSet<String>> = HashMap::new();
        for shard in ring.shards() {
            let Some(successor) = ring.successor_of(&shard.shard_id) else {
                continue;
            };
            replica_location.insert(shard.shard_id.clone(), successor.shard_id.clone());
            replica_sources
                .entry(successor.shard_id.clone())
                .or_default()
                .insert(shard.shard_id.clone());
        }
        Self {
            replica_location,
            replica_sources,
        }
    }

    /// Where a shard's data is replicated: its ring successor.
    #[must_use]
    pub fn replica_location(&self, shard_id: &str) -> Option<&str> {
        self.replica_location.get(shard_id).map(String::as_str)
    }

    /// Shards whose replicas this shard holds: its ring predecessors.
    #[must_use]
    pub fn replica_sources(&self, shard_id: &str) -> Option<&BTreeSet<String>> {
        self.replica_sources.get(shard_id)
    }

    /// Replica fallbacks for reads against an unavailable shard.
    ///
    /// The sole input the router uses to fail reads over: the shard's
    /// replica location when that location is itself available, empty
    /// otherwise.
    #[must_use]
    pub fn replica_locations_for_unavailable_shard(
        &self,
        unavailable_id: &str,
        available_ids: &HashSet<String>,
    ) -> Vec<String> {
        match self.replica_location(unavailable_id) {
            Some(location) if available_ids.contains(location) => vec![location.to_string()],
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcdb_core::{ShardConfig, ShardStatus};

    fn config(keys: &[(&str, i64)]) -> ClusterConfig {
        ClusterConfig::new(
            keys.iter()
                .map(|(id, key)| {
                    ShardConfig::new(*id, format!("http://{id}:7451"), *key, ShardStatus::Active)
                        .unwrap()
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_single_shard_replicates_to_itself() {
        let ownership = ShardOwnership::from_config(&config(&[("s1", 100)]));
        assert_eq!(ownership.replica_location("s1"), Some("s1"));
        let sources = ownership.replica_sources("s1").unwrap();
        assert_eq!(sources.iter().collect::<Vec<_>>(), vec!["s1"]);
    }

    #[test]
    fn test_replicas_follow_ring_order() {
        let ownership =
            ShardOwnership::from_config(&config(&[("s2", 200), ("s1", 100), ("s3", 300)]));

        assert_eq!(ownership.replica_location("s1"), Some("s2"));
        assert_eq!(ownership.replica_location("s2"), Some("s3"));
        assert_eq!(ownership.replica_location("s3"), Some("s1"));

        let sources = ownership.replica_sources("s1").unwrap();
        assert_eq!(sources.iter().collect::<Vec<_>>(), vec!["s3"]);
    }

    #[test]
    fn test_unknown_shard_has_no_placement() {
        let ownership = ShardOwnership::from_config(&config(&[("s1", 100)]));
        assert_eq!(ownership.replica_location("s9"), None);
        assert!(ownership.replica_sources("s9").is_none());
    }

    #[test]
    fn test_failover_location_requires_availability() {
        let ownership =
            ShardOwnership::from_config(&config(&[("s1", 100), ("s2", 200), ("s3", 300)]));

        let available: HashSet<String> = ["s1", "s3"].iter().map(ToString::to_string).collect();
        assert_eq!(
            ownership.replica_locations_for_unavailable_shard("s2", &available),
            vec!["s3".to_string()]
        );

        let only_s1: HashSet<String> = ["s1"].iter().map(ToString::to_string).collect();
        assert!(ownership
            .replica_locations_for_unavailable_shard("s2", &only_s1)
            .is_empty());
    }
}
