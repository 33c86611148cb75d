//! Consistent hash ring over the configured shards.

use arcdb_core::{ClusterConfig, CoreError, CoreResult, ShardInfo};

/// Shards ordered by `hash_key` ascending, treated as circular: the
/// owner of a hash is the first shard whose key is `>=` the hash,
/// wrapping to the minimum-key shard past the end.
#[derive(Debug, Clone)]
pub struct HashRing {
    shards: Vec<ShardInfo>,
}

impl HashRing {
    /// Builds the ring for a membership snapshot.
    #[must_use]
    pub fn new(config: &ClusterConfig) -> Self {
        let mut shards: Vec<ShardInfo> = config.shards().iter().map(ShardInfo::from).collect();
        shards.sort_by_key(|s| s.hash_key);
        Self { shards }
    }

    /// Whether any shard is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shards.is_empty()
    }

    /// Shards in ring order.
    #[must_use]
    pub fn shards(&self) -> &[ShardInfo] {
        &self.shards
    }

    /// Looks up a shard by id.
    #[must_use]
    pub fn shard(&self, shard_id: &str) -> Option<&ShardInfo> {
        self.shards.iter().find(|s| s.shard_id == shard_id)
    }

    /// Returns the shard owning `hash`.
    ///
    /// # Errors
    ///
    /// `RingEmpty` when no shards are configured.
    pub fn locate(&self, hash: i64) -> CoreResult<&ShardInfo> {
        let index = self.owner_index(hash)?;
        Ok(&self.shards[index])
    }

    /// Returns the successor of the shard owning `hash`; on a
    /// single-shard ring that is the owner itself.
    ///
    /// # Errors
    ///
    /// `RingEmpty` when no shards are configured.
    pub fn locate_next(&self, hash: i64) -> CoreResult<&ShardInfo> {
        let index = self.owner_index(hash)?;
        Ok(&self.shards[(index + 1) % self.shards.len()])
    }

    /// Ring successor of a shard, by id.
    #[must_use]
    pub fn successor_of(&self, shard_id: &str) -> Option<&ShardInfo> {
        let position = self.shards.iter().position(|s| s.shard_id == shard_id)?;
        Some(&self.shards[(position + 1) % self.shards.len()])
    }

    /// Ring predecessor of a shard, by id.
    #[must_use]
    pub fn predecessor_of(&self, shard_id: &str) -> Option<&ShardInfo> {
        let position = self.shards.iter().position(|s| s.shard_id == shard_id)?;
        Some(&self.shards[(position + self.shards.len() - 1) % self.shards.len()])
    }

    fn owner_index(&self, hash: i64) -> CoreResult<usize> {
        if self.shards.is_empty() {
            return Err(CoreError::RingEmpty);
        }
        let index = self.shards.partition_point(|s| s.hash_key < hash);
        Ok(if index == self.shards.len() { 0 } else { index })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcdb_core::{ShardConfig, ShardStatus};

    fn ring(keys: &[(&str, i64)]) -> HashRing {
        let shards = keys
            .iter()
            .map(|(id, key)| {
                ShardConfig::new(*id, format!("http://{id}:7451"), *key, ShardStatus::Active)
                    .unwrap()
            })
            .collect();
        HashRing::new(&ClusterConfig::new(shards).unwrap())
    }

    #[test]
    fn test_empty_ring_fails_locates() {
        let ring = HashRing::new(&ClusterConfig::empty());
        assert!(ring.is_empty());
        assert!(matches!(ring.locate(10), Err(CoreError::RingEmpty)));
        assert!(matches!(ring.locate_next(10), Err(CoreError::RingEmpty)));
    }

    #[test]
    fn test_single_shard_owns_everything() {
        let ring = ring(&[("s1", 100)]);
        assert_eq!(ring.locate(50).unwrap().shard_id, "s1");
        assert_eq!(ring.locate(100).unwrap().shard_id, "s1");
        assert_eq!(ring.locate(200).unwrap().shard_id, "s1");
        assert_eq!(ring.locate_next(50).unwrap().shard_id, "s1");
    }

    #[test]
    fn test_owner_is_first_key_at_or_above_hash() {
        let ring = ring(&[("s3", 300), ("s1", 100), ("s2", 200)]);
        assert_eq!(ring.locate(100).unwrap().shard_id, "s1");
        assert_eq!(ring.locate(101).unwrap().shard_id, "s2");
        assert_eq!(ring.locate(150).unwrap().shard_id, "s2");
        assert_eq!(ring.locate(300).unwrap().shard_id, "s3");
    }

    #[test]
    fn test_wraps_past_largest_key() {
        let ring = ring(&[("s1", 100), ("s2", 200), ("s3", 300)]);
        assert_eq!(ring.locate(350).unwrap().shard_id, "s1");
        assert_eq!(ring.locate_next(350).unwrap().shard_id, "s2");
    }

    #[test]
    fn test_locate_next_is_owner_successor() {
        let ring = ring(&[("s1", 100), ("s2", 200), ("s3", 300)]);
        assert_eq!(ring.locate_next(150).unwrap().shard_id, "s3");
        assert_eq!(ring.locate_next(250).unwrap().shard_id, "s1");
    }

    #[test]
    fn test_neighbors_by_id() {
        let ring = ring(&[("s1", 100), ("s2", 200), ("s3", 300)]);
        assert_eq!(ring.successor_of("s3").unwrap().shard_id, "s1");
        assert_eq!(ring.predecessor_of("s1").unwrap().shard_id, "s3");
        assert!(ring.successor_of("missing").is_none());
    }
}
