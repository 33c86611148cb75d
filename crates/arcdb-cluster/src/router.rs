//! Request routing: primary placement, replica failover, and fan-out
//! search.

use std::sync::Arc;

use tracing::{debug, warn};

use arcdb_client::{StorageClient, StorageClientFactory};
use arcdb_core::{CoreError, CoreResult, SearchQuery, SearchResult, VectorEntry};

use crate::hash::hash_vector_id;
use crate::health::ShardAvailability;
use crate::topology::{ClusterTopology, TopologySnapshot};

/// Merged fan-out search response.
///
/// A search stays useful when parts of the ring are down: partitions
/// served from replicas are transparent, partitions with no replica
/// fallback are listed in `missing_partitions` so clients can decide
/// whether a partial answer is acceptable.
#[derive(Debug)]
pub struct SearchOutcome {
    /// Global top-k, distance ascending, ties broken by smaller id.
    pub results: Vec<SearchResult>,

    /// Shards whose partition could not be served at all.
    pub missing_partitions: Vec<String>,
}

impl SearchOutcome {
    /// Whether any partition was omitted.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        !self.missing_partitions.is_empty()
    }
}

/// Routes reads, writes, and searches onto the ring.
pub struct Router {
    topology: Arc<ClusterTopology>,
    availability: Arc<dyn ShardAvailability>,
    clients: Arc<dyn StorageClientFactory>,
}

impl Router {
    /// Creates a router over the given topology, availability source,
    /// and client factory.
    #[must_use]
    pub fn new(
        topology: Arc<ClusterTopology>,
        availability: Arc<dyn ShardAvailability>,
        clients: Arc<dyn StorageClientFactory>,
    ) -> Self {
        Self {
            topology,
            availability,
            clients,
        }
    }

    /// Writes a vector to its primary shard, then fires the replica
    /// write in the background.
    ///
    /// Writes are never rerouted: a degraded write to a non-owner would
    /// violate placement, so an unavailable owner fails fast with
    /// `ShardUnavailable`.
    pub async fn put_vector(&self, entry: VectorEntry) -> CoreResult<()> {
        let snapshot = self.topology.snapshot();
        let owner = snapshot.ring.locate(hash_vector_id(entry.id))?;
        if !owner.is_active_for_write() || !self.availability.is_shard_available(&owner.shard_id) {
            return Err(CoreError::shard_unavailable(&owner.shard_id));
        }

        let client = self.clients.client_for(owner);
        client.put_vector(&entry).await?;
        debug!(vector_id = entry.id, shard_id = %owner.shard_id, "primary write complete");

        if let Some(replica_client) = self.replica_client(&snapshot, &owner.shard_id) {
            let source = owner.shard_id.clone();
            tokio::spawn(async move {
                if let Err(err) = replica_client.add_vector_replica(&entry, &source).await {
                    warn!(
                        vector_id = entry.id,
                        source_shard_id = %source,
                        error = %err,
                        "replica write failed"
                    );
                }
            });
        }
        Ok(())
    }

    /// Reads a vector from its primary shard, failing over to the
    /// replica location when the primary is unavailable.
    pub async fn get_vector(&self, vector_id: u64, database_id: &str) -> CoreResult<VectorEntry> {
        let snapshot = self.topology.snapshot();
        let owner = snapshot.ring.locate(hash_vector_id(vector_id))?;

        if self.availability.is_shard_available(&owner.shard_id) {
            let client = self.clients.client_for(owner);
            return client
                .get_vector(vector_id, database_id)
                .await?
                .ok_or_else(|| CoreError::not_found("vector", vector_id));
        }

        let available = self.availability_set(&snapshot);
        let fallback = snapshot
            .ownership
            .replica_locations_for_unavailable_shard(&owner.shard_id, &available);
        let Some(replica_id) = fallback.first() else {
            return Err(CoreError::shard_unavailable(&owner.shard_id));
        };
        let Some(replica_shard) = snapshot.ring.shard(replica_id) else {
            return Err(CoreError::shard_unavailable(&owner.shard_id));
        };

        debug!(
            vector_id,
            owner = %owner.shard_id,
            replica = %replica_shard.shard_id,
            "read failing over to replica"
        );
        self.clients
            .client_for(replica_shard)
            .get_vector_replica(vector_id, database_id, &owner.shard_id)
            .await?
            .ok_or_else(|| CoreError::not_found("vector", vector_id))
    }

    /// Deletes a vector on its primary shard; the replica delete runs
    /// in the background and is best-effort.
    pub async fn delete_vector(&self, vector_id: u64, database_id: &str) -> CoreResult<bool> {
        let snapshot = self.topology.snapshot();
        let owner = snapshot.ring.locate(hash_vector_id(vector_id))?;
        if !owner.is_active_for_write() || !self.availability.is_shard_available(&owner.shard_id) {
            return Err(CoreError::shard_unavailable(&owner.shard_id));
        }

        let deleted = self
            .clients
            .client_for(owner)
            .delete_vector(vector_id, database_id)
            .await?;

        if let Some(replica_client) = self.replica_client(&snapshot, &owner.shard_id) {
            let source = owner.shard_id.clone();
            let database_id = database_id.to_string();
            tokio::spawn(async move {
                if let Err(err) = replica_client
                    .delete_vector_replica(vector_id, &database_id, &source)
                    .await
                {
                    warn!(
                        vector_id,
                        source_shard_id = %source,
                        error = %err,
                        "replica delete failed"
                    );
                }
            });
        }
        Ok(deleted)
    }

    /// Fans a k-NN query out to every readable partition and merges
    /// the per-shard lists into the global top-k.
    pub async fn search(
        &self,
        database_id: &str,
        query: Vec<f32>,
        k: usize,
    ) -> CoreResult<SearchOutcome> {
        let snapshot = self.topology.snapshot();
        if snapshot.ring.is_empty() {
            return Err(CoreError::RingEmpty);
        }

        let available = self.availability_set(&snapshot);
        let mut missing_partitions = Vec::new();
        let mut fan_out = Vec::new();

        for shard in snapshot.ring.shards() {
            if !shard.is_active_for_read() {
                continue;
            }
            if available.contains(&shard.shard_id) {
                fan_out.push((
                    shard.shard_id.clone(),
                    self.clients.client_for(shard),
                    SearchQuery {
                        database_id: database_id.to_string(),
                        query: query.clone(),
                        k,
                        replica_source_shard_id: None,
                    },
                ));
                continue;
            }

            let fallback = snapshot
                .ownership
                .replica_locations_for_unavailable_shard(&shard.shard_id, &available);
            match fallback.first().and_then(|id| snapshot.ring.shard(id)) {
                Some(replica_shard) => fan_out.push((
                    shard.shard_id.clone(),
                    self.clients.client_for(replica_shard),
                    SearchQuery {
                        database_id: database_id.to_string(),
                        query: query.clone(),
                        k,
                        replica_source_shard_id: Some(shard.shard_id.clone()),
                    },
                )),
                None => missing_partitions.push(shard.shard_id.clone()),
            }
        }

        let responses = futures::future::join_all(fan_out.into_iter().map(
            |(partition, client, shard_query)| async move {
                (partition, client.search(&shard_query).await)
            },
        ))
        .await;

        let mut results = Vec::new();
        for (partition, response) in responses {
            match response {
                Ok(partition_results) => results.extend(partition_results),
                Err(err) => {
                    warn!(partition = %partition, error = %err, "search partition failed");
                    missing_partitions.push(partition);
                }
            }
        }

        results.sort_by(SearchResult::ranking_cmp);
        results.truncate(k);
        Ok(SearchOutcome {
            results,
            missing_partitions,
        })
    }

    fn availability_set(
        &self,
        snapshot: &TopologySnapshot,
    ) -> std::collections::HashSet<String> {
        snapshot
            .ring
            .shards()
            .iter()
            .filter(|s| self.availability.is_shard_available(&s.shard_id))
            .map(|s| s.shard_id.clone())
            .collect()
    }

    /// Client for the owner's replica location, unless the shard
    /// replicates to itself (one-shard ring), where the replica write
    /// is elided.
    fn replica_client(
        &self,
        snapshot: &TopologySnapshot,
        owner_id: &str,
    ) -> Option<Arc<dyn StorageClient>> {
        let replica_id = snapshot.ownership.replica_location(owner_id)?;
        if replica_id == owner_id {
            return None;
        }
        let shard = snapshot.ring.shard(replica_id)?;
        Some(self.clients.client_for(shard))
    }
}
