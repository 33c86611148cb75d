//! Key-range migration after ring membership changes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

use arcdb_client::StorageClientFactory;
use arcdb_core::{CoreResult, ShardInfo, VectorEntry};

use crate::hash::hash_vector_id;
use crate::topology::TopologySnapshot;

/// Arc of the ring that moved to a new owner.
///
/// Bounded by the ring positions of the target's predecessor
/// (exclusive) and the target itself (inclusive), with wraparound past
/// the top of the key space.
#[derive(Debug, Clone, Copy)]
pub struct RebalanceRange {
    start_exclusive: i64,
    end_inclusive: i64,
}

impl RebalanceRange {
    /// Range of hashes now owned by `target`, whose ring predecessor is
    /// `previous`.
    #[must_use]
    pub fn between(previous: &ShardInfo, target: &ShardInfo) -> Self {
        Self {
            start_exclusive: previous.hash_key,
            end_inclusive: target.hash_key,
        }
    }

    /// Whether `hash` falls inside the moved arc.
    #[must_use]
    pub fn contains(&self, hash: i64) -> bool {
        if self.start_exclusive < self.end_inclusive {
            hash > self.start_exclusive && hash <= self.end_inclusive
        } else {
            hash > self.start_exclusive || hash <= self.end_inclusive
        }
    }
}

/// Counters describing one finished migration.
#[derive(Debug, Default, Clone, Copy)]
pub struct RebalanceOutcome {
    /// Vectors moved to the target shard.
    pub migrated: usize,

    /// Scan batches processed.
    pub batches: usize,

    /// Replica copies moved to their new location.
    pub replicas_rehomed: usize,

    /// Whether the migration stopped early on cancellation.
    pub cancelled: bool,
}

/// Streams vectors from a source shard to a target shard in batches,
/// then re-homes their replicas.
pub struct ShardRebalancer {
    clients: Arc<dyn StorageClientFactory>,
    batch_size: usize,
    cancelled: AtomicBool,
}

impl ShardRebalancer {
    /// Creates a rebalancer moving `batch_size` vectors per scan.
    #[must_use]
    pub fn new(clients: Arc<dyn StorageClientFactory>, batch_size: usize) -> Self {
        Self {
            clients,
            batch_size,
            cancelled: AtomicBool::new(false),
        }
    }

    /// Requests cancellation. The current batch always completes its
    /// put-then-delete pair; the flag is observed between batches.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Migrates the key range that moved from `source` to `target`.
    ///
    /// `previous` is the target's predecessor in the new ring; the
    /// moved arc is `(previous.hash_key, target.hash_key]`. The scan
    /// restarts cleanly from any interruption because the target put is
    /// an upsert and always precedes the source delete: a crash leaves
    /// a vector on both shards, never on neither, and a re-run
    /// converges.
    ///
    /// # Errors
    ///
    /// Primary-path failures (scan, put, delete) surface to the caller.
    /// Replica re-homing failures are logged and never abort the
    /// migration.
    pub async fn rebalance(
        &self,
        database_id: &str,
        previous: &ShardInfo,
        source: &ShardInfo,
        target: &ShardInfo,
        old_topology: &TopologySnapshot,
        new_topology: &TopologySnapshot,
    ) -> CoreResult<RebalanceOutcome> {
        let range = RebalanceRange::between(previous, target);
        let source_client = self.clients.client_for(source);
        let target_client = self.clients.client_for(target);

        info!(
            database_id,
            source = %source.shard_id,
            target = %target.shard_id,
            start_exclusive = range.start_exclusive,
            end_inclusive = range.end_inclusive,
            "starting rebalance"
        );

        let mut outcome = RebalanceOutcome::default();
        let mut from: u64 = 0;
        loop {
            if self.cancelled.load(Ordering::SeqCst) {
                outcome.cancelled = true;
                break;
            }

            let batch = source_client
                .scan_range(database_id, from, u64::MAX, self.batch_size)
                .await?;
            let Some(last) = batch.last() else {
                break;
            };
            // The next scan starts past the last processed id, so a
            // boundary entry is never handed back twice.
            let next_from = last.id.checked_add(1);

            let to_move: Vec<VectorEntry> = batch
                .into_iter()
                .filter(|entry| range.contains(hash_vector_id(entry.id)))
                .collect();

            if !to_move.is_empty() {
                target_client.put_batch(database_id, &to_move).await?;
                let ids: Vec<u64> = to_move.iter().map(|e| e.id).collect();
                source_client.delete_batch(database_id, &ids).await?;

                outcome.migrated += to_move.len();
                outcome.replicas_rehomed += self
                    .rehome_replicas(
                        database_id,
                        &to_move,
                        source,
                        target,
                        old_topology,
                        new_topology,
                    )
                    .await;
            }
            outcome.batches += 1;

            let Some(next) = next_from else {
                break;
            };
            from = next;
        }

        info!(
            database_id,
            source = %source.shard_id,
            target = %target.shard_id,
            migrated = outcome.migrated,
            batches = outcome.batches,
            replicas_rehomed = outcome.replicas_rehomed,
            cancelled = outcome.cancelled,
            "rebalance finished"
        );
        Ok(outcome)
    }

    /// Moves the replicas of one migrated batch from the source's old
    /// replica location to the target's new one. Skipped when either
    /// location is unknown or both are the same shard.
    async fn rehome_replicas(
        &self,
        database_id: &str,
        moved: &[VectorEntry],
        source: &ShardInfo,
        target: &ShardInfo,
        old_topology: &TopologySnapshot,
        new_topology: &TopologySnapshot,
    ) -> usize {
        let Some(source_replica_id) = old_topology.ownership.replica_location(&source.shard_id)
        else {
            return 0;
        };
        let Some(target_replica_id) = new_topology.ownership.replica_location(&target.shard_id)
        else {
            return 0;
        };
        if source_replica_id == target_replica_id {
            return 0;
        }
        let Some(source_replica_shard) = old_topology.ring.shard(source_replica_id) else {
            return 0;
        };
        let Some(target_replica_shard) = new_topology.ring.shard(target_replica_id) else {
            return 0;
        };

        let source_replica_client = self.clients.client_for(source_replica_shard);
        let target_replica_client = self.clients.client_for(target_replica_shard);

        let mut rehomed = 0;
        for entry in moved {
            let replica = match source_replica_client
                .get_vector_replica(entry.id, database_id, &source.shard_id)
                .await
            {
                Ok(Some(replica)) => replica,
                Ok(None) => continue,
                Err(err) => {
                    warn!(
                        vector_id = entry.id,
                        shard_id = %source_replica_shard.shard_id,
                        error = %err,
                        "replica fetch failed during re-homing"
                    );
                    continue;
                }
            };

            if let Err(err) = target_replica_client
                .add_vector_replica(&replica, &target.shard_id)
                .await
            {
                warn!(
                    vector_id = entry.id,
                    shard_id = %target_replica_shard.shard_id,
                    error = %err,
                    "replica store failed during re-homing"
                );
                continue;
            }
            if let Err(err) = source_replica_client
                .delete_vector_replica(entry.id, database_id, &source.shard_id)
                .await
            {
                warn!(
                    vector_id = entry.id,
                    shard_id = %source_replica_shard.shard_id,
                    error = %err,
                    "stale replica cleanup failed during re-homing"
                );
            }
            rehomed += 1;
        }
        rehomed
    }
}
