//! End-to-end rebalance scenarios over the in-memory backend: a new
//! shard joins the ring and the moved arc migrates with its replicas.

use std::sync::Arc;

use arcdb_client::memory::InMemoryStorageBackend;
use arcdb_client::StorageClient;
use arcdb_cluster::{hash_vector_id, RebalanceRange, ShardRebalancer, TopologySnapshot};
use arcdb_core::{ClusterConfig, ShardConfig, ShardInfo, ShardStatus, VectorEntry};

const DB: &str = "db";
const IDS: u64 = 200;

fn shard(id: &str, hash_key: i64, status: ShardStatus) -> ShardConfig {
    ShardConfig::new(id, format!("http://{id}:7451"), hash_key, status).unwrap()
}

fn entry(id: u64) -> VectorEntry {
    VectorEntry::new(id, vec![id as f32, 1.0], DB, format!("payload-{id}"))
}

/// A cluster of three shards whose keys split the observed hash values
/// of ids `0..IDS` into quarters, plus a fourth shard joining inside
/// s2's arc.
struct JoinFixture {
    backend: Arc<InMemoryStorageBackend>,
    old_topology: TopologySnapshot,
    new_topology: TopologySnapshot,
    previous: ShardInfo,
    source: ShardInfo,
    target: ShardInfo,
    /// Ids primary-owned by s2 before the join, ascending.
    s2_ids: Vec<u64>,
    /// Subset of `s2_ids` that moves to s4, ascending.
    moved_ids: Vec<u64>,
}

impl JoinFixture {
    async fn new() -> Self {
        let mut sorted: Vec<i64> = (0..IDS).map(hash_vector_id).collect();
        sorted.sort_unstable();
        let (k1, k2, k3) = (sorted[49], sorted[99], sorted[149]);
        let k4 = sorted[74];

        let old_config = ClusterConfig::new(vec![
            shard("s1", k1, ShardStatus::Active),
            shard("s2", k2, ShardStatus::Active),
            shard("s3", k3, ShardStatus::Active),
        ])
        .unwrap();
        let new_config = ClusterConfig::new(vec![
            shard("s1", k1, ShardStatus::Active),
            shard("s2", k2, ShardStatus::Active),
            shard("s3", k3, ShardStatus::Active),
            shard("s4", k4, ShardStatus::New),
        ])
        .unwrap();

        let old_topology = TopologySnapshot::from_config(old_config);
        let new_topology = TopologySnapshot::from_config(new_config);

        // Seed every vector on its pre-join owner, with its replica on
        // the owner's ring successor.
        let backend = Arc::new(InMemoryStorageBackend::new());
        for id in 0..IDS {
            let owner = old_topology.ring.locate(hash_vector_id(id)).unwrap();
            let replica_location = old_topology
                .ownership
                .replica_location(&owner.shard_id)
                .unwrap();
            backend.node(&owner.shard_id).put_vector(&entry(id)).await.unwrap();
            backend
                .node(replica_location)
                .add_vector_replica(&entry(id), &owner.shard_id)
                .await
                .unwrap();
        }

        let range = RebalanceRange::between(
            new_topology.ring.shard("s1").unwrap(),
            new_topology.ring.shard("s4").unwrap(),
        );
        let mut s2_ids: Vec<u64> = (0..IDS)
            .filter(|id| {
                old_topology
                    .ring
                    .locate(hash_vector_id(*id))
                    .unwrap()
                    .shard_id
                    == "s2"
            })
            .collect();
        s2_ids.sort_unstable();
        let moved_ids: Vec<u64> = s2_ids
            .iter()
            .copied()
            .filter(|id| range.contains(hash_vector_id(*id)))
            .collect();

        let previous = new_topology.ring.shard("s1").unwrap().clone();
        let source = new_topology.ring.shard("s2").unwrap().clone();
        let target = new_topology.ring.shard("s4").unwrap().clone();

        Self {
            backend,
            old_topology,
            new_topology,
            previous,
            source,
            target,
            s2_ids,
            moved_ids,
        }
    }

    async fn run(&self, rebalancer: &ShardRebalancer) -> arcdb_cluster::RebalanceOutcome {
        rebalancer
            .rebalance(
                DB,
                &self.previous,
                &self.source,
                &self.target,
                &self.old_topology,
                &self.new_topology,
            )
            .await
            .unwrap()
    }
}

#[tokio::test]
async fn test_join_moves_exactly_the_new_arc() {
    let fixture = JoinFixture::new().await;
    assert!(
        fixture.moved_ids.len() >= 20,
        "fixture must move a meaningful arc"
    );

    let rebalancer = ShardRebalancer::new(fixture.backend.clone(), 7);
    let outcome = fixture.run(&rebalancer).await;

    assert_eq!(outcome.migrated, fixture.moved_ids.len());
    assert!(outcome.batches > 1, "small batches must force several scans");
    assert!(!outcome.cancelled);

    assert_eq!(fixture.backend.node("s4").primary_ids(DB), fixture.moved_ids);
    let remaining: Vec<u64> = fixture
        .s2_ids
        .iter()
        .copied()
        .filter(|id| !fixture.moved_ids.contains(id))
        .collect();
    assert_eq!(fixture.backend.node("s2").primary_ids(DB), remaining);

    // Every id lives on exactly one primary, and it is the owner the
    // new ring computes.
    for id in 0..IDS {
        let owner = fixture
            .new_topology
            .ring
            .locate(hash_vector_id(id))
            .unwrap()
            .shard_id
            .clone();
        let holders: Vec<String> = ["s1", "s2", "s3", "s4"]
            .iter()
            .filter(|s| fixture.backend.node(s).primary_ids(DB).contains(&id))
            .map(ToString::to_string)
            .collect();
        assert_eq!(holders, vec![owner], "id {id}");
    }
}

#[tokio::test]
async fn test_replicas_follow_the_moved_arc() {
    let fixture = JoinFixture::new().await;
    let rebalancer = ShardRebalancer::new(fixture.backend.clone(), 16);
    let outcome = fixture.run(&rebalancer).await;

    assert_eq!(outcome.replicas_rehomed, fixture.moved_ids.len());

    // New ring order is s1, s4, s2, s3: s4 replicates onto s2, and the
    // stale copies held by s3 for s2 are gone.
    assert_eq!(
        fixture.backend.node("s2").replica_ids(DB, "s4"),
        fixture.moved_ids
    );
    let remaining: Vec<u64> = fixture
        .s2_ids
        .iter()
        .copied()
        .filter(|id| !fixture.moved_ids.contains(id))
        .collect();
    assert_eq!(fixture.backend.node("s3").replica_ids(DB, "s2"), remaining);
}

#[tokio::test]
async fn test_rerun_is_idempotent() {
    let fixture = JoinFixture::new().await;
    let rebalancer = ShardRebalancer::new(fixture.backend.clone(), 16);

    let first = fixture.run(&rebalancer).await;
    assert_eq!(first.migrated, fixture.moved_ids.len());

    let second = fixture.run(&rebalancer).await;
    assert_eq!(second.migrated, 0);
    assert_eq!(second.replicas_rehomed, 0);
    assert_eq!(fixture.backend.node("s4").primary_ids(DB), fixture.moved_ids);
}

#[tokio::test]
async fn test_cancelled_rebalance_moves_nothing() {
    let fixture = JoinFixture::new().await;
    let rebalancer = ShardRebalancer::new(fixture.backend.clone(), 16);
    rebalancer.cancel();

    let outcome = fixture.run(&rebalancer).await;
    assert!(outcome.cancelled);
    assert_eq!(outcome.migrated, 0);
    assert_eq!(fixture.backend.node("s2").primary_ids(DB), fixture.s2_ids);
}
