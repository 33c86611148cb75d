//! Cluster administration handlers.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use arcdb_cluster::ClusterConfigRepository;
use arcdb_core::{ClusterConfig, ShardConfig};

use crate::handlers::ApiError;
use crate::state::AppState;

/// Current shard records.
pub async fn get_cluster_shards(State(state): State<AppState>) -> Json<Vec<ShardConfig>> {
    Json(state.repository.cluster_config().shards().to_vec())
}

/// Replace the cluster membership. The topology watcher picks the new
/// config up and republishes ring and ownership.
pub async fn update_cluster_config(
    State(state): State<AppState>,
    Json(shards): Json<Vec<ShardConfig>>,
) -> Result<StatusCode, ApiError> {
    let config = ClusterConfig::new(shards)?;
    state.repository.publish(config);
    Ok(StatusCode::NO_CONTENT)
}

/// Request to migrate a moved key range.
#[derive(Debug, Deserialize)]
pub struct RebalanceRequest {
    pub database_id: String,
    /// Predecessor of the target in the new ring.
    pub previous_shard_id: String,
    /// Owner of the range before the membership change.
    pub source_shard_id: String,
    /// New owner of the range.
    pub target_shard_id: String,
}

/// Migration counters returned to the operator.
#[derive(Debug, Serialize)]
pub struct RebalanceResponse {
    pub migrated: usize,
    pub batches: usize,
    pub replicas_rehomed: usize,
    pub cancelled: bool,
}

/// Run a key-range migration between two shards.
pub async fn trigger_rebalance(
    State(state): State<AppState>,
    Json(req): Json<RebalanceRequest>,
) -> Result<Json<RebalanceResponse>, ApiError> {
    state.databases.require(&req.database_id)?;

    let new_topology = state.topology.snapshot();
    let old_topology = state
        .topology
        .previous_snapshot()
        .unwrap_or_else(|| new_topology.clone());

    let resolve = |snapshot: &arcdb_cluster::TopologySnapshot, id: &str| {
        snapshot.ring.shard(id).cloned()
    };
    let previous = resolve(&new_topology, &req.previous_shard_id)
        .ok_or_else(|| ApiError::NotFound(format!("shard `{}`", req.previous_shard_id)))?;
    let target = resolve(&new_topology, &req.target_shard_id)
        .ok_or_else(|| ApiError::NotFound(format!("shard `{}`", req.target_shard_id)))?;
    // A decommissioned source only exists in the old ring.
    let source = resolve(&new_topology, &req.source_shard_id)
        .or_else(|| resolve(&old_topology, &req.source_shard_id))
        .ok_or_else(|| ApiError::NotFound(format!("shard `{}`", req.source_shard_id)))?;

    info!(
        database_id = %req.database_id,
        source = %source.shard_id,
        target = %target.shard_id,
        "operator-triggered rebalance"
    );

    let outcome = state
        .rebalancer
        .rebalance(
            &req.database_id,
            &previous,
            &source,
            &target,
            &old_topology,
            &new_topology,
        )
        .await?;

    Ok(Json(RebalanceResponse {
        migrated: outcome.migrated,
        batches: outcome.batches,
        replicas_rehomed: outcome.replicas_rehomed,
        cancelled: outcome.cancelled,
    }))
}
