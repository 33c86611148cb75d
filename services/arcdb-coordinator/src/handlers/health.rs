//! Health endpoints: coordinator liveness and the cluster view.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use arcdb_cluster::ShardAvailability;
use arcdb_core::ShardStatus;

use crate::state::AppState;

/// Availability of one shard as the monitor sees it.
#[derive(Debug, Serialize)]
pub struct ShardHealthEntry {
    pub shard_id: String,
    pub status: ShardStatus,
    pub available: bool,
}

/// Cluster-wide availability summary.
#[derive(Debug, Serialize)]
pub struct ClusterHealthResponse {
    pub total: usize,
    pub available: usize,
    pub shards: Vec<ShardHealthEntry>,
}

/// Liveness probe: 200 whenever the coordinator process is serving.
pub async fn liveness_handler() -> impl IntoResponse {
    StatusCode::OK
}

/// Availability of every configured shard.
pub async fn cluster_health(State(state): State<AppState>) -> Json<ClusterHealthResponse> {
    let snapshot = state.topology.snapshot();
    let shards: Vec<ShardHealthEntry> = snapshot
        .ring
        .shards()
        .iter()
        .map(|shard| ShardHealthEntry {
            shard_id: shard.shard_id.clone(),
            status: shard.status,
            available: state.monitor.is_shard_available(&shard.shard_id),
        })
        .collect();
    let available = shards.iter().filter(|s| s.available).count();

    Json(ClusterHealthResponse {
        total: shards.len(),
        available,
        shards,
    })
}
