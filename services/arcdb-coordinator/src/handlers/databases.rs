//! Database lifecycle handlers.
//!
//! Database creation and deletion are broadcast to every configured
//! shard; a shard that misses the broadcast picks the database up when
//! the rebalancer or a replica write first touches it, so per-shard
//! failures are logged rather than surfaced.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use arcdb_core::DatabaseInfo;

use crate::handlers::ApiError;
use crate::state::AppState;

/// Request to create a database. The id is generated when omitted.
#[derive(Debug, Deserialize)]
pub struct CreateDatabaseRequest {
    pub id: Option<String>,
    pub name: String,
    pub dimension: usize,
}

/// Create a database and broadcast it to the shards.
pub async fn create_database(
    State(state): State<AppState>,
    Json(req): Json<CreateDatabaseRequest>,
) -> Result<(StatusCode, Json<DatabaseInfo>), ApiError> {
    let id = req.id.unwrap_or_else(|| Uuid::new_v4().to_string());
    let info = DatabaseInfo::new(id, req.name, req.dimension)?;

    if !state.databases.register(info.clone()) {
        return Err(ApiError::Conflict(format!(
            "database `{}` already exists",
            info.id
        )));
    }
    info!(database_id = %info.id, dimension = info.dimension, "database created");

    let snapshot = state.topology.snapshot();
    for shard in snapshot.ring.shards() {
        let client = state.clients.client_for(shard);
        if let Err(err) = client.create_database(&info).await {
            warn!(
                database_id = %info.id,
                shard_id = %shard.shard_id,
                error = %err,
                "database broadcast failed"
            );
        }
    }

    Ok((StatusCode::CREATED, Json(info)))
}

/// List registered databases.
pub async fn list_databases(State(state): State<AppState>) -> Json<Vec<DatabaseInfo>> {
    Json(state.databases.list())
}

/// Delete a database everywhere.
pub async fn delete_database(
    State(state): State<AppState>,
    Path(database_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if !state.databases.remove(&database_id) {
        return Err(ApiError::NotFound(format!(
            "database `{database_id}` was not found"
        )));
    }

    let snapshot = state.topology.snapshot();
    for shard in snapshot.ring.shards() {
        let client = state.clients.client_for(shard);
        if let Err(err) = client.delete_database(&database_id).await {
            warn!(
                database_id,
                shard_id = %shard.shard_id,
                error = %err,
                "database delete broadcast failed"
            );
        }
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Ask every readable shard to rebuild its index for a database.
pub async fn rebuild_database(
    State(state): State<AppState>,
    Path(database_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.databases.require(&database_id)?;

    let snapshot = state.topology.snapshot();
    for shard in snapshot.ring.shards() {
        if !shard.is_active_for_read() {
            continue;
        }
        let client = state.clients.client_for(shard);
        if let Err(err) = client.rebuild_database(&database_id).await {
            warn!(
                database_id,
                shard_id = %shard.shard_id,
                error = %err,
                "index rebuild failed"
            );
        }
    }

    Ok(StatusCode::OK)
}
