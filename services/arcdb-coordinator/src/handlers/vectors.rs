//! Vector read/write handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use arcdb_core::VectorEntry;

use crate::handlers::ApiError;
use crate::state::AppState;

/// Request to store a vector.
#[derive(Debug, Deserialize)]
pub struct PutVectorRequest {
    pub id: u64,
    pub embedding: Vec<f32>,
    #[serde(default)]
    pub original_data: String,
}

/// Response for a stored vector.
#[derive(Debug, Serialize)]
pub struct PutVectorResponse {
    pub id: u64,
}

/// Store a vector in a database.
pub async fn put_vector(
    State(state): State<AppState>,
    Path(database_id): Path<String>,
    Json(req): Json<PutVectorRequest>,
) -> Result<(StatusCode, Json<PutVectorResponse>), ApiError> {
    state
        .databases
        .check_dimension(&database_id, req.embedding.len())?;

    let entry = VectorEntry::new(req.id, req.embedding, &database_id, req.original_data);
    debug!(vector_id = entry.id, database_id, "routing vector write");
    state.router.put_vector(entry).await?;

    Ok((StatusCode::CREATED, Json(PutVectorResponse { id: req.id })))
}

/// Fetch a vector by id.
pub async fn get_vector(
    State(state): State<AppState>,
    Path((database_id, vector_id)): Path<(String, u64)>,
) -> Result<Json<VectorEntry>, ApiError> {
    state.databases.require(&database_id)?;
    let entry = state.router.get_vector(vector_id, &database_id).await?;
    Ok(Json(entry))
}

/// Delete a vector by id.
pub async fn delete_vector(
    State(state): State<AppState>,
    Path((database_id, vector_id)): Path<(String, u64)>,
) -> Result<StatusCode, ApiError> {
    state.databases.require(&database_id)?;
    if state.router.delete_vector(vector_id, &database_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!(
            "vector `{vector_id}` was not found"
        )))
    }
}
