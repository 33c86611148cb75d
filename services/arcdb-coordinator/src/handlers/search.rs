//! Fan-out search handler.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use arcdb_core::{CoreError, SearchResult};

use crate::handlers::ApiError;
use crate::state::AppState;

/// Top-k search request.
#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: Vec<f32>,
    pub k: usize,
}

/// Merged search response. `missing_partitions` names the shards whose
/// partition could not be served; an empty list means the answer covers
/// the whole ring.
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    pub missing_partitions: Vec<String>,
}

/// Run a k-NN search across all readable partitions.
pub async fn search_vectors(
    State(state): State<AppState>,
    Path(database_id): Path<String>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    if req.k == 0 {
        return Err(CoreError::invalid_argument("k must be positive").into());
    }
    state
        .databases
        .check_dimension(&database_id, req.query.len())?;

    let outcome = state.router.search(&database_id, req.query, req.k).await?;
    if outcome.is_partial() {
        info!(
            database_id,
            missing = ?outcome.missing_partitions,
            "serving partial search result"
        );
    }

    Ok(Json(SearchResponse {
        results: outcome.results,
        missing_partitions: outcome.missing_partitions,
    }))
}
