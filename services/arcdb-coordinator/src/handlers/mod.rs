//! HTTP handlers for the coordinator API.

pub mod cluster;
pub mod databases;
pub mod health;
pub mod search;
pub mod vectors;

pub use cluster::{get_cluster_shards, trigger_rebalance, update_cluster_config};
pub use databases::{create_database, delete_database, list_databases, rebuild_database};
pub use health::{cluster_health, liveness_handler};
pub use search::search_vectors;
pub use vectors::{delete_vector, get_vector, put_vector};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use arcdb_core::CoreError;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// API-level error mapped onto HTTP status codes.
#[derive(Debug)]
pub enum ApiError {
    Validation(String),
    Conflict(String),
    NotFound(String),
    Unavailable(String),
    Upstream(String),
    Internal(CoreError),
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidArgument { .. } | CoreError::DimensionMismatch { .. } => {
                ApiError::Validation(err.to_string())
            }
            CoreError::UnknownDatabase { .. } | CoreError::NotFound { .. } => {
                ApiError::NotFound(err.to_string())
            }
            CoreError::RingEmpty | CoreError::ShardUnavailable { .. } => {
                ApiError::Unavailable(err.to_string())
            }
            CoreError::Protocol { .. } | CoreError::Upstream { .. } => {
                ApiError::Upstream(err.to_string())
            }
            other => ApiError::Internal(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            ApiError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg),
            ApiError::Internal(err) => {
                error!("internal error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("internal error: {err}"),
                )
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
