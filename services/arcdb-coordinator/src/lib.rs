//! ArcDB coordinator: the front-end of the cluster.
//!
//! Accepts vector reads, writes, and searches, routes them onto the
//! hash ring, and exposes the administrative surface for membership
//! changes and rebalancing.

pub mod bootstrap;
pub mod handlers;
pub mod registry;
pub mod state;

pub use bootstrap::{
    build_state, build_state_with_clients, load_seed_config, spawn_background_tasks,
};
pub use state::AppState;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

use arcdb_core::{ClusterConfig, CoordinatorConfig, CoreError, CoreResult};

/// Builds the coordinator's HTTP router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::liveness_handler))
        // Cluster administration
        .route("/api/v1/cluster/health", get(handlers::cluster_health))
        .route("/api/v1/cluster/shards", get(handlers::get_cluster_shards))
        .route("/api/v1/cluster/config", put(handlers::update_cluster_config))
        .route("/api/v1/cluster/rebalance", post(handlers::trigger_rebalance))
        // Database lifecycle
        .route(
            "/api/v1/databases",
            post(handlers::create_database).get(handlers::list_databases),
        )
        .route("/api/v1/databases/:db", delete(handlers::delete_database))
        .route("/api/v1/databases/:db/rebuild", post(handlers::rebuild_database))
        // Vector operations
        .route("/api/v1/vectors/:db", put(handlers::put_vector))
        .route(
            "/api/v1/vectors/:db/:id",
            get(handlers::get_vector).delete(handlers::delete_vector),
        )
        // Search
        .route("/api/v1/search/:db", post(handlers::search_vectors))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Loads configuration and runs the coordinator until shutdown.
pub async fn run_server() -> CoreResult<()> {
    let config = CoordinatorConfig::load()
        .map_err(|err| CoreError::invalid_argument(err.to_string()))?;
    let initial = bootstrap::load_seed_config()?;
    serve(config, initial).await
}

/// Runs the coordinator with explicit configuration and seed
/// membership.
pub async fn serve(config: CoordinatorConfig, initial: ClusterConfig) -> CoreResult<()> {
    let state = build_state(&config, initial);
    spawn_background_tasks(&state);

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(&config.server.listen_addr).await?;
    tracing::info!(addr = %config.server.listen_addr, "coordinator listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
