//! End-to-end tests for the coordinator API over the in-memory
//! storage backend.

use std::sync::Arc;

use arcdb_client::memory::InMemoryStorageBackend;
use arcdb_coordinator::{build_router, build_state_with_clients, AppState};
use arcdb_core::{ClusterConfig, CoordinatorConfig, ShardConfig, ShardStatus};
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use serde_json::{json, Value};
use tower::ServiceExt; // for `oneshot`

fn test_state() -> (AppState, Arc<InMemoryStorageBackend>) {
    let backend = Arc::new(InMemoryStorageBackend::new());
    let shards = vec![
        ShardConfig::new("s1", "http://s1:7451", 1 << 61, ShardStatus::Active).unwrap(),
        ShardConfig::new("s2", "http://s2:7451", 1 << 62, ShardStatus::Active).unwrap(),
    ];
    let state = build_state_with_clients(
        &CoordinatorConfig::default(),
        ClusterConfig::new(shards).unwrap(),
        backend.clone(),
    );
    state.monitor.record_probe("s1", true);
    state.monitor.record_probe("s2", true);
    (state, backend)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn create_database(app: &axum::Router, id: &str, dimension: usize) {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/databases",
            json!({"id": id, "name": format!("{id} database"), "dimension": dimension}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_liveness() {
    let (state, _backend) = test_state();
    let app = build_router(state);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_vector_round_trip() {
    let (state, _backend) = test_state();
    let app = build_router(state);
    create_database(&app, "db-1", 2).await;

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/api/v1/vectors/db-1",
            json!({"id": 42, "embedding": [1.0, 2.0], "original_data": "answer"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/vectors/db-1/42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["id"], 42);
    assert_eq!(body["original_data"], "answer");
}

#[tokio::test]
async fn test_dimension_mismatch_rejected() {
    let (state, _backend) = test_state();
    let app = build_router(state);
    create_database(&app, "db-1", 3).await;

    let response = app
        .oneshot(json_request(
            "PUT",
            "/api/v1/vectors/db-1",
            json!({"id": 1, "embedding": [1.0, 2.0]}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_database_rejected() {
    let (state, _backend) = test_state();
    let app = build_router(state);

    let response = app
        .oneshot(json_request(
            "PUT",
            "/api/v1/vectors/nope",
            json!({"id": 1, "embedding": [1.0]}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_duplicate_database_conflicts() {
    let (state, _backend) = test_state();
    let app = build_router(state);
    create_database(&app, "db-1", 2).await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/v1/databases",
            json!({"id": "db-1", "name": "again", "dimension": 2}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_delete_vector_then_not_found() {
    let (state, _backend) = test_state();
    let app = build_router(state);
    create_database(&app, "db-1", 2).await;

    app.clone()
        .oneshot(json_request(
            "PUT",
            "/api/v1/vectors/db-1",
            json!({"id": 7, "embedding": [0.5, 0.5]}),
        ))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/v1/vectors/db-1/7")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/v1/vectors/db-1/7")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_search_returns_nearest_without_missing_partitions() {
    let (state, _backend) = test_state();
    let app = build_router(state);
    create_database(&app, "db-1", 2).await;

    for id in 0..10u64 {
        app.clone()
            .oneshot(json_request(
                "PUT",
                "/api/v1/vectors/db-1",
                json!({"id": id, "embedding": [id as f32, 0.0]}),
            ))
            .await
            .unwrap();
    }

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/v1/search/db-1",
            json!({"query": [0.0, 0.0], "k": 3}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["missing_partitions"].as_array().unwrap().len(), 0);
    let ids: Vec<u64> = body["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["entry"]["id"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, vec![0, 1, 2]);
}

#[tokio::test]
async fn test_search_with_zero_k_rejected() {
    let (state, _backend) = test_state();
    let app = build_router(state);
    create_database(&app, "db-1", 2).await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/v1/search/db-1",
            json!({"query": [0.0, 0.0], "k": 0}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cluster_surface() {
    let (state, _backend) = test_state();
    let app = build_router(state);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/cluster/shards")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let shards = body_json(response).await;
    assert_eq!(shards.as_array().unwrap().len(), 2);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/cluster/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let health = body_json(response).await;
    assert_eq!(health["total"], 2);
    assert_eq!(health["available"], 2);

    // Grow the ring; the repository reflects the change immediately.
    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/api/v1/cluster/config",
            json!([
                {"shard_id": "s1", "base_url": "http://s1:7451", "hash_key": 1_i64 << 61, "status": "ACTIVE"},
                {"shard_id": "s2", "base_url": "http://s2:7451", "hash_key": 1_i64 << 62, "status": "ACTIVE"},
                {"shard_id": "s3", "base_url": "http://s3:7451", "hash_key": 3_i64 << 61, "status": "NEW"}
            ]),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/cluster/shards")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let shards = body_json(response).await;
    assert_eq!(shards.as_array().unwrap().len(), 3);
}
