//! Per-shard storage-node clients.
//!
//! The coordinator talks to storage nodes through the [`StorageClient`]
//! trait; [`http::HttpStorageClient`] is the production implementation,
//! [`memory::InMemoryStorageClient`] backs tests and embedded setups.

pub mod http;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;

use arcdb_core::{CoreResult, DatabaseInfo, SearchQuery, SearchResult, ShardInfo, VectorEntry};

/// RPC surface of a single storage node.
#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Shard this client is bound to.
    fn shard_id(&self) -> &str;

    /// Stores a vector as primary data.
    async fn put_vector(&self, entry: &VectorEntry) -> CoreResult<()>;

    /// Fetches a primary vector; `None` when the node does not hold it.
    async fn get_vector(
        &self,
        vector_id: u64,
        database_id: &str,
    ) -> CoreResult<Option<VectorEntry>>;

    /// Deletes a primary vector; returns whether it was present.
    async fn delete_vector(&self, vector_id: u64, database_id: &str) -> CoreResult<bool>;

    /// Runs a k-NN query on the node; results are ordered by distance
    /// ascending.
    async fn search(&self, query: &SearchQuery) -> CoreResult<Vec<SearchResult>>;

    /// Registers a database on the node.
    async fn create_database(&self, info: &DatabaseInfo) -> CoreResult<()>;

    /// Drops a database; returns whether it was present.
    async fn delete_database(&self, database_id: &str) -> CoreResult<bool>;

    /// Rebuilds the node's index for a database.
    async fn rebuild_database(&self, database_id: &str) -> CoreResult<()>;

    /// Returns up to `limit` primary vectors with `from <= id <= to`,
    /// ordered by id ascending.
    async fn scan_range(
        &self,
        database_id: &str,
        from: u64,
        to: u64,
        limit: usize,
    ) -> CoreResult<Vec<VectorEntry>>;

    /// Upserts a batch of primary vectors, keyed by `(database, id)`.
    async fn put_batch(&self, database_id: &str, entries: &[VectorEntry]) -> CoreResult<()>;

    /// Deletes a batch of primary vectors.
    async fn delete_batch(&self, database_id: &str, vector_ids: &[u64]) -> CoreResult<()>;

    /// Stores a replica of a vector whose primary lives on
    /// `source_shard_id`.
    async fn add_vector_replica(
        &self,
        entry: &VectorEntry,
        source_shard_id: &str,
    ) -> CoreResult<()>;

    /// Fetches a replica held for `source_shard_id`.
    async fn get_vector_replica(
        &self,
        vector_id: u64,
        database_id: &str,
        source_shard_id: &str,
    ) -> CoreResult<Option<VectorEntry>>;

    /// Deletes a replica held for `source_shard_id`.
    async fn delete_vector_replica(
        &self,
        vector_id: u64,
        database_id: &str,
        source_shard_id: &str,
    ) -> CoreResult<()>;
}

/// Hands out a client for any shard in the cluster.
///
/// Implementations cache clients so that routing and rebalancing reuse
/// connections across requests.
pub trait StorageClientFactory: Send + Sync {
    /// Returns the client bound to `shard`.
    fn client_for(&self, shard: &ShardInfo) -> Arc<dyn StorageClient>;
}
