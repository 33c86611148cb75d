//! Contracts implemented by the storage nodes.
//!
//! The coordinator never talks to an index or key-value store directly;
//! these traits pin down what a storage node must provide so that node
//! implementations stay interchangeable.

use std::path::Path;

use async_trait::async_trait;

use crate::error::CoreResult;
use crate::vector::{SearchResult, VectorEntry};

/// Approximate-nearest-neighbor index kept per database on each node.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Builds (or rebuilds) the index for a database from stored vectors.
    async fn build(&self, database_id: &str) -> CoreResult<()>;

    /// Adds a single entry to the index.
    async fn add(&self, entry: &VectorEntry, database_id: &str) -> CoreResult<()>;

    /// Removes an entry; returns whether it was present.
    async fn remove(&self, vector_id: u64, database_id: &str) -> CoreResult<bool>;

    /// Searches for the k nearest neighbors, ordered by distance
    /// ascending.
    async fn search(&self, query: &[f32], k: usize, database_id: &str)
        -> CoreResult<Vec<SearchResult>>;

    /// Persists the index to disk.
    async fn save(&self, path: &Path, database_id: &str) -> CoreResult<()>;

    /// Loads a previously saved index.
    async fn load(&self, path: &Path, database_id: &str) -> CoreResult<()>;

    /// Number of entries currently indexed for a database.
    async fn size(&self, database_id: &str) -> CoreResult<usize>;

    /// Drops all entries of one database.
    async fn clear(&self, database_id: &str) -> CoreResult<()>;

    /// Drops all entries of every database.
    async fn clear_all(&self) -> CoreResult<()>;

    /// Whether a usable index exists for the database.
    async fn is_built(&self, database_id: &str) -> CoreResult<bool>;

    /// Fixes the embedding dimension for subsequent inserts.
    fn set_dimension(&self, dimension: usize);
}

/// Durable key-value store backing the index on each node.
#[async_trait]
pub trait KeyValueStorage: Send + Sync {
    /// Stores a vector entry.
    async fn put_vector(&self, entry: &VectorEntry) -> CoreResult<()>;

    /// Fetches a vector entry.
    async fn get_vector(&self, vector_id: u64, database_id: &str)
        -> CoreResult<Option<VectorEntry>>;

    /// Deletes a vector entry; returns whether it was present.
    async fn delete_vector(&self, vector_id: u64, database_id: &str) -> CoreResult<bool>;

    /// Returns all vectors of a database ordered by id ascending.
    async fn get_all_vectors(&self, database_id: &str) -> CoreResult<Vec<VectorEntry>>;

    /// Stores database metadata.
    async fn put_database_info(&self, info: &crate::database::DatabaseInfo) -> CoreResult<()>;

    /// Fetches database metadata.
    async fn get_database_info(
        &self,
        database_id: &str,
    ) -> CoreResult<Option<crate::database::DatabaseInfo>>;

    /// Deletes database metadata; returns whether it was present.
    async fn delete_database_info(&self, database_id: &str) -> CoreResult<bool>;

    /// Returns metadata for every database on the node.
    async fn get_all_databases(&self) -> CoreResult<Vec<crate::database::DatabaseInfo>>;
}
