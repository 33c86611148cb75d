//! In-memory storage node for tests and embedded setups.
//!
//! Behaves like a real node over the full RPC surface, including
//! replica bookkeeping and id-ordered range scans, so router and
//! rebalancer scenarios can run without any network.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use arcdb_core::{
    CoreError, CoreResult, DatabaseInfo, SearchQuery, SearchResult, ShardInfo, VectorEntry,
};

use crate::{StorageClient, StorageClientFactory};

#[derive(Default)]
struct NodeState {
    /// database id → vectors ordered by id.
    vectors: HashMap<String, BTreeMap<u64, VectorEntry>>,
    /// (source shard, database id) → replicas ordered by id.
    replicas: HashMap<(String, String), BTreeMap<u64, VectorEntry>>,
    databases: HashMap<String, DatabaseInfo>,
}

/// One fake storage node.
pub struct InMemoryStorageClient {
    shard_id: String,
    state: Mutex<NodeState>,
    failing: AtomicBool,
}

impl InMemoryStorageClient {
    /// Creates an empty node for `shard_id`.
    #[must_use]
    pub fn new(shard_id: impl Into<String>) -> Self {
        Self {
            shard_id: shard_id.into(),
            state: Mutex::new(NodeState::default()),
            failing: AtomicBool::new(false),
        }
    }

    /// Makes every subsequent call fail with `Upstream`, simulating an
    /// unreachable node.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check_reachable(&self) -> CoreResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(CoreError::upstream(&self.shard_id, "connection refused"))
        } else {
            Ok(())
        }
    }

    /// Primary vector ids currently stored for a database, ascending.
    #[must_use]
    pub fn primary_ids(&self, database_id: &str) -> Vec<u64> {
        self.state
            .lock()
            .vectors
            .get(database_id)
            .map(|m| m.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Replica vector ids held for `source_shard_id`, ascending.
    #[must_use]
    pub fn replica_ids(&self, database_id: &str, source_shard_id: &str) -> Vec<u64> {
        self.state
            .lock()
            .replicas
            .get(&(source_shard_id.to_string(), database_id.to_string()))
            .map(|m| m.keys().copied().collect())
            .unwrap_or_default()
    }

    fn euclidean(a: &[f32], b: &[f32]) -> f64 {
        a.iter()
            .zip(b.iter())
            .map(|(x, y)| (f64::from(*x) - f64::from(*y)).powi(2))
            .sum::<f64>()
            .sqrt()
    }

    fn rank(query: &SearchQuery, entries: Vec<VectorEntry>) -> Vec<SearchResult> {
        let mut results: Vec<SearchResult> = entries
            .into_iter()
            .filter(|e| e.dimension() == query.query.len())
            .map(|entry| {
                let distance = Self::euclidean(&query.query, &entry.embedding);
                SearchResult::new(entry, distance, 1.0 / (1.0 + distance))
            })
            .collect();
        results.sort_by(|a, b| a.ranking_cmp(b));
        results.truncate(query.k);
        results
    }
}

#[async_trait]
impl StorageClient for InMemoryStorageClient {
    fn shard_id(&self) -> &str {
        &self.shard_id
    }

    async fn put_vector(&self, entry: &VectorEntry) -> CoreResult<()> {
        self.check_reachable()?;
        self.state
            .lock()
            .vectors
            .entry(entry.database_id.clone())
            .or_default()
            .insert(entry.id, entry.clone());
        Ok(())
    }

    async fn get_vector(
        &self,
        vector_id: u64,
        database_id: &str,
    ) -> CoreResult<Option<VectorEntry>> {
        self.check_reachable()?;
        Ok(self
            .state
            .lock()
            .vectors
            .get(database_id)
            .and_then(|m| m.get(&vector_id))
            .cloned())
    }

    async fn delete_vector(&self, vector_id: u64, database_id: &str) -> CoreResult<bool> {
        self.check_reachable()?;
        Ok(self
            .state
            .lock()
            .vectors
            .get_mut(database_id)
            .and_then(|m| m.remove(&vector_id))
            .is_some())
    }

    async fn search(&self, query: &SearchQuery) -> CoreResult<Vec<SearchResult>> {
        self.check_reachable()?;
        let entries: Vec<VectorEntry> = {
            let state = self.state.lock();
            match &query.replica_source_shard_id {
                Some(source) => state
                    .replicas
                    .get(&(source.clone(), query.database_id.clone()))
                    .map(|m| m.values().cloned().collect())
                    .unwrap_or_default(),
                None => state
                    .vectors
                    .get(&query.database_id)
                    .map(|m| m.values().cloned().collect())
                    .unwrap_or_default(),
            }
        };
        Ok(Self::rank(query, entries))
    }

    async fn create_database(&self, info: &DatabaseInfo) -> CoreResult<()> {
        self.check_reachable()?;
        self.state
            .lock()
            .databases
            .insert(info.id.clone(), info.clone());
        Ok(())
    }

    async fn delete_database(&self, database_id: &str) -> CoreResult<bool> {
        self.check_reachable()?;
        let mut state = self.state.lock();
        state.vectors.remove(database_id);
        state.replicas.retain(|(_, db), _| db != database_id);
        Ok(state.databases.remove(database_id).is_some())
    }

    async fn rebuild_database(&self, database_id: &str) -> CoreResult<()> {
        self.check_reachable()?;
        let state = self.state.lock();
        if state.databases.contains_key(database_id) {
            Ok(())
        } else {
            Err(CoreError::unknown_database(database_id))
        }
    }

    async fn scan_range(
        &self,
        database_id: &str,
        from: u64,
        to: u64,
        limit: usize,
    ) -> CoreResult<Vec<VectorEntry>> {
        self.check_reachable()?;
        Ok(self
            .state
            .lock()
            .vectors
            .get(database_id)
            .map(|m| {
                m.range(from..=to)
                    .take(limit)
                    .map(|(_, entry)| entry.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn put_batch(&self, database_id: &str, entries: &[VectorEntry]) -> CoreResult<()> {
        self.check_reachable()?;
        let mut state = self.state.lock();
        let vectors = state.vectors.entry(database_id.to_string()).or_default();
        for entry in entries {
            vectors.insert(entry.id, entry.clone());
        }
        Ok(())
    }

    async fn delete_batch(&self, database_id: &str, vector_ids: &[u64]) -> CoreResult<()> {
        self.check_reachable()?;
        let mut state = self.state.lock();
        if let Some(vectors) = state.vectors.get_mut(database_id) {
            for id in vector_ids {
                vectors.remove(id);
            }
        }
        Ok(())
    }

    async fn add_vector_replica(
        &self,
        entry: &VectorEntry,
        source_shard_id: &str,
    ) -> CoreResult<()> {
        self.check_reachable()?;
        self.state
            .lock()
            .replicas
            .entry((source_shard_id.to_string(), entry.database_id.clone()))
            .or_default()
            .insert(entry.id, entry.clone());
        Ok(())
    }

    async fn get_vector_replica(
        &self,
        vector_id: u64,
        database_id: &str,
        source_shard_id: &str,
    ) -> CoreResult<Option<VectorEntry>> {
        self.check_reachable()?;
        Ok(self
            .state
            .lock()
            .replicas
            .get(&(source_shard_id.to_string(), database_id.to_string()))
            .and_then(|m| m.get(&vector_id))
            .cloned())
    }

    async fn delete_vector_replica(
        &self,
        vector_id: u64,
        database_id: &str,
        source_shard_id: &str,
    ) -> CoreResult<()> {
        self.check_reachable()?;
        if let Some(replicas) = self
            .state
            .lock()
            .replicas
            .get_mut(&(source_shard_id.to_string(), database_id.to_string()))
        {
            replicas.remove(&vector_id);
        }
        Ok(())
    }
}

/// Factory over a fixed set of in-memory nodes, one per shard id.
#[derive(Default)]
pub struct InMemoryStorageBackend {
    nodes: Mutex<HashMap<String, Arc<InMemoryStorageClient>>>,
}

impl InMemoryStorageBackend {
    /// Creates an empty backend; nodes appear on first use.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the node for `shard_id`, creating it if needed.
    #[must_use]
    pub fn node(&self, shard_id: &str) -> Arc<InMemoryStorageClient> {
        self.nodes
            .lock()
            .entry(shard_id.to_string())
            .or_insert_with(|| Arc::new(InMemoryStorageClient::new(shard_id)))
            .clone()
    }
}

impl StorageClientFactory for InMemoryStorageBackend {
    fn client_for(&self, shard: &ShardInfo) -> Arc<dyn StorageClient> {
        self.node(&shard.shard_id)
    }
}
