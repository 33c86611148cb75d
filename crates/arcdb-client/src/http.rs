//! HTTP implementation of the storage-node RPC surface.
//!
//! JSON bodies everywhere except search responses, which arrive as the
//! binary frame decoded by `arcdb-wire`. One pooled `reqwest` client is
//! shared by every shard client the factory hands out.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::StatusCode;
use serde::Serialize;

use arcdb_core::{
    CoreError, CoreResult, DatabaseInfo, SearchQuery, SearchResult, ShardInfo, VectorEntry,
};
use arcdb_wire::decode_search_results;

use crate::{StorageClient, StorageClientFactory};

/// Replica write payload: the entry plus the shard whose primary data
/// it copies.
#[derive(Debug, Serialize)]
struct ReplicaPayload<'a> {
    entry: &'a VectorEntry,
    source_shard_id: &'a str,
}

/// Client for one storage node.
pub struct HttpStorageClient {
    shard_id: String,
    base_url: String,
    http: reqwest::Client,
    call_timeout: Duration,
    batch_timeout: Duration,
}

impl HttpStorageClient {
    /// Creates a client bound to one shard, reusing a pooled HTTP
    /// client.
    #[must_use]
    pub fn new(
        shard: &ShardInfo,
        http: reqwest::Client,
        call_timeout: Duration,
        batch_timeout: Duration,
    ) -> Self {
        Self {
            shard_id: shard.shard_id.clone(),
            base_url: shard.base_url.trim_end_matches('/').to_string(),
            http,
            call_timeout,
            batch_timeout,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1/storage/{path}", self.base_url)
    }

    fn upstream(&self, err: impl ToString) -> CoreError {
        CoreError::upstream(&self.shard_id, err)
    }

    /// Maps a non-2xx status to `Upstream`, passing 404 through for the
    /// callers that treat it as absence.
    async fn expect_success(&self, response: reqwest::Response) -> CoreResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(self.upstream(format!("HTTP {status}: {body}")))
    }
}

#[async_trait]
impl StorageClient for HttpStorageClient {
    fn shard_id(&self) -> &str {
        &self.shard_id
    }

    async fn put_vector(&self, entry: &VectorEntry) -> CoreResult<()> {
        let response = self
            .http
            .put(self.url(&format!("vectors/{}", entry.database_id)))
            .timeout(self.call_timeout)
            .json(entry)
            .send()
            .await
            .map_err(|e| self.upstream(e))?;
        self.expect_success(response).await?;
        Ok(())
    }

    async fn get_vector(
        &self,
        vector_id: u64,
        database_id: &str,
    ) -> CoreResult<Option<VectorEntry>> {
        let response = self
            .http
            .get(self.url(&format!("vectors/{database_id}/{vector_id}")))
            .timeout(self.call_timeout)
            .send()
            .await
            .map_err(|e| self.upstream(e))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = self.expect_success(response).await?;
        let entry = response.json().await.map_err(|e| self.upstream(e))?;
        Ok(Some(entry))
    }

    async fn delete_vector(&self, vector_id: u64, database_id: &str) -> CoreResult<bool> {
        let response = self
            .http
            .delete(self.url(&format!("vectors/{database_id}/{vector_id}")))
            .timeout(self.call_timeout)
            .send()
            .await
            .map_err(|e| self.upstream(e))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        self.expect_success(response).await?;
        Ok(true)
    }

    async fn search(&self, query: &SearchQuery) -> CoreResult<Vec<SearchResult>> {
        let response = self
            .http
            .post(self.url("search"))
            .timeout(self.call_timeout)
            .json(query)
            .send()
            .await
            .map_err(|e| self.upstream(e))?;
        let response = self.expect_success(response).await?;
        let frame = response.bytes().await.map_err(|e| self.upstream(e))?;
        decode_search_results(&frame)
    }

    async fn create_database(&self, info: &DatabaseInfo) -> CoreResult<()> {
        let response = self
            .http
            .post(self.url("databases"))
            .timeout(self.call_timeout)
            .json(info)
            .send()
            .await
            .map_err(|e| self.upstream(e))?;
        self.expect_success(response).await?;
        Ok(())
    }

    async fn delete_database(&self, database_id: &str) -> CoreResult<bool> {
        let response = self
            .http
            .delete(self.url(&format!("databases/{database_id}")))
            .timeout(self.call_timeout)
            .send()
            .await
            .map_err(|e| self.upstream(e))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        self.expect_success(response).await?;
        Ok(true)
    }

    async fn rebuild_database(&self, database_id: &str) -> CoreResult<()> {
        let response = self
            .http
            .post(self.url(&format!("databases/{database_id}/rebuild")))
            .timeout(self.batch_timeout)
            .send()
            .await
            .map_err(|e| self.upstream(e))?;
        self.expect_success(response).await?;
        Ok(())
    }

    async fn scan_range(
        &self,
        database_id: &str,
        from: u64,
        to: u64,
        limit: usize,
    ) -> CoreResult<Vec<VectorEntry>> {
        let response = self
            .http
            .get(self.url(&format!("vectors/{database_id}/scanRange")))
            .query(&[
                ("from", from.to_string()),
                ("to", to.to_string()),
                ("limit", limit.to_string()),
            ])
            .timeout(self.batch_timeout)
            .send()
            .await
            .map_err(|e| self.upstream(e))?;
        let response = self.expect_success(response).await?;
        response.json().await.map_err(|e| self.upstream(e))
    }

    async fn put_batch(&self, database_id: &str, entries: &[VectorEntry]) -> CoreResult<()> {
        let response = self
            .http
            .put(self.url(&format!("vectors/{database_id}/batch")))
            .timeout(self.batch_timeout)
            .json(entries)
            .send()
            .await
            .map_err(|e| self.upstream(e))?;
        self.expect_success(response).await?;
        Ok(())
    }

    async fn delete_batch(&self, database_id: &str, vector_ids: &[u64]) -> CoreResult<()> {
        let response = self
            .http
            .post(self.url(&format!("vectors/{database_id}/batch/delete")))
            .timeout(self.batch_timeout)
            .json(vector_ids)
            .send()
            .await
            .map_err(|e| self.upstream(e))?;
        self.expect_success(response).await?;
        Ok(())
    }

    async fn add_vector_replica(
        &self,
        entry: &VectorEntry,
        source_shard_id: &str,
    ) -> CoreResult<()> {
        let response = self
            .http
            .put(self.url("replicas"))
            .timeout(self.call_timeout)
            .json(&ReplicaPayload {
                entry,
                source_shard_id,
            })
            .send()
            .await
            .map_err(|e| self.upstream(e))?;
        self.expect_success(response).await?;
        Ok(())
    }

    async fn get_vector_replica(
        &self,
        vector_id: u64,
        database_id: &str,
        source_shard_id: &str,
    ) -> CoreResult<Option<VectorEntry>> {
        let response = self
            .http
            .get(self.url(&format!("replicas/{database_id}/{vector_id}")))
            .query(&[("sourceShardId", source_shard_id)])
            .timeout(self.call_timeout)
            .send()
            .await
            .map_err(|e| self.upstream(e))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = self.expect_success(response).await?;
        let entry = response.json().await.map_err(|e| self.upstream(e))?;
        Ok(Some(entry))
    }

    async fn delete_vector_replica(
        &self,
        vector_id: u64,
        database_id: &str,
        source_shard_id: &str,
    ) -> CoreResult<()> {
        let response = self
            .http
            .delete(self.url(&format!("replicas/{database_id}/{vector_id}")))
            .query(&[("sourceShardId", source_shard_id)])
            .timeout(self.call_timeout)
            .send()
            .await
            .map_err(|e| self.upstream(e))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        self.expect_success(response).await?;
        Ok(())
    }
}

/// Factory caching one `HttpStorageClient` per shard.
pub struct HttpStorageClientFactory {
    http: reqwest::Client,
    call_timeout: Duration,
    batch_timeout: Duration,
    clients: RwLock<HashMap<String, Arc<HttpStorageClient>>>,
}

impl HttpStorageClientFactory {
    /// Creates a factory with the given per-call timeouts.
    #[must_use]
    pub fn new(call_timeout: Duration, batch_timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            call_timeout,
            batch_timeout,
            clients: RwLock::new(HashMap::new()),
        }
    }
}

impl StorageClientFactory for HttpStorageClientFactory {
    fn client_for(&self, shard: &ShardInfo) -> Arc<dyn StorageClient> {
        {
            let clients = self.clients.read();
            if let Some(client) = clients.get(&shard.shard_id) {
                // Reuse unless the shard moved to a different node.
                if client.base_url == shard.base_url.trim_end_matches('/') {
                    return client.clone();
                }
            }
        }
        let client = Arc::new(HttpStorageClient::new(
            shard,
            self.http.clone(),
            self.call_timeout,
            self.batch_timeout,
        ));
        self.clients
            .write()
            .insert(shard.shard_id.clone(), client.clone());
        client
    }
}
