//! Core domain types and contracts for the ArcDB coordinator.

pub mod config;
pub mod database;
pub mod error;
pub mod shard;
pub mod traits;
pub mod vector;

pub use config::{
    CoordinatorConfig, HealthConfig, RebalancerConfig, ServerConfig, ShardCallConfig,
};
pub use database::DatabaseInfo;
pub use error::{CoreError, CoreResult};
pub use shard::{ClusterConfig, ShardConfig, ShardInfo, ShardStatus};
pub use traits::{KeyValueStorage, VectorIndex};
pub use vector::{SearchQuery, SearchResult, VectorEntry};
