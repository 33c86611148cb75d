use thiserror::Error;

/// Canonical error type for coordinator operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No shards are configured on the hash ring.
    #[error("hash ring is empty")]
    RingEmpty,

    /// Target shard is unreachable and no replica fallback exists.
    #[error("shard `{shard_id}` is unavailable")]
    ShardUnavailable {
        /// Identifier of the unreachable shard.
        shard_id: String,
    },

    /// Vector dimension does not match the database dimension.
    #[error("dimension mismatch: database expects {expected}, vector has {actual}")]
    DimensionMismatch {
        /// Dimension the database was created with.
        expected: usize,
        /// Dimension of the offending vector.
        actual: usize,
    },

    /// Database id is not registered with the coordinator.
    #[error("unknown database `{database_id}`")]
    UnknownDatabase {
        /// Identifier of the missing database.
        database_id: String,
    },

    /// Entity was not found.
    #[error("{entity} `{id}` was not found")]
    NotFound {
        /// Entity type name (e.g. `"vector"`).
        entity: &'static str,
        /// Identifier of the missing entity.
        id: String,
    },

    /// Malformed wire frame: varint overflow, truncation, or bad UTF-8.
    #[error("protocol error: {message}")]
    Protocol {
        /// Human-readable description of the malformed frame.
        message: String,
    },

    /// Shard returned a non-retriable error.
    #[error("upstream failure on shard `{shard_id}`: {message}")]
    Upstream {
        /// Shard that produced the failure.
        shard_id: String,
        /// Upstream error details.
        message: String,
    },

    /// Invalid caller-supplied argument.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Human-readable validation failure.
        message: String,
    },

    /// I/O error occurred during network operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error occurred.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl CoreError {
    /// Creates a `ShardUnavailable` variant.
    #[must_use]
    pub fn shard_unavailable(shard_id: impl Into<String>) -> Self {
        Self::ShardUnavailable {
            shard_id: shard_id.into(),
        }
    }

    /// Creates an `UnknownDatabase` variant.
    #[must_use]
    pub fn unknown_database(database_id: impl Into<String>) -> Self {
        Self::UnknownDatabase {
            database_id: database_id.into(),
        }
    }

    /// Creates a `NotFound` variant.
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Creates a `Protocol` variant.
    #[must_use]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates an `Upstream` variant.
    #[must_use]
    pub fn upstream(shard_id: impl Into<String>, message: impl ToString) -> Self {
        Self::Upstream {
            shard_id: shard_id.into(),
            message: message.to_string(),
        }
    }

    /// Creates an `InvalidArgument` variant.
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Convenient result alias for coordinator operations.
pub type CoreResult<T> = Result<T, CoreError>;
