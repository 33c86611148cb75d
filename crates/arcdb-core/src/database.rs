use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Metadata describing a named vector database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseInfo {
    /// Unique database identifier.
    pub id: String,

    /// Human-readable name.
    pub name: String,

    /// Fixed embedding dimension; all vectors in the database match it.
    pub dimension: usize,
}

impl DatabaseInfo {
    /// Creates database metadata after validating its fields.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a blank id or name, or a zero
    /// dimension.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        dimension: usize,
    ) -> CoreResult<Self> {
        let id = id.into();
        let name = name.into();
        if id.trim().is_empty() {
            return Err(CoreError::invalid_argument("database id must not be blank"));
        }
        if name.trim().is_empty() {
            return Err(CoreError::invalid_argument(
                "database name must not be blank",
            ));
        }
        if dimension == 0 {
            return Err(CoreError::invalid_argument(
                "database dimension must be positive",
            ));
        }
        Ok(Self {
            id,
            name,
            dimension,
        })
    }
}
