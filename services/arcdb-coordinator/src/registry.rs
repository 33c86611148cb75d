//! Database catalog kept by the coordinator.
//!
//! The coordinator validates every request against this registry
//! before routing: unknown databases and dimension mismatches are
//! rejected at the edge instead of travelling to the shards.

use std::collections::HashMap;

use parking_lot::RwLock;

use arcdb_core::{CoreError, CoreResult, DatabaseInfo};

/// In-memory catalog of registered databases.
#[derive(Default)]
pub struct DatabaseRegistry {
    databases: RwLock<HashMap<String, DatabaseInfo>>,
}

impl DatabaseRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a database; returns false when the id is taken.
    pub fn register(&self, info: DatabaseInfo) -> bool {
        let mut databases = self.databases.write();
        if databases.contains_key(&info.id) {
            return false;
        }
        databases.insert(info.id.clone(), info);
        true
    }

    /// Looks up a database.
    #[must_use]
    pub fn get(&self, database_id: &str) -> Option<DatabaseInfo> {
        self.databases.read().get(database_id).cloned()
    }

    /// Looks up a database, failing with `UnknownDatabase`.
    pub fn require(&self, database_id: &str) -> CoreResult<DatabaseInfo> {
        self.get(database_id)
            .ok_or_else(|| CoreError::unknown_database(database_id))
    }

    /// Removes a database; returns whether it was registered.
    pub fn remove(&self, database_id: &str) -> bool {
        self.databases.write().remove(database_id).is_some()
    }

    /// All registered databases, ordered by id.
    #[must_use]
    pub fn list(&self) -> Vec<DatabaseInfo> {
        let mut databases: Vec<DatabaseInfo> = self.databases.read().values().cloned().collect();
        databases.sort_by(|a, b| a.id.cmp(&b.id));
        databases
    }

    /// Validates a vector's dimension against its database.
    pub fn check_dimension(&self, database_id: &str, actual: usize) -> CoreResult<()> {
        let info = self.require(database_id)?;
        if info.dimension != actual {
            return Err(CoreError::DimensionMismatch {
                expected: info.dimension,
                actual,
            });
        }
        Ok(())
    }
}
