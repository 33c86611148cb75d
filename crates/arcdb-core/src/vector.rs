//! Vector domain types shared between the coordinator and storage nodes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A vector stored in a named database.
///
/// Entries are immutable once written; `id` is unique within a database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorEntry {
    /// Unique identifier within the database.
    pub id: u64,

    /// Dense embedding; its length must match the database dimension.
    pub embedding: Vec<f32>,

    /// Database the entry belongs to.
    pub database_id: String,

    /// Original payload the embedding was derived from.
    pub original_data: String,

    /// Timestamp when the entry was written.
    pub created_at: DateTime<Utc>,
}

impl VectorEntry {
    /// Creates a new entry stamped with the current time.
    #[must_use]
    pub fn new(
        id: u64,
        embedding: Vec<f32>,
        database_id: impl Into<String>,
        original_data: impl Into<String>,
    ) -> Self {
        Self {
            id,
            embedding,
            database_id: database_id.into(),
            original_data: original_data.into(),
            created_at: Utc::now(),
        }
    }

    /// Returns the dimension of the embedding.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.embedding.len()
    }
}

/// A single k-NN match returned from a shard.
///
/// Transmitted lists are ordered by `distance` ascending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// The matched entry.
    pub entry: VectorEntry,

    /// Distance between the query and the entry (lower is closer).
    pub distance: f64,

    /// Metric-dependent similarity score.
    pub similarity: f64,
}

impl SearchResult {
    /// Creates a new search result.
    #[must_use]
    pub fn new(entry: VectorEntry, distance: f64, similarity: f64) -> Self {
        Self {
            entry,
            distance,
            similarity,
        }
    }

    /// Ranking order for merged result lists: distance ascending,
    /// ties broken by the smaller vector id.
    #[must_use]
    pub fn ranking_cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.distance
            .partial_cmp(&other.distance)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| self.entry.id.cmp(&other.entry.id))
    }
}

/// A k-NN query fanned out to storage nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Database to search.
    pub database_id: String,

    /// Query embedding; must match the database dimension.
    pub query: Vec<f32>,

    /// Number of nearest neighbors to return.
    pub k: usize,

    /// When set, the node serves the query from the replicas it holds
    /// for this source shard instead of its primary data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replica_source_shard_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cmp::Ordering;

    fn entry(id: u64) -> VectorEntry {
        VectorEntry::new(id, vec![0.0, 1.0], "db", "payload")
    }

    #[test]
    fn test_entry_dimension() {
        assert_eq!(entry(1).dimension(), 2);
    }

    #[test]
    fn test_ranking_orders_by_distance() {
        let near = SearchResult::new(entry(9), 0.5, 0.9);
        let far = SearchResult::new(entry(1), 2.0, 0.1);
        assert_eq!(near.ranking_cmp(&far), Ordering::Less);
    }

    #[test]
    fn test_ranking_ties_break_on_smaller_id() {
        let a = SearchResult::new(entry(3), 1.0, 0.5);
        let b = SearchResult::new(entry(7), 1.0, 0.5);
        assert_eq!(a.ranking_cmp(&b), Ordering::Less);
        assert_eq!(b.ranking_cmp(&a), Ordering::Greater);
    }
}
