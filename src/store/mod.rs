pub mod memory;
pub mod schema;
pub mod sqlite;

use crate::model::Election;
use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("election not found: {0}")]
    NotFound(String),
    #[error("election already exists: {0}")]
    AlreadyExists(String),
    #[error("SQLite error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("schema integrity error: {0}")]
    Integrity(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// A consistent read of one election document together with the version it
/// was read at.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub version: i64,
    pub election: Election,
}

/// Outcome of a compare-and-swap commit attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed,
    /// The stored version no longer matches the snapshot the caller read.
    Conflict,
}

/// Versioned document store holding one record per election.
///
/// `try_commit` only writes when the stored version still equals
/// `expected_version`; the coordinator builds its read-modify-write retry
/// loop on top of exactly this contract. Sub-trees of the document are never
/// addressable for writes on their own.
#[async_trait]
pub trait ElectionStore: Send + Sync {
    /// Persist a new election at version 0.
    async fn insert(&self, election: &Election) -> Result<()>;

    async fn load(&self, id: &str) -> Result<Snapshot>;

    async fn try_commit(
        &self,
        id: &str,
        expected_version: i64,
        election: &Election,
    ) -> Result<CommitOutcome>;

    /// Elections administered by the given user, for the admin listing.
    async fn list_by_admin(&self, admin_uid: &str) -> Result<Vec<Election>>;
}
