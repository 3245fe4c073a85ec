/// SQLite-backed election store.
///
/// Each election is one row: the serialized document plus an integer version
/// used for compare-and-swap commits. The conditional UPDATE on the version
/// column is what gives coordinator transactions their atomicity.
use super::{schema, CommitOutcome, ElectionStore, Result, Snapshot, StoreError};
use crate::model::Election;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;

        schema::create_schema(&pool).await?;
        schema::verify_schema(&pool).await?;

        Ok(Self { pool })
    }

    pub async fn create_in_memory() -> Result<Self> {
        // A pooled :memory: database is a fresh database per connection, so
        // the pool is pinned to a single connection.
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        schema::create_schema(&pool).await?;
        schema::verify_schema(&pool).await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl ElectionStore for SqliteStore {
    async fn insert(&self, election: &Election) -> Result<()> {
        let document = serde_json::to_string(election)?;
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO elections (id, admin_uid, version, document, created_at, updated_at)
            VALUES (?, ?, 0, ?, ?, ?)
            "#,
        )
        .bind(&election.id)
        .bind(&election.admin_uid)
        .bind(&document)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::AlreadyExists(election.id.clone()));
        }

        Ok(())
    }

    async fn load(&self, id: &str) -> Result<Snapshot> {
        let row = sqlx::query("SELECT version, document FROM elections WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        let version: i64 = row.get("version");
        let document: String = row.get("document");
        let election: Election = serde_json::from_str(&document)?;

        Ok(Snapshot { version, election })
    }

    async fn try_commit(
        &self,
        id: &str,
        expected_version: i64,
        election: &Election,
    ) -> Result<CommitOutcome> {
        let document = serde_json::to_string(election)?;

        let result = sqlx::query(
            r#"
            UPDATE elections
            SET document = ?, version = version + 1, updated_at = ?
            WHERE id = ? AND version = ?
            "#,
        )
        .bind(&document)
        .bind(Utc::now())
        .bind(id)
        .bind(expected_version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(CommitOutcome::Committed);
        }

        // Distinguish a vanished row from a version mismatch.
        let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM elections WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match exists {
            Some(_) => Ok(CommitOutcome::Conflict),
            None => Err(StoreError::NotFound(id.to_string())),
        }
    }

    async fn list_by_admin(&self, admin_uid: &str) -> Result<Vec<Election>> {
        let rows = sqlx::query("SELECT document FROM elections WHERE admin_uid = ? ORDER BY id")
            .bind(admin_uid)
            .fetch_all(&self.pool)
            .await?;

        let mut elections = Vec::with_capacity(rows.len());
        for row in rows {
            let document: String = row.get("document");
            elections.push(serde_json::from_str(&document)?);
        }

        Ok(elections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Election, ElectionStatus};

    fn election(id: &str, admin: &str) -> Election {
        Election {
            id: id.to_string(),
            titulo: "Diretoria".to_string(),
            status: ElectionStatus::Scheduled,
            eligible_voters: Vec::new(),
            seats: Vec::new(),
            open_voting: None,
            admin_uid: admin.to_string(),
        }
    }

    #[tokio::test]
    async fn document_round_trips_through_sqlite() {
        let store = SqliteStore::create_in_memory().await.unwrap();
        let original = election("e1", "admin");
        store.insert(&original).await.unwrap();

        let snapshot = store.load("e1").await.unwrap();
        assert_eq!(snapshot.version, 0);
        assert_eq!(snapshot.election, original);
    }

    #[tokio::test]
    async fn version_check_guards_the_commit() {
        let store = SqliteStore::create_in_memory().await.unwrap();
        store.insert(&election("e1", "admin")).await.unwrap();

        let snapshot = store.load("e1").await.unwrap();
        let mut updated = snapshot.election.clone();
        updated.titulo = "Diretoria 2026".to_string();

        let outcome = store
            .try_commit("e1", snapshot.version, &updated)
            .await
            .unwrap();
        assert_eq!(outcome, CommitOutcome::Committed);

        // Replaying against the old version must conflict, not overwrite.
        let outcome = store
            .try_commit("e1", snapshot.version, &snapshot.election)
            .await
            .unwrap();
        assert_eq!(outcome, CommitOutcome::Conflict);

        let reloaded = store.load("e1").await.unwrap();
        assert_eq!(reloaded.version, 1);
        assert_eq!(reloaded.election.titulo, "Diretoria 2026");
    }

    #[tokio::test]
    async fn duplicate_insert_is_rejected() {
        let store = SqliteStore::create_in_memory().await.unwrap();
        store.insert(&election("e1", "admin")).await.unwrap();
        let err = store.insert(&election("e1", "admin")).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn committing_to_a_missing_election_is_not_found() {
        let store = SqliteStore::create_in_memory().await.unwrap();
        let err = store
            .try_commit("ghost", 0, &election("ghost", "admin"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn listing_filters_by_admin() {
        let store = SqliteStore::create_in_memory().await.unwrap();
        store.insert(&election("e1", "ana")).await.unwrap();
        store.insert(&election("e2", "rui")).await.unwrap();

        let mine = store.list_by_admin("ana").await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id, "e1");
    }
}
