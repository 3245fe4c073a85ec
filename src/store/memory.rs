/// In-memory election store for tests and local demos.
use super::{CommitOutcome, ElectionStore, Result, Snapshot, StoreError};
use crate::model::Election;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, (i64, Election)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ElectionStore for MemoryStore {
    async fn insert(&self, election: &Election) -> Result<()> {
        let mut records = self.records.write().unwrap();
        if records.contains_key(&election.id) {
            return Err(StoreError::AlreadyExists(election.id.clone()));
        }
        records.insert(election.id.clone(), (0, election.clone()));
        Ok(())
    }

    async fn load(&self, id: &str) -> Result<Snapshot> {
        let records = self.records.read().unwrap();
        let (version, election) = records
            .get(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        Ok(Snapshot {
            version: *version,
            election: election.clone(),
        })
    }

    async fn try_commit(
        &self,
        id: &str,
        expected_version: i64,
        election: &Election,
    ) -> Result<CommitOutcome> {
        let mut records = self.records.write().unwrap();
        let entry = records
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        if entry.0 != expected_version {
            return Ok(CommitOutcome::Conflict);
        }

        *entry = (expected_version + 1, election.clone());
        Ok(CommitOutcome::Committed)
    }

    async fn list_by_admin(&self, admin_uid: &str) -> Result<Vec<Election>> {
        let records = self.records.read().unwrap();
        let mut elections: Vec<Election> = records
            .values()
            .filter(|(_, e)| e.admin_uid == admin_uid)
            .map(|(_, e)| e.clone())
            .collect();
        elections.sort_by(|a, b| a.id.cmp(&b.id));
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
    async fn commit_against_a_stale_version_conflicts() {
        let store = MemoryStore::new();
        store.insert(&election("e1", "admin")).await.unwrap();

        let snapshot = store.load("e1").await.unwrap();
        assert_eq!(snapshot.version, 0);

        let outcome = store
            .try_commit("e1", snapshot.version, &snapshot.election)
            .await
            .unwrap();
        assert_eq!(outcome, CommitOutcome::Committed);

        // The same snapshot version is now stale.
        let outcome = store
            .try_commit("e1", snapshot.version, &snapshot.election)
            .await
            .unwrap();
        assert_eq!(outcome, CommitOutcome::Conflict);

        assert_eq!(store.load("e1").await.unwrap().version, 1);
    }

    #[tokio::test]
    async fn duplicate_insert_is_rejected() {
        let store = MemoryStore::new();
        store.insert(&election("e1", "admin")).await.unwrap();
        let err = store.insert(&election("e1", "admin")).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn listing_filters_by_admin() {
        let store = MemoryStore::new();
        store.insert(&election("e1", "ana")).await.unwrap();
        store.insert(&election("e2", "rui")).await.unwrap();
        store.insert(&election("e3", "ana")).await.unwrap();

        let mine = store.list_by_admin("ana").await.unwrap();
        let ids: Vec<&str> = mine.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["e1", "e3"]);
    }

    #[tokio::test]
    async fn missing_election_is_not_found() {
        let store = MemoryStore::new();
        let err = store.load("nope").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
