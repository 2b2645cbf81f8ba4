//! Key-value profile storage keyed by user id.
//!
//! Each user owns a handful of JSON documents (quota counter, ticket
//! collection). Documents are always replaced whole; [`ProfileBatch`] groups
//! replacements that must land together.

mod sqlite;

pub use sqlite::SqliteProfileStore;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Document key for the user's [`QuotaState`](crate::quota::QuotaState).
pub const QUOTA_KEY: &str = "quota_state";

/// Document key for the user's ticket collection.
pub const TICKETS_KEY: &str = "tickets";

/// Error type for profile store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store could not be read.
    #[error("profile store read failed: {0}")]
    ReadFailed(String),

    /// The backing store could not be written; nothing was persisted.
    #[error("profile store write failed: {0}")]
    WriteFailed(String),

    /// A stored document could not be decoded.
    #[error("corrupt '{key}' document for user {user_id}: {reason}")]
    Corrupt {
        user_id: String,
        key: String,
        reason: String,
    },

    /// Record not found.
    #[error("record not found: {0}")]
    NotFound(String),
}

/// Trait for profile storage backends.
pub trait ProfileStore: Send + Sync {
    /// Read one document.
    fn get(&self, user_id: &str, key: &str) -> Result<Option<String>, StoreError>;

    /// Replace several documents atomically: either all land or none do.
    fn put_many(&self, user_id: &str, entries: &[(&str, String)]) -> Result<(), StoreError>;

    /// Remove a document. Missing documents are not an error.
    fn delete(&self, user_id: &str, key: &str) -> Result<(), StoreError>;

    /// Replace one document.
    fn put(&self, user_id: &str, key: &str, value: String) -> Result<(), StoreError> {
        self.put_many(user_id, &[(key, value)])
    }
}

/// Documents staged for one atomic write.
#[derive(Debug, Default)]
pub struct ProfileBatch {
    entries: Vec<(&'static str, String)>,
}

impl ProfileBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialize and stage a document, replacing any earlier staging of `key`.
    pub fn stage<T: Serialize>(&mut self, key: &'static str, value: &T) -> Result<(), StoreError> {
        let json =
            serde_json::to_string(value).map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        self.entries.retain(|(k, _)| *k != key);
        self.entries.push((key, json));
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> Vec<&'static str> {
        self.entries.iter().map(|(k, _)| *k).collect()
    }

    /// Write every staged document in one call.
    pub fn commit(self, store: &dyn ProfileStore, user_id: &str) -> Result<(), StoreError> {
        if self.entries.is_empty() {
            return Ok(());
        }
        store.put_many(user_id, &self.entries)
    }
}

/// Read and decode a JSON document.
pub fn read_document<T: DeserializeOwned>(
    store: &dyn ProfileStore,
    user_id: &str,
    key: &str,
) -> Result<Option<T>, StoreError> {
    match store.get(user_id, key)? {
        Some(json) => serde_json::from_str(&json)
            .map(Some)
            .map_err(|e| StoreError::Corrupt {
                user_id: user_id.to_string(),
                key: key.to_string(),
                reason: e.to_string(),
            }),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_restaging_replaces_entry() {
        let mut batch = ProfileBatch::new();
        batch.stage(QUOTA_KEY, &1u32).unwrap();
        batch.stage(TICKETS_KEY, &vec!["a"]).unwrap();
        batch.stage(QUOTA_KEY, &2u32).unwrap();
        assert_eq!(batch.keys(), vec![TICKETS_KEY, QUOTA_KEY]);
    }

    #[test]
    fn test_batch_commit_writes_all() {
        let store = SqliteProfileStore::in_memory().unwrap();
        let mut batch = ProfileBatch::new();
        batch.stage(QUOTA_KEY, &7u32).unwrap();
        batch.stage(TICKETS_KEY, &vec!["x", "y"]).unwrap();
        batch.commit(&store, "user-1").unwrap();

        let quota: Option<u32> = read_document(&store, "user-1", QUOTA_KEY).unwrap();
        let tickets: Option<Vec<String>> = read_document(&store, "user-1", TICKETS_KEY).unwrap();
        assert_eq!(quota, Some(7));
        assert_eq!(tickets.unwrap(), vec!["x", "y"]);
    }

    #[test]
    fn test_read_document_corrupt() {
        let store = SqliteProfileStore::in_memory().unwrap();
        store
            .put("user-1", QUOTA_KEY, "{not json".to_string())
            .unwrap();
        let result: Result<Option<u32>, _> = read_document(&store, "user-1", QUOTA_KEY);
        assert!(matches!(result, Err(StoreError::Corrupt { .. })));
    }
}
