//! In-memory profile store for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::store::{ProfileStore, StoreError};

/// Profile store backed by a map, with switchable write failures.
#[derive(Debug, Default)]
pub struct MemoryProfileStore {
    documents: Mutex<HashMap<(String, String), String>>,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following write fail with [`StoreError::WriteFailed`].
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful `put_many` calls.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn documents(&self) -> std::sync::MutexGuard<'_, HashMap<(String, String), String>> {
        self.documents
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ProfileStore for MemoryProfileStore {
    fn get(&self, user_id: &str, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .documents()
            .get(&(user_id.to_string(), key.to_string()))
            .cloned())
    }

    fn put_many(&self, user_id: &str, entries: &[(&str, String)]) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::WriteFailed("simulated write failure".to_string()));
        }
        let mut documents = self.documents();
        for (key, value) in entries {
            documents.insert((user_id.to_string(), key.to_string()), value.clone());
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn delete(&self, user_id: &str, key: &str) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::WriteFailed("simulated write failure".to_string()));
        }
        self.documents()
            .remove(&(user_id.to_string(), key.to_string()));
        Ok(())
    }
}
