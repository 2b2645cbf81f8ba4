//! The user's ticket collection.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::warn;

use crate::store::{read_document, ProfileBatch, ProfileStore, StoreError, TICKETS_KEY};

use super::types::TicketRecord;

/// Owns a user's [`TicketRecord`] collection.
///
/// The collection is persisted as one document and always rewritten whole.
/// The in-memory copy is authoritative for the session: it is updated even
/// when persisting fails.
pub struct TicketStore {
    user_id: String,
    store: Arc<dyn ProfileStore>,
    records: RwLock<Vec<TicketRecord>>,
}

impl TicketStore {
    /// Load the user's collection; empty when none is stored.
    pub fn load(store: Arc<dyn ProfileStore>, user_id: impl Into<String>) -> Result<Self, StoreError> {
        let user_id = user_id.into();
        let mut records =
            read_document::<Vec<TicketRecord>>(store.as_ref(), &user_id, TICKETS_KEY)?
                .unwrap_or_default();
        sort_most_recent_first(&mut records);

        Ok(Self {
            user_id,
            store,
            records: RwLock::new(records),
        })
    }

    /// All tickets, most recent first.
    pub async fn list(&self) -> Vec<TicketRecord> {
        self.records.read().await.clone()
    }

    pub async fn get(&self, id: &str) -> Option<TicketRecord> {
        self.records.read().await.iter().find(|r| r.id == id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Prepend a record and persist the collection.
    pub async fn append(&self, record: TicketRecord) -> Result<(), StoreError> {
        let next = self.preview_append(record).await;
        let mut batch = ProfileBatch::new();
        let staged = batch.stage(TICKETS_KEY, &next);
        self.replace(next).await;
        staged?;
        self.persist(batch, "append")
    }

    /// The collection with `record` added, not yet applied. Pass it to
    /// [`replace`](Self::replace) once persisted.
    pub async fn preview_append(&self, record: TicketRecord) -> Vec<TicketRecord> {
        let mut next = self.records.read().await.clone();
        next.insert(0, record);
        sort_most_recent_first(&mut next);
        next
    }

    /// Swap in a collection produced by [`preview_append`](Self::preview_append).
    pub async fn replace(&self, records: Vec<TicketRecord>) {
        *self.records.write().await = records;
    }

    /// Delete a ticket. Fails with [`StoreError::NotFound`] for unknown ids.
    ///
    /// Removing the last ticket drops the stored document altogether.
    pub async fn remove(&self, id: &str) -> Result<TicketRecord, StoreError> {
        let (removed, batch) = {
            let mut records = self.records.write().await;
            let index = records
                .iter()
                .position(|r| r.id == id)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            let removed = records.remove(index);

            let batch = if records.is_empty() {
                None
            } else {
                let mut batch = ProfileBatch::new();
                batch.stage(TICKETS_KEY, &*records)?;
                Some(batch)
            };
            (removed, batch)
        };

        match batch {
            Some(batch) => self.persist(batch, "remove")?,
            None => self
                .store
                .delete(&self.user_id, TICKETS_KEY)
                .map_err(|e| {
                    warn!(user_id = %self.user_id, error = %e, "Failed to drop ticket collection");
                    e
                })?,
        }
        Ok(removed)
    }

    fn persist(&self, batch: ProfileBatch, operation: &str) -> Result<(), StoreError> {
        batch.commit(self.store.as_ref(), &self.user_id).map_err(|e| {
            warn!(user_id = %self.user_id, operation, error = %e, "Failed to persist tickets");
            e
        })
    }
}

/// Newest first; ids are time-ordered so they break timestamp ties.
fn sort_most_recent_first(records: &mut [TicketRecord]) {
    records.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{ImageRef, MediaKind};
    use crate::store::SqliteProfileStore;
    use crate::testing::MemoryProfileStore;
    use crate::ticket::{LuckyNumber, TicketMessage, TicketTemplate};
    use chrono::{Duration, TimeZone, Utc};

    fn record(minute: u32) -> TicketRecord {
        TicketRecord::new(
            LuckyNumber::from_value(100_000 + minute).unwrap(),
            ImageRef::local(format!("/data/tickets/{}.png", minute)),
            TicketMessage::GreatFortune,
            MediaKind::Photo,
            TicketTemplate::Golden,
            Utc.with_ymd_and_hms(2026, 10, 15, 12, minute, 0).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_append_then_list_returns_record_first() {
        let store = Arc::new(SqliteProfileStore::in_memory().unwrap());
        let tickets = TicketStore::load(store, "user-1").unwrap();

        tickets.append(record(1)).await.unwrap();
        let latest = record(2);
        tickets.append(latest.clone()).await.unwrap();

        let listed = tickets.list().await;
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0], latest);
    }

    #[tokio::test]
    async fn test_list_orders_by_creation_not_insertion() {
        let store = Arc::new(SqliteProfileStore::in_memory().unwrap());
        let tickets = TicketStore::load(store, "user-1").unwrap();

        let newer = record(30);
        let older = record(5);
        tickets.append(newer.clone()).await.unwrap();
        tickets.append(older.clone()).await.unwrap();

        let ids: Vec<_> = tickets.list().await.into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![newer.id, older.id]);
    }

    #[tokio::test]
    async fn test_remove() {
        let store = Arc::new(SqliteProfileStore::in_memory().unwrap());
        let tickets = TicketStore::load(store.clone(), "user-1").unwrap();
        let keep = record(1);
        let drop = record(2);
        tickets.append(keep.clone()).await.unwrap();
        tickets.append(drop.clone()).await.unwrap();

        let removed = tickets.remove(&drop.id).await.unwrap();
        assert_eq!(removed.id, drop.id);
        assert!(tickets.get(&drop.id).await.is_none());

        let reloaded = TicketStore::load(store, "user-1").unwrap();
        assert_eq!(reloaded.list().await, vec![keep]);
    }

    #[tokio::test]
    async fn test_removing_last_ticket_drops_document() {
        let store = Arc::new(SqliteProfileStore::in_memory().unwrap());
        let tickets = TicketStore::load(store.clone(), "user-1").unwrap();
        let only = record(3);
        tickets.append(only.clone()).await.unwrap();
        assert!(store.get("user-1", TICKETS_KEY).unwrap().is_some());

        tickets.remove(&only.id).await.unwrap();

        assert!(tickets.is_empty().await);
        assert!(store.get("user-1", TICKETS_KEY).unwrap().is_none());
        assert!(TicketStore::load(store, "user-1").unwrap().is_empty().await);
    }

    #[tokio::test]
    async fn test_remove_unknown_id() {
        let store = Arc::new(SqliteProfileStore::in_memory().unwrap());
        let tickets = TicketStore::load(store, "user-1").unwrap();
        let err = tickets.remove("missing").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(id) if id == "missing"));
    }

    #[tokio::test]
    async fn test_memory_stays_authoritative_when_write_fails() {
        let store = Arc::new(MemoryProfileStore::new());
        let tickets = TicketStore::load(store.clone(), "user-1").unwrap();
        store.fail_writes(true);

        let result = tickets.append(record(1)).await;
        assert!(matches!(result, Err(StoreError::WriteFailed(_))));
        assert_eq!(tickets.len().await, 1);
        assert!(store.get("user-1", TICKETS_KEY).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_load_sorts_stored_collection() {
        let store = Arc::new(SqliteProfileStore::in_memory().unwrap());
        let mut early = record(0);
        early.created_at -= Duration::hours(1);
        let late = record(10);
        store
            .put(
                "user-1",
                TICKETS_KEY,
                serde_json::to_string(&vec![early.clone(), late.clone()]).unwrap(),
            )
            .unwrap();

        let tickets = TicketStore::load(store, "user-1").unwrap();
        assert_eq!(tickets.list().await, vec![late, early]);
    }
}
