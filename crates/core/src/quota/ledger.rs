//! Persisted quota counter for one user.

use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::RwLock;
use tracing::warn;

use crate::store::{read_document, ProfileBatch, ProfileStore, StoreError, QUOTA_KEY};

use super::types::{QuotaState, QuotaTier};

/// Owns a user's [`QuotaState`].
///
/// The in-memory copy is what the gate reads; it only moves together with
/// the ticket collection at commit time.
pub struct QuotaLedger {
    user_id: String,
    store: Arc<dyn ProfileStore>,
    state: RwLock<QuotaState>,
}

impl QuotaLedger {
    /// Load the user's counter, starting fresh when none is stored.
    pub fn load(
        store: Arc<dyn ProfileStore>,
        user_id: impl Into<String>,
        today: NaiveDate,
    ) -> Result<Self, StoreError> {
        let user_id = user_id.into();
        let state = read_document::<QuotaState>(store.as_ref(), &user_id, QUOTA_KEY)?
            .unwrap_or_else(|| QuotaState::fresh(today, QuotaTier::Free));

        Ok(Self {
            user_id,
            store,
            state: RwLock::new(state),
        })
    }

    /// The counter as seen on `today`.
    pub async fn current(&self, today: NaiveDate) -> QuotaState {
        self.state.read().await.normalized(today)
    }

    /// The counter after one more generation on `today`, not yet applied.
    pub async fn preview_increment(&self, today: NaiveDate) -> QuotaState {
        self.state.read().await.incremented(today)
    }

    /// Apply a state previously produced by [`preview_increment`](Self::preview_increment).
    pub async fn replace(&self, state: QuotaState) {
        *self.state.write().await = state;
    }

    /// Change the subscription tier and persist it.
    ///
    /// The in-memory tier changes even if the write fails.
    pub async fn set_tier(&self, tier: QuotaTier, today: NaiveDate) -> Result<QuotaState, StoreError> {
        let mut state = self.state.write().await;
        let mut next = state.normalized(today);
        next.tier = tier;
        *state = next.clone();

        let mut batch = ProfileBatch::new();
        batch.stage(QUOTA_KEY, &next)?;
        if let Err(e) = batch.commit(self.store.as_ref(), &self.user_id) {
            warn!(user_id = %self.user_id, error = %e, "Failed to persist quota tier");
            return Err(e);
        }
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteProfileStore;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 15).unwrap()
    }

    #[tokio::test]
    async fn test_load_without_document_starts_fresh() {
        let store = Arc::new(SqliteProfileStore::in_memory().unwrap());
        let ledger = QuotaLedger::load(store, "user-1", today()).unwrap();
        let current = ledger.current(today()).await;
        assert_eq!(current.count, 0);
        assert_eq!(current.tier, QuotaTier::Free);
    }

    #[tokio::test]
    async fn test_preview_does_not_apply_until_replace() {
        let store = Arc::new(SqliteProfileStore::in_memory().unwrap());
        let ledger = QuotaLedger::load(store.clone(), "user-1", today()).unwrap();

        let next = ledger.preview_increment(today()).await;
        assert_eq!(next.count, 1);
        assert_eq!(ledger.current(today()).await.count, 0);

        let mut batch = ProfileBatch::new();
        batch.stage(QUOTA_KEY, &next).unwrap();
        batch.commit(&*store, "user-1").unwrap();
        ledger.replace(next).await;
        assert_eq!(ledger.current(today()).await.count, 1);

        let reloaded = QuotaLedger::load(store, "user-1", today()).unwrap();
        assert_eq!(reloaded.current(today()).await.count, 1);
    }

    #[tokio::test]
    async fn test_set_tier_persists() {
        let store = Arc::new(SqliteProfileStore::in_memory().unwrap());
        let ledger = QuotaLedger::load(store.clone(), "user-1", today()).unwrap();
        ledger.set_tier(QuotaTier::Premium, today()).await.unwrap();

        let reloaded = QuotaLedger::load(store, "user-1", today()).unwrap();
        assert_eq!(reloaded.current(today()).await.tier, QuotaTier::Premium);
    }
}
