//! Bounded, persisted log of past audit sessions, newest first.

use std::sync::Arc;

use chrono::Utc;
use shared::domain::{AuditResult, HistoryId, HistoryItem};
use storage::KeyValueStore;
use tracing::{debug, warn};

use crate::error::PersistenceError;

pub const HISTORY_CAPACITY: usize = 20;
pub const HISTORY_STORAGE_KEY: &str = "veru.audit_history";

/// Proof that the user confirmed an irreversible history clear.
#[derive(Debug)]
pub struct ClearConfirmation(());

impl ClearConfirmation {
    pub(crate) fn confirmed() -> Self {
        Self(())
    }
}

pub struct HistoryCache {
    store: Arc<dyn KeyValueStore>,
    items: Vec<HistoryItem>,
}

impl HistoryCache {
    /// Reads the persisted history. Missing, unreadable or unparsable data
    /// yields an empty cache.
    pub async fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let items = match store.get(HISTORY_STORAGE_KEY).await {
            Ok(Some(raw)) => decode_items(&raw),
            Ok(None) => Vec::new(),
            Err(err) => {
                warn!(error = %format!("{err:#}"), "history store unreadable; starting empty");
                Vec::new()
            }
        };
        debug!(items = items.len(), "history loaded");
        Self { store, items }
    }

    pub fn items(&self) -> &[HistoryItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn select(&self, id: &HistoryId) -> Option<&HistoryItem> {
        self.items.iter().find(|item| &item.id == id)
    }

    /// Prepends a session and persists the list.
    ///
    /// Empty result sets are not recorded and return `Ok(None)`. When the
    /// store write fails the item stays in memory and the error is returned.
    pub async fn record(
        &mut self,
        input_text: &str,
        results: &[AuditResult],
    ) -> Result<Option<&HistoryItem>, PersistenceError> {
        if results.is_empty() {
            return Ok(None);
        }

        let now = Utc::now().timestamp_millis();
        let timestamp = match self.items.first() {
            Some(newest) if newest.timestamp >= now => newest.timestamp + 1,
            _ => now,
        };
        let item = HistoryItem {
            id: HistoryId::from_timestamp_millis(timestamp),
            timestamp,
            input_text: input_text.to_string(),
            results: results.to_vec(),
        };

        self.items.insert(0, item);
        self.items.truncate(HISTORY_CAPACITY);
        self.persist().await?;
        Ok(self.items.first())
    }

    /// Deletes the persisted copy, then empties the cache. A failed delete
    /// leaves both untouched.
    pub async fn clear(&mut self, _confirmation: ClearConfirmation) -> Result<(), PersistenceError> {
        self.store
            .delete(HISTORY_STORAGE_KEY)
            .await
            .map_err(PersistenceError::Store)?;
        self.items.clear();
        Ok(())
    }

    async fn persist(&self) -> Result<(), PersistenceError> {
        let encoded = serde_json::to_string(&self.items)?;
        self.store
            .put(HISTORY_STORAGE_KEY, &encoded)
            .await
            .map_err(PersistenceError::Store)
    }
}

fn decode_items(raw: &str) -> Vec<HistoryItem> {
    if raw.trim().is_empty() {
        return Vec::new();
    }
    match serde_json::from_str::<Vec<HistoryItem>>(raw) {
        Ok(mut items) => {
            items.truncate(HISTORY_CAPACITY);
            items
        }
        Err(err) => {
            warn!(error = %err, "persisted history is corrupt; starting empty");
            Vec::new()
        }
    }
}

#[cfg(test)]
#[path = "tests/history_tests.rs"]
mod tests;
