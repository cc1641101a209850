//! Error-containing front for a [`KeyValueStore`].
//!
//! Nothing here returns an error: reads degrade to `None`, writes to a logged
//! drop. A quota failure gets one cleanup pass and one retry.

use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::repository::KeyValueStore;

/// Key segments marking entries that may be discarded to free space.
pub const DISPOSABLE_KEY_MARKERS: [&str; 2] = ["backup", "temp"];

/// Whether `key` names a backup or temporary entry.
///
/// A marker must be a whole `_`/`-`/`.`/`:` separated segment, so
/// `template_list` or `attempts` are kept.
#[must_use]
pub fn is_disposable_key(key: &str) -> bool {
    key.split(['_', '-', '.', ':']).any(|segment| {
        DISPOSABLE_KEY_MARKERS
            .iter()
            .any(|marker| segment.eq_ignore_ascii_case(marker))
    })
}

#[derive(Clone)]
pub struct KvAdapter {
    store: Arc<dyn KeyValueStore>,
}

impl KvAdapter {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Raw value under `key`, or `None` if absent or unreadable.
    pub async fn read(&self, key: &str) -> Option<String> {
        match self.store.get(key).await {
            Ok(value) => value,
            Err(err) => {
                error!(key, %err, "failed to read from storage");
                None
            }
        }
    }

    /// Persist `value` under `key`. Returns whether it was stored.
    ///
    /// On `QuotaExceeded` disposable entries are removed and the write is
    /// retried exactly once.
    pub async fn write(&self, key: &str, value: &str) -> bool {
        let err = match self.store.set(key, value).await {
            Ok(()) => return true,
            Err(err) => err,
        };

        if !err.is_quota_exceeded() {
            error!(key, %err, "failed to write to storage");
            return false;
        }

        warn!(key, %err, "storage quota exceeded, removing backup and temp entries");
        let removed = self.cleanup_disposable(key).await;
        debug!(removed, "storage cleanup finished");

        match self.store.set(key, value).await {
            Ok(()) => true,
            Err(err) => {
                error!(key, %err, "write failed again after cleanup, dropping it");
                false
            }
        }
    }

    /// Best-effort delete.
    pub async fn remove(&self, key: &str) {
        if let Err(err) = self.store.remove(key).await {
            warn!(key, %err, "failed to remove storage entry");
        }
    }

    /// Every stored key, or an empty list if the medium cannot be listed.
    pub async fn keys(&self) -> Vec<String> {
        match self.store.keys().await {
            Ok(keys) => keys,
            Err(err) => {
                error!(%err, "failed to list storage keys");
                Vec::new()
            }
        }
    }

    async fn cleanup_disposable(&self, keep: &str) -> usize {
        let mut removed = 0;
        for key in self.keys().await {
            if key == keep || !is_disposable_key(&key) {
                continue;
            }
            match self.store.remove(&key).await {
                Ok(()) => removed += 1,
                Err(err) => warn!(key, %err, "failed to remove entry during cleanup"),
            }
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryKeyValueStore;

    #[test]
    fn disposable_keys_match_backup_and_temp() {
        assert!(is_disposable_key("sentence_cards_backup_2024-03-01T00-00-00-000Z"));
        assert!(is_disposable_key("TEMP_draft"));
        assert!(!is_disposable_key("sentence_cards_complete_data"));
    }

    #[test]
    fn markers_inside_words_are_not_disposable() {
        assert!(!is_disposable_key("template_list"));
        assert!(!is_disposable_key("quiz_attempts"));
        assert!(!is_disposable_key("backups_index"));
        assert!(is_disposable_key("draft.temp"));
    }

    #[tokio::test]
    async fn quota_cleanup_keeps_lookalike_keys() {
        let store = InMemoryKeyValueStore::with_quota(60);
        store.set("template_a", "0123456789").await.unwrap();
        store.set("x_temp", "0123456789012345").await.unwrap();
        let adapter = KvAdapter::new(Arc::new(store.clone()));

        assert!(adapter.write("main", "01234567890123456").await);
        assert!(store.get("template_a").await.unwrap().is_some());
        assert_eq!(store.get("x_temp").await.unwrap(), None);
    }

    #[tokio::test]
    async fn read_of_unavailable_medium_is_none() {
        let store = InMemoryKeyValueStore::new();
        store.set("k", "v").await.unwrap();
        store.set_unavailable(true);
        let adapter = KvAdapter::new(Arc::new(store.clone()));

        assert_eq!(adapter.read("k").await, None);
        assert!(!adapter.write("k", "w").await);
        adapter.remove("k").await;
        assert!(adapter.keys().await.is_empty());
    }

    #[tokio::test]
    async fn quota_failure_frees_backups_then_retries() {
        let store = InMemoryKeyValueStore::with_quota(40);
        store.set("old_backup", "0123456789012345").await.unwrap();
        store.set("keep", "x").await.unwrap();
        let adapter = KvAdapter::new(Arc::new(store.clone()));

        assert!(adapter.write("main", "0123456789012345678").await);
        assert_eq!(store.get("old_backup").await.unwrap(), None);
        assert_eq!(store.get("keep").await.unwrap().as_deref(), Some("x"));
        assert!(store.get("main").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn oversized_write_is_dropped_after_one_retry() {
        let store = InMemoryKeyValueStore::with_quota(8);
        let adapter = KvAdapter::new(Arc::new(store.clone()));
        assert!(!adapter.write("main", "far too large for the quota").await);
        assert_eq!(store.get("main").await.unwrap(), None);
    }
}
