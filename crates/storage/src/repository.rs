use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by key-value media.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("storage is unavailable: {0}")]
    Unavailable(String),

    #[error("storage quota exceeded ({needed} bytes needed, limit {limit})")]
    QuotaExceeded { needed: usize, limit: usize },

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl StorageError {
    #[must_use]
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, StorageError::QuotaExceeded { .. })
    }
}

/// Persistent string-to-string medium with a hard capacity ceiling and no
/// eviction of its own.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetch the raw value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the medium cannot be read.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Insert or replace the value under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::QuotaExceeded` when the value does not fit, or
    /// other storage errors.
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete `key`. Succeeds if the key did not exist.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the medium cannot be written.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// All keys currently stored, in ascending order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the medium cannot be read.
    async fn keys(&self) -> Result<Vec<String>, StorageError>;
}

/// Bytes an entry occupies against a quota.
#[must_use]
pub fn entry_size(key: &str, value: &str) -> usize {
    key.len() + value.len()
}

/// In-memory medium for tests and ephemeral sessions.
///
/// Supports an optional byte quota (keys plus values) and can be switched to
/// an "unavailable" state to simulate a blocked medium.
#[derive(Clone, Default)]
pub struct InMemoryKeyValueStore {
    entries: Arc<Mutex<BTreeMap<String, String>>>,
    quota_bytes: Option<usize>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryKeyValueStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            quota_bytes: Some(quota_bytes),
            ..Self::default()
        }
    }

    /// Make every subsequent call fail with `StorageError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Total bytes used by stored entries.
    #[must_use]
    pub fn used_bytes(&self) -> usize {
        self.entries
            .lock()
            .map(|guard| guard.iter().map(|(k, v)| entry_size(k, v)).sum())
            .unwrap_or(0)
    }

    fn check_available(&self) -> Result<(), StorageError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("medium disabled".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.check_available()?;
        let guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check_available()?;
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        if let Some(limit) = self.quota_bytes {
            let others: usize = guard
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| entry_size(k, v))
                .sum();
            let needed = others + entry_size(key, value);
            if needed > limit {
                return Err(StorageError::QuotaExceeded { needed, limit });
            }
        }

        guard.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.check_available()?;
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, StorageError> {
        self.check_available()?;
        let guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.keys().cloned().collect())
    }
}
