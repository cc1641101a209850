use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;

use crate::repository::{KeyValueStore, StorageError, entry_size};

use super::SqliteRepository;

impl SqliteRepository {
    /// Bytes used by every entry except `key`.
    async fn used_bytes_excluding(&self, key: &str) -> Result<usize, StorageError> {
        let row = sqlx::query(
            r"
            SELECT COALESCE(SUM(LENGTH(CAST(key AS BLOB)) + LENGTH(CAST(value AS BLOB))), 0) AS used
            FROM kv_entries
            WHERE key <> ?1
            ",
        )
        .bind(key)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        let used: i64 = row
            .try_get("used")
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        Ok(usize::try_from(used).unwrap_or(0))
    }
}

#[async_trait]
impl KeyValueStore for SqliteRepository {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let row = sqlx::query("SELECT value FROM kv_entries WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let value: String = row
            .try_get("value")
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        Ok(Some(value))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if let Some(limit) = self.quota_bytes {
            let needed = self.used_bytes_excluding(key).await? + entry_size(key, value);
            if needed > limit {
                return Err(StorageError::QuotaExceeded { needed, limit });
            }
        }

        sqlx::query(
            r"
            INSERT INTO kv_entries (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            ",
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM kv_entries WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, StorageError> {
        let rows = sqlx::query("SELECT key FROM kv_entries ORDER BY key ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;

        rows.iter()
            .map(|row| {
                row.try_get::<String, _>("key")
                    .map_err(|err| StorageError::Serialization(err.to_string()))
            })
            .collect()
    }
}
