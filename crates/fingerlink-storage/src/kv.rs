#![allow(async_fn_in_trait)]

use crate::error::{StorageError, StorageResult};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::trace;

/// Unsigned integer values persisted by key.
///
/// A successful `put_uint` is durable: the value is committed before the
/// call returns, and a later `get_uint` (in this or a future process) sees it.
pub trait DurableStore: Send + Sync {
    /// Value stored under `key`, or `None` if it was never written.
    async fn get_uint(&self, key: &str) -> StorageResult<Option<u64>>;

    /// Store `value` under `key`, replacing any previous value.
    async fn put_uint(&self, key: &str, value: u64) -> StorageResult<()>;
}

/// SQLite implementation of [`DurableStore`] over the `settings` table.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl DurableStore for SqliteStore {
    async fn get_uint(&self, key: &str) -> StorageResult<Option<u64>> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|(value,)| u64::try_from(value).map_err(|_| StorageError::out_of_range(key, value)))
            .transpose()
    }

    async fn put_uint(&self, key: &str, value: u64) -> StorageResult<()> {
        let stored = i64::try_from(value).map_err(|_| StorageError::out_of_range(key, value))?;

        sqlx::query(
            r#"
            INSERT INTO settings (key, value) VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
            "#,
        )
        .bind(key)
        .bind(stored)
        .execute(&self.pool)
        .await?;

        trace!(key, value, "Persisted setting");
        Ok(())
    }
}

/// Process-local [`DurableStore`]; clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: Arc<Mutex<HashMap<String, u64>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DurableStore for MemoryStore {
    async fn get_uint(&self, key: &str) -> StorageResult<Option<u64>> {
        Ok(self.values.lock().await.get(key).copied())
    }

    async fn put_uint(&self, key: &str, value: u64) -> StorageResult<()> {
        self.values.lock().await.insert(key.to_string(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Database;
    use rstest::rstest;

    #[tokio::test]
    async fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert_eq!(store.get_uint("enrolledCount").await.unwrap(), None);

        store.put_uint("enrolledCount", 7).await.unwrap();
        assert_eq!(store.get_uint("enrolledCount").await.unwrap(), Some(7));

        let shared = store.clone();
        shared.put_uint("enrolledCount", 8).await.unwrap();
        assert_eq!(store.get_uint("enrolledCount").await.unwrap(), Some(8));
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(300)]
    #[case(i64::MAX as u64)]
    #[tokio::test]
    async fn test_sqlite_store_values(#[case] value: u64) {
        let db = Database::in_memory().await.unwrap();
        let store = SqliteStore::new(db.pool().clone());

        store.put_uint("enrolledCount", value).await.unwrap();
        assert_eq!(store.get_uint("enrolledCount").await.unwrap(), Some(value));
    }

    #[tokio::test]
    async fn test_sqlite_store_upsert_replaces() {
        let db = Database::in_memory().await.unwrap();
        let store = SqliteStore::new(db.pool().clone());

        store.put_uint("enrolledCount", 1).await.unwrap();
        store.put_uint("enrolledCount", 2).await.unwrap();

        let (rows,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM settings")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(rows, 1);
        assert_eq!(store.get_uint("enrolledCount").await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn test_sqlite_store_rejects_oversized_value() {
        let db = Database::in_memory().await.unwrap();
        let store = SqliteStore::new(db.pool().clone());

        let err = store.put_uint("enrolledCount", u64::MAX).await.unwrap_err();
        assert!(matches!(err, StorageError::OutOfRange { .. }));
    }
}
