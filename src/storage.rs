use std::collections::HashMap;
use std::str::FromStr;

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tokio::sync::RwLock;

/// Key-value persistence seam. The tracker owns exactly two entries (the
/// days map and the draft); callers treat values as opaque bytes and do
/// their own (de)serialization.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> anyhow::Result<Option<Bytes>>;
    async fn set(&self, key: &str, value: Bytes) -> anyhow::Result<()>;
    async fn delete(&self, key: &str) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct SqliteKv {
    pool: SqlitePool,
}

impl SqliteKv {
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let opts = SqliteConnectOptions::from_str(url)
            .context("parse sqlite url")?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await
            .context("connect to sqlite")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kv_entries (
                key   TEXT PRIMARY KEY,
                value BLOB NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .context("create kv_entries table")?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl KvStore for SqliteKv {
    async fn get(&self, key: &str) -> anyhow::Result<Option<Bytes>> {
        let row: Option<Vec<u8>> =
            sqlx::query_scalar(r#"SELECT value FROM kv_entries WHERE key = ?1"#)
                .bind(key)
                .fetch_optional(&self.pool)
                .await
                .context("kv get")?;
        Ok(row.map(Bytes::from))
    }

    async fn set(&self, key: &str, value: Bytes) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO kv_entries (key, value) VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(key)
        .bind(value.to_vec())
        .execute(&self.pool)
        .await
        .context("kv set")?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        sqlx::query(r#"DELETE FROM kv_entries WHERE key = ?1"#)
            .bind(key)
            .execute(&self.pool)
            .await
            .context("kv delete")?;
        Ok(())
    }
}

/// In-memory store for tests and local experiments.
#[derive(Default)]
pub struct MemoryKv {
    entries: RwLock<HashMap<String, Bytes>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryKv {
    async fn get(&self, key: &str) -> anyhow::Result<Option<Bytes>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Bytes) -> anyhow::Result<()> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sqlite_kv_roundtrip() {
        let kv = SqliteKv::connect("sqlite::memory:").await.unwrap();

        assert!(kv.get("missing").await.unwrap().is_none());

        kv.set("a", Bytes::from_static(b"one")).await.unwrap();
        assert_eq!(kv.get("a").await.unwrap().unwrap(), Bytes::from_static(b"one"));

        kv.set("a", Bytes::from_static(b"two")).await.unwrap();
        assert_eq!(kv.get("a").await.unwrap().unwrap(), Bytes::from_static(b"two"));

        kv.delete("a").await.unwrap();
        assert!(kv.get("a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn memory_kv_roundtrip() {
        let kv = MemoryKv::new();
        kv.set("k", Bytes::from_static(b"v")).await.unwrap();
        assert_eq!(kv.get("k").await.unwrap().unwrap(), Bytes::from_static(b"v"));
        kv.delete("k").await.unwrap();
        assert!(kv.get("k").await.unwrap().is_none());
    }
}
