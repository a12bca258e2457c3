use async_trait::async_trait;
use redis::AsyncCommands;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::error::AppResult;

/// Backend for TTL'd storage of serialized JSON strings
///
/// Implementations only deal in raw strings; (de)serialization and error
/// tolerance live in [`super::Cache`]. A `get` after the entry's TTL has
/// elapsed is a miss. Concurrent `set`s on one key are last-write-wins.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetches the value stored under `key`, if present and unexpired
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Stores `value` under `key`, expiring after `ttl` seconds
    async fn set(&self, key: &str, value: String, ttl: u64) -> AppResult<()>;
}

/// Redis-backed store
pub struct RedisStore {
    client: redis::Client,
}

impl RedisStore {
    pub fn new(redis_url: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: String, ttl: u64) -> AppResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _: () = conn.set_ex(key, value, ttl).await?;
        Ok(())
    }
}

/// In-process store used when no Redis URL is configured, and in tests
///
/// Entries carry their write instant and are checked against their TTL on
/// read. Expired entries are not actively purged; they are replaced by the
/// next write to the same key.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, MemoryEntry>>,
}

struct MemoryEntry {
    value: String,
    written_at: Instant,
    ttl: Duration,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|entry| entry.written_at.elapsed() < entry.ttl)
            .map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: String, ttl: u64) -> AppResult<()> {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            MemoryEntry {
                value,
                written_at: Instant::now(),
                ttl: Duration::from_secs(ttl),
            },
        );
        Ok(())
    }
}
