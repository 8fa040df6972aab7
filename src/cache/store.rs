//! Key-value store backends for the cache layer.
//!
//! The layer consumes the [`CacheStore`] interface only: get, set-with-TTL,
//! delete, keys-by-pattern, ping, info. [`RedisStore`] is the production
//! backend; [`MemoryStore`] keeps single-process deployments and tests off
//! the network.

use async_trait::async_trait;
use dashmap::DashMap;
use redis::AsyncCommands;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),
}

impl From<redis::RedisError> for CacheError {
    fn from(e: redis::RedisError) -> Self {
        CacheError::Backend(e.to_string())
    }
}

/// Backend diagnostics surfaced through the cache stats endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreInfo {
    pub backend: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_memory: Option<String>,
    pub total_keys: u64,
}

/// External key-value store with native TTL expiry and pattern delete.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;
    /// Delete the given keys, returning how many existed.
    async fn delete(&self, keys: &[String]) -> Result<u64, CacheError>;
    /// List keys matching a glob-style pattern (`*` wildcard).
    async fn keys(&self, pattern: &str) -> Result<Vec<String>, CacheError>;
    async fn ping(&self) -> Result<(), CacheError>;
    async fn info(&self) -> Result<StoreInfo, CacheError>;
}

/// Redis-backed store for deployments where results are shared across
/// processes. TTL expiry rides on Redis `SETEX`.
pub struct RedisStore {
    conn: redis::aio::MultiplexedConnection,
}

impl RedisStore {
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(url)?;
        let conn = client.get_multiplexed_tokio_connection().await?;
        let store = Self { conn };
        store.ping().await?;
        info!("connected to redis cache store");
        Ok(store)
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn.clone();
        Ok(conn.get(key).await?)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let seconds = ttl.as_secs().max(1);
        let _: () = conn.set_ex(key, value, seconds).await?;
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<u64, CacheError> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn.clone();
        Ok(conn.del(keys).await?)
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, CacheError> {
        let mut conn = self.conn.clone();
        Ok(conn.keys(pattern).await?)
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    async fn info(&self) -> Result<StoreInfo, CacheError> {
        let mut conn = self.conn.clone();
        let raw: String = redis::cmd("INFO").query_async(&mut conn).await?;
        let total_keys: u64 = redis::cmd("DBSIZE").query_async(&mut conn).await?;

        let field = |name: &str| {
            raw.lines()
                .find_map(|line| line.strip_prefix(name).and_then(|v| v.strip_prefix(':')))
                .map(|v| v.trim().to_string())
        };
        Ok(StoreInfo {
            backend: "redis",
            version: field("redis_version"),
            used_memory: field("used_memory_human"),
            total_keys,
        })
    }
}

/// In-process store over a `DashMap`, with lazy expiry on read.
#[derive(Default)]
pub struct MemoryStore {
    entries: DashMap<String, (String, Instant)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        if let Some(entry) = self.entries.get(key) {
            let (value, deadline) = entry.value();
            if Instant::now() < *deadline {
                return Ok(Some(value.clone()));
            }
        } else {
            return Ok(None);
        }
        // Expired: drop outside the read guard.
        self.entries.remove(key);
        Ok(None)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        self.entries
            .insert(key.to_string(), (value.to_string(), Instant::now() + ttl));
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<u64, CacheError> {
        let mut removed = 0;
        for key in keys {
            if self.entries.remove(key).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, CacheError> {
        let now = Instant::now();
        Ok(self
            .entries
            .iter()
            .filter(|entry| entry.value().1 > now && glob_match(pattern, entry.key()))
            .map(|entry| entry.key().clone())
            .collect())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }

    async fn info(&self) -> Result<StoreInfo, CacheError> {
        let now = Instant::now();
        let total_keys = self.entries.iter().filter(|e| e.value().1 > now).count() as u64;
        Ok(StoreInfo {
            backend: "memory",
            version: None,
            used_memory: None,
            total_keys,
        })
    }
}

/// Minimal glob matcher: `*` matches any run of characters. That is the only
/// metacharacter cache-key patterns use.
fn glob_match(pattern: &str, key: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == key;
    }

    let mut pos = 0;
    let last = parts.len() - 1;
    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        if i == 0 {
            if !key.starts_with(part) {
                return false;
            }
            pos = part.len();
        } else if i == last {
            return key.len() >= pos + part.len() && key[pos..].ends_with(part);
        } else {
            match key[pos..].find(part) {
                Some(idx) => pos += idx + part.len(),
                None => return false,
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glob_star_suffix() {
        assert!(glob_match("enrollment:*", "enrollment:CSC:MAT"));
        assert!(!glob_match("enrollment:*", "session:CSC"));
    }

    #[test]
    fn glob_exact_and_infix() {
        assert!(glob_match("enrollment:CSC", "enrollment:CSC"));
        assert!(glob_match("*term:2025FA", "enrollment:CSC:term:2025FA"));
        assert!(glob_match("enrollment:*:term:*", "enrollment:CSC:term:2025FA"));
        assert!(!glob_match("enrollment:*:term:*", "enrollment:CSC"));
    }

    #[tokio::test]
    async fn memory_store_roundtrip_and_expiry() {
        let store = MemoryStore::new();
        store
            .set_ex("k", "v", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));

        store.set_ex("k", "v", Duration::from_nanos(1)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(store.get("k").await.unwrap(), None);
        // Expired entry was removed on read.
        assert_eq!(store.info().await.unwrap().total_keys, 0);
    }

    #[tokio::test]
    async fn memory_store_pattern_delete() {
        let store = MemoryStore::new();
        for key in ["enrollment:A", "enrollment:B", "other:C"] {
            store.set_ex(key, "v", Duration::from_secs(60)).await.unwrap();
        }
        let keys = store.keys("enrollment:*").await.unwrap();
        assert_eq!(keys.len(), 2);
        assert_eq!(store.delete(&keys).await.unwrap(), 2);
        assert_eq!(store.keys("*").await.unwrap(), vec!["other:C".to_string()]);
    }
}
