//! Cache-aside layer over a pluggable key-value store.
//!
//! Results are stored as JSON envelopes carrying their own insertion time and
//! TTL, so a hit can be validated even on a backend without native expiry
//! semantics. Backend failures degrade to cache misses and never fail the
//! request they were supposed to speed up.

pub mod store;

pub use store::{CacheError, CacheStore, MemoryStore, RedisStore, StoreInfo};

use crate::models::EnrollmentResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const KEY_PREFIX: &str = "enrollment";

/// Build the canonical cache key for a subject set and optional term.
///
/// Subjects are upper-cased and sorted so `["csc", "MAT"]` and
/// `["MAT", "CSC"]` address the same entry.
pub fn cache_key(subjects: &[String], term: Option<&str>) -> String {
    let mut codes: Vec<String> = subjects.iter().map(|s| s.trim().to_uppercase()).collect();
    codes.sort();
    let mut key = format!("{KEY_PREFIX}:{}", codes.join(":"));
    if let Some(term) = term {
        key.push_str(&format!(":term:{term}"));
    }
    key
}

/// Envelope written to the store: the result plus enough metadata to judge
/// freshness independently of the backend.
#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    inserted_at: DateTime<Utc>,
    ttl_seconds: u64,
    result: EnrollmentResult,
}

impl CacheEntry {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(self.inserted_at);
        age >= chrono::Duration::zero() && age.num_seconds() < self.ttl_seconds as i64
    }
}

/// Stats snapshot for the cache endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub connected: bool,
    pub enrollment_keys: u64,
    #[serde(flatten)]
    pub store: Option<StoreInfo>,
}

/// Cache-aside access to enrollment results.
#[derive(Clone)]
pub struct CacheLayer {
    store: Arc<dyn CacheStore>,
    default_ttl: Duration,
}

impl CacheLayer {
    pub fn new(store: Arc<dyn CacheStore>, default_ttl: Duration) -> Self {
        Self { store, default_ttl }
    }

    /// Look up a cached result. Any failure on the way (backend error, corrupt
    /// payload, stale envelope) is a miss; corrupt and stale entries are
    /// deleted so they are not rechecked.
    pub async fn lookup(&self, key: &str) -> Option<EnrollmentResult> {
        let raw = match self.store.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(key, error = %e, "cache read failed, treating as miss");
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key, error = %e, "corrupt cache entry, evicting");
                let _ = self.store.delete(&[key.to_string()]).await;
                return None;
            }
        };

        if !entry.is_fresh(Utc::now()) {
            debug!(key, "stale cache entry, evicting");
            let _ = self.store.delete(&[key.to_string()]).await;
            return None;
        }

        debug!(key, sections = entry.result.total_sections, "cache hit");
        Some(entry.result)
    }

    /// Store a result under the default TTL. Best-effort: a write failure is
    /// logged and reported as `false`, never propagated.
    pub async fn store(&self, key: &str, result: &EnrollmentResult) -> bool {
        let entry = CacheEntry {
            inserted_at: Utc::now(),
            ttl_seconds: self.default_ttl.as_secs(),
            result: result.clone(),
        };
        let raw = match serde_json::to_string(&entry) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key, error = %e, "failed to serialize cache entry");
                return false;
            }
        };
        match self.store.set_ex(key, &raw, self.default_ttl).await {
            Ok(()) => {
                debug!(key, ttl_seconds = self.default_ttl.as_secs(), "cache write");
                true
            }
            Err(e) => {
                warn!(key, error = %e, "cache write failed");
                false
            }
        }
    }

    /// Delete every key matching the glob pattern, returning how many were
    /// removed. A pattern matching nothing is a successful zero.
    pub async fn invalidate(&self, pattern: &str) -> Result<u64, CacheError> {
        let keys = self.store.keys(pattern).await?;
        if keys.is_empty() {
            return Ok(0);
        }
        let deleted = self.store.delete(&keys).await?;
        debug!(pattern, deleted, "cache invalidation");
        Ok(deleted)
    }

    /// Backend health and key counts for the stats endpoint. Never errors;
    /// an unreachable backend reports as disconnected.
    pub async fn stats(&self) -> CacheStats {
        let connected = self.store.ping().await.is_ok();
        let enrollment_keys = match self.store.keys(&format!("{KEY_PREFIX}:*")).await {
            Ok(keys) => keys.len() as u64,
            Err(_) => 0,
        };
        let store = self.store.info().await.ok();
        CacheStats {
            connected,
            enrollment_keys,
            store,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn result_fixture() -> EnrollmentResult {
        EnrollmentResult {
            subjects: vec!["CSC".to_string()],
            term: Some("2025FA".to_string()),
            sections: vec![],
            total_sections: 0,
            retrieved_at: Utc::now(),
            processing_time_seconds: 0.25,
            errors: None,
        }
    }

    fn layer(ttl: Duration) -> CacheLayer {
        CacheLayer::new(Arc::new(MemoryStore::new()), ttl)
    }

    #[test]
    fn key_is_order_and_case_insensitive() {
        let a = cache_key(&["csc".to_string(), "MAT".to_string()], None);
        let b = cache_key(&["MAT".to_string(), "CSC".to_string()], None);
        assert_eq!(a, b);
        assert_eq!(a, "enrollment:CSC:MAT");
    }

    #[test]
    fn key_embeds_term() {
        let key = cache_key(&["CSC".to_string()], Some("2025FA"));
        assert_eq!(key, "enrollment:CSC:term:2025FA");
    }

    #[tokio::test]
    async fn roundtrip_hit_then_invalidate() {
        let cache = layer(Duration::from_secs(60));
        let key = cache_key(&["CSC".to_string()], Some("2025FA"));
        assert!(cache.lookup(&key).await.is_none());

        assert!(cache.store(&key, &result_fixture()).await);
        let hit = cache.lookup(&key).await.expect("expected cache hit");
        assert_eq!(hit.subjects, vec!["CSC"]);

        assert_eq!(cache.invalidate("enrollment:*").await.unwrap(), 1);
        assert!(cache.lookup(&key).await.is_none());
        assert_eq!(cache.invalidate("enrollment:*").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn stale_envelope_is_a_miss() {
        let cache = layer(Duration::from_millis(10));
        let key = cache_key(&["CSC".to_string()], None);
        assert!(cache.store(&key, &result_fixture()).await);
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert!(cache.lookup(&key).await.is_none());
    }

    #[tokio::test]
    async fn corrupt_entry_is_evicted() {
        let store = Arc::new(MemoryStore::new());
        let cache = CacheLayer::new(store.clone(), Duration::from_secs(60));
        store
            .set_ex("enrollment:CSC", "not json", Duration::from_secs(60))
            .await
            .unwrap();
        assert!(cache.lookup("enrollment:CSC").await.is_none());
        assert!(store.get("enrollment:CSC").await.unwrap().is_none());
    }
}
