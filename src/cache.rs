//! Render and route-table cache
//!
//! The cache is an injected collaborator rather than process-wide state:
//! services hold an `Arc<dyn Cache>`, and tests hand in a fresh
//! [`MemoryCache`].

use std::collections::HashMap;
use std::future::Future;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use crate::config::Environment;

#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Option<Value>;
    async fn put(&self, key: &str, value: Value, ttl: Duration);
    async fn forget(&self, key: &str);
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    inserted_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        self.inserted_at.elapsed() > self.ttl
    }
}

/// In-process cache with per-entry expiry
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries
            .read()
            .await
            .values()
            .filter(|entry| !entry.is_expired())
            .count()
    }

    pub async fn flush(&self) {
        self.entries.write().await.clear();
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Option<Value> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if !entry.is_expired() => return Some(entry.value.clone()),
                Some(_) => {}
                None => return None,
            }
        }
        self.entries.write().await.remove(key);
        None
    }

    async fn put(&self, key: &str, value: Value, ttl: Duration) {
        self.entries.write().await.insert(
            key.to_string(),
            CacheEntry {
                value,
                inserted_at: Instant::now(),
                ttl,
            },
        );
    }

    async fn forget(&self, key: &str) {
        self.entries.write().await.remove(key);
    }
}

pub fn minutes(n: u64) -> Duration {
    Duration::from_secs(n * 60)
}

/// Resolve how long a prepared block may be cached.
///
/// An explicit block TTL wins. Without one, non-local runtimes fall back to
/// `default_minutes`; local runtimes do not cache at all.
pub fn block_cache_ttl(
    cache_ttl: Option<i32>,
    environment: Environment,
    default_minutes: u64,
) -> Option<Duration> {
    match cache_ttl {
        Some(ttl) if ttl > 0 => Some(minutes(ttl as u64)),
        _ if environment.is_local() => None,
        _ if default_minutes == 0 => None,
        _ => Some(minutes(default_minutes)),
    }
}

/// Return the cached value for `key`, or compute and store it.
///
/// A `None` TTL bypasses the cache completely.
pub async fn remember<T, E, F, Fut>(
    cache: &dyn Cache,
    key: &str,
    ttl: Option<Duration>,
    compute: F,
) -> Result<T, E>
where
    T: Serialize + DeserializeOwned,
    E: From<serde_json::Error>,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let Some(ttl) = ttl else {
        return compute().await;
    };

    if let Some(cached) = cache.get(key).await {
        match serde_json::from_value(cached) {
            Ok(value) => {
                debug!("Cache hit for {}", key);
                return Ok(value);
            }
            Err(e) => debug!("Discarding unreadable cache entry {}: {}", key, e),
        }
    }

    debug!("Cache miss for {}", key);
    let value = compute().await?;
    cache.put(key, serde_json::to_value(&value)?, ttl).await;
    Ok(value)
}
