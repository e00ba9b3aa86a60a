//! Small keyed cache with a fixed time-to-live, used for dashboard reads.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

pub const DEFAULT_TTL: Duration = Duration::from_secs(10 * 60);

#[derive(Debug)]
pub struct TtlCache<V> {
    ttl: Duration,
    entries: RwLock<HashMap<String, (Instant, V)>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The cached value, unless it is older than the TTL.
    pub async fn get(&self, key: &str) -> Option<V> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|(stored_at, _)| stored_at.elapsed() < self.ttl)
            .map(|(_, value)| value.clone())
    }

    /// Store `value` under `key`. Expired entries are dropped on the way.
    pub async fn insert(&self, key: impl Into<String>, value: V) {
        let ttl = self.ttl;
        let mut entries = self.entries.write().await;
        entries.retain(|_, (stored_at, _)| stored_at.elapsed() < ttl);
        entries.insert(key.into(), (Instant::now(), value));
    }

    /// Number of entries held, expired ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn invalidate(&self, key: &str) {
        self.entries.write().await.remove(key);
    }

    /// Drop every entry whose key starts with `prefix`.
    pub async fn invalidate_prefix(&self, prefix: &str) {
        self.entries
            .write()
            .await
            .retain(|key, _| !key.starts_with(prefix));
    }

    /// Return the cached value or compute, store and return a fresh one.
    /// Errors are passed through and nothing is cached.
    pub async fn get_or_try_insert_with<F, Fut, E>(&self, key: &str, init: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(hit) = self.get(key).await {
            return Ok(hit);
        }
        let value = init().await?;
        self.insert(key, value.clone()).await;
        Ok(value)
    }
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.insert("tip", 1u32).await;
        assert_eq!(cache.get("tip").await, Some(1));

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(cache.get("tip").await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn insert_drops_expired_entries() {
        let cache = TtlCache::new(Duration::from_secs(60));
        for columns in 0..50u32 {
            cache.insert(format!("bins?max_columns={columns}"), columns).await;
        }
        assert_eq!(cache.len().await, 50);

        tokio::time::advance(Duration::from_secs(61)).await;
        cache.insert("tip", 1).await;
        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.get("tip").await, Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn loader_runs_once_while_fresh() {
        let cache: TtlCache<String> = TtlCache::default();
        let mut loads = 0;

        for _ in 0..3 {
            let value = cache
                .get_or_try_insert_with("totals", || {
                    loads += 1;
                    async { Ok::<_, String>("payload".to_string()) }
                })
                .await
                .unwrap();
            assert_eq!(value, "payload");
        }
        assert_eq!(loads, 1);
    }

    #[tokio::test]
    async fn errors_are_not_cached() {
        let cache: TtlCache<u8> = TtlCache::default();
        let err = cache
            .get_or_try_insert_with("k", || async { Err::<u8, _>("boom") })
            .await;
        assert_eq!(err, Err("boom"));
        assert_eq!(cache.get("k").await, None);

        cache.insert("api:a", 1).await;
        cache.insert("api:b", 2).await;
        cache.invalidate_prefix("api:").await;
        assert_eq!(cache.get("api:a").await, None);
    }
}
