use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

pub type CacheResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Read-path cache keyed by namespace and entry key. Correctness never
/// depends on it: callers treat every failure as a miss, and writers evict a
/// whole namespace rather than tracking individual keys.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, namespace: &str, key: &str) -> CacheResult<Option<Value>>;

    async fn put(&self, namespace: &str, key: &str, value: Value) -> CacheResult<()>;

    /// Drops every entry in the namespace.
    async fn evict_all(&self, namespace: &str) -> CacheResult<()>;
}

/// Process-local cache used by tests and single-node deployments.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, HashMap<String, Value>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, namespace: &str, key: &str) -> CacheResult<Option<Value>> {
        let entries = self.entries.lock().unwrap();
        Ok(entries
            .get(namespace)
            .and_then(|ns| ns.get(key))
            .cloned())
    }

    async fn put(&self, namespace: &str, key: &str, value: Value) -> CacheResult<()> {
        let mut entries = self.entries.lock().unwrap();
        entries
            .entry(namespace.to_string())
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn evict_all(&self, namespace: &str) -> CacheResult<()> {
        let mut entries = self.entries.lock().unwrap();
        entries.remove(namespace);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn eviction_clears_only_the_namespace() {
        let cache = MemoryCache::new();
        cache.put("orders", "a", json!({"id": "a"})).await.unwrap();
        cache.put("products", "p", json!({"id": "p"})).await.unwrap();

        cache.evict_all("orders").await.unwrap();

        assert!(cache.get("orders", "a").await.unwrap().is_none());
        assert_eq!(
            cache.get("products", "p").await.unwrap(),
            Some(json!({"id": "p"}))
        );
    }
}
