use async_trait::async_trait;
use mercato_core::{Cache, CacheResult};
use redis::AsyncCommands;
use serde_json::Value;
use tracing::debug;

#[derive(Clone)]
pub struct RedisCache {
    client: redis::Client,
    ttl_seconds: u64,
}

impl RedisCache {
    pub fn new(connection_string: &str, ttl_seconds: u64) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client, ttl_seconds })
    }

    fn entry_key(namespace: &str, key: &str) -> String {
        format!("{}:{}", namespace, key)
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, namespace: &str, key: &str) -> CacheResult<Option<Value>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let raw: Option<String> = conn.get(Self::entry_key(namespace, key)).await?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn put(&self, namespace: &str, key: &str, value: Value) -> CacheResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let json = serde_json::to_string(&value)?;
        conn.set_ex::<_, _, ()>(Self::entry_key(namespace, key), json, self.ttl_seconds)
            .await?;
        Ok(())
    }

    async fn evict_all(&self, namespace: &str) -> CacheResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        // SCAN-walk the namespace; wholesale eviction keeps writers from
        // having to track which keys exist.
        let pattern = format!("{}:*", namespace);
        let mut cursor: u64 = 0;
        let mut removed = 0usize;
        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await?;

            if !keys.is_empty() {
                removed += keys.len();
                conn.del::<_, ()>(keys).await?;
            }

            cursor = next;
            if cursor == 0 {
                break;
            }
        }
        debug!(namespace, removed, "cache namespace evicted");
        Ok(())
    }
}
