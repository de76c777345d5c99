use deadpool_redis::redis::AsyncCommands;
use deadpool_redis::{Config as RedisConfig, Pool as RedisPool, Runtime};

/// JSON response cache on Redis.
///
/// Callers treat every operation as best-effort: a cold or unreachable
/// Redis degrades to uncached responses, never to request failures.
#[derive(Clone)]
pub struct ResponseCache {
    pool: RedisPool,
}

impl ResponseCache {
    pub fn connect(redis_url: &str) -> anyhow::Result<Self> {
        let cfg = RedisConfig::from_url(redis_url);
        let pool = cfg.create_pool(Some(Runtime::Tokio1))?;
        Ok(Self { pool })
    }

    pub async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        key: &str,
    ) -> anyhow::Result<Option<T>> {
        let mut conn = self.pool.get().await?;
        let v: Option<String> = conn.get(key).await?;
        Ok(match v {
            Some(s) => Some(serde_json::from_str(&s)?),
            None => None,
        })
    }

    pub async fn set_json<T: serde::Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl_secs: u64,
    ) -> anyhow::Result<()> {
        let mut conn = self.pool.get().await?;
        let s = serde_json::to_string(value)?;
        conn.set_ex::<_, _, ()>(key, s, ttl_secs).await?;
        Ok(())
    }

    /// Drops every key under a tag prefix, e.g. `books:*` after a write to
    /// the books table.
    pub async fn invalidate(&self, pattern: &str) -> anyhow::Result<()> {
        let mut conn = self.pool.get().await?;
        let keys: Vec<String> = conn.keys(pattern).await?;
        if !keys.is_empty() {
            conn.del::<_, ()>(keys).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Pool creation is lazy, so no Redis server is needed here.
    #[test]
    fn cache_handle_clones_into_shared_state() {
        let cache = ResponseCache::connect("redis://127.0.0.1:6379").expect("valid redis url");
        let _cloned = cache.clone();
    }
}
