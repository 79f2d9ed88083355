//! For interacting with the cache.

use super::config::CacheConfig;
use redis::{aio::ConnectionManager, AsyncCommands, FromRedisValue, RedisError, ToRedisArgs};

/// A cache connection.
///
/// Clones share the same multiplexed connection.
#[derive(Clone)]
pub struct Cache {
    conn: ConnectionManager,
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache").finish_non_exhaustive()
    }
}

impl Cache {
    /// Connects to the cache and checks that it responds.
    #[tracing::instrument(skip_all, fields(host = %config.host, port = config.port, db = config.db))]
    pub async fn connect(config: &CacheConfig) -> Result<Self, RedisError> {
        let connect = async {
            let client = redis::Client::open(config.connection_info())?;
            let conn = ConnectionManager::new_with_backoff(client, 2, 100, 0).await?;
            let cache = Self { conn };
            cache.ping().await?;
            Ok::<_, RedisError>(cache)
        };
        let cache = connect
            .await
            .inspect_err(|e| tracing::error!(error = %e, "connect to cache failed"))?;
        tracing::info!("Connected to cache");
        Ok(cache)
    }

    /// Checks that the cache responds.
    pub async fn ping(&self) -> Result<(), RedisError> {
        let mut conn = self.conn.clone();
        redis::cmd("PING").query_async::<_, ()>(&mut conn).await
    }

    /// Reads a value.
    pub async fn get<V: FromRedisValue>(&self, key: &str) -> Result<Option<V>, RedisError> {
        let mut conn = self.conn.clone();
        conn.get(key).await
    }

    /// Writes a value that expires after `seconds`.
    pub async fn set_ex<V>(&self, key: &str, value: V, seconds: u64) -> Result<(), RedisError>
    where
        V: ToRedisArgs + Send + Sync,
    {
        let mut conn = self.conn.clone();
        conn.set_ex(key, value, seconds).await
    }

    /// Deletes a value.
    pub async fn del(&self, key: &str) -> Result<(), RedisError> {
        let mut conn = self.conn.clone();
        conn.del(key).await
    }

    /// Releases the connection.
    pub async fn close(self) {
        tracing::info!("Closing cache connection");
        drop(self.conn);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::config::load_config;

    #[tokio::test]
    async fn connect_fails_when_cache_is_unreachable() {
        let config = CacheConfig {
            host: "127.0.0.1".to_string(),
            // Reserved port, nothing listens here.
            port: 1,
            password: None,
            db: 0,
        };
        assert!(Cache::connect(&config).await.is_err());
    }

    #[tokio::test]
    #[ignore = "requires cache"]
    async fn set_get_del() {
        let config = load_config().unwrap();
        let cache = Cache::connect(&config.cache).await.unwrap();
        cache.set_ex("scaffold:test", "value", 60).await.unwrap();
        let value: Option<String> = cache.get("scaffold:test").await.unwrap();
        assert_eq!(Some("value".to_string()), value);
        cache.del("scaffold:test").await.unwrap();
        let value: Option<String> = cache.get("scaffold:test").await.unwrap();
        assert_eq!(None, value);
        cache.close().await;
    }
}
