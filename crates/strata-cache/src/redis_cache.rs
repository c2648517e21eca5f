//! Redis shared-cache backend.
//!
//! Commands go through a deadpool connection pool. Each subscription opens a
//! dedicated pub/sub connection, since a subscribed connection cannot issue
//! regular commands.

use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Connection, Pool};
use futures_util::StreamExt;
use redis::AsyncCommands;
use strata_storage::{MessageStream, SharedCache, StorageError};

use crate::config::RedisConfig;
use crate::error::RedisCacheError;

pub struct RedisSharedCache {
    pool: Pool,
    client: redis::Client,
}

impl RedisSharedCache {
    /// Wrap an existing pool. `url` is used for pub/sub connections.
    pub fn new(pool: Pool, url: &str) -> Result<Self, RedisCacheError> {
        let client = redis::Client::open(url)?;
        Ok(Self { pool, client })
    }

    /// Create a pool from configuration without opening a connection.
    ///
    /// Connections are made on first use, so a Redis that is down now is
    /// picked up once it returns.
    pub fn from_config(config: &RedisConfig) -> Result<Self, RedisCacheError> {
        let mut redis_config = deadpool_redis::Config::from_url(&config.url);
        let timeout = Duration::from_millis(config.timeout_ms);
        let pool_config = redis_config
            .pool
            .get_or_insert_with(|| deadpool_redis::PoolConfig::new(config.pool_size));
        pool_config.max_size = config.pool_size;
        pool_config.timeouts.wait = Some(timeout);
        pool_config.timeouts.create = Some(timeout);
        pool_config.timeouts.recycle = Some(timeout);

        let pool = redis_config
            .create_pool(Some(deadpool_redis::Runtime::Tokio1))
            .map_err(|e| RedisCacheError::Pool(e.to_string()))?;
        Self::new(pool, &config.url)
    }

    /// Create a pool from configuration and check that Redis answers.
    pub async fn connect(config: &RedisConfig) -> Result<Self, RedisCacheError> {
        tracing::info!(url = %config.url, "Connecting to Redis");
        let cache = Self::from_config(config)?;
        cache.ping().await?;
        tracing::info!("Connected to Redis");
        Ok(cache)
    }

    /// Check out a pooled connection.
    pub async fn ping(&self) -> Result<(), RedisCacheError> {
        self.pool
            .get()
            .await
            .map(drop)
            .map_err(|e| RedisCacheError::Pool(e.to_string()))
    }

    async fn conn(&self) -> Result<Connection, StorageError> {
        self.pool.get().await.map_err(|e| {
            StorageError::connection_error(format!("failed to get Redis connection: {e}"))
        })
    }
}

fn command_error(op: &str, err: redis::RedisError) -> StorageError {
    if err.is_io_error() || err.is_connection_dropped() || err.is_timeout() {
        StorageError::connection_error(format!("Redis {op} failed: {err}"))
    } else {
        StorageError::internal(format!("Redis {op} failed: {err}"))
    }
}

#[async_trait]
impl SharedCache for RedisSharedCache {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let mut conn = self.conn().await?;
        conn.get::<_, Option<String>>(key)
            .await
            .map_err(|e| command_error("GET", e))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut conn = self.conn().await?;
        conn.set::<_, _, ()>(key, value)
            .await
            .map_err(|e| command_error("SET", e))
    }

    async fn del(&self, key: &str) -> Result<(), StorageError> {
        let mut conn = self.conn().await?;
        conn.del::<_, ()>(key)
            .await
            .map_err(|e| command_error("DEL", e))
    }

    async fn publish(&self, channel: &str, payload: &[u8]) -> Result<(), StorageError> {
        let mut conn = self.conn().await?;
        conn.publish::<_, _, ()>(channel, payload)
            .await
            .map_err(|e| command_error("PUBLISH", e))
    }

    async fn subscribe(&self, channel: &str) -> Result<MessageStream, StorageError> {
        let mut pubsub = self.client.get_async_pubsub().await.map_err(|e| {
            StorageError::subscription(format!("failed to get pub/sub connection: {e}"))
        })?;
        pubsub
            .subscribe(channel)
            .await
            .map_err(|e| StorageError::subscription(format!("failed to subscribe: {e}")))?;

        Ok(pubsub
            .into_on_message()
            .map(|msg| msg.get_payload_bytes().to_vec())
            .boxed())
    }
}
