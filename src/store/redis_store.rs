//! Redis-backed store.
//!
//! Lets any number of service instances share admission state. Commands map
//! one-to-one onto [`KeyValueStore`] operations:
//!
//! - `set_if_absent` → `SET key value EX ttl NX`
//! - `time_to_live` → `PTTL key`, rounded up to whole seconds
//! - `increment` → `INCR key`
//! - `set_expiry` → `EXPIRE key ttl`
//! - `get` → `GET key`
//! - `ping` → `PING`
//!
//! Every command is bounded by the configured operation timeout. Errors are
//! returned to the caller; nothing is retried here beyond what
//! `ConnectionManager` does when reconnecting.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, RedisError};
use std::fmt;
use std::time::Duration;
use tracing::debug;

use super::{millis_to_ttl_secs, with_timeout, KeyTtl, KeyValueStore, StoreError};

impl From<RedisError> for StoreError {
    fn from(err: RedisError) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

/// Configuration for Redis storage.
#[derive(Debug, Clone)]
pub struct RedisStoreConfig {
    /// Upper bound on a single command round-trip (default: 2 seconds)
    pub operation_timeout: Duration,
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            operation_timeout: Duration::from_secs(2),
        }
    }
}

/// [`KeyValueStore`] backed by a Redis server.
#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
    config: RedisStoreConfig,
}

impl fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RedisStore {
    /// Connect to Redis with default configuration.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        Self::connect_with_config(url, RedisStoreConfig::default()).await
    }

    /// Connect to Redis with custom configuration.
    ///
    /// The initial connection is bounded by the operation timeout as well.
    pub async fn connect_with_config(
        url: &str,
        config: RedisStoreConfig,
    ) -> Result<Self, StoreError> {
        let client = Client::open(url)?;
        let connection = with_timeout("connect", config.operation_timeout, async {
            Ok(ConnectionManager::new(client).await?)
        })
        .await?;

        debug!(timeout = ?config.operation_timeout, "Connected to Redis");
        Ok(Self { connection, config })
    }

    fn timeout(&self) -> Duration {
        self.config.operation_timeout
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl_secs: u64,
    ) -> Result<bool, StoreError> {
        let mut conn = self.connection.clone();
        with_timeout("set_if_absent", self.timeout(), async move {
            let reply: Option<String> = redis::cmd("SET")
                .arg(key)
                .arg(value)
                .arg("EX")
                .arg(ttl_secs)
                .arg("NX")
                .query_async(&mut conn)
                .await?;
            Ok(reply.is_some())
        })
        .await
    }

    async fn time_to_live(&self, key: &str) -> Result<KeyTtl, StoreError> {
        let mut conn = self.connection.clone();
        with_timeout("time_to_live", self.timeout(), async move {
            let millis: i64 = redis::cmd("PTTL").arg(key).query_async(&mut conn).await?;
            Ok(match millis {
                -2 => KeyTtl::Missing,
                -1 => KeyTtl::Persistent,
                ms if ms >= 0 => KeyTtl::Expires(millis_to_ttl_secs(ms as u64)),
                other => {
                    return Err(StoreError::InvalidValue {
                        key: key.to_string(),
                        value: format!("PTTL {}", other),
                    })
                }
            })
        })
        .await
    }

    async fn increment(&self, key: &str) -> Result<u64, StoreError> {
        let mut conn = self.connection.clone();
        with_timeout("increment", self.timeout(), async move {
            let total: i64 = conn.incr(key, 1i64).await?;
            u64::try_from(total).map_err(|_| StoreError::InvalidValue {
                key: key.to_string(),
                value: total.to_string(),
            })
        })
        .await
    }

    async fn set_expiry(&self, key: &str, ttl_secs: u64) -> Result<bool, StoreError> {
        let mut conn = self.connection.clone();
        with_timeout("set_expiry", self.timeout(), async move {
            let updated: i64 = redis::cmd("EXPIRE")
                .arg(key)
                .arg(ttl_secs)
                .query_async(&mut conn)
                .await?;
            Ok(updated == 1)
        })
        .await
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.connection.clone();
        with_timeout("get", self.timeout(), async move {
            let value: Option<String> = conn.get(key).await?;
            Ok(value)
        })
        .await
    }

    async fn ping(&self) -> Result<String, StoreError> {
        let mut conn = self.connection.clone();
        with_timeout("ping", self.timeout(), async move {
            let reply: String = redis::cmd("PING").query_async(&mut conn).await?;
            Ok(reply)
        })
        .await
    }
}
