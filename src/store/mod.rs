//! Shared key-value store with expiring entries.
//!
//! All per-client state lives behind [`KeyValueStore`]; the admission gate and
//! purchase ledger only talk to it through the atomic primitives defined here.

mod clock;
mod memory;
#[cfg(feature = "redis-store")]
mod redis_store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use memory::InMemoryStore;
#[cfg(feature = "redis-store")]
pub use redis_store::{RedisStore, RedisStoreConfig};

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Errors reported by a store adapter.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store operation `{operation}` timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },
    #[error("unexpected value at `{key}`: {value}")]
    InvalidValue { key: String, value: String },
    #[error("expiry of {0}s is out of range")]
    TtlOutOfRange(u64),
}

/// Remaining lifetime of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTtl {
    /// Key exists and expires after this many whole seconds.
    Expires(u64),
    /// Key exists without an expiry.
    Persistent,
    /// Key does not exist (or has already expired).
    Missing,
}

impl KeyTtl {
    /// Remaining seconds when the key exists and is still counting down.
    pub fn remaining_secs(&self) -> Option<u64> {
        match self {
            KeyTtl::Expires(secs) if *secs > 0 => Some(*secs),
            _ => None,
        }
    }
}

/// Operations the service needs from a shared store.
///
/// Every method must be atomic with respect to concurrent callers on the
/// same key; in particular `set_if_absent` is a single conditional write.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Create `key` with `value` expiring after `ttl_secs`, only if absent.
    ///
    /// Returns `true` when the key was created.
    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl_secs: u64,
    ) -> Result<bool, StoreError>;

    /// Remaining lifetime of `key`.
    async fn time_to_live(&self, key: &str) -> Result<KeyTtl, StoreError>;

    /// Increment the integer at `key`, starting from 0 when absent.
    async fn increment(&self, key: &str) -> Result<u64, StoreError>;

    /// Reset the expiry of `key`. Returns `false` when the key is absent.
    async fn set_expiry(&self, key: &str, ttl_secs: u64) -> Result<bool, StoreError>;

    /// Current value at `key`.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Liveness check, returning the store's reply.
    async fn ping(&self) -> Result<String, StoreError>;
}

/// Run a store round-trip under `timeout`, reporting expiry as [`StoreError::Timeout`].
pub async fn with_timeout<T, F>(
    operation: &'static str,
    timeout: Duration,
    fut: F,
) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout { operation, timeout }),
    }
}

/// Convert a remaining lifetime in milliseconds to whole seconds, rounding up
/// so a key reported with `n` seconds left is gone by then.
pub(crate) fn millis_to_ttl_secs(millis: u64) -> u64 {
    millis.div_ceil(1000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remaining_secs() {
        assert_eq!(KeyTtl::Expires(12).remaining_secs(), Some(12));
        assert_eq!(KeyTtl::Expires(0).remaining_secs(), None);
        assert_eq!(KeyTtl::Persistent.remaining_secs(), None);
        assert_eq!(KeyTtl::Missing.remaining_secs(), None);
    }

    #[test]
    fn test_millis_round_up() {
        assert_eq!(millis_to_ttl_secs(0), 0);
        assert_eq!(millis_to_ttl_secs(1), 1);
        assert_eq!(millis_to_ttl_secs(1000), 1);
        assert_eq!(millis_to_ttl_secs(59_001), 60);
    }

    #[tokio::test]
    async fn test_with_timeout_elapsed() {
        let result: Result<(), StoreError> = with_timeout("ping", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        assert!(matches!(
            result,
            Err(StoreError::Timeout { operation: "ping", .. })
        ));
    }

    #[tokio::test]
    async fn test_with_timeout_passes_result() {
        let result = with_timeout("get", Duration::from_secs(1), async { Ok(7u64) }).await;
        assert_eq!(result.unwrap(), 7);
    }
}
