//! Process-local store for development and tests.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::trace;

use super::clock::{Clock, SystemClock};
use super::{millis_to_ttl_secs, KeyTtl, KeyValueStore, StoreError};

#[derive(Debug, Clone)]
struct StoredValue {
    value: String,
    expires_at: Option<Instant>,
}

impl StoredValue {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// In-memory [`KeyValueStore`] with Redis-like expiry semantics.
///
/// Each operation goes through the map's entry API, so it is atomic per key.
/// Expired entries are dropped lazily when touched; nothing sweeps in the
/// background. State is not shared between processes, so this store is only
/// correct for a single instance.
pub struct InMemoryStore {
    entries: DashMap<String, StoredValue>,
    clock: Arc<dyn Clock>,
}

impl InMemoryStore {
    /// Create a store driven by the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create a store driven by `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        let now = self.clock.now();
        self.entries.iter().filter(|e| !e.is_expired(now)).count()
    }

    /// Whether no live keys are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn purge_if_expired(&self, key: &str, now: Instant) {
        if self.entries.remove_if(key, |_, v| v.is_expired(now)).is_some() {
            trace!(key = %key, "Dropped expired key");
        }
    }

    fn expiry(now: Instant, ttl_secs: u64) -> Result<Instant, StoreError> {
        now.checked_add(Duration::from_secs(ttl_secs))
            .ok_or(StoreError::TtlOutOfRange(ttl_secs))
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl_secs: u64,
    ) -> Result<bool, StoreError> {
        let now = self.clock.now();
        let fresh = StoredValue {
            value: value.to_string(),
            expires_at: Some(Self::expiry(now, ttl_secs)?),
        };

        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_expired(now) {
                    occupied.insert(fresh);
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(fresh);
                Ok(true)
            }
        }
    }

    async fn time_to_live(&self, key: &str) -> Result<KeyTtl, StoreError> {
        let now = self.clock.now();
        self.purge_if_expired(key, now);

        let ttl = match self.entries.get(key) {
            None => KeyTtl::Missing,
            Some(entry) => match entry.expires_at {
                None => KeyTtl::Persistent,
                Some(at) => {
                    let millis = at.saturating_duration_since(now).as_millis() as u64;
                    KeyTtl::Expires(millis_to_ttl_secs(millis))
                }
            },
        };
        Ok(ttl)
    }

    async fn increment(&self, key: &str) -> Result<u64, StoreError> {
        let now = self.clock.now();
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_expired(now) {
                    occupied.insert(StoredValue {
                        value: "1".to_string(),
                        expires_at: None,
                    });
                    return Ok(1);
                }

                let stored = occupied.get_mut();
                let current: u64 = stored.value.parse().map_err(|_| StoreError::InvalidValue {
                    key: key.to_string(),
                    value: stored.value.clone(),
                })?;
                let next = current + 1;
                stored.value = next.to_string();
                Ok(next)
            }
            Entry::Vacant(vacant) => {
                vacant.insert(StoredValue {
                    value: "1".to_string(),
                    expires_at: None,
                });
                Ok(1)
            }
        }
    }

    async fn set_expiry(&self, key: &str, ttl_secs: u64) -> Result<bool, StoreError> {
        let now = self.clock.now();
        let expires_at = Self::expiry(now, ttl_secs)?;
        self.purge_if_expired(key, now);

        match self.entries.get_mut(key) {
            Some(mut entry) => {
                entry.expires_at = Some(expires_at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = self.clock.now();
        self.purge_if_expired(key, now);
        Ok(self.entries.get(key).map(|entry| entry.value.clone()))
    }

    async fn ping(&self) -> Result<String, StoreError> {
        Ok("PONG".to_string())
    }
}
