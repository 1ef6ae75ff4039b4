//! Purchase ledger: lifetime purchase counts per client.

use std::sync::Arc;
use tracing::{debug, warn};

use super::client::ClientId;
use super::keys::KeySpace;
use crate::store::{KeyValueStore, StoreError};

/// Advisory snapshot of a client's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurchaseStatus {
    pub can_purchase_now: bool,
    pub retry_after_secs: u64,
    pub total_purchases: u64,
}

/// Counts completed purchases per client.
///
/// Counters are refreshed to the retention period on every purchase, so
/// active clients keep their history while dormant ones age out.
pub struct PurchaseLedger {
    store: Arc<dyn KeyValueStore>,
    keys: KeySpace,
    retention_secs: u64,
}

impl PurchaseLedger {
    pub fn new(store: Arc<dyn KeyValueStore>, keys: KeySpace, retention_secs: u64) -> Self {
        Self {
            store,
            keys,
            retention_secs,
        }
    }

    /// Record one purchase and return the new lifetime total.
    ///
    /// Must only be called right after a successful window claim for the same
    /// client; every call adds one.
    pub async fn record_purchase(&self, client: &ClientId) -> Result<u64, StoreError> {
        let key = self.keys.count_key(client);

        let total = self.store.increment(&key).await?;
        if !self.store.set_expiry(&key, self.retention_secs).await? {
            // Only possible if the key vanished between INCR and EXPIRE
            warn!(key = %key, "Purchase counter disappeared before its retention was set");
        }

        debug!(client_id = %client, total, "Purchase recorded");
        Ok(total)
    }

    /// Read the claim TTL and purchase count without mutating either.
    ///
    /// The two lookups run concurrently and are not atomic with each other or
    /// with a concurrent claim; the result is for display only.
    pub async fn read_status(&self, client: &ClientId) -> Result<PurchaseStatus, StoreError> {
        let rate_key = self.keys.rate_key(client);
        let count_key = self.keys.count_key(client);

        let (ttl, total) = futures::try_join!(
            self.store.time_to_live(&rate_key),
            self.store.get(&count_key)
        )?;

        let total_purchases = match total {
            Some(value) => value.parse::<u64>().map_err(|_| StoreError::InvalidValue {
                key: count_key,
                value,
            })?,
            None => 0,
        };

        let remaining = ttl.remaining_secs();
        Ok(PurchaseStatus {
            can_purchase_now: remaining.is_none(),
            retry_after_secs: remaining.unwrap_or(0),
            total_purchases,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::purchase::AdmissionGate;
    use crate::store::{InMemoryStore, KeyTtl, ManualClock};
    use std::time::Duration;

    const RETENTION: u64 = 60 * 60 * 24 * 30;

    fn setup() -> (PurchaseLedger, Arc<InMemoryStore>, ManualClock) {
        let clock = ManualClock::new();
        let store = Arc::new(InMemoryStore::with_clock(Arc::new(clock.clone())));
        let ledger = PurchaseLedger::new(store.clone(), KeySpace::default(), RETENTION);
        (ledger, store, clock)
    }

    fn client(id: &str) -> ClientId {
        ClientId::parse(id).unwrap()
    }

    #[tokio::test]
    async fn test_record_purchase_counts_up() {
        let (ledger, _store, _clock) = setup();
        let c1 = client("c1");

        assert_eq!(ledger.record_purchase(&c1).await.unwrap(), 1);
        assert_eq!(ledger.record_purchase(&c1).await.unwrap(), 2);
        assert_eq!(ledger.record_purchase(&client("c2")).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_record_purchase_refreshes_retention() {
        let (ledger, store, clock) = setup();
        let c1 = client("c1");
        let key = KeySpace::default().count_key(&c1);

        ledger.record_purchase(&c1).await.unwrap();
        assert_eq!(store.time_to_live(&key).await.unwrap(), KeyTtl::Expires(RETENTION));

        clock.advance(Duration::from_secs(RETENTION - 10));
        ledger.record_purchase(&c1).await.unwrap();
        assert_eq!(store.time_to_live(&key).await.unwrap(), KeyTtl::Expires(RETENTION));
    }

    #[tokio::test]
    async fn test_dormant_counter_ages_out() {
        let (ledger, _store, clock) = setup();
        let c1 = client("c1");

        ledger.record_purchase(&c1).await.unwrap();
        clock.advance(Duration::from_secs(RETENTION));

        let status = ledger.read_status(&c1).await.unwrap();
        assert_eq!(status.total_purchases, 0);
    }

    #[tokio::test]
    async fn test_read_status_never_seen() {
        let (ledger, store, _clock) = setup();

        let status = ledger.read_status(&client("ghost")).await.unwrap();
        assert_eq!(
            status,
            PurchaseStatus {
                can_purchase_now: true,
                retry_after_secs: 0,
                total_purchases: 0,
            }
        );
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_read_status_after_claim() {
        let (ledger, store, clock) = setup();
        let gate = AdmissionGate::new(store.clone(), KeySpace::default(), 60);
        let c1 = client("c1");

        gate.try_claim(&c1).await.unwrap();
        ledger.record_purchase(&c1).await.unwrap();

        let status = ledger.read_status(&c1).await.unwrap();
        assert!(!status.can_purchase_now);
        assert_eq!(status.retry_after_secs, 60);
        assert_eq!(status.total_purchases, 1);

        clock.advance(Duration::from_secs(60));
        let status = ledger.read_status(&c1).await.unwrap();
        assert!(status.can_purchase_now);
        assert_eq!(status.retry_after_secs, 0);
        assert_eq!(status.total_purchases, 1);
    }

    #[tokio::test]
    async fn test_read_status_corrupt_counter() {
        let (ledger, store, _clock) = setup();
        let c1 = client("c1");

        store
            .set_if_absent(&KeySpace::default().count_key(&c1), "lots", 60)
            .await
            .unwrap();

        let result = ledger.read_status(&c1).await;
        assert!(matches!(result, Err(StoreError::InvalidValue { .. })));
    }
}
