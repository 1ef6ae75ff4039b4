//! Purchase service composing the gate and the ledger.

use std::sync::Arc;
use tracing::{debug, info};

use super::client::ClientId;
use super::gate::{AdmissionGate, ClaimOutcome};
use super::keys::KeySpace;
use super::ledger::PurchaseLedger;
use super::observer::{FailureObserver, TracingObserver};
use crate::config::LimitsConfig;
use crate::error::{CornstandError, Result};
use crate::store::{KeyValueStore, StoreError};

/// Result of a purchase attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseOutcome {
    /// The purchase went through.
    Purchased {
        total_purchases: u64,
        retry_after_secs: u64,
    },
    /// The client already purchased within the current window.
    RateLimited { retry_after_secs: u64 },
}

/// Advisory view of one client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientStatus {
    pub client_id: ClientId,
    pub can_purchase: bool,
    pub retry_after_secs: u64,
    pub total_purchases: u64,
}

/// Entry point for purchase, status and health operations.
///
/// Store failures are handed to the [`FailureObserver`] and returned as
/// [`CornstandError::Store`]; they are never turned into an allow or deny
/// decision and never retried.
pub struct PurchaseService {
    store: Arc<dyn KeyValueStore>,
    gate: AdmissionGate,
    ledger: PurchaseLedger,
    observer: Arc<dyn FailureObserver>,
}

impl PurchaseService {
    /// Create a service whose keys live under `namespace`.
    pub fn new(store: Arc<dyn KeyValueStore>, namespace: &str, limits: LimitsConfig) -> Self {
        let keys = KeySpace::new(namespace);
        Self {
            gate: AdmissionGate::new(store.clone(), keys.clone(), limits.window_secs),
            ledger: PurchaseLedger::new(store.clone(), keys, limits.retention_secs),
            store,
            observer: Arc::new(TracingObserver),
        }
    }

    /// Replace the failure observer.
    pub fn with_observer(mut self, observer: Arc<dyn FailureObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn window_secs(&self) -> u64 {
        self.gate.window_secs()
    }

    /// Claim the window for `raw_client_id` and, if that succeeds, count the purchase.
    pub async fn purchase(&self, raw_client_id: &str) -> Result<PurchaseOutcome> {
        let client = ClientId::parse(raw_client_id)?;

        let claim = self
            .gate
            .try_claim(&client)
            .await
            .map_err(|e| self.report("try_claim", Some(&client), e))?;

        match claim {
            ClaimOutcome::Rejected { retry_after_secs } => {
                info!(client_id = %client, retry_after_secs, "Purchase rate limited");
                Ok(PurchaseOutcome::RateLimited { retry_after_secs })
            }
            ClaimOutcome::Claimed => {
                let total_purchases = self
                    .ledger
                    .record_purchase(&client)
                    .await
                    .map_err(|e| self.report("record_purchase", Some(&client), e))?;

                info!(client_id = %client, total_purchases, "Purchase completed");
                Ok(PurchaseOutcome::Purchased {
                    total_purchases,
                    retry_after_secs: self.window_secs(),
                })
            }
        }
    }

    /// Read a client's eligibility and lifetime total without changing them.
    pub async fn status(&self, raw_client_id: &str) -> Result<ClientStatus> {
        let client = ClientId::parse(raw_client_id)?;

        let status = self
            .ledger
            .read_status(&client)
            .await
            .map_err(|e| self.report("read_status", Some(&client), e))?;

        debug!(client_id = %client, status = ?status, "Status read");
        Ok(ClientStatus {
            client_id: client,
            can_purchase: status.can_purchase_now,
            retry_after_secs: status.retry_after_secs,
            total_purchases: status.total_purchases,
        })
    }

    /// Ping the store.
    pub async fn health(&self) -> Result<String> {
        self.store
            .ping()
            .await
            .map_err(|e| self.report("ping", None, e))
    }

    fn report(
        &self,
        operation: &'static str,
        client: Option<&ClientId>,
        error: StoreError,
    ) -> CornstandError {
        self.observer.store_failed(operation, client, &error);
        CornstandError::Store(error)
    }
}
