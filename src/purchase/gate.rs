//! Admission gate: one purchase window per client.

use std::sync::Arc;
use tracing::{debug, trace};

use super::client::ClientId;
use super::keys::KeySpace;
use crate::store::{KeyValueStore, StoreError};

/// Value stored under a claim key. Only the key's existence and TTL matter.
const CLAIM_MARKER: &str = "1";

/// Result of a claim attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The client now holds the window.
    Claimed,
    /// A window is already held; retry after this many seconds.
    Rejected { retry_after_secs: u64 },
}

/// Decides whether a client may purchase right now.
///
/// A client is `Open` while no claim key exists and `Claimed` while one does.
/// The only way in is [`AdmissionGate::try_claim`]; the only way out is the
/// store expiring the key after the window.
pub struct AdmissionGate {
    store: Arc<dyn KeyValueStore>,
    keys: KeySpace,
    window_secs: u64,
}

impl AdmissionGate {
    /// Create a gate with a fixed window length in seconds.
    pub fn new(store: Arc<dyn KeyValueStore>, keys: KeySpace, window_secs: u64) -> Self {
        Self {
            store,
            keys,
            window_secs,
        }
    }

    pub fn window_secs(&self) -> u64 {
        self.window_secs
    }

    /// Atomically claim the current window for `client`.
    ///
    /// The claim is a single conditional create-with-expiry. On rejection the
    /// remaining TTL is looked up; when the store cannot report one (no
    /// expiry recorded, or the key expired in between) the full window is
    /// reported instead of zero.
    pub async fn try_claim(&self, client: &ClientId) -> Result<ClaimOutcome, StoreError> {
        let key = self.keys.rate_key(client);

        trace!(key = %key, window_secs = self.window_secs, "Attempting window claim");

        if self
            .store
            .set_if_absent(&key, CLAIM_MARKER, self.window_secs)
            .await?
        {
            debug!(client_id = %client, "Window claimed");
            return Ok(ClaimOutcome::Claimed);
        }

        let ttl = self.store.time_to_live(&key).await?;
        let retry_after_secs = ttl.remaining_secs().unwrap_or(self.window_secs);

        debug!(
            client_id = %client,
            ttl = ?ttl,
            retry_after_secs,
            "Window already claimed"
        );

        Ok(ClaimOutcome::Rejected { retry_after_secs })
    }
}
