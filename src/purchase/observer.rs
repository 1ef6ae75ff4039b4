//! Hook invoked when the store fails underneath a purchase operation.

use tracing::error;

use super::client::ClientId;
use crate::store::StoreError;

/// Receives store failures before they are returned to the caller.
///
/// Implementations must not swallow or alter the error; they only observe it.
pub trait FailureObserver: Send + Sync {
    fn store_failed(&self, operation: &'static str, client: Option<&ClientId>, error: &StoreError);
}

/// Reports failures as `tracing` error events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl FailureObserver for TracingObserver {
    fn store_failed(&self, operation: &'static str, client: Option<&ClientId>, error: &StoreError) {
        match client {
            Some(client) => error!(
                operation,
                client_id = %client,
                error = %error,
                "Store operation failed"
            ),
            None => error!(operation, error = %error, "Store operation failed"),
        }
    }
}
