//! Purchase admission logic.
//!
//! The [`AdmissionGate`] claims one purchase window per client and the
//! [`PurchaseLedger`] counts completed purchases. Neither keeps per-client
//! state in process; everything goes through the shared store.

mod client;
mod gate;
mod keys;
mod ledger;
mod observer;
mod service;

pub use client::ClientId;
pub use gate::{AdmissionGate, ClaimOutcome};
pub use keys::KeySpace;
pub use ledger::{PurchaseLedger, PurchaseStatus};
pub use observer::{FailureObserver, TracingObserver};
pub use service::{ClientStatus, PurchaseOutcome, PurchaseService};
