//! Cornstand - Per-client Purchase Admission Service
//!
//! This crate lets each client buy at most once per fixed window and keeps a
//! lifetime purchase count per client. All state lives in a shared key-value
//! store with expiring keys (Redis in production), so any number of service
//! instances can run side by side.

pub mod config;
pub mod error;
pub mod http;
pub mod purchase;
pub mod store;
