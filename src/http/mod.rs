//! HTTP surface for the purchase service.

mod server;
mod service;

pub use server::HttpServer;
pub use service::router;
