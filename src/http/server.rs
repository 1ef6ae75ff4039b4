//! HTTP server implementation.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

use super::service::router;
use crate::error::Result;
use crate::purchase::PurchaseService;

/// HTTP server for the purchase service.
pub struct HttpServer {
    /// Address to bind to
    addr: SocketAddr,
    /// The purchase service instance
    service: Arc<PurchaseService>,
}

impl HttpServer {
    /// Create a new HTTP server.
    pub fn new(addr: SocketAddr, service: Arc<PurchaseService>) -> Self {
        Self { addr, service }
    }

    /// Start the HTTP server with graceful shutdown.
    ///
    /// The server will shut down when the provided signal resolves.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;

        info!(addr = %local_addr, "Starting HTTP server for purchase service");

        axum::serve(listener, router(self.service))
            .with_graceful_shutdown(signal)
            .await
            .map_err(|e| {
                error!(error = %e, "HTTP server failed");
                e.into()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LimitsConfig;
    use crate::store::InMemoryStore;

    #[test]
    fn test_server_creation() {
        let addr: SocketAddr = "127.0.0.1:3000".parse().unwrap();
        let service = Arc::new(PurchaseService::new(
            Arc::new(InMemoryStore::new()),
            "corn",
            LimitsConfig::default(),
        ));
        let _server = HttpServer::new(addr, service);
    }

    #[tokio::test]
    async fn test_serve_stops_on_signal() {
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let service = Arc::new(PurchaseService::new(
            Arc::new(InMemoryStore::new()),
            "corn",
            LimitsConfig::default(),
        ));

        let result = HttpServer::new(addr, service)
            .serve_with_shutdown(async {})
            .await;
        assert!(result.is_ok());
    }
}
