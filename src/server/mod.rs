//! HTTP front for the mock backend.
//!
//! Serves the same REST API as the real panel server, answered by a
//! [`MockBackend`], so the HTTP client can be developed and tested without a
//! Docker host.
//!
//! ## Endpoints
//!
//! Public: `GET /api/health`, `POST /api/auth/login`, `POST /api/auth/register`,
//! `GET /api/config/public`.
//! Everything else under `/api` requires `Authorization: Bearer <token>`.

mod routes;

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::info;

use crate::api::MockBackend;

pub use routes::router;

/// Mock API server.
pub struct MockServer {
    bind_addr: SocketAddr,
    backend: MockBackend,
    shutdown_tx: broadcast::Sender<()>,
}

impl MockServer {
    pub fn new(backend: MockBackend, bind_addr: SocketAddr) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            bind_addr,
            backend,
            shutdown_tx,
        }
    }

    /// Bind and serve until shutdown() is called.
    pub async fn start(&self) -> anyhow::Result<()> {
        let listener = TcpListener::bind(self.bind_addr).await?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener until shutdown() is called.
    pub async fn serve(&self, listener: TcpListener) -> anyhow::Result<()> {
        let addr = listener.local_addr()?;
        info!(%addr, "Mock API server listening");

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        axum::serve(listener, router(self.backend.clone()))
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;

        info!("Mock API server stopped");
        Ok(())
    }

    /// Signal the server to shut down gracefully.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}
