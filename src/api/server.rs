//! HTTP listener lifecycle
//!
//! Binding happens up front so a taken port fails startup; serving runs on
//! its own task until the shutdown signal, then drains open requests.

use anyhow::{Context, Result};
use axum::Router;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// A bound but not yet serving HTTP server
pub struct HttpServer {
    listener: TcpListener,
    router: Router,
    shutdown_tx: broadcast::Sender<()>,
}

impl HttpServer {
    /// Bind the listener on `addr`
    pub async fn bind(addr: &str, router: Router) -> Result<Self> {
        let addr: SocketAddr = addr
            .parse()
            .with_context(|| format!("Invalid HTTP listen address: {}", addr))?;
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind HTTP listener on {}", addr))?;
        let (shutdown_tx, _) = broadcast::channel(1);

        Ok(Self {
            listener,
            router,
            shutdown_tx,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .context("Failed to read HTTP listener address")
    }

    /// Start serving on a background task
    pub fn spawn(self) -> Result<HttpServerHandle> {
        let local_addr = self.local_addr()?;
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        info!("HTTP server listening on http://{}", local_addr);

        let join = tokio::spawn(async move {
            axum::serve(self.listener, self.router)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.recv().await;
                    info!("HTTP server shutdown signal received");
                })
                .await
                .context("HTTP server failed")?;

            info!("HTTP server stopped");
            Ok(())
        });

        Ok(HttpServerHandle {
            local_addr,
            shutdown_tx: self.shutdown_tx,
            join,
        })
    }
}

/// Handle to a serving HTTP server
pub struct HttpServerHandle {
    local_addr: SocketAddr,
    shutdown_tx: broadcast::Sender<()>,
    join: JoinHandle<Result<()>>,
}

impl HttpServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting connections and wait for in-flight requests
    pub async fn shutdown(self) -> Result<()> {
        if let Err(e) = self.shutdown_tx.send(()) {
            warn!("Failed to send shutdown signal to HTTP server: {}", e);
        }

        self.join.await.context("HTTP server task panicked")?
    }
}
