//! Axum front door for the Slack bot.
//!
//! - `state` - shared handles the handlers need
//! - `routes` - route table and middleware
//! - `handlers` - Events API, interactive payloads, slash command, health

pub mod handlers;
pub mod routes;
pub mod state;

use anyhow::Result;
use state::AppState;
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpListener;

pub struct AxumServer {
    state: AppState,
}

impl AxumServer {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Serve until `shutdown` resolves, then finish in-flight requests.
    pub async fn run<F>(self, addr: SocketAddr, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = routes::create_router(self.state);

        tracing::info!("Starting Axum server on {}", addr);

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind {}: {}", addr, e))?;

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

        Ok(())
    }
}
