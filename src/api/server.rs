//! HTTP server lifecycle: bind → spawn background task → return a handle
//! with a shutdown channel.

use std::net::SocketAddr;

use serde::Serialize;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::api::router::build_router;
use crate::api::types::ApiContext;

/// Metadata for a running server.
#[derive(Debug, Clone, Serialize)]
pub struct ServerSession {
    pub session_id: String,
    pub server_addr: String,
    pub port: u16,
    pub started_at: String,
}

/// Handle to a running API server.
pub struct ApiServer {
    pub session: ServerSession,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl ApiServer {
    /// Ask the server to stop accepting connections. Safe to call twice.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            tracing::info!("API server shutdown signal sent");
        }
    }

    /// Wait for the server task to finish in-flight requests and exit.
    pub async fn stopped(self) {
        if let Err(e) = self.task.await {
            tracing::error!("API server task failed: {e}");
        }
    }
}

/// Bind `addr` and serve the full router in a background task.
pub async fn start_server(ctx: ApiContext, addr: SocketAddr) -> Result<ApiServer, std::io::Error> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let addr = listener.local_addr()?;

    let app = build_router(ctx);

    let session = ServerSession {
        session_id: Uuid::new_v4().to_string(),
        server_addr: addr.to_string(),
        port: addr.port(),
        started_at: chrono::Utc::now().to_rfc3339(),
    };

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        let shutdown_signal = async move {
            let _ = shutdown_rx.await;
            tracing::info!("API server received shutdown signal");
        };

        tracing::info!(%addr, "API server started");

        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
        {
            tracing::error!("API server error: {e}");
        }

        tracing::info!("API server stopped");
    });

    Ok(ApiServer {
        session,
        shutdown_tx: Some(shutdown_tx),
        task,
    })
}

/// Serve until Ctrl-C, then shut down gracefully.
pub async fn serve_until_ctrl_c(ctx: ApiContext, addr: SocketAddr) -> Result<(), std::io::Error> {
    let mut server = start_server(ctx, addr).await?;
    tracing::info!(addr = %server.session.server_addr, "Listening");

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Cannot listen for Ctrl-C: {e}");
    }
    server.shutdown();
    server.stopped().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::agents::mock::MockAgentProvider;
    use crate::api::types::test_support::seeded_context;

    fn localhost() -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 0))
    }

    #[tokio::test]
    async fn start_serve_and_stop() {
        let (ctx, _tmp) = seeded_context(Arc::new(MockAgentProvider::default()));
        let mut server = start_server(ctx, localhost()).await.expect("server should start");

        assert!(server.session.port > 0);
        assert!(!server.session.session_id.is_empty());

        let port = server.session.port;
        let health = reqwest::get(format!("http://127.0.0.1:{port}/health")).await.unwrap();
        assert_eq!(health.status(), reqwest::StatusCode::OK);

        let protected = reqwest::get(format!("http://127.0.0.1:{port}/api/my-reservations"))
            .await
            .unwrap();
        assert_eq!(protected.status(), reqwest::StatusCode::UNAUTHORIZED);

        let missing = reqwest::get(format!("http://127.0.0.1:{port}/nonexistent")).await.unwrap();
        assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);

        server.shutdown();
        server.shutdown();
        tokio::time::timeout(std::time::Duration::from_secs(5), server.stopped())
            .await
            .expect("server should stop");
    }

    #[tokio::test]
    async fn bind_conflict_is_an_error() {
        let (ctx, _tmp) = seeded_context(Arc::new(MockAgentProvider::default()));
        let taken = tokio::net::TcpListener::bind(localhost()).await.unwrap();
        let addr = taken.local_addr().unwrap();
        assert!(start_server(ctx, addr).await.is_err());
    }
}
