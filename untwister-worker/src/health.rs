use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Liveness probe
///
/// Only proves the process is up; it does not reflect worker health.
async fn hello() -> Json<Value> {
    Json(json!({
        "msg": "Hello from untwister-worker"
    }))
}

/// Creates the liveness router
pub fn router() -> Router {
    Router::new().route("/", get(hello))
}

/// Start the liveness HTTP server
///
/// # Errors
///
/// Returns an error if the server fails to bind to the specified port
pub async fn start_health_server(port: u16, shutdown_token: CancellationToken) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!("Health check server listening on {}", addr);

    axum::serve(listener, router())
        .with_graceful_shutdown(async move {
            shutdown_token.cancelled().await;
        })
        .await?;

    Ok(())
}
