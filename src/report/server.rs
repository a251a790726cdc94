//! Read-only status endpoint
//!
//! Serves the latest published snapshot at `GET /status`. Any telemetry sink
//! can replace this by subscribing to the same watch channel.

use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use std::net::SocketAddr;
use tokio::sync::watch;
use tracing::{error, info};

use crate::report::StatusSnapshot;

async fn status(State(rx): State<watch::Receiver<StatusSnapshot>>) -> impl IntoResponse {
    let snapshot = rx.borrow().clone();
    Json(snapshot)
}

pub fn router(rx: watch::Receiver<StatusSnapshot>) -> Router {
    Router::new().route("/status", get(status)).with_state(rx)
}

/// Bind and serve until the process exits
pub async fn serve(addr: SocketAddr, rx: watch::Receiver<StatusSnapshot>) {
    let app = router(rx);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("Status server failed to bind {}: {}", addr, e);
            return;
        }
    };

    info!("Status server listening on {}", addr);
    if let Err(e) = axum::serve(listener, app).await {
        error!("Status server error: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_status_returns_latest_snapshot() {
        let (tx, rx) = watch::channel(StatusSnapshot::empty());

        let mut snapshot = StatusSnapshot::empty();
        snapshot.status = "Running".to_string();
        snapshot.wallet_balance = 2.5;
        tx.send(snapshot).unwrap();

        let response = status(State(rx)).await.into_response();
        assert_eq!(response.status(), axum::http::StatusCode::OK);
    }
}
