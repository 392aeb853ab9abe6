//! Liveness endpoint for the hosting platform.

use std::net::SocketAddr;

use axum::{routing::get, Router};
use tracing::{info, warn};

pub async fn serve(port: u16) {
    let app = Router::new().route("/health", get(|| async { "OK" }));
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            warn!("health endpoint bind failed on {addr}: {e}");
            return;
        }
    };

    info!("health endpoint listening on {addr}");
    if let Err(e) = axum::serve(listener, app).await {
        warn!("health endpoint stopped: {e}");
    }
}
