//! Example instant payment notification receiver using Axum.
//!
//! Notifications are acknowledged with 200 straight away and authenticated in a
//! background task, so a slow certificate download never makes the sender retry.
//!
//! Run with:
//! ```bash
//! cargo run --example ipn_server
//! ```
//!
//! Environment variables:
//! - PORT: Server port (default: 3000)

use amazon_pay::ipn::IpnHandler;
use axum::{
    body::Bytes,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

/// Receives one notification.
async fn ipn_handler(headers: HeaderMap, body: Bytes) -> StatusCode {
    tokio::spawn(async move {
        let mut handler = match IpnHandler::new(&body, &headers) {
            Ok(handler) => handler,
            Err(e) => {
                tracing::warn!(error = %e, "unreadable notification");
                return;
            }
        };

        if handler.authenticate().await.is_err() {
            tracing::warn!(error = ?handler.error(), "notification rejected");
            return;
        }

        match handler.to_json() {
            Ok(payload) => tracing::info!(
                notification_type = ?handler.notification_type(),
                %payload,
                "notification accepted"
            ),
            Err(e) => tracing::warn!(error = %e, "notification payload unreadable"),
        }
    });

    StatusCode::OK
}

/// Health check endpoint.
async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "healthy" }))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let port = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse::<u16>()?;

    let app = Router::new()
        .route("/ipn", post(ipn_handler))
        .route("/health", get(health_handler));

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    println!("IPN receiver listening on http://{}/ipn", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
