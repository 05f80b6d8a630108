//! HTTP gateway
//!
//! Thin axum layer over the transfer engine: DTO validation, recipient
//! resolution and PIN checks live here, money movement does not.

pub mod handlers;
pub mod state;
pub mod types;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

pub use state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/transfer", post(handlers::create_transfer))
        .route("/transfer/{transfer_id}", get(handlers::get_transfer))
        .route("/accounts", post(handlers::open_account))
        .route("/accounts/{account_id}/credit", post(handlers::credit_account))
        .route("/accounts/{account_id}/ledger", get(handlers::get_ledger))
        .route("/users/{user_id}/balance", get(handlers::get_balance))
        .route("/users/{user_id}/transactions", get(handlers::get_transactions))
        .route("/users/{user_id}/insights", get(handlers::get_insights))
        .route("/admin/fraud/flags", get(handlers::list_fraud_flags))
        .route(
            "/admin/fraud/{transfer_id}/decision",
            post(handlers::decide_fraud_flag),
        )
        .route(
            "/admin/users/{user_id}/status",
            post(handlers::set_user_status),
        );

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until the process exits.
pub async fn run_server(state: Arc<AppState>, host: &str, port: u16) -> anyhow::Result<()> {
    let app = build_router(state);

    let addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", addr, e))?;

    tracing::info!("Gateway listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
