use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};

use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    // Public routes
    let public_routes = Router::new()
        .route("/", get(handlers::ui::index))
        .route("/health", get(handlers::health::health_check))
        .route("/health/ready", get(handlers::health::readiness_check));

    // Chat API
    let api_routes = Router::new()
        .route("/api/chat", post(handlers::chat::chat_handler))
        .route("/api/chat/reset", post(handlers::chat::reset_handler))
        .route("/api/chat/{session_id}/history", get(handlers::chat::history_handler));

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .with_state(state)
        // CORS
        .layer(CorsLayer::permissive())
        // Tracing
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(false)),
        )
}

/// Bind the configured host and port. Host names are resolved, so
/// `localhost` works as well as a literal address.
pub async fn bind_listener(config: &ServerConfig) -> Result<TcpListener> {
    let host = config.bind_host();
    TcpListener::bind((host, config.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", host, config.port))
}
