//! Router assembly: HTTP endpoints, WebSocket upgrade, static files, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;
pub mod ws;

/// Build the application router with:
/// - WebSocket lesson player at `/ws`
/// - JSON API under `/api/v1/...`
/// - Static SPA from `./static` with index fallback
/// - CORS (allow any origin/method/headers)
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    // Static files with SPA fallback
    let static_service = ServeDir::new("./static")
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new("./static/index.html"));

    Router::new()
        // WebSocket
        .route("/ws", get(ws::ws_upgrade))
        // HTTP API
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/learners", post(http::http_register))
        .route("/api/v1/learners/login", post(http::http_login))
        .route("/api/v1/learners/:id/age", put(http::http_put_age))
        .route("/api/v1/learners/:id/child", put(http::http_link_child))
        .route("/api/v1/learners/:id/progress", get(http::http_get_progress))
        .route("/api/v1/subjects", get(http::http_get_subjects))
        .route("/api/v1/subjects/:subject/lessons", get(http::http_get_lessons))
        .route("/api/v1/lessons", post(http::http_start_lesson))
        .route(
            "/api/v1/lessons/:session",
            get(http::http_get_lesson).delete(http::http_close_lesson),
        )
        .route("/api/v1/lessons/:session/interact", post(http::http_interact))
        .route("/api/v1/lessons/:session/advance", post(http::http_advance))
        .route("/api/v1/lessons/:session/reset", post(http::http_reset))
        // State + CORS + HTTP tracing
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Frontend fallback
        .fallback_service(static_service)
}
