//! StarSteps · children's lesson player backend
//!
//! - Axum HTTP + WebSocket API
//! - Built-in lesson catalog (TOML), replaceable at startup
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT                : u16 (default 3000)
//!   CONTENT_CONFIG_PATH : path to a TOML lesson catalog replacing the built-in one
//!   SESSION_IDLE_MINUTES: idle lesson sessions are dropped after this (default 30)
//!   LOG_LEVEL           : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT          : "pretty" (default), "compact" or "json"

use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tracing::{error, info};

use starsteps::routes::build_router;
use starsteps::state::{spawn_session_reaper, AppState, DEFAULT_SESSION_IDLE_MINUTES};
use starsteps::telemetry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Shared application state (content catalog, accounts, lesson sessions).
  let state = Arc::new(AppState::new()?);

  // Abandoned lesson sessions are swept once a minute.
  let idle_minutes = std::env::var("SESSION_IDLE_MINUTES")
    .ok()
    .and_then(|v| v.parse::<i64>().ok())
    .filter(|m| *m > 0)
    .unwrap_or(DEFAULT_SESSION_IDLE_MINUTES);
  let _reaper = spawn_session_reaper(state.clone(), Duration::from_secs(60), chrono::Duration::minutes(idle_minutes));

  // Build the HTTP router with routes, CORS and tracing layers.
  let app = build_router(state.clone());

  // Read port from env or default to 3000.
  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "starsteps", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  info!(target: "starsteps", "HTTP server stopped");
  Ok(())
}

/// Resolves on Ctrl+C or SIGTERM. In-memory progress is lost on exit.
async fn shutdown_signal() {
  let ctrl_c = async {
    if let Err(e) = tokio::signal::ctrl_c().await {
      error!(target: "starsteps", error = %e, "Failed to install Ctrl+C handler");
      std::future::pending::<()>().await;
    }
  };

  #[cfg(unix)]
  let terminate = async {
    use tokio::signal::unix::{signal, SignalKind};
    match signal(SignalKind::terminate()) {
      Ok(mut sigterm) => { sigterm.recv().await; }
      Err(e) => {
        error!(target: "starsteps", error = %e, "Failed to install SIGTERM handler");
        std::future::pending::<()>().await;
      }
    }
  };

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
    _ = ctrl_c => {},
    _ = terminate => {},
  }
}
