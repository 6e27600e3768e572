//! Web server module
//!
//! Serves the mashup request form, accepts submissions, and exposes job status and a
//! live event stream.

use crate::config::ApiConfig;
use crate::jobs::JobRunner;
use crate::{Result, shutdown_signal};
use axum::{
    Router,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

pub mod error_response;
pub mod pages;
pub mod routes;
pub mod state;

pub use state::AppState;

/// Create the router with all route definitions
///
/// # Routes
///
/// - `GET /` - Request form
/// - `POST /generate` - Validate the form and start a job
/// - `GET /jobs/:id` - Job record
/// - `GET /health` - Health check
/// - `GET /events` - Server-sent events stream
pub fn create_router(runner: JobRunner) -> Router {
    let state = AppState::new(runner);

    Router::new()
        .route("/", get(routes::index))
        .route("/generate", post(routes::generate))
        .route("/jobs/:id", get(routes::get_job))
        .route("/health", get(routes::health_check))
        .route("/events", get(routes::event_stream))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Start the web server on the configured bind address
///
/// Runs until SIGTERM/SIGINT, then stops accepting connections and returns. Jobs
/// already running are not awaited.
pub async fn start_api_server(runner: JobRunner, config: &ApiConfig) -> Result<()> {
    let bind_address = config.bind_address;

    tracing::info!(address = %bind_address, "Starting web server");

    let app = create_router(runner);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(address = %bind_address, "Web server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("Web server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
