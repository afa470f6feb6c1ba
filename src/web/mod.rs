//! Web layer module
//!
//! HTTP interface of the file server:
//!
//! - `GET /` and `GET /{*path}`: directory listing or file download
//! - `GET /uploads`: upload form
//! - `POST /uploads`: multipart upload, field `file` (repeatable)
//! - `GET /health`: JSON status including the last sweep pass
//! - `GET /static/{*path}`: embedded CSS and JS
//!
//! Handlers share an [`AppState`] built once at startup. The filesystem is
//! the only mutable state; handlers never cache anything between requests.

use anyhow::Result;
use axum::{Router, extract::DefaultBodyLimit, routing::get};
use chrono::{DateTime, Utc};
use expiry_sweeper::{ListingAnnotator, SweepStatus};
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::config::ServerSettings;

pub mod handlers;
pub mod middleware;
pub mod pages;
pub mod responses;

pub use responses::ApiResponse;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<ServerSettings>,
    pub annotator: ListingAnnotator,
    /// Latest completed sweep pass, published by the scheduler.
    pub sweep_status: watch::Receiver<Option<SweepStatus>>,
    /// Application start time for uptime calculation
    pub start_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        settings: ServerSettings,
        sweep_status: watch::Receiver<Option<SweepStatus>>,
    ) -> Self {
        Self {
            annotator: ListingAnnotator::new(settings.policy),
            settings: Arc::new(settings),
            sweep_status,
            start_time: Utc::now(),
        }
    }
}

/// Build the application router.
pub fn create_router(state: AppState) -> Router {
    let body_limit = state.settings.max_upload_size;

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route(
            "/uploads",
            get(handlers::upload::upload_form).post(handlers::upload::upload_files),
        )
        .route(
            "/static/{*path}",
            get(handlers::static_assets::serve_static_asset),
        )
        .route("/", get(handlers::browse::browse))
        .route("/{*path}", get(handlers::browse::browse))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(axum::middleware::from_fn(
            middleware::security_headers_middleware,
        ))
        .layer(axum::middleware::from_fn(
            middleware::request_logging_middleware,
        ))
        .with_state(state)
}

/// Web server configuration and setup
pub struct WebServer {
    app: Router,
    listen_address: String,
}

impl WebServer {
    pub fn new(state: AppState) -> Self {
        Self {
            listen_address: state.settings.listen_address(),
            app: create_router(state),
        }
    }

    /// Serve until `cancellation_token` is cancelled, then drain open connections.
    ///
    /// # Errors
    /// Fails if the listener cannot be bound or the server stops with an I/O error.
    pub async fn serve_with_cancellation(self, cancellation_token: CancellationToken) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(&self.listen_address)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", self.listen_address, e))?;

        tracing::info!("Web server listening on {}", listener.local_addr()?);

        axum::serve(listener, self.app)
            .with_graceful_shutdown(async move {
                cancellation_token.cancelled().await;
                tracing::info!("Web server received cancellation signal, shutting down gracefully");
            })
            .await?;

        Ok(())
    }
}
