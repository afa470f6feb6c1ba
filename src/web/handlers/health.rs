//! Health check handler

use axum::{extract::State, response::IntoResponse};
use chrono::{DateTime, Utc};
use expiry_sweeper::SweepStatus;
use serde::Serialize;

use crate::{
    utils::format_duration,
    web::{AppState, pages::expiry_description, responses::ApiResponse},
};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: DateTime<Utc>,
    pub uptime_seconds: i64,
    pub work_dir: String,
    pub upload_dir: String,
    /// Human-readable expiry window, `never` when disabled.
    pub expiry: String,
    pub sweep_interval: String,
    /// Outcome of the most recent sweep pass, if one has completed.
    pub last_sweep: Option<SweepStatus>,
}

/// `GET /health`
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let now = Utc::now();
    let settings = &state.settings;
    let last_sweep = state.sweep_status.borrow().clone();

    ApiResponse::success(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: now,
        uptime_seconds: (now - state.start_time).num_seconds(),
        work_dir: settings.work_dir.display().to_string(),
        upload_dir: settings.upload_dir.display().to_string(),
        expiry: expiry_description(settings),
        sweep_interval: format_duration(settings.sweep_interval),
        last_sweep,
    })
}
