//! Directory browsing and file download
//!
//! Every request is resolved against the filesystem afresh. A path that
//! disappears between resolution and reading, for instance because a sweep
//! deleted it, is reported as 404.

use axum::{
    body::Body,
    extract::{Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use expiry_sweeper::security::{clean_request_path, resolve_within};
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::{
    errors::{AppError, AppResult},
    web::{
        AppState,
        pages::{ListingPage, render},
    },
};

/// Serve `GET /` and `GET /{*path}`: a listing for directories, the file
/// contents otherwise.
pub async fn browse(State(state): State<AppState>, request: Request) -> AppResult<Response> {
    let relative = clean_request_path(request.uri().path())?;

    let work_dir = state.settings.work_dir.clone();
    let lookup = relative.clone();
    let full_path = tokio::task::spawn_blocking(move || resolve_within(&work_dir, &lookup))
        .await
        .map_err(|e| AppError::internal(format!("Path resolution task failed: {e}")))??;

    let metadata = match tokio::fs::metadata(&full_path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::not_found(format!("/{}", relative.display())));
        }
        Err(e) => return Err(e.into()),
    };

    if metadata.is_dir() {
        let now = Utc::now();
        let entries = state
            .annotator
            .read_directory(&full_path, &relative, now)
            .await?;
        tracing::debug!(
            "Listing {:?}: {} entries",
            full_path,
            entries.len()
        );

        let page = ListingPage::new(&relative, &entries, &state.settings, now);
        return Ok(render(StatusCode::OK, &page));
    }

    match ServeFile::new(&full_path).oneshot(request).await {
        Ok(response) => Ok(response.map(Body::new).into_response()),
        Err(never) => match never {},
    }
}
