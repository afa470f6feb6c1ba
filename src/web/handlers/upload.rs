//! Upload form and multipart upload handling
//!
//! Each `file` field is streamed chunk by chunk into the upload directory.
//! A problem with one file (bad name, write failure) is recorded in the
//! summary and the remaining files are still processed. Only a broken
//! request body aborts the whole upload.

use axum::{
    extract::{
        Multipart, State,
        multipart::{Field, MultipartError, MultipartRejection},
    },
    http::StatusCode,
    response::Response,
};
use expiry_sweeper::security::sanitize_upload_name;
use std::path::Path;
use tokio::{fs::File, io::AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::{
    errors::{AppError, AppResult, WebError},
    web::{
        AppState,
        pages::{UploadFormPage, UploadResultPage, render},
    },
};

/// Multipart field carrying file contents. May be repeated.
pub const FILE_FIELD: &str = "file";

/// Why a single file could not be stored.
enum StoreError {
    /// This file failed; keep going with the next one.
    File(AppError),
    /// The request body itself is broken; nothing further can be read.
    Body(MultipartError),
}

/// `GET /uploads`
pub async fn upload_form(State(state): State<AppState>) -> Response {
    render(StatusCode::OK, &UploadFormPage::new(&state.settings))
}

/// `POST /uploads`
pub async fn upload_files(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Response> {
    let mut multipart =
        multipart.map_err(|rejection| WebError::invalid_request("body", rejection.body_text()))?;

    let mut summary = UploadResultPage::default();
    let mut saw_file_field = false;

    while let Some(field) = multipart.next_field().await.map_err(WebError::from)? {
        if field.name() != Some(FILE_FIELD) {
            debug!("Ignoring multipart field {:?}", field.name());
            continue;
        }
        // A file input submitted with nothing selected arrives with an empty file name.
        let submitted_name = match field.file_name() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => {
                debug!("Ignoring {} field without a file name", FILE_FIELD);
                continue;
            }
        };
        saw_file_field = true;

        match store_field(&state.settings.upload_dir, field).await {
            Ok((stored_name, bytes)) => {
                info!("Uploaded file {} ({} bytes)", stored_name, bytes);
                summary.record_success(stored_name, bytes);
            }
            Err(StoreError::File(e)) => {
                warn!("Failed to upload {:?}: {}", submitted_name, e);
                summary.record_failure(submitted_name, e.public_message());
            }
            Err(StoreError::Body(e)) => return Err(WebError::from(e).into()),
        }
    }

    if !saw_file_field {
        return Err(WebError::invalid_request(FILE_FIELD, "No file selected").into());
    }

    Ok(render(StatusCode::OK, &summary))
}

/// Stream one field into `upload_dir`, returning the stored name and byte count.
async fn store_field(
    upload_dir: &Path,
    mut field: Field<'_>,
) -> Result<(String, u64), StoreError> {
    let name = sanitize_upload_name(field.file_name().unwrap_or_default())
        .map_err(|e| StoreError::File(e.into()))?;
    let destination = upload_dir.join(&name);

    let mut file = File::create(&destination)
        .await
        .map_err(|e| StoreError::File(e.into()))?;

    match write_field(&mut field, &mut file).await {
        Ok(written) => Ok((name, written)),
        Err(e) => {
            drop(file);
            discard_partial(&destination).await;
            Err(e)
        }
    }
}

async fn write_field(field: &mut Field<'_>, file: &mut File) -> Result<u64, StoreError> {
    let mut written: u64 = 0;
    while let Some(chunk) = field.chunk().await.map_err(StoreError::Body)? {
        file.write_all(&chunk)
            .await
            .map_err(|e| StoreError::File(e.into()))?;
        written += chunk.len() as u64;
    }
    file.flush().await.map_err(|e| StoreError::File(e.into()))?;
    Ok(written)
}

/// Remove a partially written upload. `path` must no longer be open.
async fn discard_partial(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        debug!("Could not remove partial upload {:?}: {}", path, e);
    }
}
