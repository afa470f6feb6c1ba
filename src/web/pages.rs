//! HTML pages rendered with askama templates from `templates/`.

use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use chrono::{DateTime, Local, Utc};
use expiry_sweeper::{ExpiryLabel, ListingEntry};
use std::path::Path;

use crate::{
    config::ServerSettings,
    utils::{format_duration, format_kilobytes, format_size},
};

/// Render a template into an HTML response.
///
/// A rendering failure is logged and reported as a plain 500.
pub fn render<T: Template>(status: StatusCode, template: &T) -> Response {
    match template.render() {
        Ok(body) => (status, Html(body)).into_response(),
        Err(e) => {
            tracing::error!("Failed to render template: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Template rendering failed").into_response()
        }
    }
}

/// Expiry window as shown to users, `never` when disabled.
pub(crate) fn expiry_description(settings: &ServerSettings) -> String {
    if settings.policy.is_disabled() {
        "never".to_string()
    } else {
        format_duration(settings.policy.expiry())
    }
}

/// One rendered row of the directory table.
#[derive(Debug)]
pub struct ListingRow {
    pub name: String,
    pub href: String,
    pub size: String,
    pub modified: String,
    pub kind: &'static str,
    pub expired: bool,
    /// Unix seconds the countdown script diffs against the client clock.
    pub expires_at_unix: Option<i64>,
    /// Server-side remaining time, shown until the script takes over.
    pub remaining: String,
}

impl ListingRow {
    fn from_entry(entry: &ListingEntry, now: DateTime<Utc>) -> Self {
        let (expired, expires_at_unix, remaining) = match entry.label {
            ExpiryLabel::NonExpiring => (false, None, "-".to_string()),
            ExpiryLabel::Expired => (true, None, String::new()),
            ExpiryLabel::ExpiresAt(at) => {
                let left = (at - now).to_std().unwrap_or_default();
                (false, Some(at.timestamp()), format_duration(left))
            }
        };

        Self {
            name: entry.name.clone(),
            href: entry.href.clone(),
            size: entry
                .size_bytes
                .map_or_else(|| "-".to_string(), format_kilobytes),
            modified: entry
                .last_modified
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
            kind: if entry.is_dir { "Directory" } else { "File" },
            expired,
            expires_at_unix,
            remaining,
        }
    }
}

#[derive(Template)]
#[template(path = "listing.html")]
pub struct ListingPage {
    pub current_path: String,
    pub expiry: String,
    pub parent_href: Option<String>,
    pub rows: Vec<ListingRow>,
}

impl ListingPage {
    pub fn new(
        relative_dir: &Path,
        entries: &[ListingEntry],
        settings: &ServerSettings,
        now: DateTime<Utc>,
    ) -> Self {
        let current_path = expiry_sweeper::annotator::directory_href(relative_dir);
        let current_path = urlencoding::decode(&current_path)
            .map(|decoded| decoded.into_owned())
            .unwrap_or(current_path);

        Self {
            current_path,
            expiry: expiry_description(settings),
            parent_href: expiry_sweeper::annotator::parent_href(relative_dir),
            rows: entries
                .iter()
                .map(|entry| ListingRow::from_entry(entry, now))
                .collect(),
        }
    }
}

#[derive(Template)]
#[template(path = "upload.html")]
pub struct UploadFormPage {
    pub max_upload_size: String,
    pub expiry: String,
}

impl UploadFormPage {
    pub fn new(settings: &ServerSettings) -> Self {
        Self {
            max_upload_size: format_size(settings.max_upload_size as u64),
            expiry: expiry_description(settings),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoredUpload {
    pub name: String,
    pub size: String,
}

#[derive(Debug, Clone)]
pub struct FailedUpload {
    pub name: String,
    pub reason: String,
}

#[derive(Template, Default)]
#[template(path = "upload_result.html")]
pub struct UploadResultPage {
    pub uploaded: Vec<StoredUpload>,
    pub failed: Vec<FailedUpload>,
}

impl UploadResultPage {
    pub fn record_success(&mut self, name: String, bytes: u64) {
        self.uploaded.push(StoredUpload {
            name,
            size: format_size(bytes),
        });
    }

    pub fn record_failure(&mut self, name: String, reason: String) {
        self.failed.push(FailedUpload { name, reason });
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorPage {
    pub status: u16,
    pub reason: &'static str,
    pub message: String,
}

impl ErrorPage {
    pub fn new(status: StatusCode, message: String) -> Self {
        Self {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("Error"),
            message,
        }
    }
}
