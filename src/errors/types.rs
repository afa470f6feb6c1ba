//! Error type definitions for the file server

use axum::{extract::multipart::MultipartError, http::StatusCode};
use expiry_sweeper::SweeperError;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Web layer errors
    #[error("Web error: {0}")]
    Web(#[from] WebError),

    /// Requested file or directory does not exist
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    /// Filesystem errors outside the engine
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors from the expiry engine (path checks, sweeps, listings)
    #[error("Sweeper error: {0}")]
    Sweeper(#[from] SweeperError),

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Work or upload directory could not be prepared at startup
    #[error("Failed to prepare directory {path:?}: {source}")]
    DirectorySetup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Web layer specific errors
#[derive(Error, Debug)]
pub enum WebError {
    /// Invalid request format
    #[error("Invalid request: {field} - {message}")]
    InvalidRequest { field: String, message: String },

    /// Multipart body could not be read
    #[error("Multipart error: {0}")]
    Multipart(#[from] MultipartError),
}

/// Convenience methods for creating common error types
impl AppError {
    /// Create a not found error for the given resource
    pub fn not_found<S: Into<String>>(resource: S) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// HTTP status this error maps to.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Web(web) => web.status_code(),
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Io(e) => io_status(e),
            Self::Sweeper(e) => match e {
                SweeperError::PathValidation { .. } => StatusCode::BAD_REQUEST,
                SweeperError::NotFound { .. } => StatusCode::NOT_FOUND,
                SweeperError::Io(io) => io_status(io),
                SweeperError::Traversal { .. } | SweeperError::Scheduler { .. } => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Configuration { .. } | Self::DirectorySetup { .. } | Self::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to show to a client. Server-side faults are not detailed.
    #[must_use]
    pub fn public_message(&self) -> String {
        let status = self.status_code();
        if status.is_server_error() {
            return "The server could not complete the request".to_string();
        }
        match self {
            Self::NotFound { resource } => format!("{resource} does not exist"),
            Self::Sweeper(SweeperError::PathValidation { reason, .. }) => reason.clone(),
            Self::Io(_) | Self::Sweeper(_) => {
                "The requested file or directory does not exist".to_string()
            }
            Self::Web(web) => web.to_string(),
            other => other.to_string(),
        }
    }
}

impl WebError {
    /// Create an invalid request error
    pub fn invalid_request<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        Self::InvalidRequest {
            field: field.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Multipart(e) => e.status(),
        }
    }
}

fn io_status(e: &std::io::Error) -> StatusCode {
    if e.kind() == std::io::ErrorKind::NotFound {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}
