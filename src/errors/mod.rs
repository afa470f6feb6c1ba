//! Centralized error handling for the file server
//!
//! Engine failures ([`expiry_sweeper::SweeperError`]) and web-layer failures
//! ([`WebError`]) both convert into [`AppError`], which the web layer maps to
//! an HTTP status and an HTML error page.
//!
//! # Usage
//!
//! ```rust
//! use expiry_file_server::errors::{AppError, AppResult};
//!
//! fn find(name: &str) -> AppResult<&str> {
//!     if name.is_empty() {
//!         return Err(AppError::not_found("/"));
//!     }
//!     Ok(name)
//! }
//! # assert_eq!(find("").unwrap_err().status_code(), axum::http::StatusCode::NOT_FOUND);
//! ```

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;
