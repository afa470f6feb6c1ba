//! Expiry File Server
//!
//! A local HTTP file server: browse a directory tree, download files, upload
//! new ones, and have files age out automatically once they are older than
//! the configured expiry window. The lifecycle engine lives in the
//! `expiry-sweeper` crate; this crate wires it to configuration and HTTP.

pub mod assets;
pub mod config;
pub mod errors;
pub mod utils;
pub mod web;
