//! HTTP request handlers

pub mod browse;
pub mod health;
pub mod static_assets;
pub mod upload;
