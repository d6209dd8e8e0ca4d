//! # markstage
//!
//! Host layer around `markstage-core`: CSV loading with a content-hashed
//! cache, TOML config, CSV export, the clap CLI and the axum HTTP API.

pub mod api;
pub mod cli;
pub mod config;
pub mod export;
pub mod loader;
