//! Shared library for the manhwa scraper workspace.
//!
//! This crate provides common functionality used by the scraper crate:
//! - Canonical manga data model produced by every source
//! - Error taxonomy (fetch, parse, unknown source)
//! - Configuration management
//! - Logging infrastructure

pub mod config;
pub mod error;
pub mod logging;
pub mod models;

// Re-export commonly used types
pub use config::Config;
pub use error::{FetchError, ParseError, SourceError};
pub use logging::LogConfig;
pub use models::*;

/// Common result type using anyhow::Error
pub type Result<T> = anyhow::Result<T>;
