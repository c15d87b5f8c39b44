//! Error taxonomy shared by the fetcher, the adapters and the orchestrator.

use thiserror::Error;

/// Failure at the page fetcher boundary
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("failed to fetch {url}{}: {cause}", status_suffix(.status))]
pub struct FetchError {
    pub url: String,
    /// HTTP status when the server answered
    pub status: Option<u16>,
    pub cause: String,
}

impl FetchError {
    pub fn new(url: impl Into<String>, cause: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status: None,
            cause: cause.into(),
        }
    }

    pub fn with_status(url: impl Into<String>, status: u16, cause: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status: Some(status),
            cause: cause.into(),
        }
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default()
}

/// Markup could not be turned into the expected structure
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("failed to parse {context}: {reason}")]
pub struct ParseError {
    pub context: String,
    pub reason: String,
}

impl ParseError {
    pub fn new(context: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("unknown source: {0}")]
    UnknownSource(String),
}

impl SourceError {
    /// Stable identifier used in response envelopes
    pub fn kind(&self) -> &'static str {
        match self {
            SourceError::Fetch(_) => "fetch_error",
            SourceError::Parse(_) => "parse_error",
            SourceError::UnknownSource(_) => "unknown_source",
        }
    }
}
