//! In-memory fetcher for tests and offline fixtures.

use super::{Headers, PageFetcher};
use async_trait::async_trait;
use shared::FetchError;
use std::collections::HashMap;
use std::sync::Mutex;

/// Serves registered markup by exact URL; anything else fails with a 404.
///
/// An empty `StaticFetcher` therefore behaves like a site that is down.
#[derive(Debug, Default)]
pub struct StaticFetcher {
    pages: HashMap<String, String>,
    requests: Mutex<Vec<String>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: impl Into<String>, markup: impl Into<String>) -> Self {
        self.pages.insert(url.into(), markup.into());
        self
    }

    /// URLs requested so far, in call order
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl PageFetcher for StaticFetcher {
    async fn fetch(&self, url: &str, _headers: &Headers) -> Result<String, FetchError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(url.to_string());
        }

        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::with_status(url, 404, "Not Found"))
    }
}
