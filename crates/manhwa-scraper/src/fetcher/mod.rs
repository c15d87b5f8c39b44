//! Page fetcher: the only place where adapters touch the network.
//!
//! Adapters hand a URL and their extra headers to a [`PageFetcher`] and get raw
//! markup back or a [`FetchError`]. Throttling, retries and anti-bot behaviour
//! all live behind this trait; adapters never throttle themselves.

pub mod http;
pub mod rate_limiter;
pub mod stub;

use async_trait::async_trait;
use shared::FetchError;
use std::collections::HashMap;

pub use http::HttpFetcher;
pub use rate_limiter::RateLimiter;
pub use stub::StaticFetcher;

/// Extra request headers supplied by an adapter
pub type Headers = HashMap<String, String>;

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch `url` and return its body. Non-2xx responses are errors, never markup.
    async fn fetch(&self, url: &str, headers: &Headers) -> Result<String, FetchError>;
}
