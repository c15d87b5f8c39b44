//! HTTP page fetcher with rate limiting, retry logic and Cloudflare handling.

use super::rate_limiter::RateLimiter;
use super::{Headers, PageFetcher};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, StatusCode};
use shared::config::FetcherConfig;
use shared::FetchError;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Markers found in Cloudflare interstitial pages
const CHALLENGE_MARKERS: &[&str] = &[
    "Just a moment...",
    "cf-browser-verification",
    "cf_chl_opt",
    "challenge-platform",
];

/// reqwest-backed [`PageFetcher`]
pub struct HttpFetcher {
    /// HTTP client
    client: Client,
    /// Rate limiter shared by all requests
    rate_limiter: RateLimiter,
    /// Cap on requests in flight
    permits: Semaphore,
    /// Maximum retries for failed requests
    max_retries: u32,
    /// Base delay for retry (exponential backoff)
    retry_delay_ms: u64,
    /// Detect Cloudflare challenge pages
    cloudflare_evasion: bool,
}

impl HttpFetcher {
    /// Create a new fetcher from configuration
    pub fn new(config: &FetcherConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            HeaderValue::from_str(&config.accept).context("Invalid Accept header")?,
        );
        headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            HeaderValue::from_str(&config.accept_language).context("Invalid Accept-Language header")?,
        );

        if config.cloudflare_evasion {
            // Navigation headers a real browser sends on a top-level page load
            for (name, value) in [
                ("upgrade-insecure-requests", "1"),
                ("sec-fetch-dest", "document"),
                ("sec-fetch-mode", "navigate"),
                ("sec-fetch-site", "none"),
                ("sec-fetch-user", "?1"),
                ("cache-control", "max-age=0"),
            ] {
                headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
            }
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            rate_limiter: RateLimiter::new(
                config.rate_limit.requests_per_second,
                config.rate_limit.requests_per_minute,
            ),
            permits: Semaphore::new(config.max_concurrent_requests.max(1)),
            max_retries: config.max_retries,
            retry_delay_ms: config.retry_delay_ms,
            cloudflare_evasion: config.cloudflare_evasion,
        })
    }

    fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.retry_delay_ms.saturating_mul(2u64.saturating_pow(attempt)))
    }

    /// Rate limiting, Cloudflare and 5xx statuses are worth another attempt
    fn is_retryable_status(status: StatusCode) -> bool {
        matches!(
            status.as_u16(),
            429 | 500 | 502 | 503 | 504 | 520 | 521 | 522 | 523 | 524 | 525 | 526 | 527
        )
    }

    fn is_challenge(status: StatusCode, response_headers: &HeaderMap, body: &str) -> bool {
        if !matches!(status.as_u16(), 403 | 503) {
            return false;
        }
        let served_by_cloudflare = response_headers.contains_key("cf-ray")
            || response_headers
                .get(reqwest::header::SERVER)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.to_lowercase().contains("cloudflare"))
                .unwrap_or(false);
        served_by_cloudflare && CHALLENGE_MARKERS.iter().any(|marker| body.contains(marker))
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, headers: &Headers) -> Result<String, FetchError> {
        for attempt in 0..=self.max_retries {
            // Apply rate limiting before each request
            self.rate_limiter.acquire().await;
            let permit = self
                .permits
                .acquire()
                .await
                .map_err(|e| FetchError::new(url, e.to_string()))?;

            debug!(url = %url, attempt = attempt + 1, "Fetching page");

            let mut request = self.client.get(url);
            for (name, value) in headers {
                request = request.header(name.as_str(), value.as_str());
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return match response.text().await {
                            Ok(body) => {
                                debug!(url = %url, bytes = body.len(), "Page fetched");
                                Ok(body)
                            }
                            Err(e) => {
                                warn!(url = %url, error = %e, "Failed to read response body");
                                Err(FetchError::with_status(url, status.as_u16(), e.to_string()))
                            }
                        };
                    }

                    let response_headers = response.headers().clone();
                    let body = response.text().await.unwrap_or_default();

                    if self.cloudflare_evasion && Self::is_challenge(status, &response_headers, &body) {
                        warn!(url = %url, status = %status, "Blocked by Cloudflare challenge");
                        return Err(FetchError::with_status(
                            url,
                            status.as_u16(),
                            "cloudflare challenge",
                        ));
                    }

                    warn!(url = %url, status = %status, "Request failed");

                    if Self::is_retryable_status(status) && attempt < self.max_retries {
                        // Free the slot while waiting to retry
                        drop(permit);
                        let delay = self.backoff(attempt);
                        debug!(delay_ms = delay.as_millis(), "Retrying after delay");
                        sleep(delay).await;
                        continue;
                    }

                    return Err(FetchError::with_status(
                        url,
                        status.as_u16(),
                        status.canonical_reason().unwrap_or("unexpected status"),
                    ));
                }
                Err(e) => {
                    warn!(url = %url, error = %e, "Request error");

                    if attempt < self.max_retries {
                        drop(permit);
                        let delay = self.backoff(attempt);
                        debug!(delay_ms = delay.as_millis(), "Retrying after delay");
                        sleep(delay).await;
                        continue;
                    }

                    return Err(FetchError::new(
                        url,
                        format!("request failed after {} retries: {}", self.max_retries, e),
                    ));
                }
            }
        }

        Err(FetchError::new(url, "request failed after all retries"))
    }
}
