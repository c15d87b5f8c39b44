//! Rate limiter shared by every request the fetcher issues.
//!
//! Enforces both per-second and per-minute limits. The state sits behind an
//! async mutex so concurrent adapter calls queue up instead of racing.

use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

#[derive(Debug)]
struct Window {
    /// Last request timestamp
    last_request: Option<Instant>,
    /// Request timestamps in the last minute
    recent_requests: Vec<Instant>,
}

/// Rate limiter with dual constraints (per-second and per-minute)
#[derive(Debug)]
pub struct RateLimiter {
    /// Maximum requests per second
    max_per_second: f64,
    /// Maximum requests per minute
    max_per_minute: u32,
    window: Mutex<Window>,
}

impl RateLimiter {
    /// Create a new rate limiter
    pub fn new(max_per_second: f64, max_per_minute: u32) -> Self {
        Self {
            max_per_second,
            max_per_minute,
            window: Mutex::new(Window {
                last_request: None,
                recent_requests: Vec::with_capacity(max_per_minute as usize),
            }),
        }
    }

    /// Wait until a request can be made, respecting both rate limits
    pub async fn acquire(&self) {
        let mut window = self.window.lock().await;
        let now = Instant::now();

        window
            .recent_requests
            .retain(|&timestamp| now.duration_since(timestamp) < Duration::from_secs(60));

        if self.max_per_minute > 0 && window.recent_requests.len() >= self.max_per_minute as usize {
            // Wait until the oldest request is more than 1 minute old
            if let Some(&oldest) = window.recent_requests.first() {
                let elapsed = now.duration_since(oldest);
                if elapsed < Duration::from_secs(60) {
                    let wait_time = Duration::from_secs(60) - elapsed;
                    tracing::debug!(
                        wait_ms = wait_time.as_millis(),
                        "Rate limit: waiting for per-minute limit"
                    );
                    sleep(wait_time).await;
                }
            }
        }

        if let (Some(last), true) = (window.last_request, self.max_per_second > 0.0) {
            let elapsed = now.duration_since(last);
            let min_interval = Duration::from_secs_f64(1.0 / self.max_per_second);

            if elapsed < min_interval {
                let wait_time = min_interval - elapsed;
                tracing::debug!(
                    wait_ms = wait_time.as_millis(),
                    "Rate limit: waiting for per-second limit"
                );
                sleep(wait_time).await;
            }
        }

        let request_time = Instant::now();
        window.last_request = Some(request_time);
        window.recent_requests.push(request_time);
    }

    /// Get the current number of requests in the last minute
    pub async fn current_minute_count(&self) -> usize {
        let mut window = self.window.lock().await;
        let now = Instant::now();
        window
            .recent_requests
            .retain(|&timestamp| now.duration_since(timestamp) < Duration::from_secs(60));
        window.recent_requests.len()
    }
}
