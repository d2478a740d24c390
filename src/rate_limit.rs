//! Blanket per-source-IP rate limiting
//!
//! Fixed-window counter per source address, applied to the whole router.
//! Each request is checked before any handler runs.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::Response,
};
use tokio::sync::RwLock;

use crate::AppState;
use crate::error::AppError;

const DEFAULT_MAX_TRACKED_KEYS: usize = 10_000;

/// Rate limiter entry
#[derive(Debug, Clone)]
struct RateLimitEntry {
    /// Number of requests in current window
    count: u32,
    /// Window start time
    window_start: Instant,
}

impl RateLimitEntry {
    /// Check if this entry is in a new window
    fn is_new_window(&self, window_duration: Duration) -> bool {
        self.window_start.elapsed() >= window_duration
    }

    /// Increment count or reset if new window
    fn increment(&mut self, window_duration: Duration) {
        if self.is_new_window(window_duration) {
            self.count = 1;
            self.window_start = Instant::now();
        } else {
            self.count += 1;
        }
    }
}

/// Fixed-window rate limiter keyed by source address
pub struct RateLimiter {
    /// Rate limit entries: key -> entry
    entries: RwLock<HashMap<String, RateLimitEntry>>,
    /// Maximum requests per window
    max_requests: u32,
    /// Window duration
    window_duration: Duration,
    /// Maximum number of tracked keys in memory
    max_tracked_keys: usize,
}

impl RateLimiter {
    /// Create new rate limiter
    ///
    /// # Arguments
    /// * `max_requests` - Maximum requests per window (default: 100)
    /// * `window_duration` - Window duration (default: 15 minutes)
    pub fn new(max_requests: Option<u32>, window_duration: Option<Duration>) -> Self {
        Self::with_max_tracked_keys(max_requests, window_duration, DEFAULT_MAX_TRACKED_KEYS)
    }

    /// Create new rate limiter with explicit in-memory key cap.
    pub fn with_max_tracked_keys(
        max_requests: Option<u32>,
        window_duration: Option<Duration>,
        max_tracked_keys: usize,
    ) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_requests: max_requests.unwrap_or(100),
            window_duration: window_duration.unwrap_or(Duration::from_secs(900)),
            max_tracked_keys: max_tracked_keys.max(1),
        }
    }

    fn prune_expired_locked(
        entries: &mut HashMap<String, RateLimitEntry>,
        window_duration: Duration,
    ) {
        entries.retain(|_, value| !value.is_new_window(window_duration));
    }

    fn evict_oldest_locked(entries: &mut HashMap<String, RateLimitEntry>) {
        let Some(oldest_key) = entries
            .iter()
            .min_by_key(|(_, value)| value.window_start)
            .map(|(key, _)| key.clone())
        else {
            return;
        };
        entries.remove(&oldest_key);
    }

    /// Check if a request should be allowed
    ///
    /// # Arguments
    /// * `key` - Rate limit key (source address)
    ///
    /// # Returns
    /// Ok if allowed, Err if rate limited
    pub async fn check_and_increment(&self, key: &str) -> Result<(), AppError> {
        let mut entries = self.entries.write().await;

        if !entries.contains_key(key) && entries.len() >= self.max_tracked_keys {
            Self::prune_expired_locked(&mut entries, self.window_duration);
            if entries.len() >= self.max_tracked_keys {
                Self::evict_oldest_locked(&mut entries);
            }
        }

        let entry = entries
            .entry(key.to_string())
            .or_insert_with(|| RateLimitEntry {
                count: 0,
                window_start: Instant::now(),
            });

        if !entry.is_new_window(self.window_duration) && entry.count >= self.max_requests {
            Err(AppError::RateLimited)
        } else {
            entry.increment(self.window_duration);
            Ok(())
        }
    }

    /// Get current count for a key
    pub async fn get_count(&self, key: &str) -> u32 {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| !entry.is_new_window(self.window_duration))
            .map(|entry| entry.count)
            .unwrap_or(0)
    }
}

/// Middleware applying the blanket limit to every request
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AppError> {
    let key = client_key(&request);
    state.rate_limiter.check_and_increment(&key).await?;
    Ok(next.run(request).await)
}

/// Rate-limit key for a request
///
/// The first X-Forwarded-For hop wins when present (the SPA dev proxy sits
/// in front); otherwise the peer address from the connection info.
fn client_key(request: &Request<axum::body::Body>) -> String {
    forwarded_for(request)
        .or_else(|| {
            request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|info| info.0.ip().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

fn forwarded_for(request: &Request<axum::body::Body>) -> Option<String> {
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
