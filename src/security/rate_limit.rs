//! Fixed-window rate limiting with the counter stored client-side.
//!
//! There is no shared store: each client's `(count, window_start)` travels in
//! its own `rate_limit_<ip>` cookie as `"<count>:<window_start_ms>"`. A client
//! that drops or forges the cookie escapes the limit.

use axum::{
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::config::RateLimitConfig;

pub const X_RATELIMIT_LIMIT: &str = "x-ratelimit-limit";
pub const X_RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";
pub const X_RATELIMIT_RESET: &str = "x-ratelimit-reset";
pub const RETRY_AFTER: &str = "retry-after";

/// Per-client counter state as carried in the cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateCounter {
    pub count: u32,
    pub window_start_ms: u64,
}

impl RateCounter {
    /// Parse `"<count>:<window_start_ms>"`. Anything else is `None`.
    pub fn parse(value: &str) -> Option<Self> {
        let (count, start) = value.split_once(':')?;
        Some(Self {
            count: count.trim().parse().ok()?,
            window_start_ms: start.trim().parse().ok()?,
        })
    }

    pub fn encode(&self) -> String {
        format!("{}:{}", self.count, self.window_start_ms)
    }
}

/// Limit/remaining/reset triple reported to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitStatus {
    pub limit: u32,
    pub remaining: u32,
    /// Window end, epoch seconds (rounded up).
    pub reset: u64,
}

impl RateLimitStatus {
    /// Write the `X-RateLimit-*` headers.
    pub fn write_headers(&self, headers: &mut HeaderMap) {
        headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(self.limit));
        headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(self.remaining));
        headers.insert(X_RATELIMIT_RESET, HeaderValue::from(self.reset));
    }
}

/// Result of one limiter check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitOutcome {
    Allowed {
        counter: RateCounter,
        status: RateLimitStatus,
        /// Seconds left in the window; the cookie's max-age.
        cookie_max_age_secs: i64,
    },
    Limited(RateLimited),
}

/// The quota for the current window is spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimited {
    pub status: RateLimitStatus,
    /// Seconds until the window ends, at least 1.
    pub retry_after: u64,
}

/// JSON body of a 429 response.
#[derive(Serialize)]
struct RateLimitedBody {
    error: &'static str,
    message: String,
    retry_after: u64,
    limit: u32,
    remaining: u32,
}

impl IntoResponse for RateLimited {
    fn into_response(self) -> Response {
        let body = RateLimitedBody {
            error: "rate_limited",
            message: format!("Too many requests. Wait {} seconds.", self.retry_after),
            retry_after: self.retry_after,
            limit: self.status.limit,
            remaining: 0,
        };
        let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
        let headers = response.headers_mut();
        self.status.write_headers(headers);
        headers.insert(RETRY_AFTER, HeaderValue::from(self.retry_after));
        response
    }
}

/// Fixed-window limiter. Pure: the clock is passed in.
#[derive(Debug, Clone, Copy)]
pub struct RateLimiter {
    window_ms: u64,
    max_requests: u32,
}

impl RateLimiter {
    pub fn new(window_ms: u64, max_requests: u32) -> Self {
        Self {
            window_ms,
            max_requests,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.window_ms, config.max_requests)
    }

    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    /// Count one request given the prior cookie value (if any).
    ///
    /// A missing, malformed or expired counter starts a new window at `now_ms`.
    /// The request is refused when the count *before* this request has already
    /// reached the quota.
    pub fn check(&self, prior: Option<&str>, now_ms: u64) -> RateLimitOutcome {
        let current = prior
            .and_then(RateCounter::parse)
            .filter(|c| now_ms.saturating_sub(c.window_start_ms) <= self.window_ms);

        let (count, window_start_ms) = match current {
            Some(c) => (c.count, c.window_start_ms),
            None => (0, now_ms),
        };

        let window_end_ms = window_start_ms.saturating_add(self.window_ms);
        let left_ms = window_end_ms.saturating_sub(now_ms);
        let left_secs = left_ms.div_ceil(1000).max(1);
        let reset = window_end_ms.div_ceil(1000);

        if count >= self.max_requests {
            return RateLimitOutcome::Limited(RateLimited {
                status: RateLimitStatus {
                    limit: self.max_requests,
                    remaining: 0,
                    reset,
                },
                retry_after: left_secs,
            });
        }

        let counter = RateCounter {
            count: count + 1,
            window_start_ms,
        };
        RateLimitOutcome::Allowed {
            counter,
            status: RateLimitStatus {
                limit: self.max_requests,
                remaining: self.max_requests - counter.count,
                reset,
            },
            cookie_max_age_secs: i64::try_from(left_secs).unwrap_or(i64::MAX),
        }
    }
}
