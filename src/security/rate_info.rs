//! Reading rate-limit headers back on the client side.
//!
//! Used by `guard-cli probe` to explain the quota state of a running guard.

use reqwest::header::HeaderMap;
use serde::Serialize;

use crate::security::rate_limit::{
    RETRY_AFTER, X_RATELIMIT_LIMIT, X_RATELIMIT_REMAINING, X_RATELIMIT_RESET,
};

/// Quota state as reported by the guard's response headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimitInfo {
    pub limit: u32,
    pub remaining: u32,
    /// Window end, epoch seconds.
    pub reset: u64,
    pub retry_after: Option<u64>,
}

impl RateLimitInfo {
    /// `None` unless limit, remaining and reset are all present and numeric.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let number = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok())
        };

        Some(Self {
            limit: u32::try_from(number(X_RATELIMIT_LIMIT)?).ok()?,
            remaining: u32::try_from(number(X_RATELIMIT_REMAINING)?).ok()?,
            reset: number(X_RATELIMIT_RESET)?,
            retry_after: number(RETRY_AFTER),
        })
    }

    /// Milliseconds until the window resets, never negative.
    pub fn time_until_reset(&self, now_ms: u64) -> u64 {
        self.reset.saturating_mul(1000).saturating_sub(now_ms)
    }

    /// True when at most 20% of the quota (rounded up) is left.
    pub fn should_warn(&self) -> bool {
        let threshold = u64::from(self.limit).saturating_mul(2).div_ceil(10);
        u64::from(self.remaining) <= threshold
    }

    pub fn message(&self, now_ms: u64) -> String {
        let wait = format_time_remaining(self.time_until_reset(now_ms));
        if self.remaining == 0 {
            format!("Rate limit exceeded. Please try again in {wait}.")
        } else if self.should_warn() {
            format!(
                "Rate limit warning: {} requests remaining. Resets in {wait}.",
                self.remaining
            )
        } else {
            format!(
                "Rate limit: {}/{} requests remaining.",
                self.remaining, self.limit
            )
        }
    }
}

/// "N seconds" / "N minutes" / "N hours", each rounded up.
pub fn format_time_remaining(millis: u64) -> String {
    let seconds = millis.div_ceil(1000);
    if seconds < 60 {
        return format!("{seconds} seconds");
    }
    let minutes = seconds.div_ceil(60);
    if minutes < 60 {
        return format!("{minutes} minutes");
    }
    format!("{} hours", minutes.div_ceil(60))
}
