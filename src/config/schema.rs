//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the guard.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the request guard.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GuardConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Dashboard upstream that allowed requests are forwarded to.
    pub upstream: UpstreamConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Cookie attributes shared by every cookie the guard writes.
    pub cookies: CookieConfig,

    /// CSRF double-submit settings.
    pub csrf: CsrfConfig,

    /// Cookie-backed rate limiting.
    pub rate_limit: RateLimitConfig,

    /// Public / protected / static path tables.
    pub routes: RoutesConfig,

    /// Login/logout/refresh endpoints served by the guard itself.
    pub auth: AuthConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Upstream configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Upstream address (e.g., "127.0.0.1:3000"). Without one, allowed
    /// requests that no local handler serves get a 404.
    pub address: Option<String>,
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Cookie attribute configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct CookieConfig {
    /// Production deployment: every cookie is written with `Secure`.
    pub production: bool,
}

/// CSRF configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CsrfConfig {
    /// Lifetime of the `csrf_token` cookie in seconds.
    pub cookie_max_age_secs: i64,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            cookie_max_age_secs: 60 * 60 * 24,
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Window length in milliseconds.
    pub window_ms: u64,

    /// Maximum requests per client IP within one window.
    pub max_requests: u32,

    /// Trust `X-Forwarded-For` / `X-Real-IP` for the client address.
    pub trust_proxy: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_ms: 15 * 60 * 1000,
            max_requests: 50,
            trust_proxy: true,
        }
    }
}

/// Path classification tables.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutesConfig {
    /// Prefixes reachable only while signed out.
    pub public: Vec<String>,

    /// Prefixes that require the auth cookie.
    pub protected: Vec<String>,

    /// Framework-internal and static prefixes that bypass the rate limiter.
    pub static_prefixes: Vec<String>,

    /// File extensions treated as static assets.
    pub static_extensions: Vec<String>,

    /// Sign-in page.
    pub login_path: String,

    /// Landing page for signed-in users.
    pub dashboard_path: String,
}

impl Default for RoutesConfig {
    fn default() -> Self {
        let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
        Self {
            public: strings(&[
                "/login",
                "/register",
                "/forgot-password",
                "/reset-password",
                "/verify-email",
            ]),
            protected: strings(&[
                "/dashboard",
                "/bookings",
                "/clients",
                "/resources",
                "/analytics",
                "/documents",
                "/notifications",
                "/help",
                "/settings",
                "/profile",
            ]),
            static_prefixes: strings(&["/_next/", "/static/", "/public/", "/favicon.ico"]),
            static_extensions: strings(&[
                "css", "js", "map", "png", "jpg", "jpeg", "gif", "svg", "ico", "webp", "woff",
                "woff2", "ttf", "txt",
            ]),
            login_path: "/login".to_string(),
            dashboard_path: "/dashboard".to_string(),
        }
    }
}

/// Session endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Serve `/api/auth/{login,logout,refresh}` from the guard.
    pub enabled: bool,

    /// Demo accounts accepted by the login endpoint.
    pub users: Vec<UserCredential>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            users: vec![UserCredential {
                email: "admin@example.com".to_string(),
                password: "password".to_string(),
            }],
        }
    }
}

/// A single demo account.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserCredential {
    pub email: String,
    pub password: String,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
