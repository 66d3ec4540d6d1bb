//! Cookie codec.
//!
//! Maps the logical cookies the guard and the session endpoints care about
//! (auth token, refresh token, remember-me, rate-limit counter) to wire
//! cookies with fixed attributes. The `Secure` flag comes from configuration,
//! never from the process environment. The CSRF cookie lives in `csrf.rs`.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;

use crate::config::CookieConfig;

pub const AUTH_TOKEN: &str = "auth_token";
pub const REFRESH_TOKEN: &str = "refresh_token";
pub const REMEMBER_ME: &str = "remember_me";
pub const RATE_LIMIT_PREFIX: &str = "rate_limit_";

const AUTH_MAX_AGE_SECS: i64 = 60 * 60 * 24 * 7;
const REFRESH_MAX_AGE_SECS: i64 = 60 * 60 * 24 * 30;
const REMEMBER_ME_MAX_AGE_SECS: i64 = 60 * 60 * 24 * 30;
const MAX_COOKIE_VALUE_LEN: usize = 4096;

/// Writes and reads the guard's cookies.
#[derive(Debug, Clone, Copy, Default)]
pub struct CookieCodec {
    secure: bool,
}

impl CookieCodec {
    pub fn new(secure: bool) -> Self {
        Self { secure }
    }

    pub fn from_config(config: &CookieConfig) -> Self {
        Self::new(config.production)
    }

    pub fn secure(&self) -> bool {
        self.secure
    }

    /// Build a `SameSite=Strict; Path=/` cookie with this codec's `Secure` flag.
    pub fn build(
        &self,
        name: impl Into<String>,
        value: impl Into<String>,
        max_age_secs: i64,
        http_only: bool,
    ) -> Cookie<'static> {
        Cookie::build((name.into(), value.into()))
            .max_age(Duration::seconds(max_age_secs))
            .http_only(http_only)
            .secure(self.secure)
            .same_site(SameSite::Strict)
            .path("/")
            .build()
    }

    pub fn set_auth_token(&self, jar: CookieJar, token: impl Into<String>) -> CookieJar {
        jar.add(self.build(AUTH_TOKEN, token, AUTH_MAX_AGE_SECS, true))
    }

    pub fn set_refresh_token(&self, jar: CookieJar, token: impl Into<String>) -> CookieJar {
        jar.add(self.build(REFRESH_TOKEN, token, REFRESH_MAX_AGE_SECS, true))
    }

    /// Expire both session cookies immediately.
    pub fn clear_auth_tokens(&self, jar: CookieJar) -> CookieJar {
        jar.add(self.build(AUTH_TOKEN, "", 0, true))
            .add(self.build(REFRESH_TOKEN, "", 0, true))
    }

    pub fn set_remember_me(&self, jar: CookieJar) -> CookieJar {
        jar.add(self.build(REMEMBER_ME, "true", REMEMBER_ME_MAX_AGE_SECS, true))
    }

    pub fn clear_remember_me(&self, jar: CookieJar) -> CookieJar {
        jar.add(self.build(REMEMBER_ME, "", 0, true))
    }

    /// Counter cookie for one client, expiring with its window.
    pub fn rate_limit_cookie(
        &self,
        client_ip: &str,
        value: impl Into<String>,
        max_age_secs: i64,
    ) -> Cookie<'static> {
        self.build(rate_limit_cookie_name(client_ip), value, max_age_secs, true)
    }
}

/// Auth token from the request jar. An empty value counts as absent.
pub fn get_auth_token(jar: &CookieJar) -> Option<String> {
    non_empty(jar, AUTH_TOKEN)
}

/// Refresh token from the request jar. An empty value counts as absent.
pub fn get_refresh_token(jar: &CookieJar) -> Option<String> {
    non_empty(jar, REFRESH_TOKEN)
}

fn non_empty(jar: &CookieJar, name: &str) -> Option<String> {
    jar.get(name)
        .map(|c| c.value())
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

/// `rate_limit_<ip>` with every non-alphanumeric byte replaced by `_`, so
/// IPv6 addresses still form a valid cookie-name token.
pub fn rate_limit_cookie_name(client_ip: &str) -> String {
    let sanitized: String = client_ip
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("{RATE_LIMIT_PREFIX}{sanitized}")
}

/// Basic sanity check for values written into cookies.
pub fn validate_cookie_value(value: &str) -> bool {
    !value.is_empty()
        && value.len() < MAX_COOKIE_VALUE_LEN
        && !value
            .chars()
            .any(|c| c == ';' || c == ',' || c.is_whitespace())
}
