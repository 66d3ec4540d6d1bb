//! CSRF double-submit tokens.
//!
//! The token is issued in a cookie that client script can read and must be
//! echoed back in `X-CSRF-Token` on every state-changing request. Issuing and
//! verifying are kept together here, apart from the general cookie codec, so
//! the cookie is never written `HttpOnly`.

use axum::http::{HeaderMap, Method};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use rand::rngs::OsRng;
use rand::RngCore;
use subtle::ConstantTimeEq;

use crate::security::cookies::CookieCodec;

pub const CSRF_COOKIE: &str = "csrf_token";
pub const CSRF_HEADER: &str = "x-csrf-token";

const TOKEN_BYTES: usize = 32;
/// Hex-encoded length of a token.
pub const TOKEN_LEN: usize = TOKEN_BYTES * 2;

/// Why a state-changing request failed CSRF validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CsrfError {
    #[error("missing X-CSRF-Token header")]
    MissingHeader,
    #[error("missing csrf_token cookie")]
    MissingCookie,
    #[error("CSRF token mismatch")]
    Mismatch,
}

/// 32 bytes from the OS CSPRNG as 64 lowercase hex characters.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// True iff both tokens are present, equal, and exactly `TOKEN_LEN` long.
pub fn validate_token(provided: Option<&str>, expected: Option<&str>) -> bool {
    let (Some(provided), Some(expected)) = (provided, expected) else {
        return false;
    };
    if provided.len() != TOKEN_LEN || expected.len() != TOKEN_LEN {
        return false;
    }
    provided.as_bytes().ct_eq(expected.as_bytes()).into()
}

/// POST, PUT, PATCH and DELETE require a token.
pub fn is_state_changing(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

/// Issues and verifies CSRF tokens.
#[derive(Debug, Clone, Copy)]
pub struct CsrfTokens {
    codec: CookieCodec,
    max_age_secs: i64,
}

impl CsrfTokens {
    pub fn new(codec: CookieCodec, max_age_secs: i64) -> Self {
        Self {
            codec,
            max_age_secs,
        }
    }

    /// A fresh token and the script-readable cookie carrying it.
    pub fn issue(&self) -> (String, Cookie<'static>) {
        let token = generate_token();
        let cookie = self
            .codec
            .build(CSRF_COOKIE, token.clone(), self.max_age_secs, false);
        (token, cookie)
    }

    /// Expire the CSRF cookie, keeping it script-readable.
    pub fn clear(&self, jar: CookieJar) -> CookieJar {
        jar.add(self.codec.build(CSRF_COOKIE, "", 0, false))
    }

    pub fn has_cookie(jar: &CookieJar) -> bool {
        jar.get(CSRF_COOKIE).is_some_and(|c| !c.value().is_empty())
    }

    /// Compare the echoed header against the cookie.
    pub fn verify(&self, headers: &HeaderMap, jar: &CookieJar) -> Result<(), CsrfError> {
        let provided = headers
            .get(CSRF_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .ok_or(CsrfError::MissingHeader)?;
        let expected = jar
            .get(CSRF_COOKIE)
            .map(|c| c.value())
            .filter(|v| !v.is_empty())
            .ok_or(CsrfError::MissingCookie)?;

        if validate_token(Some(provided), Some(expected)) {
            Ok(())
        } else {
            Err(CsrfError::Mismatch)
        }
    }
}
