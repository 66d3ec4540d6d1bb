//! Session endpoints: login, logout, refresh.
//!
//! They only mint opaque tokens and write cookies through the codec. Nothing
//! is persisted and tokens are never verified beyond their prefix.

pub mod credentials;
pub mod handlers;

use std::sync::Arc;

use axum::{routing::post, Router};
use axum_extra::extract::cookie::CookieJar;
use uuid::Uuid;

use crate::config::GuardConfig;
use crate::http::server::AppState;
use crate::security::cookies::CookieCodec;
use crate::security::csrf::CsrfTokens;

use self::credentials::{CredentialVerifier, StaticCredentials};

pub const LOGIN_PATH: &str = "/api/auth/login";
pub const LOGOUT_PATH: &str = "/api/auth/logout";
pub const REFRESH_PATH: &str = "/api/auth/refresh";

const AUTH_TOKEN_PREFIX: &str = "at_";
const REFRESH_TOKEN_PREFIX: &str = "rt_";

/// Token minting and cookie bookkeeping for the session endpoints.
#[derive(Debug, Clone)]
pub struct SessionService {
    codec: CookieCodec,
    csrf: CsrfTokens,
    verifier: Arc<dyn CredentialVerifier>,
}

impl SessionService {
    pub fn new(codec: CookieCodec, csrf: CsrfTokens, verifier: Arc<dyn CredentialVerifier>) -> Self {
        Self {
            codec,
            csrf,
            verifier,
        }
    }

    pub fn from_config(config: &GuardConfig) -> Self {
        let codec = CookieCodec::from_config(&config.cookies);
        Self::new(
            codec,
            CsrfTokens::new(codec, config.csrf.cookie_max_age_secs),
            Arc::new(StaticCredentials::new(config.auth.users.clone())),
        )
    }

    pub fn codec(&self) -> CookieCodec {
        self.codec
    }

    pub fn verify(&self, email: &str, password: &str) -> bool {
        self.verifier.verify(email, password)
    }

    /// Set a fresh auth/refresh pair, plus `remember_me` when asked.
    pub fn start(&self, jar: CookieJar, remember_me: bool) -> CookieJar {
        let jar = self.rotate(jar);
        if remember_me {
            self.codec.set_remember_me(jar)
        } else {
            jar
        }
    }

    /// Replace both tokens.
    pub fn rotate(&self, jar: CookieJar) -> CookieJar {
        let jar = self.codec.set_auth_token(jar, mint(AUTH_TOKEN_PREFIX));
        self.codec.set_refresh_token(jar, mint(REFRESH_TOKEN_PREFIX))
    }

    /// Clear every session-related cookie, CSRF token included.
    pub fn end(&self, jar: CookieJar) -> CookieJar {
        let jar = self.codec.clear_auth_tokens(jar);
        let jar = self.codec.clear_remember_me(jar);
        self.csrf.clear(jar)
    }

    /// Whether `token` has the shape of a refresh token minted here.
    pub fn is_refresh_token(&self, token: &str) -> bool {
        token
            .strip_prefix(REFRESH_TOKEN_PREFIX)
            .is_some_and(|rest| Uuid::try_parse(rest).is_ok())
    }
}

fn mint(prefix: &str) -> String {
    format!("{prefix}{}", Uuid::new_v4().simple())
}

/// Routes served by the guard itself.
pub fn session_router() -> Router<AppState> {
    Router::new()
        .route(LOGIN_PATH, post(handlers::login))
        .route(LOGOUT_PATH, post(handlers::logout))
        .route(REFRESH_PATH, post(handlers::refresh))
}
