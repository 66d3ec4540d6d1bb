//! Request guard.
//!
//! # Data Flow
//! ```text
//! Request (method, path, query, headers, cookies, peer)
//!     → security headers (always)
//!     → CSRF check on POST/PUT/PATCH/DELETE      ─ fail → 403
//!     → issue CSRF cookie on GET without one
//!     → rate limiter on API paths / dynamic pages ─ fail → 429
//!     → route class + auth cookie presence
//!         protected, signed out → /login?redirect=<path>
//!         public, signed in     → redirect param or /dashboard
//!         exactly "/"           → /dashboard or /login
//!     → Continue
//! ```
//!
//! # Design Decisions
//! - `evaluate` is pure: state comes from the request, time from the caller
//! - A rejection short-circuits every later step
//! - Auth is cookie presence only; tokens are not verified here

pub mod verdict;

use std::net::SocketAddr;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Method, Request};
use axum_extra::extract::cookie::CookieJar;
use url::form_urlencoded;

use crate::config::GuardConfig;
use crate::routing::{RouteClass, RouteTable};
use crate::security::client_ip::extract_client_ip;
use crate::security::cookies::{self, rate_limit_cookie_name, CookieCodec};
use crate::security::csrf::{is_state_changing, CsrfTokens};
use crate::security::headers::security_headers;
use crate::security::rate_limit::{RateLimitOutcome, RateLimiter};

pub use verdict::{Outcome, Rejection, Verdict};

/// Milliseconds since the Unix epoch.
pub fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}

/// Composes the cookie codec, CSRF tokens, rate limiter and route table.
#[derive(Debug)]
pub struct Guard {
    codec: CookieCodec,
    csrf: CsrfTokens,
    limiter: Option<RateLimiter>,
    trust_proxy: bool,
    routes: RouteTable,
    login_path: String,
    dashboard_path: String,
}

impl Guard {
    pub fn new(config: &GuardConfig) -> Self {
        let codec = CookieCodec::from_config(&config.cookies);
        Self {
            codec,
            csrf: CsrfTokens::new(codec, config.csrf.cookie_max_age_secs),
            limiter: config
                .rate_limit
                .enabled
                .then(|| RateLimiter::from_config(&config.rate_limit)),
            trust_proxy: config.rate_limit.trust_proxy,
            routes: RouteTable::from_config(&config.routes),
            login_path: config.routes.login_path.clone(),
            dashboard_path: config.routes.dashboard_path.clone(),
        }
    }

    /// Swap in a different route table.
    pub fn with_routes(mut self, routes: RouteTable) -> Self {
        self.routes = routes;
        self
    }

    pub fn codec(&self) -> CookieCodec {
        self.codec
    }

    pub fn csrf(&self) -> CsrfTokens {
        self.csrf
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Decide what happens to `req` at time `now_ms`.
    ///
    /// The peer address is taken from the `ConnectInfo<SocketAddr>` extension
    /// when the server provides one.
    pub fn evaluate<B>(&self, req: &Request<B>, now_ms: u64) -> Verdict {
        let mut headers = security_headers();
        let mut set_cookies = CookieJar::new();
        let jar = CookieJar::from_headers(req.headers());
        let path = req.uri().path();

        let reject = |rejection: Rejection, headers: HeaderMap, cookies: CookieJar| Verdict {
            outcome: Outcome::Reject(rejection),
            headers,
            cookies,
        };

        if is_state_changing(req.method()) {
            if let Err(e) = self.csrf.verify(req.headers(), &jar) {
                tracing::warn!(method = %req.method(), path = %path, reason = %e, "CSRF validation failed");
                return reject(Rejection::Csrf(e), headers, set_cookies);
            }
        } else if req.method() == Method::GET && !CsrfTokens::has_cookie(&jar) {
            let (_, cookie) = self.csrf.issue();
            set_cookies = set_cookies.add(cookie);
            crate::observability::metrics::record_csrf_issued();
        }

        if let Some(limiter) = self.limiter.filter(|_| self.routes.is_rate_limited(path)) {
            let peer = req
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ci| ci.0);
            let client_ip = extract_client_ip(req.headers(), peer, self.trust_proxy);
            let prior = jar.get(&rate_limit_cookie_name(&client_ip)).map(|c| c.value());

            match limiter.check(prior, now_ms) {
                RateLimitOutcome::Allowed {
                    counter,
                    status,
                    cookie_max_age_secs,
                } => {
                    status.write_headers(&mut headers);
                    set_cookies = set_cookies.add(self.codec.rate_limit_cookie(
                        &client_ip,
                        counter.encode(),
                        cookie_max_age_secs,
                    ));
                }
                RateLimitOutcome::Limited(limited) => {
                    tracing::warn!(client = %client_ip, path = %path, retry_after = limited.retry_after, "Rate limit exceeded");
                    limited.status.write_headers(&mut headers);
                    return reject(Rejection::RateLimited(limited), headers, set_cookies);
                }
            }
        }

        let authenticated = cookies::get_auth_token(&jar).is_some();
        let outcome = self.route_outcome(path, req.uri().query(), authenticated);
        if let Outcome::Redirect { location } = &outcome {
            tracing::debug!(path = %path, location = %location, authenticated, "Redirecting");
        }

        Verdict {
            outcome,
            headers,
            cookies: set_cookies,
        }
    }

    fn route_outcome(&self, path: &str, query: Option<&str>, authenticated: bool) -> Outcome {
        match (self.routes.classify(path), authenticated) {
            (RouteClass::Protected, false) => {
                let query: String = form_urlencoded::Serializer::new(String::new())
                    .append_pair("redirect", path)
                    .finish();
                Outcome::Redirect {
                    location: format!("{}?{}", self.login_path, query),
                }
            }
            (RouteClass::Public, true) => {
                let target = query
                    .and_then(redirect_param)
                    .filter(|t| is_local_path(t))
                    .unwrap_or_else(|| self.dashboard_path.clone());
                Outcome::Redirect { location: target }
            }
            _ if path == "/" => Outcome::Redirect {
                location: if authenticated {
                    self.dashboard_path.clone()
                } else {
                    self.login_path.clone()
                },
            },
            _ => Outcome::Continue,
        }
    }
}

fn redirect_param(query: &str) -> Option<String> {
    form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == "redirect")
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}

/// Same-origin absolute path: no scheme, no authority, no backslash tricks.
///
/// Browsers strip tabs and newlines before parsing a `Location`, so a target
/// carrying any control character or whitespace is refused outright.
fn is_local_path(target: &str) -> bool {
    if target
        .chars()
        .any(|c| c.is_ascii_control() || c.is_whitespace())
    {
        return false;
    }
    target.starts_with('/') && !target.starts_with("//") && !target.contains('\\')
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, StatusCode};
    use crate::security::csrf::{generate_token, CSRF_COOKIE, CSRF_HEADER};
    use crate::security::rate_limit::{RETRY_AFTER, X_RATELIMIT_REMAINING};

    const NOW: u64 = 1_700_000_000_000;

    fn guard() -> Guard {
        Guard::new(&GuardConfig::default())
    }

    fn get(uri: &str, cookie: Option<&str>) -> Request<()> {
        let mut builder = Request::builder().method(Method::GET).uri(uri);
        if let Some(c) = cookie {
            builder = builder.header(header::COOKIE, c);
        }
        builder.body(()).unwrap()
    }

    fn location(verdict: &Verdict) -> &str {
        match &verdict.outcome {
            Outcome::Redirect { location } => location,
            other => panic!("expected redirect, got {:?}", other),
        }
    }

    #[test]
    fn test_security_headers_on_every_outcome() {
        let guard = guard();
        for req in [get("/", None), get("/dashboard", Some("auth_token=x"))] {
            let verdict = guard.evaluate(&req, NOW);
            assert_eq!(verdict.headers["x-frame-options"], "DENY");
            assert_eq!(verdict.headers["x-xss-protection"], "1; mode=block");
        }
    }

    #[test]
    fn test_root_redirects() {
        let guard = guard();
        assert_eq!(location(&guard.evaluate(&get("/", None), NOW)), "/login");
        assert_eq!(
            location(&guard.evaluate(&get("/", Some("auth_token=x")), NOW)),
            "/dashboard"
        );
    }

    #[test]
    fn test_protected_without_auth_redirects_to_login() {
        let guard = guard();
        let verdict = guard.evaluate(&get("/bookings/BKG-1001", None), NOW);
        assert_eq!(location(&verdict), "/login?redirect=%2Fbookings%2FBKG-1001");
    }

    #[test]
    fn test_protected_with_auth_continues() {
        let verdict = guard().evaluate(&get("/dashboard", Some("auth_token=x")), NOW);
        assert_eq!(verdict.outcome, Outcome::Continue);
    }

    #[test]
    fn test_public_with_auth_redirects() {
        let guard = guard();
        let plain = guard.evaluate(&get("/login", Some("auth_token=x")), NOW);
        assert_eq!(location(&plain), "/dashboard");

        let with_param = guard.evaluate(
            &get("/login?redirect=%2Fclients%3Fpage%3D2", Some("auth_token=x")),
            NOW,
        );
        assert_eq!(location(&with_param), "/clients?page=2");

        let offsite = guard.evaluate(
            &get("/login?redirect=https%3A%2F%2Fevil.example", Some("auth_token=x")),
            NOW,
        );
        assert_eq!(location(&offsite), "/dashboard");

        let protocol_relative =
            guard.evaluate(&get("/login?redirect=//evil.example", Some("auth_token=x")), NOW);
        assert_eq!(location(&protocol_relative), "/dashboard");

        for smuggled in [
            "%2F%09%2Fevil.example",
            "%2F%0A%2Fevil.example",
            "%2Fclients%0D%0AX%3A1",
        ] {
            let verdict = guard.evaluate(
                &get(&format!("/login?redirect={smuggled}"), Some("auth_token=x")),
                NOW,
            );
            assert_eq!(location(&verdict), "/dashboard", "{smuggled}");
            let response = verdict.into_short_circuit().unwrap();
            assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        }
    }

    #[test]
    fn test_public_without_auth_continues() {
        let verdict = guard().evaluate(&get("/login", None), NOW);
        assert_eq!(verdict.outcome, Outcome::Continue);
    }

    #[test]
    fn test_get_issues_csrf_cookie_once() {
        let guard = guard();
        let fresh = guard.evaluate(&get("/login", None), NOW);
        let cookie = fresh.cookies.get(CSRF_COOKIE).unwrap();
        assert_eq!(cookie.value().len(), 64);
        assert_eq!(cookie.http_only(), Some(false));

        let token = generate_token();
        let existing = guard.evaluate(&get("/login", Some(&format!("csrf_token={token}"))), NOW);
        assert!(existing.cookies.get(CSRF_COOKIE).is_none());
    }

    #[test]
    fn test_state_changing_without_header_is_forbidden() {
        let guard = guard();
        let token = generate_token();
        let req = Request::builder()
            .method(Method::POST)
            .uri("/api/bookings")
            .header(header::COOKIE, format!("csrf_token={token}"))
            .body(())
            .unwrap();

        for _ in 0..2 {
            let verdict = guard.evaluate(&req, NOW);
            assert!(matches!(verdict.outcome, Outcome::Reject(Rejection::Csrf(_))));
            assert!(verdict.headers.get(X_RATELIMIT_REMAINING).is_none());
            let response = verdict.into_short_circuit().unwrap();
            assert_eq!(response.status(), StatusCode::FORBIDDEN);
        }
    }

    #[test]
    fn test_state_changing_with_matching_token_passes() {
        let token = generate_token();
        for method in [Method::POST, Method::PUT, Method::PATCH, Method::DELETE] {
            let req = Request::builder()
                .method(method)
                .uri("/api/bookings/BKG-1001")
                .header(header::COOKIE, format!("csrf_token={token}"))
                .header(CSRF_HEADER, token.as_str())
                .body(())
                .unwrap();
            assert_eq!(guard().evaluate(&req, NOW).outcome, Outcome::Continue);
        }
    }

    #[test]
    fn test_rate_limit_headers_and_counter_cookie() {
        let guard = guard();
        let req = Request::builder()
            .uri("/api/bookings")
            .header("x-forwarded-for", "203.0.113.9")
            .body(())
            .unwrap();
        let verdict = guard.evaluate(&req, NOW);

        assert_eq!(verdict.headers[X_RATELIMIT_REMAINING], "49");
        let counter = verdict.cookies.get("rate_limit_203_0_113_9").unwrap();
        assert_eq!(counter.value(), format!("1:{NOW}"));
        assert_eq!(counter.http_only(), Some(true));
    }

    #[test]
    fn test_fifty_first_request_is_limited() {
        let guard = guard();
        let mut counter: Option<String> = None;

        for n in 1..=51u64 {
            let mut builder = Request::builder()
                .uri("/api/bookings")
                .header("x-forwarded-for", "198.51.100.7");
            if let Some(value) = &counter {
                builder = builder.header(
                    header::COOKIE,
                    format!("rate_limit_198_51_100_7={value}; csrf_token={}", "a".repeat(64)),
                );
            }
            let verdict = guard.evaluate(&builder.body(()).unwrap(), NOW + n * 1_000);

            if n <= 50 {
                assert_eq!(verdict.outcome, Outcome::Continue, "request {n}");
                assert_eq!(verdict.headers[X_RATELIMIT_REMAINING], (50 - n).to_string().as_str());
                counter = verdict
                    .cookies
                    .get("rate_limit_198_51_100_7")
                    .map(|c| c.value().to_string());
            } else {
                let response = verdict.into_short_circuit().unwrap();
                assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
                let retry: u64 = response.headers()[RETRY_AFTER].to_str().unwrap().parse().unwrap();
                assert!(retry > 0);
            }
        }
    }

    #[test]
    fn test_malformed_counter_cookie_is_fresh_window() {
        let req = Request::builder()
            .uri("/api/bookings")
            .header("x-forwarded-for", "203.0.113.9")
            .header(header::COOKIE, "rate_limit_203_0_113_9=abc")
            .body(())
            .unwrap();
        let verdict = guard().evaluate(&req, NOW);
        assert_eq!(verdict.outcome, Outcome::Continue);
        assert_eq!(verdict.headers[X_RATELIMIT_REMAINING], "49");
    }

    #[test]
    fn test_static_assets_bypass_limiter() {
        let verdict = guard().evaluate(&get("/_next/static/chunks/app.js", None), NOW);
        assert!(verdict.headers.get(X_RATELIMIT_REMAINING).is_none());
        assert_eq!(verdict.outcome, Outcome::Continue);
    }

    #[test]
    fn test_disabled_limiter() {
        let mut config = GuardConfig::default();
        config.rate_limit.enabled = false;
        let verdict = Guard::new(&config).evaluate(&get("/api/bookings", None), NOW);
        assert!(verdict.headers.get(X_RATELIMIT_REMAINING).is_none());
    }

    #[test]
    fn test_injected_route_table() {
        let guard = guard().with_routes(RouteTable::new(
            ["/signin"],
            ["/admin"],
            Default::default(),
        ));
        let verdict = guard.evaluate(&get("/admin", None), NOW);
        assert_eq!(location(&verdict), "/login?redirect=%2Fadmin");
        assert_eq!(guard.evaluate(&get("/dashboard", None), NOW).outcome, Outcome::Continue);
    }

    #[test]
    fn test_local_path_filter() {
        assert!(is_local_path("/clients"));
        assert!(!is_local_path("//evil.example"));
        assert!(!is_local_path("/\\evil.example"));
        assert!(!is_local_path("https://evil.example"));
        assert!(!is_local_path("/\t/evil.example"));
        assert!(!is_local_path("/\n/evil.example"));
        assert!(!is_local_path("/clients\r\nX: 1"));
        assert!(!is_local_path("/clients page"));
        assert!(is_local_path("/clients?page=2"));
    }
}
