//! The guard's per-request decision and how it is turned into a response.

use axum::{
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::CookieJar;

use crate::security::csrf::CsrfError;
use crate::security::rate_limit::RateLimited;

/// Terminal refusal of a request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("CSRF token validation failed: {0}")]
    Csrf(CsrfError),
    #[error("rate limit exceeded")]
    RateLimited(RateLimited),
}

impl Rejection {
    pub fn status(&self) -> StatusCode {
        match self {
            Rejection::Csrf(_) => StatusCode::FORBIDDEN,
            Rejection::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
        }
    }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        match self {
            Rejection::Csrf(_) => (
                StatusCode::FORBIDDEN,
                Json(serde_json::json!({ "error": "CSRF token validation failed" })),
            )
                .into_response(),
            Rejection::RateLimited(limited) => limited.into_response(),
        }
    }
}

/// What happens to the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Hand the request to the next handler.
    Continue,
    /// 307 to `location`.
    Redirect { location: String },
    Reject(Rejection),
}

impl Outcome {
    /// Label used for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Continue => "continue",
            Outcome::Redirect { .. } => "redirect",
            Outcome::Reject(Rejection::Csrf(_)) => "csrf_rejected",
            Outcome::Reject(Rejection::RateLimited(_)) => "rate_limited",
        }
    }
}

/// Decision plus the header and cookie mutations that accompany it.
#[derive(Debug, Clone)]
pub struct Verdict {
    pub outcome: Outcome,
    /// Security headers, plus rate-limit headers when the limiter ran.
    pub headers: HeaderMap,
    /// Cookies to set on the way out (CSRF token, rate-limit counter).
    pub cookies: CookieJar,
}

impl Verdict {
    /// Apply header and cookie mutations to a downstream response.
    pub fn decorate(headers: HeaderMap, cookies: CookieJar, response: Response) -> Response {
        (headers, cookies, response).into_response()
    }

    /// Build the guard's own response for a redirect or rejection.
    ///
    /// Returns the verdict back unchanged when the outcome is `Continue`.
    pub fn into_short_circuit(self) -> Result<Response, (HeaderMap, CookieJar)> {
        let Verdict {
            outcome,
            headers,
            cookies,
        } = self;
        let response = match outcome {
            Outcome::Continue => return Err((headers, cookies)),
            Outcome::Redirect { location } => redirect(&location),
            Outcome::Reject(rejection) => rejection.into_response(),
        };
        Ok(Self::decorate(headers, cookies, response))
    }
}

fn redirect(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::TEMPORARY_REDIRECT, [(header::LOCATION, value)]).into_response(),
        Err(_) => {
            tracing::error!(location = %location, "Unencodable redirect target");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::headers::security_headers;
    use crate::security::rate_limit::RateLimitStatus;

    fn verdict(outcome: Outcome) -> Verdict {
        Verdict {
            outcome,
            headers: security_headers(),
            cookies: CookieJar::new(),
        }
    }

    #[test]
    fn test_continue_is_not_short_circuited() {
        assert!(verdict(Outcome::Continue).into_short_circuit().is_err());
    }

    #[test]
    fn test_redirect_response() {
        let response = verdict(Outcome::Redirect {
            location: "/login?redirect=%2Fdashboard".into(),
        })
        .into_short_circuit()
        .unwrap();
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(response.headers()[header::LOCATION], "/login?redirect=%2Fdashboard");
        assert_eq!(response.headers()["x-frame-options"], "DENY");
    }

    #[test]
    fn test_rejection_statuses() {
        let csrf = verdict(Outcome::Reject(Rejection::Csrf(CsrfError::Mismatch)))
            .into_short_circuit()
            .unwrap();
        assert_eq!(csrf.status(), StatusCode::FORBIDDEN);
        assert_eq!(csrf.headers()["x-content-type-options"], "nosniff");

        let limited = Rejection::RateLimited(RateLimited {
            status: RateLimitStatus {
                limit: 50,
                remaining: 0,
                reset: 1,
            },
            retry_after: 30,
        });
        assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
        let response = verdict(Outcome::Reject(limited)).into_short_circuit().unwrap();
        assert_eq!(response.headers()["retry-after"], "30");
    }
}
