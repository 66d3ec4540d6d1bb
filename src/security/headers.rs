//! Security response headers.
//!
//! Attached to every response the guard produces or forwards, whatever the
//! outcome.

use axum::http::{HeaderMap, HeaderValue};

pub const SECURITY_HEADERS: [(&str, &str); 4] = [
    ("x-frame-options", "DENY"),
    ("x-content-type-options", "nosniff"),
    ("referrer-policy", "strict-origin-when-cross-origin"),
    ("x-xss-protection", "1; mode=block"),
];

/// A header map holding only the security headers.
pub fn security_headers() -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(SECURITY_HEADERS.len());
    for (name, value) in SECURITY_HEADERS {
        headers.insert(name, HeaderValue::from_static(value));
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_security_headers() {
        let headers = security_headers();
        assert_eq!(headers.len(), 4);
        assert_eq!(headers["x-frame-options"], "DENY");
        assert_eq!(headers["referrer-policy"], "strict-origin-when-cross-origin");
    }
}
