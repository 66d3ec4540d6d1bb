//! Client address resolution for rate limiting.

use std::net::SocketAddr;

use axum::http::HeaderMap;

/// Bucket shared by every client whose address cannot be determined.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Resolve the client IP.
///
/// When `trust_proxy` is true, the first `X-Forwarded-For` entry wins, then
/// `X-Real-IP`. Falls back to the socket peer, then to `"unknown"`.
pub fn extract_client_ip(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trust_proxy: bool,
) -> String {
    if trust_proxy {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .map(str::trim)
            .filter(|s| !s.is_empty());
        if let Some(ip) = forwarded {
            return ip.to_string();
        }

        let real_ip = headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty());
        if let Some(ip) = real_ip {
            return ip.to_string();
        }
    }

    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer() -> Option<SocketAddr> {
        Some("10.0.0.1:12345".parse().unwrap())
    }

    #[test]
    fn test_no_proxy_uses_peer() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.50".parse().unwrap());
        assert_eq!(extract_client_ip(&headers, peer(), false), "10.0.0.1");
    }

    #[test]
    fn test_forwarded_for_first_entry() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.50, 70.41.3.18".parse().unwrap());
        headers.insert("x-real-ip", "198.51.100.25".parse().unwrap());
        assert_eq!(extract_client_ip(&headers, peer(), true), "203.0.113.50");
    }

    #[test]
    fn test_real_ip_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", "198.51.100.25".parse().unwrap());
        assert_eq!(extract_client_ip(&headers, peer(), true), "198.51.100.25");
    }

    #[test]
    fn test_unknown_when_nothing_available() {
        assert_eq!(extract_client_ip(&HeaderMap::new(), None, true), UNKNOWN_CLIENT);
    }
}
