//! Configuration validation.
//!
//! Semantic checks that serde cannot express. Validation is a pure function
//! `GuardConfig → Result<(), Vec<ValidationError>>` and reports every problem,
//! not just the first.

use std::net::SocketAddr;

use axum::http::uri::Authority;

use crate::config::schema::GuardConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("listener.bind_address `{0}` is not a socket address")]
    BindAddress(String),
    #[error("upstream.address `{0}` must be host:port")]
    UpstreamAddress(String),
    #[error("observability.metrics_address `{0}` is not a socket address")]
    MetricsAddress(String),
    #[error("timeouts.request_secs must be greater than zero")]
    RequestTimeout,
    #[error("rate_limit.window_ms must be greater than zero")]
    RateWindow,
    #[error("rate_limit.max_requests must be greater than zero")]
    RateMax,
    #[error("csrf.cookie_max_age_secs must be greater than zero")]
    CsrfMaxAge,
    #[error("route prefix `{0}` must start with `/`")]
    RoutePrefix(String),
    #[error("route prefix `{0}` is listed as both public and protected")]
    RouteConflict(String),
    #[error("{0} must be an absolute path")]
    RedirectTarget(&'static str),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GuardConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }
    if let Some(upstream) = &config.upstream.address {
        let has_port = upstream
            .parse::<Authority>()
            .is_ok_and(|authority| authority.port_u16().is_some());
        if !has_port {
            errors.push(ValidationError::UpstreamAddress(upstream.clone()));
        }
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::RequestTimeout);
    }
    if config.rate_limit.window_ms == 0 {
        errors.push(ValidationError::RateWindow);
    }
    if config.rate_limit.max_requests == 0 {
        errors.push(ValidationError::RateMax);
    }
    if config.csrf.cookie_max_age_secs <= 0 {
        errors.push(ValidationError::CsrfMaxAge);
    }

    let routes = &config.routes;
    for prefix in routes
        .public
        .iter()
        .chain(&routes.protected)
        .chain(&routes.static_prefixes)
    {
        if !prefix.starts_with('/') {
            errors.push(ValidationError::RoutePrefix(prefix.clone()));
        }
    }
    for prefix in &routes.public {
        if routes.protected.contains(prefix) {
            errors.push(ValidationError::RouteConflict(prefix.clone()));
        }
    }
    if !routes.login_path.starts_with('/') {
        errors.push(ValidationError::RedirectTarget("routes.login_path"));
    }
    if !routes.dashboard_path.starts_with('/') {
        errors.push(ValidationError::RedirectTarget("routes.dashboard_path"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&GuardConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = GuardConfig::default();
        config.listener.bind_address = "nope".into();
        config.rate_limit.window_ms = 0;
        config.rate_limit.max_requests = 0;
        config.routes.public.push("settings".into());

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::RateWindow));
        assert!(errors.contains(&ValidationError::RoutePrefix("settings".into())));
    }

    #[test]
    fn test_conflicting_prefix() {
        let mut config = GuardConfig::default();
        config.routes.public.push("/dashboard".into());
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::RouteConflict("/dashboard".into())]);
    }

    #[test]
    fn test_upstream_needs_port() {
        let mut config = GuardConfig::default();
        config.upstream.address = Some("dashboard:3000".into());
        assert!(validate_config(&config).is_ok());

        config.upstream.address = Some("dashboard".into());
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::UpstreamAddress("dashboard".into())]);
    }
}
