//! Forwarding of allowed requests to the dashboard upstream.

use std::str::FromStr;

use axum::{
    body::Body,
    http::{
        uri::{Authority, Scheme},
        HeaderValue, Request, StatusCode, Uri,
    },
    response::{IntoResponse, Response},
};
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

pub const X_REQUEST_ID: &str = "x-request-id";

/// Upstream forwarding failures.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("invalid upstream address `{0}`")]
    Address(String),
    #[error("could not build upstream URI: {0}")]
    Uri(#[from] axum::http::uri::InvalidUriParts),
    #[error("upstream request failed: {0}")]
    Request(#[from] hyper_util::client::legacy::Error),
}

impl IntoResponse for UpstreamError {
    fn into_response(self) -> Response {
        match self {
            UpstreamError::Request(_) => {
                (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "Upstream misconfigured").into_response(),
        }
    }
}

/// HTTP client for the dashboard upstream.
#[derive(Clone)]
pub struct UpstreamClient {
    client: Client<HttpConnector, Body>,
}

impl UpstreamClient {
    pub fn new() -> Self {
        Self {
            client: Client::builder(TokioExecutor::new()).build(HttpConnector::new()),
        }
    }

    /// Rewrite `request` to target `address` and send it.
    pub async fn forward(
        &self,
        address: &str,
        request: Request<Body>,
    ) -> Result<Response, UpstreamError> {
        let authority =
            Authority::from_str(address).map_err(|_| UpstreamError::Address(address.to_string()))?;

        let (mut parts, body) = request.into_parts();
        let request_id = parts
            .headers
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string();

        let mut uri_parts = parts.uri.clone().into_parts();
        uri_parts.scheme = Some(Scheme::HTTP);
        uri_parts.authority = Some(authority);
        if uri_parts.path_and_query.is_none() {
            uri_parts.path_and_query = Some("/".parse().map_err(|_| UpstreamError::Address(address.to_string()))?);
        }
        parts.uri = Uri::from_parts(uri_parts)?;
        if let Ok(value) = HeaderValue::from_str(address) {
            parts.headers.insert(axum::http::header::HOST, value);
        }

        tracing::debug!(request_id = %request_id, upstream = %address, uri = %parts.uri, "Forwarding request");

        let response = self
            .client
            .request(Request::from_parts(parts, body))
            .await
            .map_err(|e| {
                tracing::error!(request_id = %request_id, error = %e, "Upstream error");
                UpstreamError::from(e)
            })?;

        Ok(into_axum_response(response))
    }
}

/// Re-box an upstream response body for axum.
fn into_axum_response(response: hyper::Response<Incoming>) -> Response {
    let (parts, body) = response.into_parts();
    Response::from_parts(parts, Body::new(body))
}

impl Default for UpstreamClient {
    fn default() -> Self {
        Self::new()
    }
}
