//! Guard middleware.
//! Runs the request guard before any handler and decorates whatever comes back.

use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::guard::{epoch_millis, Verdict};
use crate::http::server::AppState;
use crate::observability::metrics;

pub async fn guard_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let start = Instant::now();
    let verdict = state.inner.load().guard.evaluate(&req, epoch_millis());
    let label = verdict.outcome.label();

    let response = match verdict.into_short_circuit() {
        Ok(response) => response,
        Err((headers, cookies)) => {
            let response = next.run(req).await;
            Verdict::decorate(headers, cookies, response)
        }
    };

    metrics::record_decision(label, response.status().as_u16(), start);
    response
}
