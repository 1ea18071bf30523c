//! Request tracking for observability.
//!
//! Every request carries an `x-request-id` header. The router sets one (a
//! UUID v4) when the client did not, records it on the request's tracing
//! span and copies it onto the response.
//!
//! # Flow
//!
//! 1. **Set** `x-request-id` on the request if missing (`SetRequestIdLayer`)
//! 2. **Create tracing span** with the request id, method and URI
//! 3. **Propagate** the id into the response headers (`PropagateRequestIdLayer`)

use axum::{body::Body, http::Request};
use tracing::Span;

/// Header name for the request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Build the tracing span for one HTTP request.
///
/// Used as `TraceLayer::make_span_with`. Runs after the request id has been
/// set, so the header is present unless the layers are misordered.
pub fn make_request_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");

    tracing::info_span!(
        "http_request",
        request_id = %request_id,
        method = %request.method(),
        uri = %request.uri(),
    )
}
