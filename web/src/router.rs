//! Route table and middleware stack.

use crate::handlers::{admin, health, tickets};
use crate::middleware::{make_request_span, REQUEST_ID_HEADER};
use crate::{AppError, AppState};
use axum::{
    http::HeaderName,
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

/// Build the application router.
///
/// Layers, outermost first: request id, tracing span, request id
/// propagation to the response, CORS.
#[must_use]
pub fn build_router(state: AppState) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
        .route("/metrics", get(health::metrics))
        .route("/tickets", post(tickets::create_ticket))
        .route(
            "/tickets/:token",
            get(tickets::get_ticket).delete(tickets::cancel_ticket),
        )
        .route("/admin/tickets", get(admin::list_tickets))
        .route("/admin/tickets/:id/complete", put(admin::complete_ticket))
        .route("/admin/reset", post(admin::reset))
        .route("/admin/cleanup", post(admin::cleanup))
        .route("/admin/stats", get(admin::stats))
        .fallback(route_not_found)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
                .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
                .layer(PropagateRequestIdLayer::new(request_id))
                .layer(CorsLayer::permissive()),
        )
}

#[allow(clippy::unused_async)]
async fn route_not_found() -> AppError {
    AppError::not_found("No such route")
}
