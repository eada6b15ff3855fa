//! HTTP adapters - axum endpoints.

pub mod webhook;

use std::time::Duration;

use axum::Router;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

pub use webhook::{webhook_router, WebhookAppState};

/// Builds the service router with tracing and a request deadline.
pub fn app_router(state: WebhookAppState, request_timeout: Duration) -> Router {
    webhook_router()
        .with_state(state)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
}
