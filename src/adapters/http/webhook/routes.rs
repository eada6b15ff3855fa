//! Axum router configuration for webhook endpoints.

use axum::{routing::post, Router};

use super::handlers::{handle_stripe_webhook, WebhookAppState};

/// Create the webhook router, mounted at `/webhooks`.
///
/// # Routes
/// - `POST /webhooks/stripe` - Handle Stripe webhooks (no auth, signature verified)
pub fn webhook_router() -> Router<WebhookAppState> {
    Router::new().nest(
        "/webhooks",
        Router::new().route("/stripe", post(handle_stripe_webhook)),
    )
}
