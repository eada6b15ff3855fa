//! HTTP adapter for provider webhooks.
//!
//! - `POST /webhooks/stripe` - Verify and reconcile a Stripe delivery

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::{ErrorResponse, WebhookAckResponse};
pub use handlers::{WebhookApiError, WebhookAppState};
pub use routes::webhook_router;
