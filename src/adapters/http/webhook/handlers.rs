//! Axum handler for provider webhook deliveries.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};

use crate::application::ReconcileWebhookHandler;
use crate::domain::billing::{WebhookError, WebhookSignatureVerifier};
use crate::ports::Clock;

use super::dto::{ErrorResponse, WebhookAckResponse};

/// Header carrying the provider's signature.
pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared state for the webhook endpoint.
#[derive(Clone)]
pub struct WebhookAppState {
    pub reconciler: Arc<ReconcileWebhookHandler>,
    pub verifier: Arc<WebhookSignatureVerifier>,
    pub clock: Arc<dyn Clock>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// POST /webhooks/stripe - Verify and reconcile a Stripe webhook delivery
///
/// The signature is checked against the exact request bytes before the body
/// is parsed.
pub async fn handle_stripe_webhook(
    State(state): State<WebhookAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, WebhookApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            WebhookError::MalformedSignatureHeader("missing Stripe-Signature header".to_string())
        })?;

    let now_unix = state.clock.now().as_unix_secs();
    if let Err(err) = state.verifier.verify(&body, signature, now_unix) {
        tracing::warn!(error = %err, "Rejected webhook signature");
        return Err(err.into());
    }

    let result = state.reconciler.handle_raw(&body).await?;

    Ok((
        StatusCode::OK,
        Json(WebhookAckResponse {
            received: true,
            processed: result.is_processed(),
        }),
    ))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts webhook errors to HTTP responses.
#[derive(Debug)]
pub struct WebhookApiError(WebhookError);

impl From<WebhookError> for WebhookApiError {
    fn from(err: WebhookError) -> Self {
        Self(err)
    }
}

impl IntoResponse for WebhookApiError {
    fn into_response(self) -> axum::response::Response {
        let error_code = match &self.0 {
            WebhookError::InvalidSignature => "INVALID_SIGNATURE",
            WebhookError::MalformedSignatureHeader(_) => "MALFORMED_SIGNATURE_HEADER",
            WebhookError::TimestampOutOfRange => "TIMESTAMP_OUT_OF_RANGE",
            WebhookError::InvalidTimestamp => "INVALID_TIMESTAMP",
            WebhookError::MalformedPayload(_) => "MALFORMED_PAYLOAD",
            WebhookError::MissingField(_) => "MISSING_FIELD",
            WebhookError::LedgerUnavailable(_) => "LEDGER_UNAVAILABLE",
            WebhookError::InvalidTransition(_) => "INVALID_TRANSITION",
            WebhookError::Database(_) => "DATABASE_ERROR",
            WebhookError::Timeout(_) => "TIMEOUT",
        };
        let status = self.0.status_code();

        // Server-side details stay in the logs
        let message = if status.is_server_error() {
            "Webhook could not be processed".to_string()
        } else {
            self.0.to_string()
        };

        let body = ErrorResponse::new(error_code, message).with_retryable(self.0.is_retryable());
        (status, Json(body)).into_response()
    }
}
