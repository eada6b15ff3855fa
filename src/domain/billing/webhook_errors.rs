//! Webhook error types for provider webhook reconciliation.
//!
//! Defines all error conditions that can occur while verifying, parsing
//! and applying a webhook, with HTTP status code mapping and retryability
//! semantics. Conditions that are acknowledged without a state change
//! (unknown event types, missing tenants or subscriptions) are not errors.

use std::time::Duration;

use axum::http::StatusCode;
use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode};

/// Errors that occur during webhook processing.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Webhook signature verification failed.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Signature header could not be parsed.
    #[error("Malformed signature header: {0}")]
    MalformedSignatureHeader(String),

    /// Webhook timestamp is older than the tolerance window.
    #[error("Timestamp out of range")]
    TimestampOutOfRange,

    /// Event timestamp is in the future beyond clock skew tolerance.
    #[error("Invalid timestamp")]
    InvalidTimestamp,

    /// Payload is not valid JSON or does not match the expected shape.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// Required field missing from webhook payload.
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// Dedup status could not be determined. Processing must not proceed.
    #[error("Idempotency ledger unavailable: {0}")]
    LedgerUnavailable(String),

    /// A stored row disagrees with the tenant state machine.
    #[error("Invalid state transition: {0}")]
    InvalidTransition(String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(String),

    /// Transaction did not commit within the configured deadline.
    #[error("Transaction timed out after {0:?}")]
    Timeout(Duration),
}

impl WebhookError {
    /// Returns true if the provider should redeliver this webhook.
    ///
    /// Nothing is committed when any of these occur, so redelivery is safe.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WebhookError::LedgerUnavailable(_)
                | WebhookError::Database(_)
                | WebhookError::Timeout(_)
        )
    }

    /// Maps the error to an appropriate HTTP status code.
    ///
    /// Status codes determine the provider's retry behavior:
    /// - 2xx: Event acknowledged, no retry
    /// - 4xx: Client error, no retry
    /// - 5xx: Server error, will retry
    pub fn status_code(&self) -> StatusCode {
        match self {
            // Auth failures
            WebhookError::InvalidSignature
            | WebhookError::MalformedSignatureHeader(_)
            | WebhookError::TimestampOutOfRange => StatusCode::UNAUTHORIZED,

            // Bad request
            WebhookError::InvalidTimestamp
            | WebhookError::MalformedPayload(_)
            | WebhookError::MissingField(_) => StatusCode::BAD_REQUEST,

            // Server errors
            WebhookError::LedgerUnavailable(_)
            | WebhookError::InvalidTransition(_)
            | WebhookError::Database(_)
            | WebhookError::Timeout(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DomainError> for WebhookError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::InvalidStateTransition => WebhookError::InvalidTransition(err.message),
            ErrorCode::ValidationFailed => WebhookError::MalformedPayload(err.message),
            _ => WebhookError::Database(err.to_string()),
        }
    }
}
