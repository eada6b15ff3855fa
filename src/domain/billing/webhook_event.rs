//! Idempotency ledger record.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::Timestamp;

/// Provider name used for ledger keys.
pub const STRIPE_PROVIDER: &str = "stripe";

/// Longest ledger retention accepted by the purge.
pub const MAX_WEBHOOK_RETENTION_DAYS: i64 = 3650;

/// A provider event that has been accepted for processing.
///
/// `(provider, event_id)` is unique across the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookEventRecord {
    pub provider: String,
    pub event_id: String,
    /// Raw payload snapshot for debugging.
    pub payload: Option<serde_json::Value>,
    pub received_at: Timestamp,
}

impl WebhookEventRecord {
    pub fn new(
        provider: impl Into<String>,
        event_id: impl Into<String>,
        payload: Option<serde_json::Value>,
        received_at: Timestamp,
    ) -> Self {
        Self {
            provider: provider.into(),
            event_id: event_id.into(),
            payload,
            received_at,
        }
    }

    pub fn key(&self) -> (&str, &str) {
        (&self.provider, &self.event_id)
    }
}
