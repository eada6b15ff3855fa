//! Idempotency ledger ports.
//!
//! The ledger is the dedup store for provider events. Providers deliver
//! webhooks at least once; the same event can arrive again after network
//! timeouts, 5xx responses, or lost acknowledgements.

use async_trait::async_trait;

use crate::domain::billing::WebhookEventRecord;
use crate::domain::foundation::{DomainError, Timestamp};

/// Transaction-scoped ledger insert.
#[async_trait]
pub trait WebhookLedger: Send {
    /// Record an event key.
    ///
    /// Returns `true` if this is the first time `(provider, event_id)` has been
    /// seen, `false` otherwise. Concurrent calls with the same key must yield
    /// exactly one `true`. Implementations use a unique constraint with
    /// `ON CONFLICT DO NOTHING` semantics.
    async fn try_insert(&mut self, record: &WebhookEventRecord) -> Result<bool, DomainError>;
}

/// Retention sweep over the ledger. Runs outside any webhook transaction.
#[async_trait]
pub trait WebhookRetention: Send + Sync {
    /// Delete ledger rows received before `cutoff`.
    ///
    /// Returns the number of rows deleted.
    async fn delete_older_than(&self, cutoff: Timestamp) -> Result<u64, DomainError>;
}

/// Result of webhook processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookResult {
    /// Event was processed (including acknowledged no-ops).
    Processed,
    /// Event was already processed (idempotent skip).
    AlreadyProcessed,
}

impl WebhookResult {
    pub fn is_processed(&self) -> bool {
        matches!(self, WebhookResult::Processed)
    }
}
