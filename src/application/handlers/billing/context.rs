//! Shared state for per-event handlers.

use crate::domain::billing::{AuditAction, BillingAuditEntry, BillingSnapshot, WebhookError};
use crate::domain::foundation::{TenantId, Timestamp};
use crate::ports::BillingTransaction;

use super::ReconcilerSettings;

/// What a per-event handler did with its event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerOutcome {
    /// State was mutated and one audit entry appended.
    Applied,
    /// Acknowledged without any state change.
    Skipped(&'static str),
}

/// Inputs every per-event handler needs besides its payload.
pub(super) struct EventContext<'a> {
    pub event_id: &'a str,
    pub now: Timestamp,
    pub settings: &'a ReconcilerSettings,
}

impl EventContext<'_> {
    /// Appends the single audit entry for an applied event.
    pub async fn record_audit(
        &self,
        tx: &mut dyn BillingTransaction,
        action: AuditAction,
        tenant_id: TenantId,
        before: &BillingSnapshot,
        after: &BillingSnapshot,
    ) -> Result<(), WebhookError> {
        let entry = BillingAuditEntry::from_provider_event(
            self.now,
            self.event_id,
            action,
            tenant_id,
            before,
            after,
        );
        tx.append_audit(&entry).await?;
        Ok(())
    }
}
