//! Billing audit log port.

use async_trait::async_trait;

use crate::domain::billing::BillingAuditEntry;
use crate::domain::foundation::DomainError;

/// Append-only audit trail. There is no update or delete.
#[async_trait]
pub trait BillingAuditLog: Send {
    async fn append_audit(&mut self, entry: &BillingAuditEntry) -> Result<(), DomainError>;

    /// Entries for a target, in append order.
    async fn list_audit_for_target(
        &mut self,
        target_type: &str,
        target_id: &str,
    ) -> Result<Vec<BillingAuditEntry>, DomainError>;
}
