//! Unit of work port.
//!
//! A webhook touches tenant, subscription, entitlement, audit and ledger
//! state together. All of it goes through one [`BillingTransaction`] so the
//! writes land atomically or not at all.
//!
//! # Example
//!
//! ```ignore
//! let mut tx = uow.begin().await?;
//! if !tx.try_insert(&record).await? {
//!     return Ok(WebhookResult::AlreadyProcessed); // dropped, rolled back
//! }
//! tx.update_tenant(&tenant).await?;
//! tx.append_audit(&entry).await?;
//! tx.commit().await?;
//! ```

use async_trait::async_trait;

use crate::domain::foundation::DomainError;

use super::{
    BillingAuditLog, EntitlementRepository, SubscriptionRepository, TenantRepository,
    WebhookLedger,
};

/// An open transaction over all billing state.
///
/// Dropping a transaction without calling [`commit`](Self::commit) rolls it
/// back. Calls made after `commit` fail with `TransactionClosed`.
#[async_trait]
pub trait BillingTransaction:
    TenantRepository + SubscriptionRepository + EntitlementRepository + BillingAuditLog + WebhookLedger + Send
{
    async fn commit(&mut self) -> Result<(), DomainError>;
}

/// Factory for billing transactions.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn BillingTransaction>, DomainError>;
}
