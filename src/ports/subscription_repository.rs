//! Subscription mirror repository port.

use async_trait::async_trait;

use crate::domain::billing::Subscription;
use crate::domain::foundation::{DomainError, TenantId};

/// Transaction-scoped access to mirrored subscriptions.
///
/// Implementations must enforce at most one subscription per tenant.
#[async_trait]
pub trait SubscriptionRepository: Send {
    /// # Errors
    ///
    /// - `SubscriptionExists` if the tenant already has a subscription
    /// - `DatabaseError` on persistence failure
    async fn insert_subscription(&mut self, subscription: &Subscription)
        -> Result<(), DomainError>;

    /// # Errors
    ///
    /// - `SubscriptionNotFound` if the row doesn't exist
    /// - `DatabaseError` on persistence failure
    async fn update_subscription(&mut self, subscription: &Subscription)
        -> Result<(), DomainError>;

    async fn find_subscription_by_tenant(
        &mut self,
        tenant_id: &TenantId,
    ) -> Result<Option<Subscription>, DomainError>;

    /// Lookup by the provider's subscription reference (sub_xxx).
    async fn find_subscription_by_provider_id(
        &mut self,
        provider_subscription_id: &str,
    ) -> Result<Option<Subscription>, DomainError>;
}
