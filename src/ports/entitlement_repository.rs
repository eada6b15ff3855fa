//! Entitlement repository port.

use async_trait::async_trait;

use crate::domain::billing::Entitlement;
use crate::domain::foundation::{DomainError, TenantId};

#[async_trait]
pub trait EntitlementRepository: Send {
    async fn insert_entitlement(&mut self, entitlement: &Entitlement) -> Result<(), DomainError>;

    /// Persist a revocation or expiry change.
    ///
    /// # Errors
    ///
    /// - `EntitlementNotFound` if the row doesn't exist
    async fn update_entitlement(&mut self, entitlement: &Entitlement) -> Result<(), DomainError>;

    /// All entitlements of a tenant, oldest first, including revoked ones.
    async fn list_entitlements(
        &mut self,
        tenant_id: &TenantId,
    ) -> Result<Vec<Entitlement>, DomainError>;
}
