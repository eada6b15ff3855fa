//! Tenant repository port.
//!
//! Transaction-scoped access to Tenant aggregates. Implementations run every
//! call inside the enclosing [`BillingTransaction`](super::BillingTransaction).

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, TenantId};
use crate::domain::tenant::Tenant;

#[async_trait]
pub trait TenantRepository: Send {
    /// Insert a newly created tenant.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` if a tenant with the same id exists
    /// - `DatabaseError` on persistence failure
    async fn insert_tenant(&mut self, tenant: &Tenant) -> Result<(), DomainError>;

    /// Persist changes to an existing tenant.
    ///
    /// # Errors
    ///
    /// - `TenantNotFound` if the tenant doesn't exist
    /// - `DatabaseError` on persistence failure
    async fn update_tenant(&mut self, tenant: &Tenant) -> Result<(), DomainError>;

    async fn find_tenant(&mut self, id: &TenantId) -> Result<Option<Tenant>, DomainError>;

    /// Find the tenant awaiting the given checkout session.
    async fn find_tenant_by_pending_session(
        &mut self,
        session_id: &str,
    ) -> Result<Option<Tenant>, DomainError>;
}
