//! Tenant aggregate entity.
//!
//! A tenant is a billable customer organization. Its billing status is
//! mutated by the webhook reconciliation engine and by explicit admin
//! actions; tenants are never hard-deleted.

use crate::domain::foundation::{DomainError, ErrorCode, StateMachine, TenantId, Timestamp};
use serde::{Deserialize, Serialize};

use super::TenantStatus;

/// Tenant aggregate.
///
/// # Invariants
///
/// - Status transitions follow [`TenantStatus`] state machine rules
/// - `grace_until` is set if and only if `status == Grace`
/// - `pending_provider_session_id` is only set while `status == PendingPayment`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub display_name: String,
    pub timezone: String,
    pub status: TenantStatus,

    /// End of the grace window. Only present in `Grace`.
    pub grace_until: Option<Timestamp>,

    /// Checkout session awaiting its first successful payment.
    pub pending_provider_session_id: Option<String>,

    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Tenant {
    /// Create a tenant that has started checkout but not yet paid.
    pub fn create_pending(
        id: TenantId,
        display_name: impl Into<String>,
        timezone: impl Into<String>,
        provider_session_id: impl Into<String>,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            timezone: timezone.into(),
            status: TenantStatus::PendingPayment,
            grace_until: None,
            pending_provider_session_id: Some(provider_session_id.into()),
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the tenant currently has access to the product.
    ///
    /// A tenant in grace loses access once `grace_until` has passed, even if
    /// no suspension has been recorded yet.
    pub fn has_access(&self, now: Timestamp) -> bool {
        match self.status {
            TenantStatus::Grace => self.grace_until.is_some_and(|until| now < until),
            status => status.has_access(),
        }
    }

    /// First successful checkout: `PendingPayment -> Active`.
    pub fn activate(&mut self, now: Timestamp) -> Result<(), DomainError> {
        if self.status != TenantStatus::PendingPayment {
            return Err(self.invalid_transition(TenantStatus::Active));
        }
        self.transition_to(TenantStatus::Active)?;
        self.pending_provider_session_id = None;
        self.grace_until = None;
        self.updated_at = now;
        Ok(())
    }

    /// Payment recovered: `Grace -> Active`.
    pub fn restore(&mut self, now: Timestamp) -> Result<(), DomainError> {
        if self.status != TenantStatus::Grace {
            return Err(self.invalid_transition(TenantStatus::Active));
        }
        self.transition_to(TenantStatus::Active)?;
        self.grace_until = None;
        self.updated_at = now;
        Ok(())
    }

    /// Enter (or re-anchor) the grace window ending at `until`.
    pub fn enter_grace(&mut self, until: Timestamp, now: Timestamp) -> Result<(), DomainError> {
        self.transition_to(TenantStatus::Grace)?;
        self.grace_until = Some(until);
        self.updated_at = now;
        Ok(())
    }

    /// Revoke access.
    pub fn suspend(&mut self, now: Timestamp) -> Result<(), DomainError> {
        self.transition_to(TenantStatus::Suspended)?;
        self.grace_until = None;
        self.updated_at = now;
        Ok(())
    }

    fn transition_to(&mut self, target: TenantStatus) -> Result<(), DomainError> {
        self.status = self
            .status
            .transition_to(target)
            .map_err(|_| self.invalid_transition(target))?;
        Ok(())
    }

    fn invalid_transition(&self, target: TenantStatus) -> DomainError {
        DomainError::new(
            ErrorCode::InvalidStateTransition,
            format!(
                "Cannot transition tenant from {:?} to {:?}",
                self.status, target
            ),
        )
        .with_detail("tenant_id", self.id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> Timestamp {
        Timestamp::from_unix_secs(1_760_000_000).unwrap()
    }

    fn pending_tenant() -> Tenant {
        Tenant::create_pending(TenantId::new(), "Acme Shifts", "Europe/Berlin", "cs_123", now())
    }

    fn active_tenant() -> Tenant {
        let mut tenant = pending_tenant();
        tenant.activate(now()).unwrap();
        tenant
    }

    #[test]
    fn create_pending_holds_session_reference() {
        let tenant = pending_tenant();

        assert_eq!(tenant.status, TenantStatus::PendingPayment);
        assert_eq!(tenant.pending_provider_session_id.as_deref(), Some("cs_123"));
        assert!(tenant.grace_until.is_none());
        assert!(!tenant.has_access(now()));
    }

    #[test]
    fn activate_clears_pending_session() {
        let tenant = active_tenant();

        assert_eq!(tenant.status, TenantStatus::Active);
        assert!(tenant.pending_provider_session_id.is_none());
        assert!(tenant.has_access(now()));
    }

    #[test]
    fn activate_twice_is_rejected() {
        let mut tenant = active_tenant();

        let err = tenant.activate(now()).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidStateTransition);
    }

    #[test]
    fn enter_grace_sets_grace_until() {
        let mut tenant = active_tenant();
        let until = now().add_days(14);

        tenant.enter_grace(until, now()).unwrap();

        assert_eq!(tenant.status, TenantStatus::Grace);
        assert_eq!(tenant.grace_until, Some(until));
    }

    #[test]
    fn grace_access_ends_at_grace_until() {
        let mut tenant = active_tenant();
        let until = now().add_days(14);
        tenant.enter_grace(until, now()).unwrap();

        assert!(tenant.has_access(now().add_days(13)));
        assert!(!tenant.has_access(until));
    }

    #[test]
    fn restore_clears_grace_until() {
        let mut tenant = active_tenant();
        tenant.enter_grace(now().add_days(14), now()).unwrap();

        tenant.restore(now()).unwrap();

        assert_eq!(tenant.status, TenantStatus::Active);
        assert!(tenant.grace_until.is_none());
    }

    #[test]
    fn restore_requires_grace() {
        let mut tenant = active_tenant();
        assert!(tenant.restore(now()).is_err());
    }

    #[test]
    fn suspend_clears_grace_until() {
        let mut tenant = active_tenant();
        tenant.enter_grace(now().add_days(14), now()).unwrap();

        tenant.suspend(now()).unwrap();

        assert_eq!(tenant.status, TenantStatus::Suspended);
        assert!(tenant.grace_until.is_none());
    }

    #[test]
    fn pending_tenant_cannot_enter_grace_or_suspend() {
        let mut tenant = pending_tenant();

        assert!(tenant.enter_grace(now().add_days(14), now()).is_err());
        assert!(tenant.suspend(now()).is_err());
        assert_eq!(tenant.status, TenantStatus::PendingPayment);
    }
}
