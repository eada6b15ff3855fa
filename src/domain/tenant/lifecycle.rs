//! Tenant lifecycle policy.
//!
//! Billing signals (checkout, invoice outcome, cancellation) are translated
//! into tenant transitions here. The grace period length is configuration,
//! not a constant, so it is carried by [`GracePolicy`].

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, Timestamp, ValidationError};

use super::{Tenant, TenantStatus};

/// Default grace window after a failed payment or cancellation.
pub const DEFAULT_GRACE_PERIOD_DAYS: i64 = 14;

/// Upper bound accepted for the grace window.
pub const MAX_GRACE_PERIOD_DAYS: i64 = 90;

/// Grace window configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GracePolicy {
    grace_period_days: i64,
}

impl GracePolicy {
    /// Creates a policy with the given grace window.
    ///
    /// Zero is allowed and means failures suspend on the next cancellation
    /// without any extra window.
    pub fn new(grace_period_days: i64) -> Result<Self, ValidationError> {
        if !(0..=MAX_GRACE_PERIOD_DAYS).contains(&grace_period_days) {
            return Err(ValidationError::out_of_range(
                "grace_period_days",
                0,
                MAX_GRACE_PERIOD_DAYS,
                grace_period_days,
            ));
        }
        Ok(Self { grace_period_days })
    }

    pub fn grace_period_days(&self) -> i64 {
        self.grace_period_days
    }

    /// End of a grace window that starts at `anchor`.
    ///
    /// Fails when the window would end past the representable date range.
    pub fn grace_until(&self, anchor: Timestamp) -> Result<Timestamp, ValidationError> {
        anchor.checked_add_days(self.grace_period_days).ok_or_else(|| {
            ValidationError::invalid_format(
                "grace_until",
                format!("grace window from {} is out of range", anchor),
            )
        })
    }

    /// Decide what a cancellation does given the subscription's period end.
    ///
    /// A missing period end is treated as already elapsed.
    pub fn resolve_cancellation(
        &self,
        now: Timestamp,
        period_end: Option<Timestamp>,
    ) -> Result<CancellationResolution, ValidationError> {
        match period_end {
            Some(end) if now < end => {
                Ok(CancellationResolution::GraceUntil(self.grace_until(end)?))
            }
            _ => Ok(CancellationResolution::SuspendNow),
        }
    }
}

impl Default for GracePolicy {
    fn default() -> Self {
        Self {
            grace_period_days: DEFAULT_GRACE_PERIOD_DAYS,
        }
    }
}

/// Outcome of a cancellation before it is applied to a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancellationResolution {
    /// Paid period has elapsed; suspend immediately.
    SuspendNow,
    /// Keep access until the given instant.
    GraceUntil(Timestamp),
}

/// Result of applying a billing signal to a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleChange {
    /// The tenant was left untouched.
    Unchanged,
    /// The tenant was mutated. `from` may equal `to` when only the grace
    /// window moved.
    Changed {
        from: TenantStatus,
        to: TenantStatus,
    },
}

impl LifecycleChange {
    pub fn is_changed(&self) -> bool {
        matches!(self, LifecycleChange::Changed { .. })
    }
}

/// Applies billing signals to tenants under a [`GracePolicy`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TenantLifecycle {
    policy: GracePolicy,
}

impl TenantLifecycle {
    pub fn new(policy: GracePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &GracePolicy {
        &self.policy
    }

    /// First successful checkout.
    ///
    /// Only a `PendingPayment` tenant is activated; any other status is left
    /// alone so a replayed checkout cannot re-run activation side effects.
    pub fn activate(
        &self,
        tenant: &mut Tenant,
        now: Timestamp,
    ) -> Result<LifecycleChange, DomainError> {
        let from = tenant.status;
        if from != TenantStatus::PendingPayment {
            return Ok(LifecycleChange::Unchanged);
        }
        tenant.activate(now)?;
        Ok(LifecycleChange::Changed {
            from,
            to: tenant.status,
        })
    }

    /// A successful invoice payment.
    ///
    /// `Grace -> Active`; `Active` stays as it is.
    pub fn record_payment_succeeded(
        &self,
        tenant: &mut Tenant,
        now: Timestamp,
    ) -> Result<LifecycleChange, DomainError> {
        let from = tenant.status;
        match from {
            TenantStatus::Grace => {
                tenant.restore(now)?;
                Ok(LifecycleChange::Changed {
                    from,
                    to: tenant.status,
                })
            }
            TenantStatus::Active | TenantStatus::PendingPayment | TenantStatus::Suspended => {
                Ok(LifecycleChange::Unchanged)
            }
        }
    }

    /// A failed invoice payment.
    ///
    /// `Active -> Grace` with `grace_until = now + grace period`. A tenant
    /// already in grace keeps its existing window so payment retries never
    /// extend it.
    pub fn record_payment_failed(
        &self,
        tenant: &mut Tenant,
        now: Timestamp,
    ) -> Result<LifecycleChange, DomainError> {
        let from = tenant.status;
        match from {
            TenantStatus::Active => {
                tenant.enter_grace(self.policy.grace_until(now)?, now)?;
                Ok(LifecycleChange::Changed {
                    from,
                    to: tenant.status,
                })
            }
            TenantStatus::Grace | TenantStatus::PendingPayment | TenantStatus::Suspended => {
                Ok(LifecycleChange::Unchanged)
            }
        }
    }

    /// Subscription cancellation, given the subscription's period end.
    ///
    /// Suspends directly when the period has elapsed, otherwise grants grace
    /// anchored to the period end.
    pub fn record_cancellation(
        &self,
        tenant: &mut Tenant,
        now: Timestamp,
        period_end: Option<Timestamp>,
    ) -> Result<LifecycleChange, DomainError> {
        let from = tenant.status;
        if !matches!(from, TenantStatus::Active | TenantStatus::Grace) {
            return Ok(LifecycleChange::Unchanged);
        }

        match self.policy.resolve_cancellation(now, period_end)? {
            CancellationResolution::SuspendNow => tenant.suspend(now)?,
            CancellationResolution::GraceUntil(until) => {
                if from == TenantStatus::Grace && tenant.grace_until == Some(until) {
                    return Ok(LifecycleChange::Unchanged);
                }
                tenant.enter_grace(until, now)?;
            }
        }

        Ok(LifecycleChange::Changed {
            from,
            to: tenant.status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{ErrorCode, TenantId};
    use proptest::prelude::*;

    fn now() -> Timestamp {
        Timestamp::from_unix_secs(1_760_000_000).unwrap()
    }

    fn tenant_in(status: TenantStatus) -> Tenant {
        let mut tenant =
            Tenant::create_pending(TenantId::new(), "Acme Shifts", "UTC", "cs_1", now());
        match status {
            TenantStatus::PendingPayment => {}
            TenantStatus::Active => tenant.activate(now()).unwrap(),
            TenantStatus::Grace => {
                tenant.activate(now()).unwrap();
                tenant.enter_grace(now().add_days(3), now()).unwrap();
            }
            TenantStatus::Suspended => {
                tenant.activate(now()).unwrap();
                tenant.suspend(now()).unwrap();
            }
        }
        tenant
    }

    #[test]
    fn grace_policy_rejects_out_of_range_values() {
        assert!(GracePolicy::new(-1).is_err());
        assert!(GracePolicy::new(MAX_GRACE_PERIOD_DAYS + 1).is_err());
        assert_eq!(GracePolicy::new(0).unwrap().grace_period_days(), 0);
        assert_eq!(GracePolicy::default().grace_period_days(), 14);
    }

    #[test]
    fn activate_ignores_non_pending_tenant() {
        let lifecycle = TenantLifecycle::default();
        let mut tenant = tenant_in(TenantStatus::Active);

        let change = lifecycle.activate(&mut tenant, now()).unwrap();

        assert_eq!(change, LifecycleChange::Unchanged);
    }

    #[test]
    fn payment_failure_moves_active_to_grace() {
        let lifecycle = TenantLifecycle::default();
        let mut tenant = tenant_in(TenantStatus::Active);

        let change = lifecycle.record_payment_failed(&mut tenant, now()).unwrap();

        assert_eq!(
            change,
            LifecycleChange::Changed {
                from: TenantStatus::Active,
                to: TenantStatus::Grace
            }
        );
        assert_eq!(tenant.grace_until, Some(now().add_days(14)));
    }

    #[test]
    fn repeated_payment_failure_keeps_grace_window() {
        let lifecycle = TenantLifecycle::default();
        let mut tenant = tenant_in(TenantStatus::Grace);
        let before = tenant.grace_until;

        let change = lifecycle
            .record_payment_failed(&mut tenant, now().add_days(1))
            .unwrap();

        assert_eq!(change, LifecycleChange::Unchanged);
        assert_eq!(tenant.grace_until, before);
    }

    #[test]
    fn payment_success_restores_grace_tenant() {
        let lifecycle = TenantLifecycle::default();
        let mut tenant = tenant_in(TenantStatus::Grace);

        let change = lifecycle.record_payment_succeeded(&mut tenant, now()).unwrap();

        assert!(change.is_changed());
        assert_eq!(tenant.status, TenantStatus::Active);
        assert!(tenant.grace_until.is_none());
    }

    #[test]
    fn payment_success_leaves_suspended_tenant_alone() {
        let lifecycle = TenantLifecycle::default();
        let mut tenant = tenant_in(TenantStatus::Suspended);

        let change = lifecycle.record_payment_succeeded(&mut tenant, now()).unwrap();

        assert_eq!(change, LifecycleChange::Unchanged);
        assert_eq!(tenant.status, TenantStatus::Suspended);
    }

    #[test]
    fn cancellation_after_period_end_suspends() {
        let lifecycle = TenantLifecycle::default();
        let mut tenant = tenant_in(TenantStatus::Active);

        lifecycle
            .record_cancellation(&mut tenant, now(), Some(now().add_hours(-1)))
            .unwrap();

        assert_eq!(tenant.status, TenantStatus::Suspended);
    }

    #[test]
    fn cancellation_exactly_at_period_end_suspends() {
        let lifecycle = TenantLifecycle::default();
        let mut tenant = tenant_in(TenantStatus::Active);

        lifecycle
            .record_cancellation(&mut tenant, now(), Some(now()))
            .unwrap();

        assert_eq!(tenant.status, TenantStatus::Suspended);
    }

    #[test]
    fn cancellation_without_period_end_suspends() {
        let lifecycle = TenantLifecycle::default();
        let mut tenant = tenant_in(TenantStatus::Grace);

        lifecycle.record_cancellation(&mut tenant, now(), None).unwrap();

        assert_eq!(tenant.status, TenantStatus::Suspended);
    }

    #[test]
    fn cancellation_before_period_end_anchors_grace_to_period_end() {
        let lifecycle = TenantLifecycle::default();
        let mut tenant = tenant_in(TenantStatus::Grace);
        let period_end = now().add_days(7);

        let change = lifecycle
            .record_cancellation(&mut tenant, now(), Some(period_end))
            .unwrap();

        assert_eq!(
            change,
            LifecycleChange::Changed {
                from: TenantStatus::Grace,
                to: TenantStatus::Grace
            }
        );
        assert_eq!(tenant.grace_until, Some(period_end.add_days(14)));
    }

    #[test]
    fn cancellation_ignores_pending_tenant() {
        let lifecycle = TenantLifecycle::default();
        let mut tenant = tenant_in(TenantStatus::PendingPayment);

        let change = lifecycle
            .record_cancellation(&mut tenant, now(), Some(now().add_hours(-1)))
            .unwrap();

        assert_eq!(change, LifecycleChange::Unchanged);
        assert_eq!(tenant.status, TenantStatus::PendingPayment);
    }

    #[test]
    fn custom_grace_policy_is_honoured() {
        let lifecycle = TenantLifecycle::new(GracePolicy::new(3).unwrap());
        let mut tenant = tenant_in(TenantStatus::Active);

        lifecycle.record_payment_failed(&mut tenant, now()).unwrap();

        assert_eq!(tenant.grace_until, Some(now().add_days(3)));
    }

    #[test]
    fn cancellation_with_period_end_at_range_limit_is_rejected() {
        let lifecycle = TenantLifecycle::default();
        let mut tenant = tenant_in(TenantStatus::Active);
        let period_end = Timestamp::from_unix_secs(8_210_266_876_799).unwrap();

        let err = lifecycle
            .record_cancellation(&mut tenant, now(), Some(period_end))
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::ValidationFailed);
        assert_eq!(tenant.status, TenantStatus::Active);
        assert!(tenant.grace_until.is_none());
    }

    proptest! {
        #[test]
        fn cancellation_split_follows_period_end(
            offset_secs in -90_i64 * 86_400..90 * 86_400,
            days in 0_i64..=MAX_GRACE_PERIOD_DAYS,
        ) {
            let policy = GracePolicy::new(days).unwrap();
            let period_end = Timestamp::from_unix_secs(now().as_unix_secs() + offset_secs).unwrap();

            let resolution = policy.resolve_cancellation(now(), Some(period_end)).unwrap();

            if offset_secs <= 0 {
                prop_assert_eq!(resolution, CancellationResolution::SuspendNow);
            } else {
                prop_assert_eq!(
                    resolution,
                    CancellationResolution::GraceUntil(period_end.add_days(days))
                );
            }
        }
    }
}
