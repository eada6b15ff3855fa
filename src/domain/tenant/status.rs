//! Tenant status state machine.
//!
//! Defines the billing-driven lifecycle states of a tenant and the transitions
//! the reconciliation engine is allowed to perform.

use crate::domain::foundation::{StateMachine, ValidationError};
use serde::{Deserialize, Serialize};

/// Billing status of a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantStatus {
    /// Checkout started, first payment not yet confirmed.
    /// No access until the checkout completes.
    PendingPayment,

    /// Paid and in good standing.
    Active,

    /// Payment failed or subscription cancelled; access continues
    /// until `grace_until`.
    Grace,

    /// No access. Only an explicit admin action brings the tenant back.
    Suspended,
}

impl TenantStatus {
    /// Returns true if this status grants access to the application.
    pub fn has_access(&self) -> bool {
        matches!(self, TenantStatus::Active | TenantStatus::Grace)
    }

    /// Storage representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            TenantStatus::PendingPayment => "pending_payment",
            TenantStatus::Active => "active",
            TenantStatus::Grace => "grace",
            TenantStatus::Suspended => "suspended",
        }
    }

    /// Parses the storage representation.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        match s {
            "pending_payment" => Ok(TenantStatus::PendingPayment),
            "active" => Ok(TenantStatus::Active),
            "grace" => Ok(TenantStatus::Grace),
            "suspended" => Ok(TenantStatus::Suspended),
            other => Err(ValidationError::invalid_format(
                "tenant_status",
                format!("unknown status '{}'", other),
            )),
        }
    }
}

impl std::fmt::Display for TenantStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl StateMachine for TenantStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use TenantStatus::*;
        matches!(
            (self, target),
            // First successful checkout
            (PendingPayment, Active)
            // From ACTIVE
                | (Active, Active) // Renewal
                | (Active, Grace)
                | (Active, Suspended) // Cancellation after period end
            // From GRACE
                | (Grace, Active)
                | (Grace, Grace) // Cancellation re-anchors grace
                | (Grace, Suspended)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use TenantStatus::*;
        match self {
            PendingPayment => vec![Active],
            Active => vec![Active, Grace, Suspended],
            Grace => vec![Active, Grace, Suspended],
            Suspended => vec![],
        }
    }
}
