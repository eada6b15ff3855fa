//! Billing audit trail entries.
//!
//! Entries are append-only. Each carries before/after snapshots of the
//! billing state it touched so a reviewer can reconstruct what an event did.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::domain::foundation::{AuditLogId, TenantId, Timestamp, ValidationError};
use crate::domain::tenant::{Tenant, TenantStatus};

use super::{Subscription, SubscriptionStatus};

/// Who caused an audited change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorType {
    System,
    User,
    PaymentProvider,
}

impl ActorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorType::System => "system",
            ActorType::User => "user",
            ActorType::PaymentProvider => "payment_provider",
        }
    }

    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        match s {
            "system" => Ok(ActorType::System),
            "user" => Ok(ActorType::User),
            "payment_provider" => Ok(ActorType::PaymentProvider),
            other => Err(ValidationError::invalid_format(
                "actor_type",
                format!("unknown actor type '{}'", other),
            )),
        }
    }
}

/// What kind of change was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    SubscriptionCreated,
    InvoicePaid,
    PaymentFailed,
    SubscriptionUpdated,
    SubscriptionCanceled,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::SubscriptionCreated => "subscription_created",
            AuditAction::InvoicePaid => "invoice_paid",
            AuditAction::PaymentFailed => "payment_failed",
            AuditAction::SubscriptionUpdated => "subscription_updated",
            AuditAction::SubscriptionCanceled => "subscription_canceled",
        }
    }

    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        match s {
            "subscription_created" => Ok(AuditAction::SubscriptionCreated),
            "invoice_paid" => Ok(AuditAction::InvoicePaid),
            "payment_failed" => Ok(AuditAction::PaymentFailed),
            "subscription_updated" => Ok(AuditAction::SubscriptionUpdated),
            "subscription_canceled" => Ok(AuditAction::SubscriptionCanceled),
            other => Err(ValidationError::invalid_format(
                "audit_action",
                format!("unknown action '{}'", other),
            )),
        }
    }
}

/// Point-in-time view of a tenant's billing state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingSnapshot {
    pub tenant_status: TenantStatus,
    pub grace_until: Option<Timestamp>,
    pub provider_subscription_id: Option<String>,
    pub subscription_status: Option<SubscriptionStatus>,
    pub current_period_end: Option<Timestamp>,
    pub cancel_at_period_end: Option<bool>,
    pub cancel_at: Option<Timestamp>,
}

impl BillingSnapshot {
    pub fn capture(tenant: &Tenant, subscription: Option<&Subscription>) -> Self {
        Self {
            tenant_status: tenant.status,
            grace_until: tenant.grace_until,
            provider_subscription_id: subscription.map(|s| s.provider_subscription_id.clone()),
            subscription_status: subscription.map(|s| s.status),
            current_period_end: subscription.and_then(|s| s.current_period_end),
            cancel_at_period_end: subscription.map(|s| s.cancel_at_period_end),
            cancel_at: subscription.and_then(|s| s.cancel_at),
        }
    }

    pub fn to_json(&self) -> Value {
        json!({
            "tenant_status": self.tenant_status.as_str(),
            "grace_until": self.grace_until.map(|t| t.to_string()),
            "provider_subscription_id": self.provider_subscription_id,
            "subscription_status": self.subscription_status.map(|s| s.as_str()),
            "current_period_end": self.current_period_end.map(|t| t.to_string()),
            "cancel_at_period_end": self.cancel_at_period_end,
            "cancel_at": self.cancel_at.map(|t| t.to_string()),
        })
    }
}

/// Immutable audit log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillingAuditEntry {
    pub id: AuditLogId,
    pub occurred_at: Timestamp,
    pub actor_type: ActorType,
    pub actor_id: Option<String>,
    pub action: AuditAction,
    pub target_type: String,
    pub target_id: String,
    pub before: Option<Value>,
    pub after: Option<Value>,
}

impl BillingAuditEntry {
    /// Entry for a change driven by a payment provider event.
    ///
    /// The provider event id is recorded as the actor id so the entry can be
    /// traced back to the delivery that caused it.
    pub fn from_provider_event(
        now: Timestamp,
        event_id: impl Into<String>,
        action: AuditAction,
        tenant_id: TenantId,
        before: &BillingSnapshot,
        after: &BillingSnapshot,
    ) -> Self {
        Self {
            id: AuditLogId::new(),
            occurred_at: now,
            actor_type: ActorType::PaymentProvider,
            actor_id: Some(event_id.into()),
            action,
            target_type: "tenant".to_string(),
            target_id: tenant_id.to_string(),
            before: Some(before.to_json()),
            after: Some(after.to_json()),
        }
    }
}
