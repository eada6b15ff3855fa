//! Subscription mirror.
//!
//! Local copy of the payment provider's subscription object. The mirror
//! carries no policy; lifecycle decisions read `current_period_end` from it.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{SubscriptionId, TenantId, Timestamp, ValidationError};

/// Provider-side subscription status, mirrored verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Trialing,
    PastDue,
    Canceled,
    Unpaid,
    Incomplete,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Trialing => "trialing",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Canceled => "canceled",
            SubscriptionStatus::Unpaid => "unpaid",
            SubscriptionStatus::Incomplete => "incomplete",
        }
    }

    /// Parses the provider's status string.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        match s {
            "active" => Ok(SubscriptionStatus::Active),
            "trialing" => Ok(SubscriptionStatus::Trialing),
            "past_due" => Ok(SubscriptionStatus::PastDue),
            "canceled" => Ok(SubscriptionStatus::Canceled),
            "unpaid" => Ok(SubscriptionStatus::Unpaid),
            "incomplete" => Ok(SubscriptionStatus::Incomplete),
            other => Err(ValidationError::invalid_format(
                "subscription_status",
                format!("unknown status '{}'", other),
            )),
        }
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mirrored subscription, one per tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub tenant_id: TenantId,
    pub provider_customer_id: String,
    pub provider_subscription_id: String,
    pub status: SubscriptionStatus,
    pub current_period_end: Option<Timestamp>,
    pub cancel_at_period_end: bool,
    pub cancel_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Subscription {
    /// Creates the mirror on first successful checkout.
    pub fn create(
        tenant_id: TenantId,
        provider_customer_id: impl Into<String>,
        provider_subscription_id: impl Into<String>,
        now: Timestamp,
    ) -> Self {
        Self {
            id: SubscriptionId::new(),
            tenant_id,
            provider_customer_id: provider_customer_id.into(),
            provider_subscription_id: provider_subscription_id.into(),
            status: SubscriptionStatus::Active,
            current_period_end: None,
            cancel_at_period_end: false,
            cancel_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Points an existing mirror at new provider references.
    ///
    /// Used when a tenant that already has a row completes checkout again.
    pub fn rebind(
        &mut self,
        now: Timestamp,
        provider_customer_id: impl Into<String>,
        provider_subscription_id: impl Into<String>,
    ) {
        self.provider_customer_id = provider_customer_id.into();
        self.provider_subscription_id = provider_subscription_id.into();
        self.status = SubscriptionStatus::Active;
        self.cancel_at_period_end = false;
        self.cancel_at = None;
        self.updated_at = now;
    }

    /// Copies status and period end from the provider.
    ///
    /// A `None` period end leaves the stored value in place; provider
    /// payloads omit it on some event shapes.
    pub fn update_status(
        &mut self,
        now: Timestamp,
        status: SubscriptionStatus,
        current_period_end: Option<Timestamp>,
    ) {
        self.status = status;
        if current_period_end.is_some() {
            self.current_period_end = current_period_end;
        }
        self.updated_at = now;
    }

    /// Copies the cancellation schedule from the provider.
    pub fn set_cancel_schedule(
        &mut self,
        now: Timestamp,
        cancel_at_period_end: bool,
        cancel_at: Option<Timestamp>,
    ) {
        self.cancel_at_period_end = cancel_at_period_end;
        self.cancel_at = cancel_at;
        self.updated_at = now;
    }
}
