//! Payment provider event envelope and typed payloads.
//!
//! The envelope is parsed once, then the `data.object` payload is decoded
//! into the variant for its event type. Only fields the reconciler reads are
//! captured; everything else in the provider's schema is ignored.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::foundation::Timestamp;

use super::{SubscriptionStatus, WebhookError};

/// Event envelope: `{id, type, data: {object}}`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderEvent {
    /// Unique identifier for the event (evt_xxx format).
    pub id: String,

    /// Type of event (e.g., "checkout.session.completed").
    #[serde(rename = "type")]
    pub event_type: String,

    /// Object containing event-specific data.
    pub data: ProviderEventData,

    /// Time at which the event was created (Unix timestamp).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<i64>,
}

/// Container for event-specific data.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderEventData {
    /// The object that triggered the event (shape depends on event type).
    pub object: serde_json::Value,
}

impl ProviderEvent {
    /// Parses the raw request body.
    pub fn from_slice(raw: &[u8]) -> Result<Self, WebhookError> {
        let event: ProviderEvent = serde_json::from_slice(raw)
            .map_err(|e| WebhookError::MalformedPayload(e.to_string()))?;
        if event.id.trim().is_empty() {
            return Err(WebhookError::MissingField("id"));
        }
        Ok(event)
    }

    /// Decodes the payload for this event's type.
    pub fn billing_event(&self) -> Result<BillingEvent, WebhookError> {
        let event = match self.event_type.as_str() {
            CHECKOUT_SESSION_COMPLETED => BillingEvent::CheckoutCompleted(self.decode_object()?),
            INVOICE_PAID => BillingEvent::InvoicePaid(self.decode_object()?),
            INVOICE_PAYMENT_FAILED => BillingEvent::InvoicePaymentFailed(self.decode_object()?),
            SUBSCRIPTION_UPDATED => BillingEvent::SubscriptionUpdated(self.decode_object()?),
            SUBSCRIPTION_DELETED => BillingEvent::SubscriptionDeleted(self.decode_object()?),
            other => BillingEvent::Unrecognized(other.to_string()),
        };
        Ok(event)
    }

    fn decode_object<T: serde::de::DeserializeOwned>(&self) -> Result<T, WebhookError> {
        T::deserialize(&self.data.object).map_err(|e| {
            WebhookError::MalformedPayload(format!("{} payload: {}", self.event_type, e))
        })
    }
}

pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";
pub const INVOICE_PAID: &str = "invoice.paid";
pub const INVOICE_PAYMENT_FAILED: &str = "invoice.payment_failed";
pub const SUBSCRIPTION_UPDATED: &str = "customer.subscription.updated";
pub const SUBSCRIPTION_DELETED: &str = "customer.subscription.deleted";

/// Closed set of events the reconciler acts on.
#[derive(Debug, Clone, PartialEq)]
pub enum BillingEvent {
    CheckoutCompleted(CheckoutSessionPayload),
    InvoicePaid(InvoicePayload),
    InvoicePaymentFailed(InvoicePayload),
    SubscriptionUpdated(SubscriptionPayload),
    SubscriptionDeleted(SubscriptionPayload),
    /// Any other type. Acknowledged and ignored.
    Unrecognized(String),
}

impl BillingEvent {
    pub fn event_type(&self) -> &str {
        match self {
            BillingEvent::CheckoutCompleted(_) => CHECKOUT_SESSION_COMPLETED,
            BillingEvent::InvoicePaid(_) => INVOICE_PAID,
            BillingEvent::InvoicePaymentFailed(_) => INVOICE_PAYMENT_FAILED,
            BillingEvent::SubscriptionUpdated(_) => SUBSCRIPTION_UPDATED,
            BillingEvent::SubscriptionDeleted(_) => SUBSCRIPTION_DELETED,
            BillingEvent::Unrecognized(event_type) => event_type,
        }
    }
}

/// `checkout.session.completed` object.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CheckoutSessionPayload {
    /// Checkout session id, matched against the tenant's pending session.
    pub id: String,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub subscription: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl CheckoutSessionPayload {
    pub fn is_subscription_mode(&self) -> bool {
        self.mode.as_deref() == Some("subscription")
    }

    pub fn plan_code(&self) -> Option<&str> {
        self.metadata
            .get("plan_code")
            .map(String::as_str)
            .filter(|code| !code.trim().is_empty())
    }

    /// Customer and subscription references required in subscription mode.
    pub fn provider_references(&self) -> Result<(&str, &str), WebhookError> {
        let customer = self
            .customer
            .as_deref()
            .ok_or(WebhookError::MissingField("customer"))?;
        let subscription = self
            .subscription
            .as_deref()
            .ok_or(WebhookError::MissingField("subscription"))?;
        Ok((customer, subscription))
    }
}

/// `invoice.*` object.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct InvoicePayload {
    pub id: String,
    #[serde(default)]
    pub customer: Option<String>,
    /// Absent for one-off invoices.
    #[serde(default)]
    pub subscription: Option<String>,
    #[serde(default)]
    pub lines: InvoiceLines,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct InvoiceLines {
    #[serde(default)]
    pub data: Vec<InvoiceLine>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct InvoiceLine {
    #[serde(default)]
    pub period: Option<LinePeriod>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LinePeriod {
    #[serde(default)]
    pub start: Option<i64>,
    #[serde(default)]
    pub end: Option<i64>,
}

impl InvoicePayload {
    /// Latest line period end, used to refresh the mirrored period end.
    pub fn latest_period_end(&self) -> Option<Timestamp> {
        self.lines
            .data
            .iter()
            .filter_map(|line| line.period.as_ref().and_then(|p| p.end))
            .max()
            .and_then(Timestamp::from_unix_secs)
    }
}

/// `customer.subscription.*` object.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SubscriptionPayload {
    pub id: String,
    #[serde(default)]
    pub customer: Option<String>,
    pub status: String,
    #[serde(default)]
    pub current_period_end: Option<i64>,
    #[serde(default)]
    pub cancel_at_period_end: bool,
    #[serde(default)]
    pub cancel_at: Option<i64>,
}

impl SubscriptionPayload {
    pub fn parsed_status(&self) -> Result<SubscriptionStatus, WebhookError> {
        SubscriptionStatus::parse(&self.status)
            .map_err(|e| WebhookError::MalformedPayload(e.to_string()))
    }

    pub fn period_end(&self) -> Option<Timestamp> {
        self.current_period_end.and_then(Timestamp::from_unix_secs)
    }

    pub fn cancel_at(&self) -> Option<Timestamp> {
        self.cancel_at.and_then(Timestamp::from_unix_secs)
    }
}
