//! Billing domain module.
//!
//! Mirrors the payment provider's view of a tenant (subscription,
//! entitlements) and defines the webhook event vocabulary.
//!
//! # Module Structure
//!
//! - `subscription` - Subscription mirror and provider status
//! - `entitlement` - Plan entitlements
//! - `audit` - Append-only audit entries and state snapshots
//! - `webhook_event` - Idempotency ledger record
//! - `provider_event` - Event envelope and typed payloads
//! - `webhook_errors` - Webhook error taxonomy
//! - `webhook_verifier` - HMAC-SHA256 signature verification

mod audit;
mod entitlement;
mod provider_event;
mod subscription;
mod webhook_errors;
mod webhook_event;
mod webhook_verifier;

pub use audit::{ActorType, AuditAction, BillingAuditEntry, BillingSnapshot};
pub use entitlement::{Entitlement, EntitlementSource, PlanCode, DEFAULT_PLAN_CODE};
pub use provider_event::{
    BillingEvent, CheckoutSessionPayload, InvoiceLine, InvoiceLines, InvoicePayload, LinePeriod,
    ProviderEvent, ProviderEventData, SubscriptionPayload, CHECKOUT_SESSION_COMPLETED,
    INVOICE_PAID, INVOICE_PAYMENT_FAILED, SUBSCRIPTION_DELETED, SUBSCRIPTION_UPDATED,
};
pub use subscription::{Subscription, SubscriptionStatus};
pub use webhook_errors::WebhookError;
pub use webhook_event::{WebhookEventRecord, MAX_WEBHOOK_RETENTION_DAYS, STRIPE_PROVIDER};
#[cfg(test)]
pub(crate) use webhook_verifier::sign_payload;
pub use webhook_verifier::{SignatureHeader, WebhookSignatureVerifier, DEFAULT_TOLERANCE_SECS};
