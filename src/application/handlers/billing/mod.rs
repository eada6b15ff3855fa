//! Billing handlers.
//!
//! ## Commands
//! - Reconciling a payment provider webhook (the webhook dispatcher)
//! - Purging expired idempotency ledger rows
//!
//! Each recognized event type has its own module with a single `apply`
//! function that runs against the dispatcher's open transaction.

mod checkout_completed;
mod context;
mod invoice_paid;
mod invoice_payment_failed;
mod purge_webhook_events;
mod reconcile_webhook;
mod subscription_deleted;
mod subscription_updated;

pub use context::HandlerOutcome;
pub use purge_webhook_events::{PurgeWebhookEventsCommand, PurgeWebhookEventsHandler};
pub use reconcile_webhook::{ReconcileWebhookHandler, ReconcilerSettings};
