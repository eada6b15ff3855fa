//! ReconcileWebhookHandler - Applies verified provider events to billing state.
//!
//! Every delivery runs in one transaction:
//!
//! 1. Insert the `(provider, event_id)` ledger row
//! 2. Dispatch to the handler for the event type
//! 3. Commit
//!
//! A duplicate key ends the transaction without touching state. Any failure
//! drops the transaction, which also discards the ledger row, so the provider
//! can redeliver and the event is applied exactly once.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::billing::{
    BillingEvent, PlanCode, ProviderEvent, WebhookError, WebhookEventRecord, STRIPE_PROVIDER,
};
use crate::domain::tenant::TenantLifecycle;
use crate::ports::{BillingTransaction, Clock, UnitOfWork, WebhookResult};

use super::context::{EventContext, HandlerOutcome};
use super::{
    checkout_completed, invoice_paid, invoice_payment_failed, subscription_deleted,
    subscription_updated,
};

/// Tunables for webhook reconciliation.
#[derive(Debug, Clone)]
pub struct ReconcilerSettings {
    /// Provider name written to the ledger key.
    pub provider: String,
    pub lifecycle: TenantLifecycle,
    /// Plan granted when checkout metadata names none.
    pub default_plan_code: PlanCode,
    /// Deadline for one delivery, from `begin` to `commit`.
    pub transaction_timeout: Duration,
}

impl Default for ReconcilerSettings {
    fn default() -> Self {
        Self {
            provider: STRIPE_PROVIDER.to_string(),
            lifecycle: TenantLifecycle::default(),
            default_plan_code: PlanCode::default(),
            transaction_timeout: Duration::from_secs(10),
        }
    }
}

/// Handler for verified provider webhook deliveries.
pub struct ReconcileWebhookHandler {
    uow: Arc<dyn UnitOfWork>,
    clock: Arc<dyn Clock>,
    settings: ReconcilerSettings,
}

impl ReconcileWebhookHandler {
    pub fn new(
        uow: Arc<dyn UnitOfWork>,
        clock: Arc<dyn Clock>,
        settings: ReconcilerSettings,
    ) -> Self {
        Self {
            uow,
            clock,
            settings,
        }
    }

    pub fn settings(&self) -> &ReconcilerSettings {
        &self.settings
    }

    /// Parses and applies a raw, already verified request body.
    pub async fn handle_raw(&self, raw: &[u8]) -> Result<WebhookResult, WebhookError> {
        let event = ProviderEvent::from_slice(raw)?;
        let payload_snapshot = serde_json::from_slice(raw).ok();
        self.handle(&event, payload_snapshot).await
    }

    /// Applies one provider event exactly once.
    ///
    /// `raw_payload` is stored with the ledger row for debugging.
    ///
    /// # Errors
    ///
    /// - `MalformedPayload` / `MissingField` - Payload does not match its type
    /// - `LedgerUnavailable` - Dedup status could not be determined
    /// - `Database` / `InvalidTransition` - Apply failed, nothing committed
    /// - `Timeout` - Transaction exceeded the configured deadline
    pub async fn handle(
        &self,
        event: &ProviderEvent,
        raw_payload: Option<serde_json::Value>,
    ) -> Result<WebhookResult, WebhookError> {
        let billing_event = event.billing_event()?;
        let deadline = self.settings.transaction_timeout;

        let result = tokio::time::timeout(
            deadline,
            self.reconcile(&event.id, &billing_event, raw_payload),
        )
        .await
        .unwrap_or(Err(WebhookError::Timeout(deadline)));

        if let Err(err) = &result {
            if err.is_retryable() {
                tracing::error!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    error = %err,
                    "Webhook reconciliation failed, nothing committed"
                );
            } else {
                tracing::warn!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    error = %err,
                    "Webhook rejected"
                );
            }
        }
        result
    }

    async fn reconcile(
        &self,
        event_id: &str,
        event: &BillingEvent,
        raw_payload: Option<serde_json::Value>,
    ) -> Result<WebhookResult, WebhookError> {
        let mut tx = self
            .uow
            .begin()
            .await
            .map_err(|e| WebhookError::LedgerUnavailable(e.to_string()))?;

        let now = self.clock.now();
        let record = WebhookEventRecord::new(&self.settings.provider, event_id, raw_payload, now);
        let inserted = tx
            .try_insert(&record)
            .await
            .map_err(|e| WebhookError::LedgerUnavailable(e.to_string()))?;
        if !inserted {
            tracing::info!(
                event_id,
                event_type = event.event_type(),
                "Duplicate webhook delivery, already processed"
            );
            return Ok(WebhookResult::AlreadyProcessed);
        }

        let ctx = EventContext {
            event_id,
            now,
            settings: &self.settings,
        };
        let outcome = dispatch(tx.as_mut(), &ctx, event).await?;

        tx.commit().await?;

        if let HandlerOutcome::Skipped(reason) = outcome {
            tracing::info!(
                event_id,
                event_type = event.event_type(),
                reason,
                "Webhook acknowledged without state change"
            );
        }
        Ok(WebhookResult::Processed)
    }
}

async fn dispatch(
    tx: &mut dyn BillingTransaction,
    ctx: &EventContext<'_>,
    event: &BillingEvent,
) -> Result<HandlerOutcome, WebhookError> {
    match event {
        BillingEvent::CheckoutCompleted(payload) => {
            checkout_completed::apply(tx, ctx, payload).await
        }
        BillingEvent::InvoicePaid(invoice) => invoice_paid::apply(tx, ctx, invoice).await,
        BillingEvent::InvoicePaymentFailed(invoice) => {
            invoice_payment_failed::apply(tx, ctx, invoice).await
        }
        BillingEvent::SubscriptionUpdated(payload) => {
            subscription_updated::apply(tx, ctx, payload).await
        }
        BillingEvent::SubscriptionDeleted(payload) => {
            subscription_deleted::apply(tx, ctx, payload).await
        }
        BillingEvent::Unrecognized(event_type) => {
            tracing::warn!(
                event_id = ctx.event_id,
                event_type = %event_type,
                "Unhandled webhook event type"
            );
            Ok(HandlerOutcome::Skipped("unhandled event type"))
        }
    }
}
