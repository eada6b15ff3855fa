//! `invoice.payment_failed`: start the grace window.

use crate::domain::billing::{
    AuditAction, BillingSnapshot, InvoicePayload, SubscriptionStatus, WebhookError,
};
use crate::ports::BillingTransaction;

use super::context::{EventContext, HandlerOutcome};

/// Marks the mirror past due and moves an active tenant into grace.
///
/// The period end is not refreshed: the failed invoice covers a period
/// that was never paid for.
pub(super) async fn apply(
    tx: &mut dyn BillingTransaction,
    ctx: &EventContext<'_>,
    invoice: &InvoicePayload,
) -> Result<HandlerOutcome, WebhookError> {
    let Some(provider_subscription_id) = invoice.subscription.as_deref() else {
        return Ok(HandlerOutcome::Skipped("invoice has no subscription"));
    };

    let Some(mut subscription) = tx
        .find_subscription_by_provider_id(provider_subscription_id)
        .await?
    else {
        tracing::warn!(
            event_id = ctx.event_id,
            provider_subscription_id,
            "Payment failure for unknown subscription"
        );
        return Ok(HandlerOutcome::Skipped("unknown subscription"));
    };

    let Some(mut tenant) = tx.find_tenant(&subscription.tenant_id).await? else {
        tracing::warn!(
            event_id = ctx.event_id,
            tenant_id = %subscription.tenant_id,
            provider_subscription_id,
            "Subscription references missing tenant"
        );
        return Ok(HandlerOutcome::Skipped("unknown tenant"));
    };

    let before = BillingSnapshot::capture(&tenant, Some(&subscription));

    subscription.update_status(ctx.now, SubscriptionStatus::PastDue, None);
    tx.update_subscription(&subscription).await?;

    let change = ctx
        .settings
        .lifecycle
        .record_payment_failed(&mut tenant, ctx.now)?;
    if change.is_changed() {
        tx.update_tenant(&tenant).await?;
    }

    let after = BillingSnapshot::capture(&tenant, Some(&subscription));
    ctx.record_audit(tx, AuditAction::PaymentFailed, tenant.id, &before, &after)
        .await?;

    tracing::info!(
        event_id = ctx.event_id,
        tenant_id = %tenant.id,
        provider_subscription_id,
        status = %tenant.status,
        grace_until = ?tenant.grace_until.map(|t| t.to_string()),
        "Payment failure applied"
    );
    Ok(HandlerOutcome::Applied)
}
