//! `customer.subscription.updated`: copy provider state into the mirror.

use crate::domain::billing::{AuditAction, BillingSnapshot, SubscriptionPayload, WebhookError};
use crate::ports::BillingTransaction;

use super::context::{EventContext, HandlerOutcome};

pub(super) async fn apply(
    tx: &mut dyn BillingTransaction,
    ctx: &EventContext<'_>,
    payload: &SubscriptionPayload,
) -> Result<HandlerOutcome, WebhookError> {
    let status = payload.parsed_status()?;

    let Some(mut subscription) = tx.find_subscription_by_provider_id(&payload.id).await? else {
        tracing::warn!(
            event_id = ctx.event_id,
            provider_subscription_id = %payload.id,
            "Update for unknown subscription"
        );
        return Ok(HandlerOutcome::Skipped("unknown subscription"));
    };

    let Some(tenant) = tx.find_tenant(&subscription.tenant_id).await? else {
        tracing::warn!(
            event_id = ctx.event_id,
            tenant_id = %subscription.tenant_id,
            provider_subscription_id = %payload.id,
            "Subscription references missing tenant"
        );
        return Ok(HandlerOutcome::Skipped("unknown tenant"));
    };

    let before = BillingSnapshot::capture(&tenant, Some(&subscription));

    subscription.update_status(ctx.now, status, payload.period_end());
    subscription.set_cancel_schedule(ctx.now, payload.cancel_at_period_end, payload.cancel_at());
    tx.update_subscription(&subscription).await?;

    let after = BillingSnapshot::capture(&tenant, Some(&subscription));
    ctx.record_audit(tx, AuditAction::SubscriptionUpdated, tenant.id, &before, &after)
        .await?;

    tracing::info!(
        event_id = ctx.event_id,
        tenant_id = %tenant.id,
        provider_subscription_id = %payload.id,
        subscription_status = %status,
        cancel_at_period_end = payload.cancel_at_period_end,
        "Subscription mirror updated"
    );
    Ok(HandlerOutcome::Applied)
}
