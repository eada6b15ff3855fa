//! `customer.subscription.deleted`: cancellation.

use crate::domain::billing::{
    AuditAction, BillingSnapshot, EntitlementSource, SubscriptionPayload, SubscriptionStatus,
    WebhookError,
};
use crate::domain::tenant::TenantStatus;
use crate::ports::BillingTransaction;

use super::context::{EventContext, HandlerOutcome};

/// Marks the mirror canceled and applies the cancellation split.
///
/// The split reads the period end from the mirror after it has been
/// refreshed from the payload. A direct suspension also revokes the
/// tenant's active provider-sourced entitlements.
pub(super) async fn apply(
    tx: &mut dyn BillingTransaction,
    ctx: &EventContext<'_>,
    payload: &SubscriptionPayload,
) -> Result<HandlerOutcome, WebhookError> {
    payload.parsed_status()?;

    let Some(mut subscription) = tx.find_subscription_by_provider_id(&payload.id).await? else {
        tracing::warn!(
            event_id = ctx.event_id,
            provider_subscription_id = %payload.id,
            "Cancellation for unknown subscription"
        );
        return Ok(HandlerOutcome::Skipped("unknown subscription"));
    };

    let Some(mut tenant) = tx.find_tenant(&subscription.tenant_id).await? else {
        tracing::warn!(
            event_id = ctx.event_id,
            tenant_id = %subscription.tenant_id,
            provider_subscription_id = %payload.id,
            "Subscription references missing tenant"
        );
        return Ok(HandlerOutcome::Skipped("unknown tenant"));
    };

    let before = BillingSnapshot::capture(&tenant, Some(&subscription));

    subscription.update_status(ctx.now, SubscriptionStatus::Canceled, payload.period_end());
    subscription.set_cancel_schedule(ctx.now, payload.cancel_at_period_end, payload.cancel_at());
    tx.update_subscription(&subscription).await?;

    let change = ctx.settings.lifecycle.record_cancellation(
        &mut tenant,
        ctx.now,
        subscription.current_period_end,
    )?;
    if change.is_changed() {
        tx.update_tenant(&tenant).await?;
    }

    let mut revoked = 0usize;
    if change.is_changed() && tenant.status == TenantStatus::Suspended {
        for mut entitlement in tx.list_entitlements(&tenant.id).await? {
            if entitlement.source == EntitlementSource::Provider
                && entitlement.is_active(ctx.now)
                && entitlement.revoke(ctx.now)
            {
                tx.update_entitlement(&entitlement).await?;
                revoked += 1;
            }
        }
    }

    let after = BillingSnapshot::capture(&tenant, Some(&subscription));
    ctx.record_audit(tx, AuditAction::SubscriptionCanceled, tenant.id, &before, &after)
        .await?;

    tracing::info!(
        event_id = ctx.event_id,
        tenant_id = %tenant.id,
        provider_subscription_id = %payload.id,
        status = %tenant.status,
        entitlements_revoked = revoked,
        "Cancellation applied"
    );
    Ok(HandlerOutcome::Applied)
}
