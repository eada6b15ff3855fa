//! `checkout.session.completed`: first activation of a pending tenant.

use crate::domain::billing::{
    AuditAction, BillingSnapshot, CheckoutSessionPayload, Entitlement, EntitlementSource,
    PlanCode, Subscription, WebhookError,
};
use crate::ports::BillingTransaction;

use super::context::{EventContext, HandlerOutcome};

/// Activates the tenant awaiting this checkout session.
///
/// Creates (or rebinds) the subscription mirror and grants the plan
/// entitlement. A tenant that is no longer pending is left alone, so a
/// checkout replayed past the ledger never grants twice.
pub(super) async fn apply(
    tx: &mut dyn BillingTransaction,
    ctx: &EventContext<'_>,
    payload: &CheckoutSessionPayload,
) -> Result<HandlerOutcome, WebhookError> {
    if !payload.is_subscription_mode() {
        return Ok(HandlerOutcome::Skipped("checkout is not in subscription mode"));
    }
    let (customer_id, provider_subscription_id) = payload.provider_references()?;
    let plan_code = match payload.plan_code() {
        Some(code) => {
            PlanCode::new(code).map_err(|e| WebhookError::MalformedPayload(e.to_string()))?
        }
        None => ctx.settings.default_plan_code.clone(),
    };

    let Some(mut tenant) = tx.find_tenant_by_pending_session(&payload.id).await? else {
        tracing::warn!(
            event_id = ctx.event_id,
            session_id = %payload.id,
            "No tenant awaiting checkout session"
        );
        return Ok(HandlerOutcome::Skipped("no tenant awaiting checkout session"));
    };

    let existing = tx.find_subscription_by_tenant(&tenant.id).await?;
    let before = BillingSnapshot::capture(&tenant, existing.as_ref());

    let change = ctx.settings.lifecycle.activate(&mut tenant, ctx.now)?;
    if !change.is_changed() {
        tracing::info!(
            event_id = ctx.event_id,
            tenant_id = %tenant.id,
            status = %tenant.status,
            "Checkout for tenant that is not awaiting payment"
        );
        return Ok(HandlerOutcome::Skipped("tenant is not awaiting payment"));
    }
    tx.update_tenant(&tenant).await?;

    let subscription = match existing {
        Some(mut subscription) => {
            subscription.rebind(ctx.now, customer_id, provider_subscription_id);
            tx.update_subscription(&subscription).await?;
            subscription
        }
        None => {
            let subscription =
                Subscription::create(tenant.id, customer_id, provider_subscription_id, ctx.now);
            tx.insert_subscription(&subscription).await?;
            subscription
        }
    };

    let already_entitled = tx
        .list_entitlements(&tenant.id)
        .await?
        .iter()
        .any(|e| e.plan_code == plan_code && e.is_active(ctx.now));
    if !already_entitled {
        let entitlement = Entitlement::grant(
            ctx.now,
            tenant.id,
            plan_code.clone(),
            EntitlementSource::Provider,
            None,
        );
        tx.insert_entitlement(&entitlement).await?;
    }

    let after = BillingSnapshot::capture(&tenant, Some(&subscription));
    ctx.record_audit(tx, AuditAction::SubscriptionCreated, tenant.id, &before, &after)
        .await?;

    tracing::info!(
        event_id = ctx.event_id,
        tenant_id = %tenant.id,
        provider_subscription_id,
        plan_code = %plan_code,
        "Tenant activated"
    );
    Ok(HandlerOutcome::Applied)
}
