//! Database row representations and their conversion into domain types.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::billing::{
    ActorType, AuditAction, BillingAuditEntry, Entitlement, EntitlementSource, PlanCode,
    Subscription, SubscriptionStatus,
};
use crate::domain::foundation::{
    AuditLogId, DomainError, EntitlementId, ErrorCode, SubscriptionId, TenantId, Timestamp,
    ValidationError,
};
use crate::domain::tenant::{Tenant, TenantStatus};

fn corrupt_row(table: &str, err: ValidationError) -> DomainError {
    DomainError::new(
        ErrorCode::DatabaseError,
        format!("Invalid {} row: {}", table, err),
    )
}

fn ts(value: Option<DateTime<Utc>>) -> Option<Timestamp> {
    value.map(Timestamp::from_datetime)
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct TenantRow {
    id: Uuid,
    display_name: String,
    timezone: String,
    status: String,
    grace_until: Option<DateTime<Utc>>,
    pending_provider_session_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TenantRow> for Tenant {
    type Error = DomainError;

    fn try_from(row: TenantRow) -> Result<Self, Self::Error> {
        Ok(Tenant {
            id: TenantId::from_uuid(row.id),
            display_name: row.display_name,
            timezone: row.timezone,
            status: TenantStatus::parse(&row.status).map_err(|e| corrupt_row("tenants", e))?,
            grace_until: ts(row.grace_until),
            pending_provider_session_id: row.pending_provider_session_id,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct SubscriptionRow {
    id: Uuid,
    tenant_id: Uuid,
    provider_customer_id: String,
    provider_subscription_id: String,
    status: String,
    current_period_end: Option<DateTime<Utc>>,
    cancel_at_period_end: bool,
    cancel_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        Ok(Subscription {
            id: SubscriptionId::from_uuid(row.id),
            tenant_id: TenantId::from_uuid(row.tenant_id),
            provider_customer_id: row.provider_customer_id,
            provider_subscription_id: row.provider_subscription_id,
            status: SubscriptionStatus::parse(&row.status)
                .map_err(|e| corrupt_row("subscriptions", e))?,
            current_period_end: ts(row.current_period_end),
            cancel_at_period_end: row.cancel_at_period_end,
            cancel_at: ts(row.cancel_at),
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct EntitlementRow {
    id: Uuid,
    tenant_id: Uuid,
    plan_code: String,
    source: String,
    expires_at: Option<DateTime<Utc>>,
    revoked_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<EntitlementRow> for Entitlement {
    type Error = DomainError;

    fn try_from(row: EntitlementRow) -> Result<Self, Self::Error> {
        Ok(Entitlement {
            id: EntitlementId::from_uuid(row.id),
            tenant_id: TenantId::from_uuid(row.tenant_id),
            plan_code: PlanCode::new(row.plan_code).map_err(|e| corrupt_row("entitlements", e))?,
            source: EntitlementSource::parse(&row.source)
                .map_err(|e| corrupt_row("entitlements", e))?,
            expires_at: ts(row.expires_at),
            revoked_at: ts(row.revoked_at),
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct AuditRow {
    id: Uuid,
    occurred_at: DateTime<Utc>,
    actor_type: String,
    actor_id: Option<String>,
    action: String,
    target_type: String,
    target_id: String,
    before_state: Option<serde_json::Value>,
    after_state: Option<serde_json::Value>,
}

impl TryFrom<AuditRow> for BillingAuditEntry {
    type Error = DomainError;

    fn try_from(row: AuditRow) -> Result<Self, Self::Error> {
        Ok(BillingAuditEntry {
            id: AuditLogId::from_uuid(row.id),
            occurred_at: Timestamp::from_datetime(row.occurred_at),
            actor_type: ActorType::parse(&row.actor_type)
                .map_err(|e| corrupt_row("billing_audit_log", e))?,
            actor_id: row.actor_id,
            action: AuditAction::parse(&row.action)
                .map_err(|e| corrupt_row("billing_audit_log", e))?,
            target_type: row.target_type,
            target_id: row.target_id,
            before: row.before_state,
            after: row.after_state,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tenant_row(status: &str) -> TenantRow {
        let now = Utc::now();
        TenantRow {
            id: Uuid::new_v4(),
            display_name: "Acme".to_string(),
            timezone: "UTC".to_string(),
            status: status.to_string(),
            grace_until: None,
            pending_provider_session_id: Some("cs_1".to_string()),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn tenant_row_converts() {
        let tenant = Tenant::try_from(tenant_row("pending_payment")).unwrap();
        assert_eq!(tenant.status, TenantStatus::PendingPayment);
        assert_eq!(tenant.pending_provider_session_id.as_deref(), Some("cs_1"));
    }

    #[test]
    fn tenant_row_with_unknown_status_is_database_error() {
        let err = Tenant::try_from(tenant_row("frozen")).unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
    }

    #[test]
    fn subscription_row_with_unknown_status_is_database_error() {
        let now = Utc::now();
        let row = SubscriptionRow {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            provider_customer_id: "cus_1".to_string(),
            provider_subscription_id: "sub_1".to_string(),
            status: "paused".to_string(),
            current_period_end: None,
            cancel_at_period_end: false,
            cancel_at: None,
            created_at: now,
            updated_at: now,
        };

        assert!(Subscription::try_from(row).is_err());
    }
}
