//! PostgreSQL implementation of the billing unit of work.
//!
//! Each [`PostgresBillingTransaction`] wraps one database transaction. Rows
//! read for mutation are locked with `FOR UPDATE`, so concurrent events for
//! the same tenant queue behind each other instead of losing updates.

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};

use crate::domain::billing::{BillingAuditEntry, Entitlement, Subscription, WebhookEventRecord};
use crate::domain::foundation::{DomainError, ErrorCode, TenantId, Timestamp};
use crate::domain::tenant::Tenant;
use crate::ports::{
    BillingAuditLog, BillingTransaction, EntitlementRepository, SubscriptionRepository,
    TenantRepository, UnitOfWork, WebhookLedger, WebhookRetention,
};

use super::rows::{AuditRow, EntitlementRow, SubscriptionRow, TenantRow};

/// PostgreSQL-backed billing store.
#[derive(Clone)]
pub struct PostgresBillingStore {
    pool: PgPool,
}

impl PostgresBillingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn db_error(action: &str, e: sqlx::Error) -> DomainError {
    DomainError::database(format!("Failed to {}: {}", action, e))
}

fn is_constraint(e: &sqlx::Error, name: &str) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.constraint() == Some(name))
}

#[async_trait]
impl UnitOfWork for PostgresBillingStore {
    async fn begin(&self) -> Result<Box<dyn BillingTransaction>, DomainError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("begin transaction", e))?;
        Ok(Box::new(PostgresBillingTransaction { tx: Some(tx) }))
    }
}

#[async_trait]
impl WebhookRetention for PostgresBillingStore {
    async fn delete_older_than(&self, cutoff: Timestamp) -> Result<u64, DomainError> {
        let result = sqlx::query("DELETE FROM webhook_events WHERE received_at < $1")
            .bind(cutoff.as_datetime())
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("delete webhook events", e))?;
        Ok(result.rows_affected())
    }
}

/// One open database transaction. Dropping it rolls back.
pub struct PostgresBillingTransaction {
    tx: Option<Transaction<'static, Postgres>>,
}

impl PostgresBillingTransaction {
    fn conn(&mut self) -> Result<&mut PgConnection, DomainError> {
        self.tx.as_deref_mut().ok_or_else(|| {
            DomainError::new(ErrorCode::TransactionClosed, "Transaction already committed")
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Tenants
// ════════════════════════════════════════════════════════════════════════════════

#[async_trait]
impl TenantRepository for PostgresBillingTransaction {
    async fn insert_tenant(&mut self, tenant: &Tenant) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO tenants (
                id, display_name, timezone, status, grace_until,
                pending_provider_session_id, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(tenant.id.as_uuid())
        .bind(&tenant.display_name)
        .bind(&tenant.timezone)
        .bind(tenant.status.as_str())
        .bind(tenant.grace_until.map(|t| *t.as_datetime()))
        .bind(&tenant.pending_provider_session_id)
        .bind(tenant.created_at.as_datetime())
        .bind(tenant.updated_at.as_datetime())
        .execute(self.conn()?)
        .await
        .map_err(|e| db_error("insert tenant", e))?;

        Ok(())
    }

    async fn update_tenant(&mut self, tenant: &Tenant) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE tenants SET
                display_name = $2,
                timezone = $3,
                status = $4,
                grace_until = $5,
                pending_provider_session_id = $6,
                updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(tenant.id.as_uuid())
        .bind(&tenant.display_name)
        .bind(&tenant.timezone)
        .bind(tenant.status.as_str())
        .bind(tenant.grace_until.map(|t| *t.as_datetime()))
        .bind(&tenant.pending_provider_session_id)
        .bind(tenant.updated_at.as_datetime())
        .execute(self.conn()?)
        .await
        .map_err(|e| db_error("update tenant", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(ErrorCode::TenantNotFound, "Tenant not found")
                .with_detail("tenant_id", tenant.id.to_string()));
        }

        Ok(())
    }

    async fn find_tenant(&mut self, id: &TenantId) -> Result<Option<Tenant>, DomainError> {
        let row: Option<TenantRow> = sqlx::query_as(
            r#"
            SELECT id, display_name, timezone, status, grace_until,
                   pending_provider_session_id, created_at, updated_at
            FROM tenants
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(self.conn()?)
        .await
        .map_err(|e| db_error("find tenant", e))?;

        row.map(Tenant::try_from).transpose()
    }

    async fn find_tenant_by_pending_session(
        &mut self,
        session_id: &str,
    ) -> Result<Option<Tenant>, DomainError> {
        let row: Option<TenantRow> = sqlx::query_as(
            r#"
            SELECT id, display_name, timezone, status, grace_until,
                   pending_provider_session_id, created_at, updated_at
            FROM tenants
            WHERE pending_provider_session_id = $1
            FOR UPDATE
            "#,
        )
        .bind(session_id)
        .fetch_optional(self.conn()?)
        .await
        .map_err(|e| db_error("find tenant by session", e))?;

        row.map(Tenant::try_from).transpose()
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Subscriptions
// ════════════════════════════════════════════════════════════════════════════════

const SUBSCRIPTION_COLUMNS: &str = "id, tenant_id, provider_customer_id, provider_subscription_id, \
     status, current_period_end, cancel_at_period_end, cancel_at, created_at, updated_at";

#[async_trait]
impl SubscriptionRepository for PostgresBillingTransaction {
    async fn insert_subscription(
        &mut self,
        subscription: &Subscription,
    ) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO subscriptions (
                id, tenant_id, provider_customer_id, provider_subscription_id, status,
                current_period_end, cancel_at_period_end, cancel_at, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(subscription.id.as_uuid())
        .bind(subscription.tenant_id.as_uuid())
        .bind(&subscription.provider_customer_id)
        .bind(&subscription.provider_subscription_id)
        .bind(subscription.status.as_str())
        .bind(subscription.current_period_end.map(|t| *t.as_datetime()))
        .bind(subscription.cancel_at_period_end)
        .bind(subscription.cancel_at.map(|t| *t.as_datetime()))
        .bind(subscription.created_at.as_datetime())
        .bind(subscription.updated_at.as_datetime())
        .execute(self.conn()?)
        .await
        .map_err(|e| {
            if is_constraint(&e, "subscriptions_tenant_id_key")
                || is_constraint(&e, "subscriptions_provider_subscription_id_key")
            {
                return DomainError::new(
                    ErrorCode::SubscriptionExists,
                    "Tenant already has a subscription",
                )
                .with_detail("tenant_id", subscription.tenant_id.to_string());
            }
            db_error("insert subscription", e)
        })?;

        Ok(())
    }

    async fn update_subscription(
        &mut self,
        subscription: &Subscription,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions SET
                provider_customer_id = $2,
                provider_subscription_id = $3,
                status = $4,
                current_period_end = $5,
                cancel_at_period_end = $6,
                cancel_at = $7,
                updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(subscription.id.as_uuid())
        .bind(&subscription.provider_customer_id)
        .bind(&subscription.provider_subscription_id)
        .bind(subscription.status.as_str())
        .bind(subscription.current_period_end.map(|t| *t.as_datetime()))
        .bind(subscription.cancel_at_period_end)
        .bind(subscription.cancel_at.map(|t| *t.as_datetime()))
        .bind(subscription.updated_at.as_datetime())
        .execute(self.conn()?)
        .await
        .map_err(|e| db_error("update subscription", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::SubscriptionNotFound,
                "Subscription not found",
            ));
        }

        Ok(())
    }

    async fn find_subscription_by_tenant(
        &mut self,
        tenant_id: &TenantId,
    ) -> Result<Option<Subscription>, DomainError> {
        let sql = format!(
            "SELECT {} FROM subscriptions WHERE tenant_id = $1 FOR UPDATE",
            SUBSCRIPTION_COLUMNS
        );
        let row: Option<SubscriptionRow> = sqlx::query_as(&sql)
            .bind(tenant_id.as_uuid())
            .fetch_optional(self.conn()?)
            .await
            .map_err(|e| db_error("find subscription", e))?;

        row.map(Subscription::try_from).transpose()
    }

    async fn find_subscription_by_provider_id(
        &mut self,
        provider_subscription_id: &str,
    ) -> Result<Option<Subscription>, DomainError> {
        let sql = format!(
            "SELECT {} FROM subscriptions WHERE provider_subscription_id = $1 FOR UPDATE",
            SUBSCRIPTION_COLUMNS
        );
        let row: Option<SubscriptionRow> = sqlx::query_as(&sql)
            .bind(provider_subscription_id)
            .fetch_optional(self.conn()?)
            .await
            .map_err(|e| db_error("find subscription", e))?;

        row.map(Subscription::try_from).transpose()
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Entitlements
// ════════════════════════════════════════════════════════════════════════════════

#[async_trait]
impl EntitlementRepository for PostgresBillingTransaction {
    async fn insert_entitlement(&mut self, entitlement: &Entitlement) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO entitlements (
                id, tenant_id, plan_code, source, expires_at, revoked_at, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(entitlement.id.as_uuid())
        .bind(entitlement.tenant_id.as_uuid())
        .bind(entitlement.plan_code.as_str())
        .bind(entitlement.source.as_str())
        .bind(entitlement.expires_at.map(|t| *t.as_datetime()))
        .bind(entitlement.revoked_at.map(|t| *t.as_datetime()))
        .bind(entitlement.created_at.as_datetime())
        .execute(self.conn()?)
        .await
        .map_err(|e| db_error("insert entitlement", e))?;

        Ok(())
    }

    async fn update_entitlement(&mut self, entitlement: &Entitlement) -> Result<(), DomainError> {
        let result = sqlx::query(
            "UPDATE entitlements SET expires_at = $2, revoked_at = $3 WHERE id = $1",
        )
        .bind(entitlement.id.as_uuid())
        .bind(entitlement.expires_at.map(|t| *t.as_datetime()))
        .bind(entitlement.revoked_at.map(|t| *t.as_datetime()))
        .execute(self.conn()?)
        .await
        .map_err(|e| db_error("update entitlement", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::EntitlementNotFound,
                "Entitlement not found",
            ));
        }

        Ok(())
    }

    async fn list_entitlements(
        &mut self,
        tenant_id: &TenantId,
    ) -> Result<Vec<Entitlement>, DomainError> {
        let rows: Vec<EntitlementRow> = sqlx::query_as(
            r#"
            SELECT id, tenant_id, plan_code, source, expires_at, revoked_at, created_at
            FROM entitlements
            WHERE tenant_id = $1
            ORDER BY created_at ASC
            FOR UPDATE
            "#,
        )
        .bind(tenant_id.as_uuid())
        .fetch_all(self.conn()?)
        .await
        .map_err(|e| db_error("list entitlements", e))?;

        rows.into_iter().map(Entitlement::try_from).collect()
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Audit Log
// ════════════════════════════════════════════════════════════════════════════════

#[async_trait]
impl BillingAuditLog for PostgresBillingTransaction {
    async fn append_audit(&mut self, entry: &BillingAuditEntry) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO billing_audit_log (
                id, occurred_at, actor_type, actor_id, action,
                target_type, target_id, before_state, after_state
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(entry.id.as_uuid())
        .bind(entry.occurred_at.as_datetime())
        .bind(entry.actor_type.as_str())
        .bind(&entry.actor_id)
        .bind(entry.action.as_str())
        .bind(&entry.target_type)
        .bind(&entry.target_id)
        .bind(&entry.before)
        .bind(&entry.after)
        .execute(self.conn()?)
        .await
        .map_err(|e| db_error("append audit entry", e))?;

        Ok(())
    }

    async fn list_audit_for_target(
        &mut self,
        target_type: &str,
        target_id: &str,
    ) -> Result<Vec<BillingAuditEntry>, DomainError> {
        let rows: Vec<AuditRow> = sqlx::query_as(
            r#"
            SELECT id, occurred_at, actor_type, actor_id, action,
                   target_type, target_id, before_state, after_state
            FROM billing_audit_log
            WHERE target_type = $1 AND target_id = $2
            ORDER BY occurred_at ASC
            "#,
        )
        .bind(target_type)
        .bind(target_id)
        .fetch_all(self.conn()?)
        .await
        .map_err(|e| db_error("list audit entries", e))?;

        rows.into_iter().map(BillingAuditEntry::try_from).collect()
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Ledger and Commit
// ════════════════════════════════════════════════════════════════════════════════

#[async_trait]
impl WebhookLedger for PostgresBillingTransaction {
    async fn try_insert(&mut self, record: &WebhookEventRecord) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO webhook_events (provider, event_id, payload, received_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (provider, event_id) DO NOTHING
            "#,
        )
        .bind(&record.provider)
        .bind(&record.event_id)
        .bind(&record.payload)
        .bind(record.received_at.as_datetime())
        .execute(self.conn()?)
        .await
        .map_err(|e| db_error("insert webhook event", e))?;

        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl BillingTransaction for PostgresBillingTransaction {
    async fn commit(&mut self) -> Result<(), DomainError> {
        let tx = self.tx.take().ok_or_else(|| {
            DomainError::new(ErrorCode::TransactionClosed, "Transaction already committed")
        })?;
        tx.commit()
            .await
            .map_err(|e| db_error("commit transaction", e))
    }
}
