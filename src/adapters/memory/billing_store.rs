//! In-memory billing store.
//!
//! Implements [`UnitOfWork`] over a single mutex-guarded state. A transaction
//! holds the lock from `begin` until it is committed or dropped and works on
//! a private copy, so transactions are fully serialized and a dropped
//! transaction leaves no trace.
//!
//! Used by tests and for running the service without a database.
//!
//! # Example
//!
//! ```ignore
//! let store = InMemoryBillingStore::new();
//! store.seed_tenant(tenant).await;
//!
//! let handler = ReconcileWebhookHandler::new(Arc::new(store.clone()), clock, settings);
//! handler.handle(&event, raw).await?;
//!
//! assert_eq!(store.snapshot().await.audit_log.len(), 1);
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::billing::{BillingAuditEntry, Entitlement, Subscription, WebhookEventRecord};
use crate::domain::foundation::{DomainError, ErrorCode, TenantId, Timestamp};
use crate::domain::tenant::Tenant;
use crate::ports::{
    BillingAuditLog, BillingTransaction, EntitlementRepository, SubscriptionRepository,
    TenantRepository, UnitOfWork, WebhookLedger, WebhookRetention,
};

/// All billing state held by the in-memory store.
#[derive(Debug, Clone, Default)]
pub struct BillingState {
    pub tenants: HashMap<TenantId, Tenant>,
    pub subscriptions: Vec<Subscription>,
    pub entitlements: Vec<Entitlement>,
    pub audit_log: Vec<BillingAuditEntry>,
    pub webhook_events: HashMap<(String, String), WebhookEventRecord>,
}

impl BillingState {
    pub fn tenant(&self, id: &TenantId) -> Option<&Tenant> {
        self.tenants.get(id)
    }

    pub fn subscription_for(&self, tenant_id: &TenantId) -> Option<&Subscription> {
        self.subscriptions.iter().find(|s| &s.tenant_id == tenant_id)
    }

    pub fn entitlements_for(&self, tenant_id: &TenantId) -> Vec<&Entitlement> {
        self.entitlements
            .iter()
            .filter(|e| &e.tenant_id == tenant_id)
            .collect()
    }

    pub fn audit_for(&self, tenant_id: &TenantId) -> Vec<&BillingAuditEntry> {
        let target_id = tenant_id.to_string();
        self.audit_log
            .iter()
            .filter(|entry| entry.target_type == "tenant" && entry.target_id == target_id)
            .collect()
    }
}

#[derive(Debug, Default)]
struct Faults {
    ledger: AtomicBool,
    writes: AtomicBool,
}

/// Shared in-memory store. Cloning shares the underlying state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBillingStore {
    state: Arc<Mutex<BillingState>>,
    faults: Arc<Faults>,
}

impl InMemoryBillingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a tenant directly, outside any transaction.
    pub async fn seed_tenant(&self, tenant: Tenant) {
        self.state.lock().await.tenants.insert(tenant.id, tenant);
    }

    /// Returns a copy of the committed state.
    pub async fn snapshot(&self) -> BillingState {
        self.state.lock().await.clone()
    }

    // === Fault Injection ===

    /// Makes ledger inserts fail with a database error.
    pub fn fail_ledger(&self, fail: bool) {
        self.faults.ledger.store(fail, Ordering::SeqCst);
    }

    /// Makes every write other than the ledger insert fail.
    pub fn fail_writes(&self, fail: bool) {
        self.faults.writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl UnitOfWork for InMemoryBillingStore {
    async fn begin(&self) -> Result<Box<dyn BillingTransaction>, DomainError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(InMemoryBillingTransaction {
            guard: Some(guard),
            working,
            faults: Arc::clone(&self.faults),
        }))
    }
}

#[async_trait]
impl WebhookRetention for InMemoryBillingStore {
    async fn delete_older_than(&self, cutoff: Timestamp) -> Result<u64, DomainError> {
        let mut state = self.state.lock().await;
        let before = state.webhook_events.len();
        state
            .webhook_events
            .retain(|_, record| record.received_at >= cutoff);
        Ok((before - state.webhook_events.len()) as u64)
    }
}

/// Transaction over a private copy of [`BillingState`].
pub struct InMemoryBillingTransaction {
    guard: Option<OwnedMutexGuard<BillingState>>,
    working: BillingState,
    faults: Arc<Faults>,
}

impl InMemoryBillingTransaction {
    fn state(&mut self) -> Result<&mut BillingState, DomainError> {
        if self.guard.is_none() {
            return Err(DomainError::new(
                ErrorCode::TransactionClosed,
                "Transaction already committed",
            ));
        }
        Ok(&mut self.working)
    }

    fn writable_state(&mut self) -> Result<&mut BillingState, DomainError> {
        if self.faults.writes.load(Ordering::SeqCst) {
            return Err(DomainError::database("Injected write failure"));
        }
        self.state()
    }
}

#[async_trait]
impl TenantRepository for InMemoryBillingTransaction {
    async fn insert_tenant(&mut self, tenant: &Tenant) -> Result<(), DomainError> {
        let state = self.writable_state()?;
        if state.tenants.contains_key(&tenant.id) {
            return Err(DomainError::validation("id", "Tenant already exists"));
        }
        state.tenants.insert(tenant.id, tenant.clone());
        Ok(())
    }

    async fn update_tenant(&mut self, tenant: &Tenant) -> Result<(), DomainError> {
        let state = self.writable_state()?;
        match state.tenants.get_mut(&tenant.id) {
            Some(existing) => {
                *existing = tenant.clone();
                Ok(())
            }
            None => Err(DomainError::new(ErrorCode::TenantNotFound, "Tenant not found")),
        }
    }

    async fn find_tenant(&mut self, id: &TenantId) -> Result<Option<Tenant>, DomainError> {
        Ok(self.state()?.tenants.get(id).cloned())
    }

    async fn find_tenant_by_pending_session(
        &mut self,
        session_id: &str,
    ) -> Result<Option<Tenant>, DomainError> {
        Ok(self
            .state()?
            .tenants
            .values()
            .find(|t| t.pending_provider_session_id.as_deref() == Some(session_id))
            .cloned())
    }
}

#[async_trait]
impl SubscriptionRepository for InMemoryBillingTransaction {
    async fn insert_subscription(
        &mut self,
        subscription: &Subscription,
    ) -> Result<(), DomainError> {
        let state = self.writable_state()?;
        let conflict = state.subscriptions.iter().any(|s| {
            s.tenant_id == subscription.tenant_id
                || s.provider_subscription_id == subscription.provider_subscription_id
        });
        if conflict {
            return Err(DomainError::new(
                ErrorCode::SubscriptionExists,
                "Tenant already has a subscription",
            )
            .with_detail("tenant_id", subscription.tenant_id.to_string()));
        }
        state.subscriptions.push(subscription.clone());
        Ok(())
    }

    async fn update_subscription(
        &mut self,
        subscription: &Subscription,
    ) -> Result<(), DomainError> {
        let state = self.writable_state()?;
        match state.subscriptions.iter_mut().find(|s| s.id == subscription.id) {
            Some(existing) => {
                *existing = subscription.clone();
                Ok(())
            }
            None => Err(DomainError::new(
                ErrorCode::SubscriptionNotFound,
                "Subscription not found",
            )),
        }
    }

    async fn find_subscription_by_tenant(
        &mut self,
        tenant_id: &TenantId,
    ) -> Result<Option<Subscription>, DomainError> {
        Ok(self.state()?.subscription_for(tenant_id).cloned())
    }

    async fn find_subscription_by_provider_id(
        &mut self,
        provider_subscription_id: &str,
    ) -> Result<Option<Subscription>, DomainError> {
        Ok(self
            .state()?
            .subscriptions
            .iter()
            .find(|s| s.provider_subscription_id == provider_subscription_id)
            .cloned())
    }
}

#[async_trait]
impl EntitlementRepository for InMemoryBillingTransaction {
    async fn insert_entitlement(&mut self, entitlement: &Entitlement) -> Result<(), DomainError> {
        self.writable_state()?.entitlements.push(entitlement.clone());
        Ok(())
    }

    async fn update_entitlement(&mut self, entitlement: &Entitlement) -> Result<(), DomainError> {
        let state = self.writable_state()?;
        match state.entitlements.iter_mut().find(|e| e.id == entitlement.id) {
            Some(existing) => {
                *existing = entitlement.clone();
                Ok(())
            }
            None => Err(DomainError::new(
                ErrorCode::EntitlementNotFound,
                "Entitlement not found",
            )),
        }
    }

    async fn list_entitlements(
        &mut self,
        tenant_id: &TenantId,
    ) -> Result<Vec<Entitlement>, DomainError> {
        Ok(self
            .state()?
            .entitlements_for(tenant_id)
            .into_iter()
            .cloned()
            .collect())
    }
}

#[async_trait]
impl BillingAuditLog for InMemoryBillingTransaction {
    async fn append_audit(&mut self, entry: &BillingAuditEntry) -> Result<(), DomainError> {
        self.writable_state()?.audit_log.push(entry.clone());
        Ok(())
    }

    async fn list_audit_for_target(
        &mut self,
        target_type: &str,
        target_id: &str,
    ) -> Result<Vec<BillingAuditEntry>, DomainError> {
        Ok(self
            .state()?
            .audit_log
            .iter()
            .filter(|e| e.target_type == target_type && e.target_id == target_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl WebhookLedger for InMemoryBillingTransaction {
    async fn try_insert(&mut self, record: &WebhookEventRecord) -> Result<bool, DomainError> {
        if self.faults.ledger.load(Ordering::SeqCst) {
            return Err(DomainError::database("Injected ledger failure"));
        }
        let state = self.state()?;
        let key = (record.provider.clone(), record.event_id.clone());
        if state.webhook_events.contains_key(&key) {
            return Ok(false);
        }
        state.webhook_events.insert(key, record.clone());
        Ok(true)
    }
}

#[async_trait]
impl BillingTransaction for InMemoryBillingTransaction {
    async fn commit(&mut self) -> Result<(), DomainError> {
        let mut guard = self.guard.take().ok_or_else(|| {
            DomainError::new(ErrorCode::TransactionClosed, "Transaction already committed")
        })?;
        *guard = std::mem::take(&mut self.working);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::STRIPE_PROVIDER;

    fn now() -> Timestamp {
        Timestamp::from_unix_secs(1_760_000_000).unwrap()
    }

    fn pending_tenant() -> Tenant {
        Tenant::create_pending(TenantId::new(), "Acme", "UTC", "cs_1", now())
    }

    fn record(event_id: &str, received_at: Timestamp) -> WebhookEventRecord {
        WebhookEventRecord::new(STRIPE_PROVIDER, event_id, None, received_at)
    }

    // ══════════════════════════════════════════════════════════════
    // Transaction Tests
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn committed_writes_are_visible() {
        let store = InMemoryBillingStore::new();
        let tenant = pending_tenant();

        let mut tx = store.begin().await.unwrap();
        tx.insert_tenant(&tenant).await.unwrap();
        tx.commit().await.unwrap();
        drop(tx);

        assert!(store.snapshot().await.tenant(&tenant.id).is_some());
    }

    #[tokio::test]
    async fn dropped_transaction_rolls_back() {
        let store = InMemoryBillingStore::new();
        let tenant = pending_tenant();

        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_tenant(&tenant).await.unwrap();
            assert!(tx.try_insert(&record("evt_1", now())).await.unwrap());
        }

        let state = store.snapshot().await;
        assert!(state.tenants.is_empty());
        assert!(state.webhook_events.is_empty());
    }

    #[tokio::test]
    async fn calls_after_commit_fail() {
        let store = InMemoryBillingStore::new();
        let mut tx = store.begin().await.unwrap();
        tx.commit().await.unwrap();

        let err = tx.find_tenant(&TenantId::new()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::TransactionClosed);
        assert!(tx.commit().await.is_err());
    }

    #[tokio::test]
    async fn transactions_are_serialized() {
        let store = InMemoryBillingStore::new();
        let first = store.begin().await.unwrap();

        let second = tokio::time::timeout(std::time::Duration::from_millis(50), store.begin()).await;
        assert!(second.is_err());

        drop(first);
        assert!(store.begin().await.is_ok());
    }

    // ══════════════════════════════════════════════════════════════
    // Ledger Tests
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn ledger_detects_duplicate_key() {
        let store = InMemoryBillingStore::new();

        let mut tx = store.begin().await.unwrap();
        assert!(tx.try_insert(&record("evt_1", now())).await.unwrap());
        assert!(!tx.try_insert(&record("evt_1", now())).await.unwrap());
        assert!(tx.try_insert(&record("evt_2", now())).await.unwrap());
    }

    #[tokio::test]
    async fn ledger_keys_include_provider() {
        let store = InMemoryBillingStore::new();

        let mut tx = store.begin().await.unwrap();
        assert!(tx.try_insert(&record("evt_1", now())).await.unwrap());
        let other = WebhookEventRecord::new("paddle", "evt_1", None, now());
        assert!(tx.try_insert(&other).await.unwrap());
    }

    #[tokio::test]
    async fn ledger_fault_surfaces_as_error() {
        let store = InMemoryBillingStore::new();
        store.fail_ledger(true);

        let mut tx = store.begin().await.unwrap();
        assert!(tx.try_insert(&record("evt_1", now())).await.is_err());
    }

    #[tokio::test]
    async fn retention_deletes_only_old_records() {
        let store = InMemoryBillingStore::new();
        let mut tx = store.begin().await.unwrap();
        tx.try_insert(&record("evt_old", now().minus_days(40))).await.unwrap();
        tx.try_insert(&record("evt_new", now())).await.unwrap();
        tx.commit().await.unwrap();
        drop(tx);

        let deleted = store.delete_older_than(now().minus_days(30)).await.unwrap();

        assert_eq!(deleted, 1);
        let state = store.snapshot().await;
        assert!(state
            .webhook_events
            .contains_key(&(STRIPE_PROVIDER.to_string(), "evt_new".to_string())));
    }

    // ══════════════════════════════════════════════════════════════
    // Repository Tests
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn second_subscription_for_tenant_is_rejected() {
        let store = InMemoryBillingStore::new();
        let tenant_id = TenantId::new();
        let mut tx = store.begin().await.unwrap();

        tx.insert_subscription(&Subscription::create(tenant_id, "cus_1", "sub_1", now()))
            .await
            .unwrap();
        let err = tx
            .insert_subscription(&Subscription::create(tenant_id, "cus_1", "sub_2", now()))
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::SubscriptionExists);
    }

    #[tokio::test]
    async fn find_by_pending_session_matches_only_pending_reference() {
        let store = InMemoryBillingStore::new();
        let tenant = pending_tenant();
        store.seed_tenant(tenant.clone()).await;

        let mut tx = store.begin().await.unwrap();

        assert_eq!(
            tx.find_tenant_by_pending_session("cs_1").await.unwrap(),
            Some(tenant)
        );
        assert!(tx
            .find_tenant_by_pending_session("cs_other")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn write_fault_blocks_updates() {
        let store = InMemoryBillingStore::new();
        let tenant = pending_tenant();
        store.seed_tenant(tenant.clone()).await;
        store.fail_writes(true);

        let mut tx = store.begin().await.unwrap();
        assert!(tx.update_tenant(&tenant).await.is_err());
        assert!(tx.find_tenant(&tenant.id).await.unwrap().is_some());
    }
}
