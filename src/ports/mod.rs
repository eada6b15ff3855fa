//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Transaction-Scoped Ports
//!
//! - `TenantRepository` - Tenant aggregates
//! - `SubscriptionRepository` - Subscription mirror
//! - `EntitlementRepository` - Plan entitlements
//! - `BillingAuditLog` - Append-only audit trail
//! - `WebhookLedger` - Provider event idempotency
//! - `BillingTransaction` / `UnitOfWork` - Atomic scope over all of the above
//!
//! ## Other Ports
//!
//! - `WebhookRetention` - Ledger cleanup
//! - `Clock` - Current time

mod audit_log;
mod clock;
mod entitlement_repository;
mod subscription_repository;
mod tenant_repository;
mod unit_of_work;
mod webhook_ledger;

pub use audit_log::BillingAuditLog;
pub use clock::Clock;
pub use entitlement_repository::EntitlementRepository;
pub use subscription_repository::SubscriptionRepository;
pub use tenant_repository::TenantRepository;
pub use unit_of_work::{BillingTransaction, UnitOfWork};
pub use webhook_ledger::{WebhookLedger, WebhookResult, WebhookRetention};
