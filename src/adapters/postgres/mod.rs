//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresBillingStore` - Unit of work and ledger retention over a `PgPool`
//! - `MIGRATOR` - Embedded schema migrations

mod billing_store;
mod rows;

pub use billing_store::{PostgresBillingStore, PostgresBillingTransaction};

/// Schema migrations embedded from `migrations/`.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
