//! In-memory adapters.
//!
//! - `InMemoryBillingStore` - Serializable unit of work over process memory

mod billing_store;

pub use billing_store::{BillingState, InMemoryBillingStore, InMemoryBillingTransaction};
