//! Adapters - Implementations of port interfaces.
//!
//! - `clock` - System and fixed clocks
//! - `http` - Webhook endpoint
//! - `memory` - In-memory unit of work for tests and local runs
//! - `postgres` - PostgreSQL unit of work

pub mod clock;
pub mod http;
pub mod memory;
pub mod postgres;

pub use clock::{FixedClock, SystemClock};
pub use memory::InMemoryBillingStore;
pub use postgres::{PostgresBillingStore, MIGRATOR};
