//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, errors)
//! - `tenant` - Tenant aggregate and billing lifecycle state machine
//! - `billing` - Subscription mirror, entitlements, audit, webhook events

pub mod billing;
pub mod foundation;
pub mod tenant;
