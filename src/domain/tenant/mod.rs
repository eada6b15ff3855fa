//! Tenant domain module.
//!
//! Billing lifecycle of a tenant organization.
//!
//! # Module Structure
//!
//! - `aggregate` - Tenant aggregate entity
//! - `status` - TenantStatus state machine
//! - `lifecycle` - Grace policy and billing-signal transitions

mod aggregate;
mod lifecycle;
mod status;

pub use aggregate::Tenant;
pub use lifecycle::{
    CancellationResolution, GracePolicy, LifecycleChange, TenantLifecycle,
    DEFAULT_GRACE_PERIOD_DAYS, MAX_GRACE_PERIOD_DAYS,
};
pub use status::TenantStatus;
