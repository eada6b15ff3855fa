//! Tenant Billing Reconciler
//!
//! Consumes at-least-once payment provider webhooks and reconciles tenant
//! status, the subscription mirror and plan entitlements, exactly once per
//! provider event.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
