//! Plan entitlements.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{EntitlementId, TenantId, Timestamp, ValidationError};

/// Plan granted when checkout metadata names none.
pub const DEFAULT_PLAN_CODE: &str = "standard";

/// Identifier of a subscription plan tier (e.g. `standard`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlanCode(String);

impl PlanCode {
    pub fn new(code: impl Into<String>) -> Result<Self, ValidationError> {
        let code = code.into();
        let trimmed = code.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::empty_field("plan_code"));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for PlanCode {
    fn default() -> Self {
        Self(DEFAULT_PLAN_CODE.to_string())
    }
}

impl std::fmt::Display for PlanCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who issued an entitlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntitlementSource {
    /// Granted by the payment provider flow.
    Provider,
    /// Issued by an administrator.
    Manual,
}

impl EntitlementSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntitlementSource::Provider => "provider",
            EntitlementSource::Manual => "manual",
        }
    }

    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        match s {
            "provider" => Ok(EntitlementSource::Provider),
            "manual" => Ok(EntitlementSource::Manual),
            other => Err(ValidationError::invalid_format(
                "entitlement_source",
                format!("unknown source '{}'", other),
            )),
        }
    }
}

/// Grant of a plan's features to a tenant.
///
/// An entitlement is active while it has no revocation and its expiry, if
/// any, lies in the future.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entitlement {
    pub id: EntitlementId,
    pub tenant_id: TenantId,
    pub plan_code: PlanCode,
    pub source: EntitlementSource,
    pub expires_at: Option<Timestamp>,
    pub revoked_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl Entitlement {
    pub fn grant(
        now: Timestamp,
        tenant_id: TenantId,
        plan_code: PlanCode,
        source: EntitlementSource,
        expires_at: Option<Timestamp>,
    ) -> Self {
        Self {
            id: EntitlementId::new(),
            tenant_id,
            plan_code,
            source,
            expires_at,
            revoked_at: None,
            created_at: now,
        }
    }

    pub fn is_active(&self, now: Timestamp) -> bool {
        self.revoked_at.is_none() && self.expires_at.map_or(true, |expiry| now < expiry)
    }

    /// Revokes the entitlement. Returns `false` if it was already revoked.
    pub fn revoke(&mut self, now: Timestamp) -> bool {
        if self.revoked_at.is_some() {
            return false;
        }
        self.revoked_at = Some(now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> Timestamp {
        Timestamp::from_unix_secs(1_760_000_000).unwrap()
    }

    fn standard() -> PlanCode {
        PlanCode::new("standard").unwrap()
    }

    #[test]
    fn plan_code_rejects_blank() {
        assert!(PlanCode::new("  ").is_err());
        assert_eq!(PlanCode::new(" pro ").unwrap().as_str(), "pro");
        assert_eq!(PlanCode::default().as_str(), DEFAULT_PLAN_CODE);
    }

    #[test]
    fn grant_without_expiry_is_active() {
        let ent = Entitlement::grant(now(), TenantId::new(), standard(), EntitlementSource::Provider, None);

        assert!(ent.is_active(now().add_days(3650)));
    }

    #[test]
    fn expired_entitlement_is_inactive() {
        let expiry = now().add_days(1);
        let ent = Entitlement::grant(
            now(),
            TenantId::new(),
            standard(),
            EntitlementSource::Manual,
            Some(expiry),
        );

        assert!(ent.is_active(now()));
        assert!(!ent.is_active(expiry));
    }

    #[test]
    fn revoke_is_idempotent() {
        let mut ent = Entitlement::grant(now(), TenantId::new(), standard(), EntitlementSource::Provider, None);

        assert!(ent.revoke(now()));
        assert!(!ent.revoke(now().add_days(1)));
        assert_eq!(ent.revoked_at, Some(now()));
        assert!(!ent.is_active(now()));
    }

    #[test]
    fn source_parses_storage_values() {
        assert_eq!(EntitlementSource::parse("provider"), Ok(EntitlementSource::Provider));
        assert_eq!(EntitlementSource::parse("manual"), Ok(EntitlementSource::Manual));
        assert!(EntitlementSource::parse("stripe").is_err());
    }
}
