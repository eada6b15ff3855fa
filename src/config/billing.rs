//! Billing reconciliation configuration

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::application::ReconcilerSettings;
use crate::domain::billing::{
    PlanCode, DEFAULT_PLAN_CODE, DEFAULT_TOLERANCE_SECS, MAX_WEBHOOK_RETENTION_DAYS,
    STRIPE_PROVIDER,
};
use crate::domain::tenant::{
    GracePolicy, TenantLifecycle, DEFAULT_GRACE_PERIOD_DAYS, MAX_GRACE_PERIOD_DAYS,
};

use super::error::ValidationError;

/// Billing configuration (Stripe webhooks)
#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    /// Provider name used in ledger keys
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Webhook signing secret
    pub webhook_secret: SecretString,

    /// Days of grace after a failed payment
    #[serde(default = "default_grace_period_days")]
    pub grace_period_days: i64,

    /// Plan granted when checkout metadata names none
    #[serde(default = "default_plan_code")]
    pub default_plan_code: String,

    /// Ledger rows older than this are purged at startup
    #[serde(default = "default_webhook_retention_days")]
    pub webhook_retention_days: i64,

    /// Deadline for one webhook transaction in seconds
    #[serde(default = "default_transaction_timeout")]
    pub transaction_timeout_secs: u64,

    /// Maximum age of a webhook signature in seconds
    #[serde(default = "default_signature_tolerance")]
    pub signature_tolerance_secs: i64,
}

impl BillingConfig {
    pub fn transaction_timeout(&self) -> Duration {
        Duration::from_secs(self.transaction_timeout_secs)
    }

    /// Builds reconciler settings. Call after [`validate`](Self::validate).
    pub fn reconciler_settings(&self) -> Result<ReconcilerSettings, ValidationError> {
        let policy = GracePolicy::new(self.grace_period_days)
            .map_err(|_| ValidationError::InvalidGracePeriod)?;
        let default_plan_code =
            PlanCode::new(&self.default_plan_code).map_err(|_| ValidationError::InvalidPlanCode)?;

        Ok(ReconcilerSettings {
            provider: self.provider.clone(),
            lifecycle: TenantLifecycle::new(policy),
            default_plan_code,
            transaction_timeout: self.transaction_timeout(),
        })
    }

    /// Validate billing configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.provider.trim().is_empty() {
            return Err(ValidationError::MissingRequired("BILLING_PROVIDER"));
        }
        let secret = self.webhook_secret.expose_secret();
        if secret.is_empty() {
            return Err(ValidationError::MissingRequired("BILLING_WEBHOOK_SECRET"));
        }
        if !secret.starts_with("whsec_") {
            return Err(ValidationError::InvalidStripeWebhookSecret);
        }
        if !(1..=MAX_GRACE_PERIOD_DAYS).contains(&self.grace_period_days) {
            return Err(ValidationError::InvalidGracePeriod);
        }
        if self.default_plan_code.trim().is_empty() {
            return Err(ValidationError::InvalidPlanCode);
        }
        if !(1..=MAX_WEBHOOK_RETENTION_DAYS).contains(&self.webhook_retention_days) {
            return Err(ValidationError::InvalidRetention);
        }
        if self.transaction_timeout_secs == 0 || self.transaction_timeout_secs > 300 {
            return Err(ValidationError::InvalidTimeout);
        }
        if self.signature_tolerance_secs <= 0 {
            return Err(ValidationError::InvalidSignatureTolerance);
        }
        Ok(())
    }
}

fn default_provider() -> String {
    STRIPE_PROVIDER.to_string()
}

fn default_grace_period_days() -> i64 {
    DEFAULT_GRACE_PERIOD_DAYS
}

fn default_plan_code() -> String {
    DEFAULT_PLAN_CODE.to_string()
}

fn default_webhook_retention_days() -> i64 {
    30
}

fn default_transaction_timeout() -> u64 {
    10
}

fn default_signature_tolerance() -> i64 {
    DEFAULT_TOLERANCE_SECS
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> BillingConfig {
        BillingConfig {
            provider: default_provider(),
            webhook_secret: SecretString::new("whsec_xyz789".to_string()),
            grace_period_days: default_grace_period_days(),
            default_plan_code: default_plan_code(),
            webhook_retention_days: default_webhook_retention_days(),
            transaction_timeout_secs: default_transaction_timeout(),
            signature_tolerance_secs: default_signature_tolerance(),
        }
    }

    #[test]
    fn test_validation_valid_config() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_validation_invalid_webhook_secret_prefix() {
        let config = BillingConfig {
            webhook_secret: SecretString::new("secret_xxx".to_string()),
            ..valid_config()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidStripeWebhookSecret)
        ));
    }

    #[test]
    fn test_validation_missing_webhook_secret() {
        let config = BillingConfig {
            webhook_secret: SecretString::new(String::new()),
            ..valid_config()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::MissingRequired(_))
        ));
    }

    #[test]
    fn test_validation_grace_period_bounds() {
        for days in [0, 91] {
            let config = BillingConfig {
                grace_period_days: days,
                ..valid_config()
            };
            assert!(config.validate().is_err(), "{} days accepted", days);
        }
        for days in [1, 90] {
            let config = BillingConfig {
                grace_period_days: days,
                ..valid_config()
            };
            assert!(config.validate().is_ok(), "{} days rejected", days);
        }
    }

    #[test]
    fn test_validation_blank_plan_code() {
        let config = BillingConfig {
            default_plan_code: "  ".to_string(),
            ..valid_config()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_retention_bounds() {
        for days in [0, MAX_WEBHOOK_RETENTION_DAYS + 1, i64::MAX] {
            let config = BillingConfig {
                webhook_retention_days: days,
                ..valid_config()
            };
            assert!(
                matches!(config.validate(), Err(ValidationError::InvalidRetention)),
                "{} days accepted",
                days
            );
        }
        let config = BillingConfig {
            webhook_retention_days: MAX_WEBHOOK_RETENTION_DAYS,
            ..valid_config()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_invalid_timeout() {
        let config = BillingConfig {
            transaction_timeout_secs: 0,
            ..valid_config()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_reconciler_settings_carry_values() {
        let config = BillingConfig {
            grace_period_days: 7,
            default_plan_code: "pro".to_string(),
            transaction_timeout_secs: 5,
            ..valid_config()
        };

        let settings = config.reconciler_settings().unwrap();

        assert_eq!(settings.provider, "stripe");
        assert_eq!(settings.lifecycle.policy().grace_period_days(), 7);
        assert_eq!(settings.default_plan_code.as_str(), "pro");
        assert_eq!(settings.transaction_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let rendered = format!("{:?}", valid_config());
        assert!(!rendered.contains("whsec_xyz789"));
    }
}
