//! PurgeWebhookEventsHandler - Deletes idempotency ledger rows past retention.

use std::sync::Arc;

use crate::domain::billing::MAX_WEBHOOK_RETENTION_DAYS;
use crate::domain::foundation::{DomainError, ValidationError};
use crate::ports::{Clock, WebhookRetention};

/// Command to purge old ledger rows.
#[derive(Debug, Clone, Copy)]
pub struct PurgeWebhookEventsCommand {
    /// Rows received more than this many days ago are deleted.
    pub retention_days: i64,
}

/// Handler for ledger retention.
///
/// A purged event id that is redelivered afterwards is treated as new, so
/// retention must comfortably exceed the provider's redelivery window.
pub struct PurgeWebhookEventsHandler {
    retention: Arc<dyn WebhookRetention>,
    clock: Arc<dyn Clock>,
}

impl PurgeWebhookEventsHandler {
    pub fn new(retention: Arc<dyn WebhookRetention>, clock: Arc<dyn Clock>) -> Self {
        Self { retention, clock }
    }

    /// Returns the number of rows deleted.
    pub async fn handle(&self, cmd: PurgeWebhookEventsCommand) -> Result<u64, DomainError> {
        let out_of_range = || {
            ValidationError::out_of_range(
                "retention_days",
                1,
                MAX_WEBHOOK_RETENTION_DAYS,
                cmd.retention_days,
            )
        };
        if !(1..=MAX_WEBHOOK_RETENTION_DAYS).contains(&cmd.retention_days) {
            return Err(out_of_range().into());
        }

        let cutoff = self
            .clock
            .now()
            .checked_minus_days(cmd.retention_days)
            .ok_or_else(out_of_range)?;
        let deleted = self.retention.delete_older_than(cutoff).await?;

        tracing::info!(
            retention_days = cmd.retention_days,
            cutoff = %cutoff,
            deleted,
            "Purged webhook ledger"
        );
        Ok(deleted)
    }
}
