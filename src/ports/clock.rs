//! Clock port.

use crate::domain::foundation::Timestamp;

/// Source of the current time. Handlers never read the system clock directly.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}
