//! Timestamp value object for immutable points in time.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Immutable point in time, always UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a timestamp for the current moment.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a timestamp from a DateTime<Utc>.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Returns the inner DateTime.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Checks if this timestamp is before another.
    pub fn is_before(&self, other: &Timestamp) -> bool {
        self.0 < other.0
    }

    /// Checks if this timestamp is after another.
    pub fn is_after(&self, other: &Timestamp) -> bool {
        self.0 > other.0
    }

    /// Returns the duration from another timestamp to this one.
    ///
    /// Returns negative duration if other is after self.
    pub fn duration_since(&self, other: &Timestamp) -> Duration {
        self.0.signed_duration_since(other.0)
    }

    /// Adds days, returning `None` if the result leaves chrono's range.
    pub fn checked_add_days(&self, days: i64) -> Option<Self> {
        Duration::try_days(days)
            .and_then(|delta| self.0.checked_add_signed(delta))
            .map(Self)
    }

    /// Subtracts days, returning `None` if the result leaves chrono's range.
    pub fn checked_minus_days(&self, days: i64) -> Option<Self> {
        Duration::try_days(days)
            .and_then(|delta| self.0.checked_sub_signed(delta))
            .map(Self)
    }

    /// Creates a new timestamp by adding the specified number of days.
    ///
    /// Negative values subtract days. Saturates at the representable range.
    pub fn add_days(&self, days: i64) -> Self {
        self.checked_add_days(days)
            .unwrap_or_else(|| Self::saturated(days >= 0))
    }

    /// Creates a new timestamp by subtracting the specified number of days.
    ///
    /// Saturates at the representable range.
    pub fn minus_days(&self, days: i64) -> Self {
        self.checked_minus_days(days)
            .unwrap_or_else(|| Self::saturated(days < 0))
    }

    /// Creates a new timestamp by adding the specified number of hours.
    ///
    /// Negative values subtract hours. Saturates at the representable range.
    pub fn add_hours(&self, hours: i64) -> Self {
        Duration::try_hours(hours)
            .and_then(|delta| self.0.checked_add_signed(delta))
            .map(Self)
            .unwrap_or_else(|| Self::saturated(hours >= 0))
    }

    fn saturated(upper: bool) -> Self {
        if upper {
            Self(DateTime::<Utc>::MAX_UTC)
        } else {
            Self(DateTime::<Utc>::MIN_UTC)
        }
    }

    /// Creates a timestamp from Unix seconds.
    ///
    /// Returns `None` when the value is outside chrono's representable range.
    pub fn from_unix_secs(secs: i64) -> Option<Self> {
        Utc.timestamp_opt(secs, 0).single().map(Self)
    }

    /// Returns the timestamp as Unix seconds.
    pub fn as_unix_secs(&self) -> i64 {
        self.0.timestamp()
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn timestamp_now_creates_current_time() {
        let before = Utc::now();
        let ts = Timestamp::now();
        let after = Utc::now();

        assert!(ts.as_datetime() >= &before);
        assert!(ts.as_datetime() <= &after);
    }

    #[test]
    fn timestamp_ordering_helpers_agree() {
        let ts1 = Timestamp::from_unix_secs(1_000).unwrap();
        let ts2 = Timestamp::from_unix_secs(2_000).unwrap();

        assert!(ts1.is_before(&ts2));
        assert!(ts2.is_after(&ts1));
        assert!(ts1 < ts2);
    }

    #[test]
    fn timestamp_serializes_to_rfc3339_json() {
        let dt = DateTime::parse_from_rfc3339("2024-01-15T10:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let ts = Timestamp::from_datetime(dt);

        let json = serde_json::to_string(&ts).unwrap();
        assert!(json.contains("2024-01-15"));
    }

    #[test]
    fn timestamp_from_unix_secs_works() {
        // 2024-01-15T00:00:00Z
        let ts = Timestamp::from_unix_secs(1705276800).unwrap();
        assert_eq!(ts.as_datetime().year(), 2024);
        assert_eq!(ts.as_datetime().month(), 1);
        assert_eq!(ts.as_datetime().day(), 15);
        assert_eq!(ts.as_unix_secs(), 1705276800);
    }

    #[test]
    fn timestamp_from_unix_secs_rejects_out_of_range() {
        assert!(Timestamp::from_unix_secs(i64::MAX).is_none());
    }

    #[test]
    fn add_days_and_hours_shift_forward_and_back() {
        let ts = Timestamp::from_unix_secs(1705276800).unwrap();

        assert_eq!(ts.add_days(14).as_unix_secs(), 1705276800 + 14 * 86_400);
        assert_eq!(ts.minus_days(1).as_unix_secs(), 1705276800 - 86_400);
        assert_eq!(ts.add_hours(-1).as_unix_secs(), 1705276800 - 3_600);
        assert_eq!(ts.add_days(2).duration_since(&ts), Duration::days(2));
    }

    #[test]
    fn checked_day_arithmetic_reports_overflow() {
        let near_max = Timestamp::from_unix_secs(8_210_266_876_799).unwrap();
        let ts = Timestamp::from_unix_secs(1705276800).unwrap();

        assert!(near_max.checked_add_days(14).is_none());
        assert!(ts.checked_minus_days(i64::MAX).is_none());
        assert_eq!(
            ts.checked_add_days(1).map(|t| t.as_unix_secs()),
            Some(1705276800 + 86_400)
        );
    }

    #[test]
    fn day_arithmetic_saturates_instead_of_panicking() {
        let near_max = Timestamp::from_unix_secs(8_210_266_876_799).unwrap();
        let ts = Timestamp::from_unix_secs(1705276800).unwrap();

        assert_eq!(*near_max.add_days(14).as_datetime(), DateTime::<Utc>::MAX_UTC);
        assert_eq!(*ts.minus_days(i64::MAX).as_datetime(), DateTime::<Utc>::MIN_UTC);
        assert_eq!(*ts.add_hours(i64::MIN).as_datetime(), DateTime::<Utc>::MIN_UTC);
    }
}
