//! Retention thresholds for auto-archival and audit-log pruning.

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};

use crate::defaults;

/// Thresholds applied by the auto-archival policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Completed requests approved more than this many days ago are archived.
    pub request_days: i64,
    /// Adopted pets whose adoption is older than this are archived.
    pub adopted_pet_days: i64,
    /// Audit entries older than this are pruned by a full retention run.
    pub audit_log_keep_days: i64,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            request_days: defaults::REQUEST_RETENTION_DAYS,
            adopted_pet_days: defaults::ADOPTED_PET_RETENTION_DAYS,
            audit_log_keep_days: defaults::AUDIT_LOG_KEEP_DAYS,
        }
    }
}

impl RetentionPolicy {
    /// Create policy from environment variables (with defaults).
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `RETENTION_REQUEST_DAYS` | `30` |
    /// | `RETENTION_ADOPTED_PET_DAYS` | `60` |
    /// | `AUDIT_LOG_KEEP_DAYS` | `365` |
    pub fn from_env() -> Self {
        let read = |name: &str, default: i64| {
            std::env::var(name)
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .filter(|v| *v >= 0)
                .unwrap_or(default)
        };

        Self {
            request_days: read("RETENTION_REQUEST_DAYS", defaults::REQUEST_RETENTION_DAYS),
            adopted_pet_days: read(
                "RETENTION_ADOPTED_PET_DAYS",
                defaults::ADOPTED_PET_RETENTION_DAYS,
            ),
            audit_log_keep_days: read("AUDIT_LOG_KEEP_DAYS", defaults::AUDIT_LOG_KEEP_DAYS),
        }
    }

    pub fn with_request_days(mut self, days: i64) -> Self {
        self.request_days = days;
        self
    }

    pub fn with_adopted_pet_days(mut self, days: i64) -> Self {
        self.adopted_pet_days = days;
        self
    }

    pub fn with_audit_log_keep_days(mut self, days: i64) -> Self {
        self.audit_log_keep_days = days;
        self
    }

    /// Reason recorded on auto-archived adoption requests.
    pub fn request_reason(&self) -> String {
        format!(
            "Auto-archived: Completed request older than {} days",
            self.request_days
        )
    }

    /// Reason recorded on auto-archived pets.
    pub fn pet_reason(&self) -> String {
        format!(
            "Auto-archived: Pet adopted over {} days ago",
            self.adopted_pet_days
        )
    }

    /// Requests with `approval_date` strictly before this date are eligible.
    ///
    /// `None` when the threshold reaches past the representable calendar.
    pub fn request_cutoff(&self, today: NaiveDate) -> Option<NaiveDate> {
        days_before(today, self.request_days)
    }

    /// Pets adopted strictly before this date are eligible.
    pub fn adopted_pet_cutoff(&self, today: NaiveDate) -> Option<NaiveDate> {
        days_before(today, self.adopted_pet_days)
    }
}

fn days_before(today: NaiveDate, days: i64) -> Option<NaiveDate> {
    TimeDelta::try_days(days).and_then(|delta| today.checked_sub_signed(delta))
}

/// Audit entries with `operation_date` strictly before this instant are pruned.
///
/// `None` when nothing can be that old.
pub fn audit_log_cutoff(now: DateTime<Utc>, days_to_keep: i64) -> Option<DateTime<Utc>> {
    TimeDelta::try_days(days_to_keep).and_then(|delta| now.checked_sub_signed(delta))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = RetentionPolicy::default();
        assert_eq!(policy.request_days, 30);
        assert_eq!(policy.adopted_pet_days, 60);
        assert_eq!(policy.audit_log_keep_days, 365);
    }

    #[test]
    fn test_default_reasons() {
        let policy = RetentionPolicy::default();
        assert_eq!(
            policy.request_reason(),
            "Auto-archived: Completed request older than 30 days"
        );
        assert_eq!(
            policy.pet_reason(),
            "Auto-archived: Pet adopted over 60 days ago"
        );
    }

    #[test]
    fn test_builder_reasons_follow_days() {
        let policy = RetentionPolicy::default()
            .with_request_days(7)
            .with_adopted_pet_days(14)
            .with_audit_log_keep_days(90);
        assert_eq!(
            policy.request_reason(),
            "Auto-archived: Completed request older than 7 days"
        );
        assert_eq!(policy.pet_reason(), "Auto-archived: Pet adopted over 14 days ago");
        assert_eq!(policy.audit_log_keep_days, 90);
    }

    #[test]
    fn test_request_cutoff_threshold() {
        let policy = RetentionPolicy::default();
        let today = NaiveDate::from_ymd_opt(2026, 3, 31).unwrap();
        let cutoff = policy.request_cutoff(today).unwrap();
        assert_eq!(cutoff, NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());

        let thirty_one_days_ago = today - TimeDelta::days(31);
        let ten_days_ago = today - TimeDelta::days(10);
        assert!(thirty_one_days_ago < cutoff);
        assert!(ten_days_ago >= cutoff);
    }

    #[test]
    fn test_adopted_pet_cutoff() {
        let policy = RetentionPolicy::default();
        let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        assert_eq!(
            policy.adopted_pet_cutoff(today),
            NaiveDate::from_ymd_opt(2025, 12, 31)
        );
    }

    #[test]
    fn test_audit_log_cutoff_zero_days_is_now() {
        let now = Utc::now();
        assert_eq!(audit_log_cutoff(now, 0), Some(now));
        assert_eq!(audit_log_cutoff(now, 2), Some(now - TimeDelta::days(2)));
    }

    #[test]
    fn test_huge_thresholds_have_no_cutoff() {
        let policy = RetentionPolicy::default()
            .with_request_days(1_000_000_000)
            .with_adopted_pet_days(i64::MAX);
        let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        assert_eq!(policy.request_cutoff(today), None);
        assert_eq!(policy.adopted_pet_cutoff(today), None);
        assert_eq!(audit_log_cutoff(Utc::now(), 1_000_000_000), None);
        assert_eq!(audit_log_cutoff(Utc::now(), i64::MAX), None);
    }
}
