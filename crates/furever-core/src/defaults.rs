//! Centralized default constants for the furever archive subsystem.
//!
//! All crates reference these constants instead of defining their own magic
//! numbers. Organized by domain area.

// =============================================================================
// RETENTION
// =============================================================================

/// Completed adoption requests older than this many days are auto-archived.
pub const REQUEST_RETENTION_DAYS: i64 = 30;

/// Adopted pets whose adoption is older than this many days are auto-archived.
pub const ADOPTED_PET_RETENTION_DAYS: i64 = 60;

/// Audit log entries older than this many days are pruned by the worker.
pub const AUDIT_LOG_KEEP_DAYS: i64 = 365;

/// Adoption request statuses considered "completed".
pub const COMPLETED_REQUEST_STATUSES: &[&str] = &["Approved", "Rejected"];

/// Pet adoption status that makes a pet eligible for auto-archival.
pub const ADOPTED_STATUS: &str = "Adopted";

// =============================================================================
// REASONS
// =============================================================================

/// Reason recorded when a user is deleted through the admin surface.
pub const USER_DELETE_REASON: &str = "User deleted via admin dashboard";

// =============================================================================
// PROFILES
// =============================================================================

/// Contact placeholder for profiles created by a role change.
pub const PROFILE_DEFAULT_CONTACT: &str = "09000000000";

/// Address placeholder for profiles created by a role change.
pub const PROFILE_DEFAULT_ADDRESS: &str = "Address not provided";

// =============================================================================
// REPORTING
// =============================================================================

/// Default number of audit entries shown by "recent operations".
pub const RECENT_OPERATIONS_LIMIT: i64 = 20;

/// Default page size for archived record listings.
pub const ARCHIVED_LIST_LIMIT: i64 = 100;

// =============================================================================
// WORKER
// =============================================================================

/// Default interval between retention worker runs (one day).
pub const RETENTION_WORKER_INTERVAL_SECS: u64 = 86_400;

/// Broadcast buffer for archive and worker events.
pub const EVENT_BUS_CAPACITY: usize = 256;

// =============================================================================
// DATABASE
// =============================================================================

/// Default database URL when `DATABASE_URL` is not set.
pub const DATABASE_URL: &str = "postgres://localhost/furever";

/// Default maximum number of pooled connections.
pub const DB_MAX_CONNECTIONS: u32 = 10;

/// Default connection acquire timeout in seconds.
pub const DB_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default idle connection timeout in seconds.
pub const DB_IDLE_TIMEOUT_SECS: u64 = 600;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retention_windows_are_ordered() {
        const {
            assert!(REQUEST_RETENTION_DAYS > 0);
            assert!(REQUEST_RETENTION_DAYS < ADOPTED_PET_RETENTION_DAYS);
            assert!(ADOPTED_PET_RETENTION_DAYS < AUDIT_LOG_KEEP_DAYS);
        }
    }

    #[test]
    fn adopted_status_is_not_a_request_status() {
        assert!(!COMPLETED_REQUEST_STATUSES.contains(&ADOPTED_STATUS));
        assert_eq!(COMPLETED_REQUEST_STATUSES, &["Approved", "Rejected"]);
    }
}
