//! Repository traits for the archive subsystem.
//!
//! Transition and report methods return plain values rather than `Result`:
//! storage failures are caught at this boundary, logged, and folded into
//! `TransitionOutcome::Failed` or an empty/zero report.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::*;
use crate::roles::{RoleTransition, UserUpdate};

// =============================================================================
// ARCHIVE ENGINE
// =============================================================================

/// The three state transitions, selected by entity kind.
#[async_trait]
pub trait ArchiveRepository: Send + Sync {
    /// Move a live row to its archive table and log `ARCHIVE`.
    async fn archive(
        &self,
        kind: EntityKind,
        id: i32,
        actor: Option<i32>,
        reason: &str,
    ) -> TransitionOutcome;

    /// Move an archived row back to its live table and log `RESTORE`.
    async fn restore(
        &self,
        kind: EntityKind,
        id: i32,
        actor: Option<i32>,
        reason: &str,
    ) -> TransitionOutcome;

    /// Delete an archived row for good and log `PERMANENT_DELETE`.
    async fn permanent_delete(
        &self,
        kind: EntityKind,
        id: i32,
        actor: Option<i32>,
        reason: &str,
    ) -> TransitionOutcome;

    /// True when the id is present in the live table.
    async fn is_live(&self, kind: EntityKind, id: i32) -> Result<bool>;

    /// True when the id is present in the archive table.
    async fn is_archived(&self, kind: EntityKind, id: i32) -> Result<bool>;

    /// Archived rows of one kind, newest first. Empty on storage failure.
    async fn list_archived(&self, kind: EntityKind, limit: i64) -> Vec<ArchivedRecord>;
}

// =============================================================================
// AUDIT LOG
// =============================================================================

#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    /// Most recent entries, newest first, optionally for one entity kind.
    async fn recent_operations(
        &self,
        limit: i64,
        kind: Option<EntityKind>,
    ) -> Vec<ArchiveLogEntry>;

    /// Delete entries older than `days_to_keep` days; returns rows removed.
    async fn cleanup_archive_log(&self, days_to_keep: i64) -> u64;

    /// Total number of audit entries.
    async fn count(&self) -> Result<i64>;
}

// =============================================================================
// REPORTING
// =============================================================================

#[async_trait]
pub trait ArchiveReportRepository: Send + Sync {
    /// Row count per archive table; zero for a table that could not be read.
    async fn archive_statistics(&self) -> ArchiveStatistics;

    /// Count and archived-date range per entity kind.
    async fn archive_summary(&self) -> Vec<ArchiveSummary>;

    /// Human-readable descriptions of orphaned archive rows.
    async fn validate_archive_integrity(&self) -> Vec<String>;
}

// =============================================================================
// RETENTION
// =============================================================================

#[async_trait]
pub trait RetentionRepository: Send + Sync {
    /// Archive completed adoption requests past the threshold; returns successes.
    async fn auto_archive_completed_requests(&self, actor: Option<i32>) -> u64;

    /// Archive adopted pets past the threshold; returns successes.
    async fn auto_archive_adopted_pets(&self, actor: Option<i32>) -> u64;

    /// Both policies followed by audit-log pruning.
    async fn run_retention(&self, actor: Option<i32>) -> RetentionReport;
}

// =============================================================================
// USERS AND PROFILES
// =============================================================================

#[async_trait]
pub trait UserProfileRepository: Send + Sync {
    /// Replace a user row and reconcile its linked profile in one unit of work.
    async fn update_user(&self, update: &UserUpdate) -> Result<RoleTransition>;

    /// Route user deletion through the archive.
    async fn delete_user(&self, id: i32) -> TransitionOutcome;
}
