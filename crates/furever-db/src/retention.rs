//! Retention policies: batch auto-archival and audit-log pruning.
//!
//! Candidates are archived one at a time, each in its own transaction, so a
//! failure on one record is logged and skipped without touching the others.

use std::time::Instant;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::{Pool, Postgres};
use tracing::{debug, error, info, trace, warn};

use furever_core::defaults::{ADOPTED_STATUS, COMPLETED_REQUEST_STATUSES};
use furever_core::{
    ArchiveEvent, ArchiveEventBus, ArchiveRepository, AuditLogRepository, EntityKind, Error,
    Result, RetentionPolicy, RetentionReport, RetentionRepository,
};

use crate::archive::PgArchiveRepository;
use crate::audit::PgAuditLogRepository;

/// PostgreSQL implementation of RetentionRepository.
#[derive(Debug, Clone)]
pub struct PgRetentionRepository {
    pool: Pool<Postgres>,
    archives: PgArchiveRepository,
    audit: PgAuditLogRepository,
    policy: RetentionPolicy,
    events: Option<ArchiveEventBus>,
}

impl PgRetentionRepository {
    pub fn new(pool: Pool<Postgres>, archives: PgArchiveRepository) -> Self {
        Self {
            audit: PgAuditLogRepository::new(pool.clone()),
            pool,
            archives,
            policy: RetentionPolicy::default(),
            events: None,
        }
    }

    pub fn with_policy(mut self, policy: RetentionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_events(mut self, events: ArchiveEventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn policy(&self) -> &RetentionPolicy {
        &self.policy
    }

    /// Completed requests whose approval date is missing or before the cutoff.
    ///
    /// A threshold too large for the calendar binds a NULL cutoff, which
    /// leaves only requests without an approval date.
    pub async fn completed_request_candidates(&self, today: NaiveDate) -> Result<Vec<i32>> {
        let statuses: Vec<String> = COMPLETED_REQUEST_STATUSES
            .iter()
            .map(|s| s.to_string())
            .collect();

        sqlx::query_scalar(
            "SELECT adoption_request_id FROM tbl_adoption_request \
             WHERE status = ANY($1) AND (approval_date IS NULL OR approval_date < $2) \
             ORDER BY adoption_request_id",
        )
        .bind(statuses)
        .bind(self.policy.request_cutoff(today))
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)
    }

    /// Adopted pets whose adoption date is before the cutoff. None when the
    /// threshold is too large for the calendar.
    pub async fn adopted_pet_candidates(&self, today: NaiveDate) -> Result<Vec<i32>> {
        sqlx::query_scalar(
            "SELECT DISTINCT p.pet_id FROM tbl_pet p \
             JOIN tbl_adoption a ON a.pet_id = p.pet_id \
             WHERE p.adoption_status = $1 AND a.adoption_date < $2 \
             ORDER BY p.pet_id",
        )
        .bind(ADOPTED_STATUS)
        .bind(self.policy.adopted_pet_cutoff(today))
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)
    }

    /// Request auto-archival evaluated against an explicit date.
    pub async fn auto_archive_completed_requests_as_of(
        &self,
        today: NaiveDate,
        actor: Option<i32>,
    ) -> u64 {
        let candidates = self.completed_request_candidates(today).await;
        self.archive_candidates(
            EntityKind::AdoptionRequest,
            candidates,
            actor,
            &self.policy.request_reason(),
        )
        .await
    }

    /// Pet auto-archival evaluated against an explicit date.
    pub async fn auto_archive_adopted_pets_as_of(
        &self,
        today: NaiveDate,
        actor: Option<i32>,
    ) -> u64 {
        let candidates = self.adopted_pet_candidates(today).await;
        self.archive_candidates(EntityKind::Pet, candidates, actor, &self.policy.pet_reason())
            .await
    }

    async fn archive_candidates(
        &self,
        kind: EntityKind,
        candidates: Result<Vec<i32>>,
        actor: Option<i32>,
        reason: &str,
    ) -> u64 {
        let start = Instant::now();
        let candidates = match candidates {
            Ok(ids) => ids,
            Err(e) => {
                error!(
                    subsystem = "db",
                    component = "retention",
                    op = "auto_archive",
                    db_table = kind.storage_id(),
                    error = %e,
                    "Failed to select auto-archive candidates"
                );
                return 0;
            }
        };

        debug!(
            subsystem = "db",
            component = "retention",
            op = "auto_archive",
            db_table = kind.storage_id(),
            candidates = candidates.len(),
            "Selected auto-archive candidates"
        );

        let mut archived = 0u64;
        for id in candidates {
            trace!(db_table = kind.storage_id(), record_id = id, "Auto-archiving");
            let outcome = self.archives.archive(kind, id, actor, reason).await;
            if outcome.is_success() {
                archived += 1;
            } else {
                warn!(
                    subsystem = "db",
                    component = "retention",
                    op = "auto_archive",
                    db_table = kind.storage_id(),
                    record_id = id,
                    outcome = %outcome.describe(),
                    "Skipped auto-archive candidate"
                );
            }
        }

        info!(
            subsystem = "db",
            component = "retention",
            op = "auto_archive",
            db_table = kind.storage_id(),
            actor_id = ?actor,
            result_count = archived,
            duration_ms = start.elapsed().as_millis() as u64,
            "Auto-archive pass complete"
        );
        archived
    }
}

#[async_trait]
impl RetentionRepository for PgRetentionRepository {
    async fn auto_archive_completed_requests(&self, actor: Option<i32>) -> u64 {
        self.auto_archive_completed_requests_as_of(Utc::now().date_naive(), actor)
            .await
    }

    async fn auto_archive_adopted_pets(&self, actor: Option<i32>) -> u64 {
        self.auto_archive_adopted_pets_as_of(Utc::now().date_naive(), actor)
            .await
    }

    async fn run_retention(&self, actor: Option<i32>) -> RetentionReport {
        let report = RetentionReport {
            requests_archived: self.auto_archive_completed_requests(actor).await,
            pets_archived: self.auto_archive_adopted_pets(actor).await,
            log_entries_pruned: self
                .audit
                .cleanup_archive_log(self.policy.audit_log_keep_days)
                .await,
        };

        info!(
            subsystem = "db",
            component = "retention",
            op = "run",
            requests_archived = report.requests_archived,
            pets_archived = report.pets_archived,
            log_entries_pruned = report.log_entries_pruned,
            "Retention run complete"
        );

        if let Some(events) = &self.events {
            events.emit(ArchiveEvent::RetentionCompleted { report });
        }
        report
    }
}
