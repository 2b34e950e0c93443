//! Archive engine: moves rows between live and archive tables.
//!
//! Each transition is one transaction. The row move is a single
//! `DELETE ... RETURNING` feeding an `INSERT ... SELECT`, so two racing calls
//! on the same id serialize on the row lock and the loser sees zero rows.
//! The audit entry is written in the same transaction; dropping the
//! transaction without commit rolls everything back.

use std::time::Instant;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Pool, Postgres, Row, Transaction};
use tracing::{debug, error, info, warn};

use furever_core::defaults::ARCHIVED_LIST_LIMIT;
use furever_core::{
    Adopter, AdoptionRequest, ArchiveEvent, ArchiveEventBus, ArchiveLogEntry, ArchiveOperation,
    ArchiveRepository, Archived, ArchivedRecord, EntityKind, Error, Pet, PetOwner, Result,
    TransitionOutcome, User,
};

use crate::audit::record_tx;
use crate::tables::{
    spec, ACTIVE_PET_COUNT_SQL, ARCHIVED_PET_OWNER_SQL, PET_OWNER_LOCK_SQL, PET_OWNER_SHARE_SQL,
};

/// PostgreSQL implementation of ArchiveRepository.
#[derive(Debug, Clone)]
pub struct PgArchiveRepository {
    pool: Pool<Postgres>,
    events: Option<ArchiveEventBus>,
}

impl PgArchiveRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool, events: None }
    }

    /// Report transitions on the given bus.
    pub fn with_events(mut self, events: ArchiveEventBus) -> Self {
        self.events = Some(events);
        self
    }

    // =========================================================================
    // Transaction-scoped transitions
    // =========================================================================

    /// Archive inside the caller's transaction.
    ///
    /// Returns `Error::Precondition` when a pet owner still has active pets
    /// and `Error::NotFound` when the id is not live. Nothing is written in
    /// either case.
    pub async fn archive_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        kind: EntityKind,
        id: i32,
        actor: Option<i32>,
        reason: &str,
    ) -> Result<ArchiveLogEntry> {
        if kind == EntityKind::PetOwner {
            // Serializes with pet restores; the count below then sees any
            // pet restored before this lock was granted.
            sqlx::query_scalar::<_, i32>(PET_OWNER_LOCK_SQL)
                .bind(id)
                .fetch_optional(&mut **tx)
                .await
                .map_err(Error::Database)?;

            let active: i64 = sqlx::query_scalar(ACTIVE_PET_COUNT_SQL)
                .bind(id)
                .fetch_one(&mut **tx)
                .await
                .map_err(Error::Database)?;
            debug!(
                subsystem = "db",
                component = "archive",
                record_id = id,
                active_pets = active,
                "Checked pet owner guard"
            );
            if active > 0 {
                return Err(Error::Precondition(format!(
                    "pet owner {} has {} active pet(s)",
                    id, active
                )));
            }
        }

        let moved = sqlx::query(&spec(kind).archive_move_sql())
            .bind(id)
            .bind(actor)
            .bind(reason)
            .execute(&mut **tx)
            .await
            .map_err(Error::Database)?
            .rows_affected();

        if moved == 0 {
            return Err(Error::NotFound(format!("{} {} is not live", kind, id)));
        }

        record_tx(tx, kind, id, ArchiveOperation::Archive, actor, reason).await
    }

    /// Restore inside the caller's transaction.
    ///
    /// A pet whose owner is not live returns `Error::Precondition`.
    pub async fn restore_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        kind: EntityKind,
        id: i32,
        actor: Option<i32>,
        reason: &str,
    ) -> Result<ArchiveLogEntry> {
        if kind == EntityKind::Pet {
            self.hold_owner_for_restore(tx, id).await?;
        }

        let moved = sqlx::query(&spec(kind).restore_move_sql())
            .bind(id)
            .execute(&mut **tx)
            .await
            .map_err(Error::Database)?
            .rows_affected();

        if moved == 0 {
            return Err(Error::NotFound(format!("{} {} is not archived", kind, id)));
        }

        record_tx(tx, kind, id, ArchiveOperation::Restore, actor, reason).await
    }

    /// A pet comes back only under a live owner. The shared lock waits out
    /// an in-flight owner archive; if that archive commits, the owner row is
    /// gone and the restore is blocked.
    async fn hold_owner_for_restore(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        pet_id: i32,
    ) -> Result<()> {
        let owner: Option<i32> = sqlx::query_scalar(ARCHIVED_PET_OWNER_SQL)
            .bind(pet_id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(Error::Database)?;
        let Some(owner) = owner else {
            return Err(Error::NotFound(format!(
                "{} {} is not archived",
                EntityKind::Pet,
                pet_id
            )));
        };

        let held: Option<i32> = sqlx::query_scalar(PET_OWNER_SHARE_SQL)
            .bind(owner)
            .fetch_optional(&mut **tx)
            .await
            .map_err(Error::Database)?;
        if held.is_none() {
            return Err(Error::Precondition(format!(
                "pet owner {} of pet {} is not live",
                owner, pet_id
            )));
        }
        Ok(())
    }

    /// Permanently delete inside the caller's transaction. Never touches the live table.
    pub async fn permanent_delete_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        kind: EntityKind,
        id: i32,
        actor: Option<i32>,
        reason: &str,
    ) -> Result<ArchiveLogEntry> {
        let deleted = sqlx::query(&spec(kind).purge_sql())
            .bind(id)
            .execute(&mut **tx)
            .await
            .map_err(Error::Database)?
            .rows_affected();

        if deleted == 0 {
            return Err(Error::NotFound(format!("{} {} is not archived", kind, id)));
        }

        record_tx(tx, kind, id, ArchiveOperation::PermanentDelete, actor, reason).await
    }

    // =========================================================================
    // Unit of work
    // =========================================================================

    async fn transition_once(
        &self,
        operation: ArchiveOperation,
        kind: EntityKind,
        id: i32,
        actor: Option<i32>,
        reason: &str,
    ) -> Result<ArchiveLogEntry> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let entry = match operation {
            ArchiveOperation::Archive => self.archive_tx(&mut tx, kind, id, actor, reason).await?,
            ArchiveOperation::Restore => self.restore_tx(&mut tx, kind, id, actor, reason).await?,
            ArchiveOperation::PermanentDelete => {
                self.permanent_delete_tx(&mut tx, kind, id, actor, reason)
                    .await?
            }
        };
        tx.commit().await.map_err(Error::Database)?;
        Ok(entry)
    }

    /// Run one transition and fold its result into an outcome.
    async fn transition(
        &self,
        operation: ArchiveOperation,
        kind: EntityKind,
        id: i32,
        actor: Option<i32>,
        reason: &str,
    ) -> TransitionOutcome {
        let start = Instant::now();
        let result = self.transition_once(operation, kind, id, actor, reason).await;
        let duration_ms = start.elapsed().as_millis() as u64;
        let db_table = kind.storage_id();

        let outcome = match result {
            Ok(entry) => {
                info!(
                    subsystem = "db",
                    component = "archive",
                    op = operation.as_str(),
                    db_table,
                    record_id = id,
                    actor_id = ?actor,
                    log_id = entry.log_id,
                    success = true,
                    duration_ms,
                    "Archive transition completed"
                );
                TransitionOutcome::Completed(entry)
            }
            Err(Error::NotFound(msg)) => {
                warn!(
                    subsystem = "db",
                    component = "archive",
                    op = operation.as_str(),
                    db_table,
                    record_id = id,
                    actor_id = ?actor,
                    success = false,
                    duration_ms,
                    "Archive transition found no record: {}",
                    msg
                );
                TransitionOutcome::NotFound
            }
            Err(Error::Precondition(reason)) => {
                warn!(
                    subsystem = "db",
                    component = "archive",
                    op = operation.as_str(),
                    db_table,
                    record_id = id,
                    actor_id = ?actor,
                    success = false,
                    duration_ms,
                    "Archive transition blocked: {}",
                    reason
                );
                TransitionOutcome::Blocked { reason }
            }
            Err(e) => {
                error!(
                    subsystem = "db",
                    component = "archive",
                    op = operation.as_str(),
                    db_table,
                    record_id = id,
                    actor_id = ?actor,
                    success = false,
                    duration_ms,
                    error = %e,
                    "Archive transition failed and was rolled back"
                );
                TransitionOutcome::Failed {
                    error: e.to_string(),
                }
            }
        };

        self.report(operation, kind, id, actor, &outcome);
        outcome
    }

    fn report(
        &self,
        operation: ArchiveOperation,
        kind: EntityKind,
        record_id: i32,
        actor_id: Option<i32>,
        outcome: &TransitionOutcome,
    ) {
        let Some(events) = &self.events else {
            return;
        };
        let event = match outcome {
            TransitionOutcome::Completed(entry) => ArchiveEvent::TransitionCompleted {
                kind,
                record_id,
                operation,
                actor_id,
                log_id: entry.log_id,
            },
            other => ArchiveEvent::TransitionRejected {
                kind,
                record_id,
                operation,
                actor_id,
                detail: other.describe(),
            },
        };
        events.emit(event);
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Fetch one live row.
    pub async fn fetch_live<T>(&self, kind: EntityKind, id: i32) -> Result<Option<T>>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        sqlx::query_as::<_, T>(&spec(kind).select_live_by_id_sql())
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)
    }

    /// Fetch one archived row with its archive metadata.
    pub async fn fetch_archived<T>(&self, kind: EntityKind, id: i32) -> Result<Option<Archived<T>>>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        sqlx::query_as::<_, Archived<T>>(&spec(kind).select_archived_by_id_sql())
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)
    }

    async fn list_typed<T>(&self, kind: EntityKind, limit: i64) -> Result<Vec<Archived<T>>>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        sqlx::query_as::<_, Archived<T>>(&spec(kind).select_archived_sql())
            .bind(limit.max(0))
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)
    }

    /// Archived pets, optionally for one owner.
    pub async fn list_archived_pets(&self, owner: Option<i32>) -> Result<Vec<Archived<Pet>>> {
        sqlx::query_as::<_, Archived<Pet>>(
            "SELECT * FROM tbl_pet_archive WHERE ($1::INT IS NULL OR pet_owner_id = $1) \
             ORDER BY archived_date DESC NULLS LAST, pet_id DESC",
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)
    }

    pub async fn list_archived_adopters(&self) -> Result<Vec<Archived<Adopter>>> {
        self.list_typed(EntityKind::Adopter, ARCHIVED_LIST_LIMIT).await
    }

    pub async fn list_archived_pet_owners(&self) -> Result<Vec<Archived<PetOwner>>> {
        self.list_typed(EntityKind::PetOwner, ARCHIVED_LIST_LIMIT).await
    }

    pub async fn list_archived_adoption_requests(&self) -> Result<Vec<Archived<AdoptionRequest>>> {
        self.list_typed(EntityKind::AdoptionRequest, ARCHIVED_LIST_LIMIT)
            .await
    }

    pub async fn list_archived_users(&self) -> Result<Vec<Archived<User>>> {
        self.list_typed(EntityKind::User, ARCHIVED_LIST_LIMIT).await
    }

    async fn exists(&self, sql: &str, id: i32) -> Result<bool> {
        sqlx::query_scalar(sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)
    }

    async fn fetch_archived_records(
        &self,
        kind: EntityKind,
        limit: i64,
    ) -> Result<Vec<ArchivedRecord>> {
        let rows = sqlx::query(&spec(kind).list_archived_sql())
            .bind(limit.max(0))
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        rows.iter()
            .map(|row| {
                Ok(ArchivedRecord {
                    kind,
                    record_id: row.try_get("record_id")?,
                    label: row.try_get("label")?,
                    archived_date: row.try_get("archived_date")?,
                    archived_by_user_id: row.try_get("archived_by_user_id")?,
                    archive_reason: row.try_get("archive_reason")?,
                })
            })
            .collect::<std::result::Result<Vec<_>, sqlx::Error>>()
            .map_err(Error::Database)
    }
}

#[async_trait]
impl ArchiveRepository for PgArchiveRepository {
    async fn archive(
        &self,
        kind: EntityKind,
        id: i32,
        actor: Option<i32>,
        reason: &str,
    ) -> TransitionOutcome {
        self.transition(ArchiveOperation::Archive, kind, id, actor, reason)
            .await
    }

    async fn restore(
        &self,
        kind: EntityKind,
        id: i32,
        actor: Option<i32>,
        reason: &str,
    ) -> TransitionOutcome {
        self.transition(ArchiveOperation::Restore, kind, id, actor, reason)
            .await
    }

    async fn permanent_delete(
        &self,
        kind: EntityKind,
        id: i32,
        actor: Option<i32>,
        reason: &str,
    ) -> TransitionOutcome {
        self.transition(ArchiveOperation::PermanentDelete, kind, id, actor, reason)
            .await
    }

    async fn is_live(&self, kind: EntityKind, id: i32) -> Result<bool> {
        self.exists(&spec(kind).exists_live_sql(), id).await
    }

    async fn is_archived(&self, kind: EntityKind, id: i32) -> Result<bool> {
        self.exists(&spec(kind).exists_archived_sql(), id).await
    }

    async fn list_archived(&self, kind: EntityKind, limit: i64) -> Vec<ArchivedRecord> {
        match self.fetch_archived_records(kind, limit).await {
            Ok(records) => records,
            Err(e) => {
                error!(
                    subsystem = "db",
                    component = "archive",
                    op = "list_archived",
                    db_table = kind.archive_table(),
                    error = %e,
                    "Failed to list archived records"
                );
                Vec::new()
            }
        }
    }
}
