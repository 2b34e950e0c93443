//! Audit log repository over `tbl_archive_log`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row, Transaction};
use tracing::{debug, error, info};

use furever_core::{
    audit_log_cutoff, ArchiveLogEntry, ArchiveOperation, AuditLogRepository, EntityKind, Error,
    Result,
};

use crate::tables::LOG_INSERT_SQL;

/// Append one audit entry inside the caller's transaction.
pub async fn record_tx(
    tx: &mut Transaction<'_, Postgres>,
    kind: EntityKind,
    record_id: i32,
    operation: ArchiveOperation,
    actor: Option<i32>,
    reason: &str,
) -> Result<ArchiveLogEntry> {
    let row = sqlx::query(LOG_INSERT_SQL)
        .bind(kind.storage_id())
        .bind(record_id)
        .bind(operation.as_str())
        .bind(actor)
        .bind(reason)
        .fetch_one(&mut **tx)
        .await
        .map_err(Error::Database)?;

    log_entry_from_row(&row)
}

/// Map a `tbl_archive_log` row.
pub(crate) fn log_entry_from_row(row: &PgRow) -> Result<ArchiveLogEntry> {
    let operation: String = row.try_get("operation").map_err(Error::Database)?;
    Ok(ArchiveLogEntry {
        log_id: row.try_get("log_id").map_err(Error::Database)?,
        table_name: row.try_get("table_name").map_err(Error::Database)?,
        record_id: row.try_get("record_id").map_err(Error::Database)?,
        operation: operation.parse()?,
        performed_by_user_id: row.try_get("performed_by_user_id").map_err(Error::Database)?,
        operation_date: row.try_get("operation_date").map_err(Error::Database)?,
        reason: row.try_get("reason").map_err(Error::Database)?,
    })
}

/// PostgreSQL implementation of AuditLogRepository.
#[derive(Debug, Clone)]
pub struct PgAuditLogRepository {
    pool: Pool<Postgres>,
}

impl PgAuditLogRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Entries for one record, oldest first.
    pub async fn history(&self, kind: EntityKind, record_id: i32) -> Result<Vec<ArchiveLogEntry>> {
        let rows = sqlx::query(
            "SELECT log_id, table_name, record_id, operation, performed_by_user_id, operation_date, reason \
             FROM tbl_archive_log WHERE table_name = $1 AND record_id = $2 ORDER BY log_id",
        )
        .bind(kind.storage_id())
        .bind(record_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.iter().map(log_entry_from_row).collect()
    }

    async fn fetch_recent(
        &self,
        limit: i64,
        kind: Option<EntityKind>,
    ) -> Result<Vec<ArchiveLogEntry>> {
        let rows = sqlx::query(
            "SELECT log_id, table_name, record_id, operation, performed_by_user_id, operation_date, reason \
             FROM tbl_archive_log \
             WHERE ($1::TEXT IS NULL OR table_name = $1) \
             ORDER BY operation_date DESC, log_id DESC LIMIT $2",
        )
        .bind(kind.map(|k| k.storage_id()))
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.iter().map(log_entry_from_row).collect()
    }

    /// Delete entries with `operation_date` before `cutoff`.
    pub async fn prune_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM tbl_archive_log WHERE operation_date < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl AuditLogRepository for PgAuditLogRepository {
    async fn recent_operations(
        &self,
        limit: i64,
        kind: Option<EntityKind>,
    ) -> Vec<ArchiveLogEntry> {
        match self.fetch_recent(limit, kind).await {
            Ok(entries) => {
                debug!(
                    subsystem = "db",
                    component = "audit",
                    op = "recent_operations",
                    db_table = kind.map(|k| k.storage_id()),
                    result_count = entries.len(),
                    "Fetched recent archive operations"
                );
                entries
            }
            Err(e) => {
                error!(
                    subsystem = "db",
                    component = "audit",
                    op = "recent_operations",
                    error = %e,
                    "Failed to fetch recent archive operations"
                );
                Vec::new()
            }
        }
    }

    async fn cleanup_archive_log(&self, days_to_keep: i64) -> u64 {
        let Some(cutoff) = audit_log_cutoff(Utc::now(), days_to_keep) else {
            info!(
                subsystem = "db",
                component = "audit",
                op = "cleanup",
                days_to_keep,
                result_count = 0,
                "Retention window exceeds the calendar; nothing to prune"
            );
            return 0;
        };
        match self.prune_before(cutoff).await {
            Ok(deleted) => {
                info!(
                    subsystem = "db",
                    component = "audit",
                    op = "cleanup",
                    days_to_keep,
                    result_count = deleted,
                    "Pruned archive log"
                );
                deleted
            }
            Err(e) => {
                error!(
                    subsystem = "db",
                    component = "audit",
                    op = "cleanup",
                    days_to_keep,
                    error = %e,
                    "Failed to prune archive log"
                );
                0
            }
        }
    }

    async fn count(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM tbl_archive_log")
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)
    }
}
