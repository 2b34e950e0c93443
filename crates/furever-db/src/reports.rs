//! Archive statistics, retention summaries, and integrity checks.
//!
//! Every table and every check is queried on its own; one failure is logged
//! and reported in place without aborting the rest.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row};
use tracing::{debug, error, warn};

use furever_core::{
    ArchiveReportRepository, ArchiveStatistics, ArchiveSummary, EntityKind, Error, Result,
};

use crate::tables::{orphan_any_count_sql, orphan_count_sql, spec};

/// Order of the retention dashboard rows.
pub const SUMMARY_ORDER: [EntityKind; 6] = [
    EntityKind::Pet,
    EntityKind::AdoptionRequest,
    EntityKind::Adopter,
    EntityKind::PetOwner,
    EntityKind::Adoption,
    EntityKind::User,
];

/// One orphan check: what it inspects, the count query, and the issue text.
struct IntegrityCheck {
    subject: &'static str,
    sql: String,
    describe: fn(i64) -> String,
}

fn integrity_checks() -> Vec<IntegrityCheck> {
    vec![
        IntegrityCheck {
            subject: "pet archive integrity",
            sql: orphan_count_sql(
                EntityKind::Pet.archive_table(),
                "pet_owner_id",
                spec(EntityKind::PetOwner),
            ),
            describe: |n| format!("Found {} archived pets without corresponding owners", n),
        },
        IntegrityCheck {
            subject: "adoption request archive integrity",
            sql: orphan_any_count_sql(
                EntityKind::AdoptionRequest.archive_table(),
                &[
                    ("pet_id", spec(EntityKind::Pet)),
                    ("adopter_id", spec(EntityKind::Adopter)),
                ],
            ),
            describe: |n| {
                format!(
                    "Found {} archived adoption requests with missing references",
                    n
                )
            },
        },
        IntegrityCheck {
            subject: "adoption archive integrity",
            sql: orphan_any_count_sql(
                EntityKind::Adoption.archive_table(),
                &[
                    ("pet_id", spec(EntityKind::Pet)),
                    ("adopter_id", spec(EntityKind::Adopter)),
                ],
            ),
            describe: |n| format!("Found {} archived adoptions with missing references", n),
        },
    ]
}

/// PostgreSQL implementation of ArchiveReportRepository.
#[derive(Debug, Clone)]
pub struct PgArchiveReportRepository {
    pool: Pool<Postgres>,
}

impl PgArchiveReportRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn count_archived(&self, kind: EntityKind) -> Result<i64> {
        sqlx::query_scalar(&spec(kind).count_archived_sql())
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)
    }

    async fn summarize(&self, kind: EntityKind) -> Result<ArchiveSummary> {
        let row = sqlx::query(&spec(kind).summary_sql())
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(ArchiveSummary {
            kind,
            count: row.try_get("count").map_err(Error::Database)?,
            oldest: row
                .try_get::<Option<DateTime<Utc>>, _>("oldest")
                .map_err(Error::Database)?,
            newest: row
                .try_get::<Option<DateTime<Utc>>, _>("newest")
                .map_err(Error::Database)?,
        })
    }

    async fn run_check(&self, check: &IntegrityCheck) -> Option<String> {
        match sqlx::query_scalar::<_, i64>(&check.sql)
            .fetch_one(&self.pool)
            .await
        {
            Ok(0) => None,
            Ok(n) => {
                warn!(
                    subsystem = "db",
                    component = "reports",
                    op = "integrity",
                    check = check.subject,
                    result_count = n,
                    "Archive integrity issue found"
                );
                Some((check.describe)(n))
            }
            Err(e) => {
                error!(
                    subsystem = "db",
                    component = "reports",
                    op = "integrity",
                    check = check.subject,
                    error = %e,
                    "Archive integrity check failed"
                );
                Some(format!("Error checking {}: {}", check.subject, e))
            }
        }
    }
}

#[async_trait]
impl ArchiveReportRepository for PgArchiveReportRepository {
    async fn archive_statistics(&self) -> ArchiveStatistics {
        let mut stats = ArchiveStatistics::default();
        for kind in EntityKind::ALL {
            let count = match self.count_archived(kind).await {
                Ok(count) => count,
                Err(e) => {
                    error!(
                        subsystem = "db",
                        component = "reports",
                        op = "statistics",
                        db_table = kind.archive_table(),
                        error = %e,
                        "Failed to count archive table"
                    );
                    0
                }
            };
            stats.counts.insert(kind, count);
        }
        debug!(
            subsystem = "db",
            component = "reports",
            op = "statistics",
            total = stats.total(),
            "Computed archive statistics"
        );
        stats
    }

    async fn archive_summary(&self) -> Vec<ArchiveSummary> {
        let mut rows = Vec::with_capacity(SUMMARY_ORDER.len());
        for kind in SUMMARY_ORDER {
            match self.summarize(kind).await {
                Ok(summary) => rows.push(summary),
                Err(e) => {
                    error!(
                        subsystem = "db",
                        component = "reports",
                        op = "summary",
                        db_table = kind.archive_table(),
                        error = %e,
                        "Failed to summarize archive table"
                    );
                    rows.push(ArchiveSummary::empty(kind));
                }
            }
        }
        rows
    }

    async fn validate_archive_integrity(&self) -> Vec<String> {
        let mut issues = Vec::new();
        for check in integrity_checks() {
            if let Some(issue) = self.run_check(&check).await {
                issues.push(issue);
            }
        }
        issues
    }
}
