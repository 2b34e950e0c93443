//! In-place archive flags on live rows.
//!
//! Flagging sets `archived`/`archived_date` on the live row and nothing else:
//! the row stays in its live table and no audit entry is written. This is a
//! separate mechanism from the archive-table move in [`crate::archive`].

use sqlx::{Pool, Postgres, Transaction};
use tracing::{debug, info};

use furever_core::{EntityKind, Error, Result};

/// PostgreSQL in-place flag operations.
#[derive(Debug, Clone)]
pub struct PgSoftFlagRepository {
    pool: Pool<Postgres>,
}

impl PgSoftFlagRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Flag a live, unflagged pet. False when no such pet exists.
    pub async fn flag_pet_archived(&self, pet_id: i32) -> Result<bool> {
        let changed = sqlx::query(
            "UPDATE tbl_pet SET archived = TRUE, archived_date = NOW() \
             WHERE pet_id = $1 AND archived = FALSE",
        )
        .bind(pet_id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?
        .rows_affected();

        info!(
            subsystem = "db",
            component = "soft_flags",
            op = "flag_pet",
            record_id = pet_id,
            success = changed > 0,
            "Pet archive flag set"
        );
        Ok(changed > 0)
    }

    /// Clear the flag on a flagged pet. False when the pet is not flagged.
    pub async fn unflag_pet_archived(&self, pet_id: i32) -> Result<bool> {
        let changed = sqlx::query(
            "UPDATE tbl_pet SET archived = FALSE, archived_date = NULL \
             WHERE pet_id = $1 AND archived = TRUE",
        )
        .bind(pet_id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?
        .rows_affected();

        info!(
            subsystem = "db",
            component = "soft_flags",
            op = "unflag_pet",
            record_id = pet_id,
            success = changed > 0,
            "Pet archive flag cleared"
        );
        Ok(changed > 0)
    }
}

/// Flag every profile row of `kind` linked to `username`.
///
/// Only profile kinds carry a username link; other kinds are rejected.
pub async fn flag_profile_tx(
    tx: &mut Transaction<'_, Postgres>,
    kind: EntityKind,
    username: &str,
) -> Result<u64> {
    let sql = match kind {
        EntityKind::Adopter => {
            "UPDATE tbl_adopter SET archived = TRUE, archived_date = NOW() WHERE username = $1"
        }
        EntityKind::PetOwner => {
            "UPDATE tbl_pet_owner SET archived = TRUE, archived_date = NOW() WHERE username = $1"
        }
        other => {
            return Err(Error::InvalidInput(format!(
                "{} has no username-linked profile",
                other
            )))
        }
    };

    let flagged = sqlx::query(sql)
        .bind(username)
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?
        .rows_affected();

    debug!(
        subsystem = "db",
        component = "soft_flags",
        op = "flag_profile",
        db_table = kind.storage_id(),
        result_count = flagged,
        "Profile archive flag set"
    );
    Ok(flagged)
}
