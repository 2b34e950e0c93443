//! User updates with role-linked profile reconciliation, and user deletion.

use std::time::Instant;

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Transaction};
use tracing::{debug, error, info, warn};

use furever_core::defaults::{PROFILE_DEFAULT_ADDRESS, PROFILE_DEFAULT_CONTACT, USER_DELETE_REASON};
use furever_core::{
    ArchiveEvent, ArchiveEventBus, ArchiveRepository, EntityKind, Error, ProfilePlan, Result,
    RoleTransition, TransitionOutcome, User, UserProfileRepository, UserUpdate,
};

use crate::archive::PgArchiveRepository;
use crate::soft_flags::flag_profile_tx;

/// PostgreSQL implementation of UserProfileRepository.
#[derive(Debug, Clone)]
pub struct PgUserProfileRepository {
    pool: Pool<Postgres>,
    archives: PgArchiveRepository,
    events: Option<ArchiveEventBus>,
}

impl PgUserProfileRepository {
    pub fn new(pool: Pool<Postgres>, archives: PgArchiveRepository) -> Self {
        Self {
            pool,
            archives,
            events: None,
        }
    }

    pub fn with_events(mut self, events: ArchiveEventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Fetch a live user.
    pub async fn get_user(&self, id: i32) -> Result<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)
    }

    async fn apply_update(&self, update: &UserUpdate) -> Result<(User, ProfilePlan)> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let current = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 FOR UPDATE")
            .bind(update.id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(Error::Database)?
            .ok_or_else(|| Error::NotFound(format!("user {}", update.id)))?;
        let from = current.role()?;

        sqlx::query("UPDATE users SET username = $1, email = $2, password = $3, role = $4 WHERE id = $5")
            .bind(&update.username)
            .bind(&update.email)
            .bind(&update.password)
            .bind(update.role.as_str())
            .bind(update.id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        let plan = ProfilePlan::for_roles(from, update.role);
        if plan.is_empty() {
            debug!(
                subsystem = "db",
                component = "profiles",
                record_id = update.id,
                "No linked profile to update"
            );
        } else {
            if let Some(kind) = plan.flag_old {
                flag_profile_tx(&mut tx, kind, &current.username).await?;
            }
            if let Some(kind) = plan.create_new {
                create_profile_tx(&mut tx, kind, update).await?;
            }
            if let Some(kind) = plan.sync {
                sync_profile_tx(&mut tx, kind, &current.username, update).await?;
            }
        }

        tx.commit().await.map_err(Error::Database)?;
        Ok((current, plan))
    }
}

/// Insert a fresh profile for a user entering a profile-bearing role.
async fn create_profile_tx(
    tx: &mut Transaction<'_, Postgres>,
    kind: EntityKind,
    update: &UserUpdate,
) -> Result<()> {
    let sql = match kind {
        EntityKind::Adopter => {
            "INSERT INTO tbl_adopter (username, adopter_name, adopter_contact, adopter_email, \
             adopter_address, adopter_username, adopter_password) \
             VALUES ($1, $1, $2, $3, $4, $1, $5)"
        }
        EntityKind::PetOwner => {
            "INSERT INTO tbl_pet_owner (username, pet_owner_name, pet_owner_contact, pet_owner_email, \
             pet_owner_address, pet_owner_username, pet_owner_password) \
             VALUES ($1, $1, $2, $3, $4, $1, $5)"
        }
        other => {
            return Err(Error::InvalidInput(format!(
                "{} is not a profile entity",
                other
            )))
        }
    };

    sqlx::query(sql)
        .bind(&update.username)
        .bind(PROFILE_DEFAULT_CONTACT)
        .bind(&update.email)
        .bind(PROFILE_DEFAULT_ADDRESS)
        .bind(&update.password)
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;
    Ok(())
}

/// Copy email and username into the live, unflagged profile.
async fn sync_profile_tx(
    tx: &mut Transaction<'_, Postgres>,
    kind: EntityKind,
    old_username: &str,
    update: &UserUpdate,
) -> Result<()> {
    let sql = match kind {
        EntityKind::Adopter => {
            "UPDATE tbl_adopter SET adopter_email = $1, username = $2 \
             WHERE username = $3 AND archived = FALSE"
        }
        EntityKind::PetOwner => {
            "UPDATE tbl_pet_owner SET pet_owner_email = $1, username = $2 \
             WHERE username = $3 AND archived = FALSE"
        }
        other => {
            return Err(Error::InvalidInput(format!(
                "{} is not a profile entity",
                other
            )))
        }
    };

    sqlx::query(sql)
        .bind(&update.email)
        .bind(&update.username)
        .bind(old_username)
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;
    Ok(())
}

#[async_trait]
impl UserProfileRepository for PgUserProfileRepository {
    async fn update_user(&self, update: &UserUpdate) -> Result<RoleTransition> {
        let start = Instant::now();
        match self.apply_update(update).await {
            Ok((previous, plan)) => {
                let from = previous.role()?;
                let transition = RoleTransition::from_plan(from, update.role, plan);
                info!(
                    subsystem = "db",
                    component = "profiles",
                    op = "update_user",
                    record_id = update.id,
                    from_role = from.as_str(),
                    to_role = update.role.as_str(),
                    success = true,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "User updated"
                );
                if let (Some(events), Some(kind)) = (&self.events, plan.flag_old) {
                    events.emit(ArchiveEvent::ProfileFlagged {
                        kind,
                        username: previous.username,
                    });
                }
                Ok(transition)
            }
            Err(e) => {
                if e.is_storage() {
                    error!(
                        subsystem = "db",
                        component = "profiles",
                        op = "update_user",
                        record_id = update.id,
                        success = false,
                        error = %e,
                        "User update rolled back"
                    );
                } else {
                    warn!(
                        subsystem = "db",
                        component = "profiles",
                        op = "update_user",
                        record_id = update.id,
                        success = false,
                        error = %e,
                        "User update rejected"
                    );
                }
                Err(e)
            }
        }
    }

    async fn delete_user(&self, id: i32) -> TransitionOutcome {
        self.archives
            .archive(EntityKind::User, id, None, USER_DELETE_REASON)
            .await
    }
}
