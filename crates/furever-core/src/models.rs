//! Domain models for the archive subsystem.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::FromRow;

use crate::error::{Error, Result};

// =============================================================================
// ENTITY CATALOGUE
// =============================================================================

/// Closed set of archivable entity types.
///
/// Each kind maps to a live table and a shadow archive table. The live table
/// name doubles as the storage identifier written to the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    User,
    Adopter,
    PetOwner,
    Pet,
    AdoptionRequest,
    Adoption,
}

impl EntityKind {
    /// Every archivable kind, in statistics order.
    pub const ALL: [EntityKind; 6] = [
        EntityKind::Adopter,
        EntityKind::PetOwner,
        EntityKind::Pet,
        EntityKind::AdoptionRequest,
        EntityKind::Adoption,
        EntityKind::User,
    ];

    /// Canonical snake_case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::User => "user",
            EntityKind::Adopter => "adopter",
            EntityKind::PetOwner => "pet_owner",
            EntityKind::Pet => "pet",
            EntityKind::AdoptionRequest => "adoption_request",
            EntityKind::Adoption => "adoption",
        }
    }

    /// Live table holding active rows.
    pub fn live_table(&self) -> &'static str {
        match self {
            EntityKind::User => "users",
            EntityKind::Adopter => "tbl_adopter",
            EntityKind::PetOwner => "tbl_pet_owner",
            EntityKind::Pet => "tbl_pet",
            EntityKind::AdoptionRequest => "tbl_adoption_request",
            EntityKind::Adoption => "tbl_adoption",
        }
    }

    /// Shadow table holding archived rows.
    pub fn archive_table(&self) -> &'static str {
        match self {
            EntityKind::User => "users_archive",
            EntityKind::Adopter => "tbl_adopter_archive",
            EntityKind::PetOwner => "tbl_pet_owner_archive",
            EntityKind::Pet => "tbl_pet_archive",
            EntityKind::AdoptionRequest => "tbl_adoption_request_archive",
            EntityKind::Adoption => "tbl_adoption_archive",
        }
    }

    /// Identifier stored in `tbl_archive_log.table_name`.
    pub fn storage_id(&self) -> &'static str {
        self.live_table()
    }

    /// Resolve a kind from an audit log `table_name`.
    pub fn from_storage_id(table: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.storage_id() == table)
    }

    /// Human-readable plural label used by summaries.
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::User => "Users",
            EntityKind::Adopter => "Adopters",
            EntityKind::PetOwner => "Pet Owners",
            EntityKind::Pet => "Pets",
            EntityKind::AdoptionRequest => "Adoption Requests",
            EntityKind::Adoption => "Adoptions",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = Error;

    /// Accepts snake_case, kebab-case, and live or archive table names.
    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        let normalized = normalized.trim_end_matches("_archive");
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == normalized || k.live_table() == normalized)
            .or(match normalized {
                "users" => Some(EntityKind::User),
                "request" | "requests" => Some(EntityKind::AdoptionRequest),
                "owner" | "pet_owners" => Some(EntityKind::PetOwner),
                "pets" => Some(EntityKind::Pet),
                "adopters" => Some(EntityKind::Adopter),
                "adoptions" => Some(EntityKind::Adoption),
                _ => None,
            })
            .ok_or_else(|| Error::InvalidInput(format!("unknown entity type '{}'", s)))
    }
}

/// Kind of state transition recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArchiveOperation {
    Archive,
    Restore,
    PermanentDelete,
}

impl ArchiveOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArchiveOperation::Archive => "ARCHIVE",
            ArchiveOperation::Restore => "RESTORE",
            ArchiveOperation::PermanentDelete => "PERMANENT_DELETE",
        }
    }
}

impl fmt::Display for ArchiveOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArchiveOperation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ARCHIVE" => Ok(ArchiveOperation::Archive),
            "RESTORE" => Ok(ArchiveOperation::Restore),
            "PERMANENT_DELETE" => Ok(ArchiveOperation::PermanentDelete),
            other => Err(Error::InvalidInput(format!(
                "unknown archive operation '{}'",
                other
            ))),
        }
    }
}

// =============================================================================
// USERS AND ROLES
// =============================================================================

/// User role. Adopter and pet-owner roles own a linked profile row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Adopter,
    PetOwner,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Adopter => "adopter",
            Role::PetOwner => "pet_owner",
        }
    }

    /// Profile entity linked to this role, if any.
    pub fn profile_kind(&self) -> Option<EntityKind> {
        match self {
            Role::Admin => None,
            Role::Adopter => Some(EntityKind::Adopter),
            Role::PetOwner => Some(EntityKind::PetOwner),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "admin" => Ok(Role::Admin),
            "adopter" => Ok(Role::Adopter),
            "pet_owner" => Ok(Role::PetOwner),
            other => Err(Error::InvalidInput(format!("unknown role '{}'", other))),
        }
    }
}

/// Live user row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: Option<String>,
    pub password: String,
    pub role: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    /// Parsed role.
    pub fn role(&self) -> Result<Role> {
        self.role.parse()
    }
}

/// Adopter profile, linked to a user by `username`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Adopter {
    pub adopter_id: i32,
    pub username: Option<String>,
    pub adopter_name: String,
    pub adopter_contact: Option<String>,
    pub adopter_email: Option<String>,
    pub adopter_address: Option<String>,
    pub adopter_profile: Option<String>,
    pub adopter_username: Option<String>,
    pub adopter_password: Option<String>,
}

/// Pet owner profile, linked to a user by `username`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PetOwner {
    pub pet_owner_id: i32,
    pub pet_owner_name: String,
    pub pet_owner_contact: Option<String>,
    pub pet_owner_email: Option<String>,
    pub pet_owner_address: Option<String>,
    pub pet_owner_profile: Option<String>,
    pub pet_owner_username: Option<String>,
    pub pet_owner_password: Option<String>,
    pub username: Option<String>,
}

/// Pet row. `archived`/`archived_date` are the in-place soft flag, distinct
/// from a full move to the archive table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Pet {
    pub pet_id: i32,
    pub pet_owner_id: i32,
    pub pet_name: String,
    pub pet_type_id: Option<i32>,
    pub description: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub health_status: Option<String>,
    pub upload_health_history: Option<String>,
    pub vaccination_status: Option<String>,
    pub proof_of_vaccination: Option<String>,
    pub adoption_status: String,
    pub date_registered: Option<NaiveDate>,
    pub archived: bool,
    pub archived_date: Option<DateTime<Utc>>,
}

/// Adoption request row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AdoptionRequest {
    pub adoption_request_id: i32,
    pub pet_id: i32,
    pub adopter_id: i32,
    pub status: String,
    pub request_date: Option<NaiveDate>,
    pub approval_date: Option<NaiveDate>,
    pub remarks: Option<String>,
}

/// Completed adoption row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Adoption {
    pub adoption_id: i32,
    pub pet_id: i32,
    pub adopter_id: i32,
    pub adoption_date: NaiveDate,
    pub remarks: Option<String>,
}

// =============================================================================
// ARCHIVE RECORDS
// =============================================================================

/// Metadata columns carried only by archive tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ArchiveMetadata {
    pub archived: bool,
    pub archived_date: Option<DateTime<Utc>>,
    pub archived_by_user_id: Option<i32>,
    pub archive_reason: Option<String>,
}

/// A typed row read from an archive table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Archived<T> {
    #[serde(flatten)]
    pub record: T,
    #[serde(flatten)]
    pub meta: ArchiveMetadata,
}

impl<'r, T> FromRow<'r, PgRow> for Archived<T>
where
    T: FromRow<'r, PgRow>,
{
    fn from_row(row: &'r PgRow) -> std::result::Result<Self, sqlx::Error> {
        Ok(Self {
            record: T::from_row(row)?,
            meta: ArchiveMetadata::from_row(row)?,
        })
    }
}

/// Untyped listing row for any archive table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchivedRecord {
    pub kind: EntityKind,
    pub record_id: i32,
    pub label: Option<String>,
    pub archived_date: Option<DateTime<Utc>>,
    pub archived_by_user_id: Option<i32>,
    pub archive_reason: Option<String>,
}

/// One immutable audit log row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveLogEntry {
    pub log_id: i64,
    pub table_name: String,
    pub record_id: i32,
    pub operation: ArchiveOperation,
    pub performed_by_user_id: Option<i32>,
    pub operation_date: DateTime<Utc>,
    pub reason: Option<String>,
}

impl ArchiveLogEntry {
    /// Entity kind for this entry, if the table name is a known identifier.
    pub fn entity_kind(&self) -> Option<EntityKind> {
        EntityKind::from_storage_id(&self.table_name)
    }
}

/// Result of one archive, restore, or permanent-delete call.
///
/// Only `Completed` means state changed; every other variant guarantees that
/// nothing was written.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TransitionOutcome {
    /// The move committed and was recorded in the audit log.
    Completed(ArchiveLogEntry),
    /// The id was not present in the expected table.
    NotFound,
    /// A business rule rejected the transition.
    Blocked { reason: String },
    /// The store failed; the unit of work was rolled back.
    Failed { error: String },
}

impl TransitionOutcome {
    /// The boolean result exposed to callers.
    pub fn is_success(&self) -> bool {
        matches!(self, TransitionOutcome::Completed(_))
    }

    /// Audit entry written by a completed transition.
    pub fn log_entry(&self) -> Option<&ArchiveLogEntry> {
        match self {
            TransitionOutcome::Completed(entry) => Some(entry),
            _ => None,
        }
    }

    /// Human-readable narration of the outcome.
    pub fn describe(&self) -> String {
        match self {
            TransitionOutcome::Completed(entry) => format!(
                "{} {} #{} recorded as log entry {}",
                entry.operation, entry.table_name, entry.record_id, entry.log_id
            ),
            TransitionOutcome::NotFound => "record not found".to_string(),
            TransitionOutcome::Blocked { reason } => format!("blocked: {}", reason),
            TransitionOutcome::Failed { error } => format!("failed: {}", error),
        }
    }
}

// =============================================================================
// REPORTING
// =============================================================================

/// Row count per archive table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArchiveStatistics {
    pub counts: BTreeMap<EntityKind, i64>,
}

impl ArchiveStatistics {
    /// Count for one kind (zero when absent).
    pub fn get(&self, kind: EntityKind) -> i64 {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    /// Sum of all archive table counts.
    pub fn total(&self) -> i64 {
        self.counts.values().sum()
    }
}

/// Retention dashboard row for one entity kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArchiveSummary {
    pub kind: EntityKind,
    pub count: i64,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
}

impl ArchiveSummary {
    /// Summary for a table that could not be read or holds no rows.
    pub fn empty(kind: EntityKind) -> Self {
        Self {
            kind,
            count: 0,
            oldest: None,
            newest: None,
        }
    }
}

/// Totals from one retention run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionReport {
    pub requests_archived: u64,
    pub pets_archived: u64,
    pub log_entries_pruned: u64,
}

impl RetentionReport {
    /// Records moved to archive tables by this run.
    pub fn records_archived(&self) -> u64 {
        self.requests_archived + self.pets_archived
    }
}
