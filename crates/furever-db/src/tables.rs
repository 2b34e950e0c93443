//! Per-entity table descriptors and the SQL they generate.
//!
//! Table and column names come only from the static descriptors below, never
//! from caller input, so the `format!`-built statements are safe to prepare.

use furever_core::EntityKind;

/// Static description of one archivable entity's storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSpec {
    pub kind: EntityKind,
    pub live: &'static str,
    pub archive: &'static str,
    /// Primary key column, preserved across moves.
    pub key: &'static str,
    /// Business columns shared by the live and archive tables, key excluded.
    pub columns: &'static [&'static str],
    /// SQL expression yielding a short display label for listings.
    pub label: &'static str,
}

const USERS: TableSpec = TableSpec {
    kind: EntityKind::User,
    live: "users",
    archive: "users_archive",
    key: "id",
    columns: &["username", "email", "password", "role", "created_at"],
    label: "username",
};

const ADOPTERS: TableSpec = TableSpec {
    kind: EntityKind::Adopter,
    live: "tbl_adopter",
    archive: "tbl_adopter_archive",
    key: "adopter_id",
    columns: &[
        "username",
        "adopter_name",
        "adopter_contact",
        "adopter_email",
        "adopter_address",
        "adopter_profile",
        "adopter_username",
        "adopter_password",
    ],
    label: "adopter_name",
};

const PET_OWNERS: TableSpec = TableSpec {
    kind: EntityKind::PetOwner,
    live: "tbl_pet_owner",
    archive: "tbl_pet_owner_archive",
    key: "pet_owner_id",
    columns: &[
        "pet_owner_name",
        "pet_owner_contact",
        "pet_owner_email",
        "pet_owner_address",
        "pet_owner_profile",
        "pet_owner_username",
        "pet_owner_password",
        "username",
    ],
    label: "pet_owner_name",
};

const PETS: TableSpec = TableSpec {
    kind: EntityKind::Pet,
    live: "tbl_pet",
    archive: "tbl_pet_archive",
    key: "pet_id",
    columns: &[
        "pet_owner_id",
        "pet_name",
        "pet_type_id",
        "description",
        "age",
        "gender",
        "health_status",
        "upload_health_history",
        "vaccination_status",
        "proof_of_vaccination",
        "adoption_status",
        "date_registered",
    ],
    label: "pet_name",
};

const ADOPTION_REQUESTS: TableSpec = TableSpec {
    kind: EntityKind::AdoptionRequest,
    live: "tbl_adoption_request",
    archive: "tbl_adoption_request_archive",
    key: "adoption_request_id",
    columns: &[
        "pet_id",
        "adopter_id",
        "status",
        "request_date",
        "approval_date",
        "remarks",
    ],
    label: "'pet ' || pet_id || ' / adopter ' || adopter_id || ' (' || status || ')'",
};

const ADOPTIONS: TableSpec = TableSpec {
    kind: EntityKind::Adoption,
    live: "tbl_adoption",
    archive: "tbl_adoption_archive",
    key: "adoption_id",
    columns: &["pet_id", "adopter_id", "adoption_date", "remarks"],
    label: "'pet ' || pet_id || ' / adopter ' || adopter_id",
};

/// Descriptor for an entity kind.
pub fn spec(kind: EntityKind) -> &'static TableSpec {
    match kind {
        EntityKind::User => &USERS,
        EntityKind::Adopter => &ADOPTERS,
        EntityKind::PetOwner => &PET_OWNERS,
        EntityKind::Pet => &PETS,
        EntityKind::AdoptionRequest => &ADOPTION_REQUESTS,
        EntityKind::Adoption => &ADOPTIONS,
    }
}

impl TableSpec {
    /// Key followed by business columns, comma separated.
    fn column_list(&self) -> String {
        std::iter::once(self.key)
            .chain(self.columns.iter().copied())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Move one live row into the archive table.
    ///
    /// Binds: `$1` id, `$2` actor, `$3` reason. Affects one row or none.
    pub fn archive_move_sql(&self) -> String {
        let cols = self.column_list();
        format!(
            "WITH moved AS (DELETE FROM {live} WHERE {key} = $1 RETURNING {cols}) \
             INSERT INTO {archive} ({cols}, archived, archived_date, archived_by_user_id, archive_reason) \
             SELECT {cols}, TRUE, NOW(), $2::INT, $3::TEXT FROM moved",
            live = self.live,
            archive = self.archive,
            key = self.key,
            cols = cols,
        )
    }

    /// Move one archived row back into the live table with the soft flag cleared.
    ///
    /// Binds: `$1` id. Affects one row or none.
    pub fn restore_move_sql(&self) -> String {
        let cols = self.column_list();
        format!(
            "WITH moved AS (DELETE FROM {archive} WHERE {key} = $1 RETURNING {cols}) \
             INSERT INTO {live} ({cols}, archived, archived_date) \
             SELECT {cols}, FALSE, NULL FROM moved",
            live = self.live,
            archive = self.archive,
            key = self.key,
            cols = cols,
        )
    }

    /// Remove one archived row. Binds: `$1` id.
    pub fn purge_sql(&self) -> String {
        format!("DELETE FROM {} WHERE {} = $1", self.archive, self.key)
    }

    pub fn exists_live_sql(&self) -> String {
        format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = $1)",
            self.live, self.key
        )
    }

    pub fn exists_archived_sql(&self) -> String {
        format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = $1)",
            self.archive, self.key
        )
    }

    /// Untyped listing of archived rows. Binds: `$1` limit.
    pub fn list_archived_sql(&self) -> String {
        format!(
            "SELECT {key} AS record_id, ({label})::TEXT AS label, archived_date, \
             archived_by_user_id, archive_reason \
             FROM {archive} ORDER BY archived_date DESC NULLS LAST, {key} DESC LIMIT $1",
            key = self.key,
            label = self.label,
            archive = self.archive,
        )
    }

    /// Full archived rows for typed reads. Binds: `$1` limit.
    pub fn select_archived_sql(&self) -> String {
        format!(
            "SELECT * FROM {archive} ORDER BY archived_date DESC NULLS LAST, {key} DESC LIMIT $1",
            archive = self.archive,
            key = self.key,
        )
    }

    /// One live row by key. Binds: `$1` id.
    pub fn select_live_by_id_sql(&self) -> String {
        format!("SELECT * FROM {} WHERE {} = $1", self.live, self.key)
    }

    /// One archived row by key. Binds: `$1` id.
    pub fn select_archived_by_id_sql(&self) -> String {
        format!("SELECT * FROM {} WHERE {} = $1", self.archive, self.key)
    }

    pub fn count_archived_sql(&self) -> String {
        format!("SELECT COUNT(*) FROM {}", self.archive)
    }

    /// Count with oldest and newest archive dates.
    pub fn summary_sql(&self) -> String {
        format!(
            "SELECT COUNT(*) AS count, MIN(archived_date) AS oldest, MAX(archived_date) AS newest FROM {}",
            self.archive
        )
    }
}

/// Insert one audit entry and return it.
pub const LOG_INSERT_SQL: &str = "INSERT INTO tbl_archive_log \
     (table_name, record_id, operation, performed_by_user_id, reason) \
     VALUES ($1, $2, $3, $4, $5) \
     RETURNING log_id, table_name, record_id, operation, performed_by_user_id, operation_date, reason";

/// Active pets owned by a pet owner. Soft-flagged pets do not count.
pub const ACTIVE_PET_COUNT_SQL: &str =
    "SELECT COUNT(*) FROM tbl_pet WHERE pet_owner_id = $1 AND archived = FALSE";

/// Lock a live pet owner against concurrent pet restores.
pub const PET_OWNER_LOCK_SQL: &str =
    "SELECT pet_owner_id FROM tbl_pet_owner WHERE pet_owner_id = $1 FOR UPDATE";

/// Owner referenced by an archived pet.
pub const ARCHIVED_PET_OWNER_SQL: &str =
    "SELECT pet_owner_id FROM tbl_pet_archive WHERE pet_id = $1";

/// Hold a live pet owner for the duration of a pet restore.
pub const PET_OWNER_SHARE_SQL: &str =
    "SELECT pet_owner_id FROM tbl_pet_owner WHERE pet_owner_id = $1 FOR SHARE";

/// Count rows in `archive` whose `fk` matches neither the live nor the
/// archived form of `target`.
pub fn orphan_count_sql(archive: &str, fk: &str, target: &TableSpec) -> String {
    format!(
        "SELECT COUNT(*) FROM {archive} a \
         WHERE NOT EXISTS (SELECT 1 FROM {live} t WHERE t.{key} = a.{fk}) \
         AND NOT EXISTS (SELECT 1 FROM {target_archive} t WHERE t.{key} = a.{fk})",
        archive = archive,
        live = target.live,
        target_archive = target.archive,
        key = target.key,
        fk = fk,
    )
}

/// Count rows in `archive` with a dangling reference on any of `refs`.
pub fn orphan_any_count_sql(archive: &str, refs: &[(&str, &TableSpec)]) -> String {
    let clauses = refs
        .iter()
        .map(|(fk, target)| {
            format!(
                "(NOT EXISTS (SELECT 1 FROM {live} t WHERE t.{key} = a.{fk}) \
                 AND NOT EXISTS (SELECT 1 FROM {target_archive} t WHERE t.{key} = a.{fk}))",
                live = target.live,
                target_archive = target.archive,
                key = target.key,
                fk = fk,
            )
        })
        .collect::<Vec<_>>()
        .join(" OR ");
    format!("SELECT COUNT(*) FROM {} a WHERE {}", archive, clauses)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_matches_entity_kind_tables() {
        for kind in EntityKind::ALL {
            let s = spec(kind);
            assert_eq!(s.kind, kind);
            assert_eq!(s.live, kind.live_table());
            assert_eq!(s.archive, kind.archive_table());
            assert!(!s.columns.contains(&s.key));
            assert!(!s.columns.contains(&"archived"));
        }
    }

    #[test]
    fn test_archive_move_sql_for_pet() {
        let sql = spec(EntityKind::Pet).archive_move_sql();
        assert!(sql.starts_with("WITH moved AS (DELETE FROM tbl_pet WHERE pet_id = $1 RETURNING pet_id, pet_owner_id"));
        assert!(sql.contains("INSERT INTO tbl_pet_archive (pet_id, pet_owner_id"));
        assert!(sql.contains("archived, archived_date, archived_by_user_id, archive_reason)"));
        assert!(sql.ends_with("TRUE, NOW(), $2::INT, $3::TEXT FROM moved"));
    }

    #[test]
    fn test_restore_move_sql_clears_flag() {
        let sql = spec(EntityKind::AdoptionRequest).restore_move_sql();
        assert!(sql.contains("DELETE FROM tbl_adoption_request_archive WHERE adoption_request_id = $1"));
        assert!(sql.contains("INSERT INTO tbl_adoption_request (adoption_request_id, pet_id"));
        assert!(sql.ends_with("FALSE, NULL FROM moved"));
    }

    #[test]
    fn test_purge_sql_never_touches_live_table() {
        let sql = spec(EntityKind::User).purge_sql();
        assert_eq!(sql, "DELETE FROM users_archive WHERE id = $1");
    }

    #[test]
    fn test_column_list_counts() {
        assert_eq!(spec(EntityKind::Adoption).column_list().split(", ").count(), 5);
        assert_eq!(spec(EntityKind::Pet).column_list().split(", ").count(), 13);
    }

    #[test]
    fn test_orphan_count_sql_checks_both_forms() {
        let sql = orphan_count_sql("tbl_pet_archive", "pet_owner_id", spec(EntityKind::PetOwner));
        assert!(sql.contains("FROM tbl_pet_owner t WHERE t.pet_owner_id = a.pet_owner_id"));
        assert!(sql.contains("FROM tbl_pet_owner_archive t WHERE t.pet_owner_id = a.pet_owner_id"));
    }

    #[test]
    fn test_orphan_any_count_sql_joins_with_or() {
        let sql = orphan_any_count_sql(
            "tbl_adoption_request_archive",
            &[
                ("pet_id", spec(EntityKind::Pet)),
                ("adopter_id", spec(EntityKind::Adopter)),
            ],
        );
        assert!(sql.starts_with("SELECT COUNT(*) FROM tbl_adoption_request_archive a WHERE"));
        assert_eq!(sql.matches(" OR ").count(), 1);
        assert!(sql.contains("tbl_adopter_archive"));
    }
}
