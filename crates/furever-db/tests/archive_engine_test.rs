//! Archive engine transitions against a migrated PostgreSQL database.
//!
//! Run with `cargo test -p furever-db -- --ignored`.

use std::time::Duration;

use furever_db::test_fixtures::{connect_test_db, Seed};
use furever_db::{
    ArchiveOperation, ArchiveRepository, AuditLogRepository, Database, EntityKind, Pet,
    TransitionOutcome,
};

async fn setup() -> Database {
    dotenvy::dotenv().ok();
    connect_test_db()
        .await
        .expect("Failed to connect to test database")
}

#[tokio::test]
#[ignore = "requires migrated PostgreSQL database"]
async fn test_pet_archive_then_restore_scenario() {
    let db = setup().await;
    let seed = Seed::new(db.pool());
    let owner = seed.pet_owner().await.unwrap();
    let pet = seed.pet(owner, "Available").await.unwrap();

    let outcome = db.archives.archive(EntityKind::Pet, pet, Some(2), "test").await;
    assert!(outcome.is_success(), "{}", outcome.describe());
    let entry = outcome.log_entry().unwrap();
    assert_eq!(entry.table_name, "tbl_pet");
    assert_eq!(entry.record_id, pet);
    assert_eq!(entry.operation, ArchiveOperation::Archive);
    assert_eq!(entry.performed_by_user_id, Some(2));
    assert_eq!(entry.reason.as_deref(), Some("test"));

    assert!(!db.archives.is_live(EntityKind::Pet, pet).await.unwrap());
    let archived = db
        .archives
        .fetch_archived::<Pet>(EntityKind::Pet, pet)
        .await
        .unwrap()
        .expect("archived row");
    assert!(archived.meta.archived);
    assert_eq!(archived.meta.archived_by_user_id, Some(2));
    assert_eq!(archived.meta.archive_reason.as_deref(), Some("test"));
    assert!(archived.meta.archived_date.is_some());
    assert_eq!(seed.log_count("tbl_pet", pet).await.unwrap(), 1);

    let outcome = db.archives.restore(EntityKind::Pet, pet, Some(2), "undo").await;
    assert!(outcome.is_success(), "{}", outcome.describe());
    assert_eq!(
        outcome.log_entry().unwrap().operation,
        ArchiveOperation::Restore
    );

    let live = db
        .archives
        .fetch_live::<Pet>(EntityKind::Pet, pet)
        .await
        .unwrap()
        .expect("live row");
    assert!(!live.archived);
    assert!(live.archived_date.is_none());
    assert!(!db.archives.is_archived(EntityKind::Pet, pet).await.unwrap());
    assert_eq!(seed.log_count("tbl_pet", pet).await.unwrap(), 2);

    let history = db.audit.history(EntityKind::Pet, pet).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].operation, ArchiveOperation::Archive);
    assert_eq!(history[1].operation, ArchiveOperation::Restore);
}

#[tokio::test]
#[ignore = "requires migrated PostgreSQL database"]
async fn test_round_trip_preserves_row() {
    let db = setup().await;
    let seed = Seed::new(db.pool());
    let owner = seed.pet_owner().await.unwrap();
    let pet = seed.pet(owner, "Available").await.unwrap();

    let before = db
        .archives
        .fetch_live::<Pet>(EntityKind::Pet, pet)
        .await
        .unwrap()
        .unwrap();

    assert!(db.archives.archive(EntityKind::Pet, pet, None, "").await.is_success());
    assert!(db.archives.restore(EntityKind::Pet, pet, None, "").await.is_success());

    let after = db
        .archives
        .fetch_live::<Pet>(EntityKind::Pet, pet)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
#[ignore = "requires migrated PostgreSQL database"]
async fn test_restore_of_live_record_fails_without_side_effects() {
    let db = setup().await;
    let seed = Seed::new(db.pool());
    let owner = seed.pet_owner().await.unwrap();
    let pet = seed.pet(owner, "Available").await.unwrap();

    let outcome = db.archives.restore(EntityKind::Pet, pet, Some(1), "nope").await;
    assert_eq!(outcome, TransitionOutcome::NotFound);
    assert!(!outcome.is_success());
    assert!(db.archives.is_live(EntityKind::Pet, pet).await.unwrap());
    assert!(!db.archives.is_archived(EntityKind::Pet, pet).await.unwrap());
    assert_eq!(seed.log_count("tbl_pet", pet).await.unwrap(), 0);
}

#[tokio::test]
#[ignore = "requires migrated PostgreSQL database"]
async fn test_archive_missing_record_writes_nothing() {
    let db = setup().await;

    let outcome = db
        .archives
        .archive(EntityKind::AdoptionRequest, -42, None, "ghost")
        .await;
    assert_eq!(outcome, TransitionOutcome::NotFound);
    assert_eq!(
        Seed::new(db.pool())
            .log_count("tbl_adoption_request", -42)
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
#[ignore = "requires migrated PostgreSQL database"]
async fn test_pet_owner_guard_blocks_until_pets_archived() {
    let db = setup().await;
    let seed = Seed::new(db.pool());
    let owner = seed.pet_owner().await.unwrap();
    let pet = seed.pet(owner, "Available").await.unwrap();

    let outcome = db
        .archives
        .archive(EntityKind::PetOwner, owner, Some(1), "closing account")
        .await;
    assert!(matches!(outcome, TransitionOutcome::Blocked { .. }));
    assert!(db.archives.is_live(EntityKind::PetOwner, owner).await.unwrap());
    assert_eq!(seed.log_count("tbl_pet_owner", owner).await.unwrap(), 0);

    assert!(db.archives.archive(EntityKind::Pet, pet, Some(1), "").await.is_success());

    let outcome = db
        .archives
        .archive(EntityKind::PetOwner, owner, Some(1), "closing account")
        .await;
    assert!(outcome.is_success(), "{}", outcome.describe());
    assert!(db.archives.is_archived(EntityKind::PetOwner, owner).await.unwrap());
    assert_eq!(seed.log_count("tbl_pet_owner", owner).await.unwrap(), 1);
}

#[tokio::test]
#[ignore = "requires migrated PostgreSQL database"]
async fn test_pet_restore_waits_for_owner_archive() {
    let db = setup().await;
    let seed = Seed::new(db.pool());
    let owner = seed.pet_owner().await.unwrap();
    let pet = seed.pet(owner, "Available").await.unwrap();
    assert!(db.archives.archive(EntityKind::Pet, pet, Some(1), "").await.is_success());

    let mut tx = db.pool().begin().await.unwrap();
    db.archives
        .archive_tx(&mut tx, EntityKind::PetOwner, owner, Some(1), "closing account")
        .await
        .unwrap();

    let archives = db.archives.clone();
    let restore = tokio::spawn(async move {
        archives.restore(EntityKind::Pet, pet, Some(1), "undo").await
    });
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!restore.is_finished(), "restore must wait on the owner row");

    tx.commit().await.unwrap();
    let outcome = restore.await.unwrap();
    assert!(
        matches!(outcome, TransitionOutcome::Blocked { .. }),
        "{}",
        outcome.describe()
    );

    assert!(db.archives.is_archived(EntityKind::PetOwner, owner).await.unwrap());
    assert!(db.archives.is_archived(EntityKind::Pet, pet).await.unwrap());
    assert!(!db.archives.is_live(EntityKind::Pet, pet).await.unwrap());
    assert_eq!(seed.log_count("tbl_pet", pet).await.unwrap(), 1);
}

#[tokio::test]
#[ignore = "requires migrated PostgreSQL database"]
async fn test_pet_restore_blocked_under_archived_owner() {
    let db = setup().await;
    let seed = Seed::new(db.pool());
    let owner = seed.pet_owner().await.unwrap();
    let pet = seed.pet(owner, "Available").await.unwrap();
    assert!(db.archives.archive(EntityKind::Pet, pet, None, "").await.is_success());
    assert!(db.archives.archive(EntityKind::PetOwner, owner, None, "").await.is_success());

    let outcome = db.archives.restore(EntityKind::Pet, pet, None, "").await;
    assert!(matches!(outcome, TransitionOutcome::Blocked { .. }));
    assert!(db.archives.is_archived(EntityKind::Pet, pet).await.unwrap());

    assert!(db.archives.restore(EntityKind::PetOwner, owner, None, "").await.is_success());
    assert!(db.archives.restore(EntityKind::Pet, pet, None, "").await.is_success());
    assert!(db.archives.is_live(EntityKind::Pet, pet).await.unwrap());
}

#[tokio::test]
#[ignore = "requires migrated PostgreSQL database"]
async fn test_soft_flagged_pets_do_not_block_owner() {
    let db = setup().await;
    let seed = Seed::new(db.pool());
    let owner = seed.pet_owner().await.unwrap();
    let pet = seed.pet(owner, "Available").await.unwrap();

    assert!(db.flags.flag_pet_archived(pet).await.unwrap());
    assert!(!db.flags.flag_pet_archived(pet).await.unwrap());
    assert!(db.archives.is_live(EntityKind::Pet, pet).await.unwrap());
    assert_eq!(seed.log_count("tbl_pet", pet).await.unwrap(), 0);

    let outcome = db.archives.archive(EntityKind::PetOwner, owner, None, "").await;
    assert!(outcome.is_success(), "{}", outcome.describe());

    assert!(db.flags.unflag_pet_archived(pet).await.unwrap());
    assert!(!db.flags.unflag_pet_archived(pet).await.unwrap());
}

#[tokio::test]
#[ignore = "requires migrated PostgreSQL database"]
async fn test_permanent_delete_is_final() {
    let db = setup().await;
    let seed = Seed::new(db.pool());
    let adopter = seed.adopter(None).await.unwrap();

    let outcome = db
        .archives
        .permanent_delete(EntityKind::Adopter, adopter, None, "live rows cannot be purged")
        .await;
    assert_eq!(outcome, TransitionOutcome::NotFound);
    assert!(db.archives.is_live(EntityKind::Adopter, adopter).await.unwrap());

    assert!(db.archives.archive(EntityKind::Adopter, adopter, Some(1), "").await.is_success());
    let outcome = db
        .archives
        .permanent_delete(EntityKind::Adopter, adopter, Some(1), "gdpr")
        .await;
    assert_eq!(
        outcome.log_entry().map(|e| e.operation),
        Some(ArchiveOperation::PermanentDelete)
    );

    assert!(!db.archives.is_live(EntityKind::Adopter, adopter).await.unwrap());
    assert!(!db.archives.is_archived(EntityKind::Adopter, adopter).await.unwrap());
    let outcome = db.archives.restore(EntityKind::Adopter, adopter, Some(1), "").await;
    assert_eq!(outcome, TransitionOutcome::NotFound);
    assert_eq!(seed.log_count("tbl_adopter", adopter).await.unwrap(), 2);
}

#[tokio::test]
#[ignore = "requires migrated PostgreSQL database"]
async fn test_racing_archives_exactly_one_wins() {
    let db = setup().await;
    let seed = Seed::new(db.pool());
    let owner = seed.pet_owner().await.unwrap();
    let pet = seed.pet(owner, "Available").await.unwrap();

    let (a, b) = tokio::join!(
        db.archives.archive(EntityKind::Pet, pet, Some(1), "first"),
        db.archives.archive(EntityKind::Pet, pet, Some(2), "second"),
    );
    assert_eq!(
        [a.is_success(), b.is_success()]
            .iter()
            .filter(|ok| **ok)
            .count(),
        1
    );
    assert!(
        a == TransitionOutcome::NotFound || b == TransitionOutcome::NotFound,
        "loser must observe not-found: {:?} / {:?}",
        a,
        b
    );
    assert_eq!(seed.log_count("tbl_pet", pet).await.unwrap(), 1);
}

#[tokio::test]
#[ignore = "requires migrated PostgreSQL database"]
async fn test_state_exclusivity_over_sequence() {
    let db = setup().await;
    let seed = Seed::new(db.pool());
    let adopter = seed.adopter(None).await.unwrap();
    let owner = seed.pet_owner().await.unwrap();
    let pet = seed.pet(owner, "Available").await.unwrap();
    let request = seed.adoption_request(pet, adopter, "Pending", None).await.unwrap();

    let kind = EntityKind::AdoptionRequest;
    for step in 0..4 {
        let outcome = if step % 2 == 0 {
            db.archives.archive(kind, request, None, "").await
        } else {
            db.archives.restore(kind, request, None, "").await
        };
        assert!(outcome.is_success());
        let live = db.archives.is_live(kind, request).await.unwrap();
        let archived = db.archives.is_archived(kind, request).await.unwrap();
        assert!(live ^ archived);
    }
    assert_eq!(seed.log_count("tbl_adoption_request", request).await.unwrap(), 4);
}

#[tokio::test]
#[ignore = "requires migrated PostgreSQL database"]
async fn test_list_archived_and_recent_operations() {
    let db = setup().await;
    let seed = Seed::new(db.pool());
    let owner = seed.pet_owner().await.unwrap();
    let pet = seed.pet(owner, "Available").await.unwrap();

    assert!(db.archives.archive(EntityKind::Pet, pet, Some(5), "listing").await.is_success());

    let listed = db.archives.list_archived(EntityKind::Pet, 1000).await;
    let record = listed.iter().find(|r| r.record_id == pet).expect("listed");
    assert_eq!(record.kind, EntityKind::Pet);
    assert!(record.label.as_deref().unwrap_or("").starts_with("Pet "));
    assert_eq!(record.archive_reason.as_deref(), Some("listing"));

    let pets = db.archives.list_archived_pets(Some(owner)).await.unwrap();
    assert_eq!(pets.len(), 1);
    assert_eq!(pets[0].record.pet_id, pet);

    let recent = db.audit.recent_operations(50, Some(EntityKind::Pet)).await;
    assert!(recent.iter().all(|e| e.table_name == "tbl_pet"));
    assert!(recent.windows(2).all(|w| w[0].operation_date >= w[1].operation_date));
    assert!(recent.iter().any(|e| e.record_id == pet));
}
