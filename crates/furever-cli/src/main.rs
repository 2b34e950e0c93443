//! furever-archive: operator CLI for the adoption archive subsystem.
//!
//! Environment variables:
//!   DATABASE_URL - PostgreSQL connection string
//!   LOG_FORMAT   - "json" or "text" (default: "text")
//!   LOG_FILE     - path to log file (optional, enables file logging)
//!   LOG_ANSI     - "true"/"false" override ANSI colors
//!   RUST_LOG     - standard env filter
//!
//! Pool, retention, and worker settings are read with their `from_env`
//! constructors (`DB_MAX_CONNECTIONS`, `RETENTION_REQUEST_DAYS`,
//! `RETENTION_WORKER_INTERVAL_SECS`, ...).

mod render;

use std::process::ExitCode;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use furever_core::defaults::{
    ARCHIVED_LIST_LIMIT, AUDIT_LOG_KEEP_DAYS, DATABASE_URL, RECENT_OPERATIONS_LIMIT,
};
use furever_db::{
    ArchiveReportRepository, ArchiveRepository, AuditLogRepository, Database, EntityKind,
    PoolConfig, RetentionPolicy, RetentionReport, RetentionRepository, Role, TransitionOutcome,
    UserProfileRepository, UserUpdate,
};
use furever_db::pool::log_pool_metrics;
use furever_jobs::{RetentionEvent, RetentionWorker, RetentionWorkerConfig};

#[derive(Parser, Debug)]
#[command(name = "furever-archive")]
#[command(author, version, about = "Archive, restore, and retention tooling for the furever adoption database")]
#[command(propagate_version = true)]
struct Cli {
    /// Emit JSON instead of plain text
    #[arg(long, global = true)]
    json: bool,

    /// PostgreSQL connection string
    #[arg(
        long,
        global = true,
        env = "DATABASE_URL",
        default_value = DATABASE_URL,
        hide_env_values = true
    )]
    database_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone)]
struct TransitionArgs {
    /// Entity type (user, adopter, pet_owner, pet, adoption_request, adoption)
    entity: EntityKind,

    /// Record id
    id: i32,

    /// Id of the user performing the operation
    #[arg(long)]
    actor: Option<i32>,

    /// Reason stored with the archived row and the audit entry
    #[arg(long, default_value = "")]
    reason: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Move a live record into its archive table
    Archive(TransitionArgs),

    /// Move an archived record back into its live table
    Restore(TransitionArgs),

    /// Permanently delete an archived record
    Purge(TransitionArgs),

    /// Row count per archive table
    Stats,

    /// Count and date range per archive table
    Summary,

    /// Most recent audit log entries
    Recent {
        /// Maximum entries to show
        #[arg(long, default_value_t = RECENT_OPERATIONS_LIMIT)]
        limit: i64,

        /// Only show entries for this entity type
        #[arg(long)]
        entity: Option<EntityKind>,
    },

    /// Archived records of one entity type, newest first
    List {
        /// Entity type
        entity: EntityKind,

        /// Maximum records to show
        #[arg(long, default_value_t = ARCHIVED_LIST_LIMIT)]
        limit: i64,
    },

    /// Check archive tables for orphaned references
    Integrity,

    /// Archive completed requests and adopted pets past their retention window
    AutoArchive {
        /// Id of the user recorded as the actor
        #[arg(long)]
        actor: Option<i32>,
    },

    /// Delete audit log entries older than the given number of days
    CleanupLog {
        /// Days of history to keep
        #[arg(long, default_value_t = AUDIT_LOG_KEEP_DAYS)]
        days: i64,
    },

    /// Set the in-place archived flag on a live pet
    FlagPet {
        /// Pet id
        id: i32,
    },

    /// Clear the in-place archived flag on a live pet
    UnflagPet {
        /// Pet id
        id: i32,
    },

    /// Replace a user's fields, handling role-linked profiles
    UpdateUser {
        /// User id
        id: i32,

        #[arg(long)]
        username: String,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        password: String,

        /// New role (admin, adopter, pet_owner)
        #[arg(long)]
        role: Role,
    },

    /// Delete a user by archiving it
    DeleteUser {
        /// User id
        id: i32,
    },

    /// Run the retention worker until interrupted
    Worker,

    /// Apply database migrations
    Migrate,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let _log_guard = init_logging();

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!(error = %e, "Command failed");
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr (or a rolling file) so stdout carries only command output.
fn init_logging() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "furever_cli=info,furever_db=warn,furever_jobs=info".into());

    let registry = tracing_subscriber::registry().with(env_filter);

    if let Some(ref path) = log_file {
        let file_dir = std::path::Path::new(path)
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(std::path::Path::new("."));
        let file_name = std::path::Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("furever-archive.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(log_ansi.unwrap_or(false));
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    }
}

/// Print a value as pretty JSON or through its text renderer.
fn emit<T: Serialize>(json: bool, value: &T, text: impl FnOnce(&T) -> String) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", text(value));
    }
    Ok(())
}

/// Runs one command; `Ok(false)` means it completed but the operation failed.
async fn run(cli: Cli) -> anyhow::Result<bool> {
    let db = Database::connect_with_config(&cli.database_url, PoolConfig::from_env())
        .await
        .context("failed to connect to database")?
        .with_retention_policy(RetentionPolicy::from_env());
    log_pool_metrics(db.pool());
    let json = cli.json;

    match cli.command {
        Commands::Archive(args) => {
            let outcome = db
                .archives
                .archive(args.entity, args.id, args.actor, &args.reason)
                .await;
            transition(json, "archive", &args, outcome)
        }
        Commands::Restore(args) => {
            let outcome = db
                .archives
                .restore(args.entity, args.id, args.actor, &args.reason)
                .await;
            transition(json, "restore", &args, outcome)
        }
        Commands::Purge(args) => {
            let outcome = db
                .archives
                .permanent_delete(args.entity, args.id, args.actor, &args.reason)
                .await;
            transition(json, "purge", &args, outcome)
        }
        Commands::Stats => {
            let stats = db.reports.archive_statistics().await;
            emit(json, &stats, render::statistics)?;
            Ok(true)
        }
        Commands::Summary => {
            let summary = db.reports.archive_summary().await;
            emit(json, &summary, |s| render::summary(s))?;
            Ok(true)
        }
        Commands::Recent { limit, entity } => {
            let entries = db.audit.recent_operations(limit, entity).await;
            emit(json, &entries, |e| render::log_entries(e))?;
            Ok(true)
        }
        Commands::List { entity, limit } => {
            let records = db.archives.list_archived(entity, limit).await;
            emit(json, &records, |r| render::archived_records(entity, r))?;
            Ok(true)
        }
        Commands::Integrity => {
            let issues = db.reports.validate_archive_integrity().await;
            emit(json, &issues, |i| render::integrity(i))?;
            Ok(issues.is_empty())
        }
        Commands::AutoArchive { actor } => {
            let report = RetentionReport {
                requests_archived: db.retention.auto_archive_completed_requests(actor).await,
                pets_archived: db.retention.auto_archive_adopted_pets(actor).await,
                log_entries_pruned: 0,
            };
            emit(json, &report, render::retention)?;
            Ok(true)
        }
        Commands::CleanupLog { days } => {
            let pruned = db.audit.cleanup_archive_log(days).await;
            emit(json, &serde_json::json!({ "deleted": pruned }), |_| {
                format!("Deleted {} audit log entries older than {} days", pruned, days)
            })?;
            Ok(true)
        }
        Commands::FlagPet { id } => {
            let changed = db.flags.flag_pet_archived(id).await?;
            emit(json, &serde_json::json!({ "pet_id": id, "changed": changed }), |_| {
                if changed {
                    format!("Flagged pet {} as archived", id)
                } else {
                    format!("Pet {} not found or already flagged", id)
                }
            })?;
            Ok(changed)
        }
        Commands::UnflagPet { id } => {
            let changed = db.flags.unflag_pet_archived(id).await?;
            emit(json, &serde_json::json!({ "pet_id": id, "changed": changed }), |_| {
                if changed {
                    format!("Cleared archived flag on pet {}", id)
                } else {
                    format!("Pet {} not found or not flagged", id)
                }
            })?;
            Ok(changed)
        }
        Commands::UpdateUser {
            id,
            username,
            email,
            password,
            role,
        } => {
            let update = UserUpdate {
                id,
                username,
                email,
                password,
                role,
            };
            let transition = db.profiles.update_user(&update).await?;
            emit(json, &transition, |t| render::role_transition(id, t))?;
            Ok(true)
        }
        Commands::DeleteUser { id } => {
            let outcome = db.profiles.delete_user(id).await;
            let ok = outcome.is_success();
            emit(json, &outcome, |o| render::outcome("delete", EntityKind::User, id, o))?;
            Ok(ok)
        }
        Commands::Worker => run_worker(&db).await.map(|_| true),
        Commands::Migrate => {
            db.migrate().await.context("failed to apply migrations")?;
            info!(subsystem = "cli", "Migrations applied");
            println!("Migrations applied");
            Ok(true)
        }
    }
}

fn transition(
    json: bool,
    verb: &str,
    args: &TransitionArgs,
    outcome: TransitionOutcome,
) -> anyhow::Result<bool> {
    emit(json, &outcome, |o| render::outcome(verb, args.entity, args.id, o))?;
    Ok(outcome.is_success())
}

async fn run_worker(db: &Database) -> anyhow::Result<()> {
    let config = RetentionWorkerConfig::from_env();
    if !config.enabled {
        warn!(
            subsystem = "cli",
            "RETENTION_WORKER_ENABLED is false; nothing to run"
        );
        return Ok(());
    }

    let handle = RetentionWorker::from_database(db, config).start();
    let mut events = handle.events();
    let mut archive_events = db.events.subscribe();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!(subsystem = "cli", "Interrupt received, stopping retention worker");
                handle.shutdown().await?;
                break;
            }
            event = events.recv() => match event {
                Ok(RetentionEvent::RunCompleted(report)) => println!("{}", render::retention(&report)),
                Ok(RetentionEvent::RunFailed { error }) => eprintln!("Retention run failed: {}", error),
                Ok(RetentionEvent::WorkerStopped) => break,
                Ok(RetentionEvent::WorkerStarted) => {}
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {}
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            },
            envelope = archive_events.recv() => {
                if let Ok(envelope) = envelope {
                    info!(
                        subsystem = "cli",
                        event_id = %envelope.event_id,
                        event_type = envelope.event_type.as_str(),
                        "Archive event"
                    );
                }
            }
        }
    }

    while let Ok(event) = events.recv().await {
        if event == RetentionEvent::WorkerStopped {
            break;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_archive_with_actor_and_reason() {
        let cli = Cli::try_parse_from([
            "furever-archive",
            "archive",
            "pet",
            "7",
            "--actor",
            "2",
            "--reason",
            "test",
        ])
        .unwrap();
        match cli.command {
            Commands::Archive(args) => {
                assert_eq!(args.entity, EntityKind::Pet);
                assert_eq!(args.id, 7);
                assert_eq!(args.actor, Some(2));
                assert_eq!(args.reason, "test");
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert!(!cli.json);
    }

    #[test]
    fn test_parse_entity_aliases() {
        let cli = Cli::try_parse_from(["furever-archive", "purge", "adoption-request", "3"]).unwrap();
        match cli.command {
            Commands::Purge(args) => {
                assert_eq!(args.entity, EntityKind::AdoptionRequest);
                assert_eq!(args.actor, None);
                assert_eq!(args.reason, "");
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_unknown_entity() {
        assert!(Cli::try_parse_from(["furever-archive", "archive", "hamster", "1"]).is_err());
    }

    #[test]
    fn test_parse_recent_defaults_and_global_json() {
        let cli = Cli::try_parse_from(["furever-archive", "recent", "--json"]).unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Recent { limit, entity } => {
                assert_eq!(limit, RECENT_OPERATIONS_LIMIT);
                assert_eq!(entity, None);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_update_user_role() {
        let cli = Cli::try_parse_from([
            "furever-archive",
            "update-user",
            "5",
            "--username",
            "sam",
            "--password",
            "pw",
            "--role",
            "pet_owner",
        ])
        .unwrap();
        match cli.command {
            Commands::UpdateUser { role, email, .. } => {
                assert_eq!(role, Role::PetOwner);
                assert_eq!(email, None);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_cleanup_log_default_days() {
        let cli = Cli::try_parse_from(["furever-archive", "cleanup-log"]).unwrap();
        match cli.command {
            Commands::CleanupLog { days } => assert_eq!(days, AUDIT_LOG_KEEP_DAYS),
            other => panic!("unexpected command {:?}", other),
        }
    }
}
