//! # furever-db
//!
//! PostgreSQL archive engine for the furever records manager.
//!
//! This crate provides:
//! - Connection pool management
//! - Archive, restore, and permanent-delete transitions with an audit trail
//! - Archive statistics, summaries, and integrity checks
//! - Retention-based auto-archival
//! - User updates that reconcile role-linked profiles
//!
//! ## Example
//!
//! ```rust,ignore
//! use furever_db::{ArchiveRepository, Database, EntityKind};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/furever").await?;
//!
//!     let outcome = db.archives.archive(EntityKind::Pet, 7, Some(2), "rehomed").await;
//!     println!("{}", outcome.describe());
//!     Ok(())
//! }
//! ```
pub mod archive;
pub mod audit;
pub mod pool;
pub mod profiles;
pub mod reports;
pub mod retention;
pub mod soft_flags;
pub mod tables;

// Test fixtures for integration tests
// Note: Always compiled so integration tests (in tests/) can use DEFAULT_TEST_DATABASE_URL
pub mod test_fixtures;

// Re-export core types
pub use furever_core::*;

pub use archive::PgArchiveRepository;
pub use audit::PgAuditLogRepository;
pub use pool::{create_lazy_pool, create_pool, create_pool_with_config, PoolConfig};
pub use profiles::PgUserProfileRepository;
pub use reports::PgArchiveReportRepository;
pub use retention::PgRetentionRepository;
pub use soft_flags::PgSoftFlagRepository;

/// Database handle with every archive repository.
#[derive(Clone)]
pub struct Database {
    pool: sqlx::Pool<sqlx::Postgres>,
    pub events: ArchiveEventBus,
    pub archives: PgArchiveRepository,
    pub audit: PgAuditLogRepository,
    pub reports: PgArchiveReportRepository,
    pub retention: PgRetentionRepository,
    pub profiles: PgUserProfileRepository,
    pub flags: PgSoftFlagRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self::with_events(pool, ArchiveEventBus::default())
    }

    /// Create a Database whose repositories report on `events`.
    pub fn with_events(pool: sqlx::Pool<sqlx::Postgres>, events: ArchiveEventBus) -> Self {
        let archives = PgArchiveRepository::new(pool.clone()).with_events(events.clone());
        Self {
            audit: PgAuditLogRepository::new(pool.clone()),
            reports: PgArchiveReportRepository::new(pool.clone()),
            retention: PgRetentionRepository::new(pool.clone(), archives.clone())
                .with_events(events.clone()),
            profiles: PgUserProfileRepository::new(pool.clone(), archives.clone())
                .with_events(events.clone()),
            flags: PgSoftFlagRepository::new(pool.clone()),
            archives,
            events,
            pool,
        }
    }

    /// Apply retention thresholds to the auto-archival policies.
    pub fn with_retention_policy(mut self, policy: RetentionPolicy) -> Self {
        self.retention = self.retention.with_policy(policy);
        self
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}
