//! # furever-jobs
//!
//! Scheduled retention for the furever archive subsystem.
//!
//! ## Example
//!
//! ```ignore
//! use furever_db::Database;
//! use furever_jobs::{RetentionWorker, RetentionWorkerConfig};
//!
//! let db = Database::connect("postgres://...").await?;
//! let handle = RetentionWorker::from_database(&db, RetentionWorkerConfig::from_env()).start();
//!
//! let mut events = handle.events();
//! while let Ok(event) = events.recv().await {
//!     println!("Event: {:?}", event);
//! }
//!
//! handle.shutdown().await?;
//! ```

pub mod worker;

pub use worker::{RetentionEvent, RetentionWorker, RetentionWorkerConfig, RetentionWorkerHandle};
