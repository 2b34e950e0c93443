//! # furever-core
//!
//! Core types, traits, and abstractions for the furever archive subsystem.
//!
//! This crate holds the entity catalogue, transition outcomes, repository
//! traits, and the archive event bus that the other furever crates build on.

pub mod defaults;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod retention;
pub mod roles;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use events::{ArchiveEvent, ArchiveEventBus, ArchiveEventEnvelope};
pub use models::*;
pub use retention::{audit_log_cutoff, RetentionPolicy};
pub use roles::{ProfilePlan, RoleTransition, UserUpdate};
pub use traits::*;
