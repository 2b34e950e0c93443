//! Structured logging field names shared by every furever crate.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Storage failure at an operation boundary |
//! | WARN  | Precondition violation, not-found, per-item batch failure |
//! | INFO  | Completed transitions, batch totals, worker lifecycle |
//! | DEBUG | Decision points, candidate selection, config choices |
//! | TRACE | Per-row iteration |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event ("db", "jobs", "cli").
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem ("archive", "audit", "retention", "pool").
pub const COMPONENT: &str = "component";

/// Logical operation name ("archive", "restore", "permanent_delete").
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Storage identifier of the table affected.
pub const DB_TABLE: &str = "db_table";

/// Primary key of the record being moved.
pub const RECORD_ID: &str = "record_id";

/// Acting user id, absent for automated actions.
pub const ACTOR_ID: &str = "actor_id";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of records affected by a batch.
pub const RESULT_COUNT: &str = "result_count";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
