//! Structured logging schema and field name constants for ferry.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log aggregation tools can query by standardized field names across
//! every subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Setup failure, migration aborted before mutation |
//! | WARN  | Per-item failure or dropped reference, processing continues |
//! | INFO  | Lifecycle events (phase start/end), operation completions |
//! | DEBUG | Decision points, plan shapes, upsert branch taken |
//! | TRACE | Per-attribute normalization, per-file copy |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "export", "import", "media", "cleanup", "archive", "store", "cli"
pub const SUBSYSTEM: &str = "subsystem";

/// Logical operation name.
/// Examples: "export", "phase1", "phase2", "resolve_asset", "pack"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Content-type name being operated on.
pub const CONTENT_TYPE: &str = "content_type";

/// Portable stable identifier of an entry.
pub const STABLE_ID: &str = "stable_id";

/// Locale tag of an entry variant.
pub const LOCALE: &str = "locale";

/// Store-local media asset identifier.
pub const ASSET_ID: &str = "asset_id";

/// Content hash of a media asset.
pub const ASSET_HASH: &str = "asset_hash";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of entries processed by a phase.
pub const ENTRY_COUNT: &str = "entry_count";

/// Number of media assets processed by a pass.
pub const ASSET_COUNT: &str = "asset_count";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Whether the invocation is simulating without mutation.
pub const DRY_RUN: &str = "dry_run";

/// Import phase an entry failed or succeeded in.
pub const PHASE: &str = "phase";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
