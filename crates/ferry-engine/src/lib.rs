//! # ferry-engine
//!
//! The export-traversal and import-reconciliation pipeline of the ferry
//! migration engine: schema-driven deep data collection on export, and
//! two-phase, cycle-safe, idempotent, locale-aware reconstruction on
//! import, with content-addressed media deduplication and relation
//! resolution. Store instances are consumed through
//! [`ferry_core::ContentStore`].

pub mod archive;
pub mod cleanup;
pub mod export;
pub mod import;
pub mod media;
pub mod normalize;
pub mod report;
pub mod walker;

pub use archive::{load_source, pack, ImportSource};
pub use cleanup::{execute_cleanup, plan_cleanup, CleanupPlan};
pub use export::{ExportOptions, Exporter};
pub use import::{ImportOptions, Importer};
pub use media::MediaResolver;
pub use normalize::{Normalizer, RelationMode};
pub use report::{
    CleanupReport, EntryOutcome, EntryState, ExportReport, ImportAction, ImportReport, MediaStats,
};
pub use walker::build_plan;
