//! Centralized default constants for ferry.
//!
//! **This module is the single source of truth** for all shared default
//! values. All crates reference these constants instead of defining their
//! own magic numbers or file names.

// =============================================================================
// TRAVERSAL
// =============================================================================

/// Maximum recursion depth for population-plan derivation. When exhausted,
/// the plan degrades to "fetch everything" for the remaining subtree; this
/// bounds self-referential fragment schemas but is not a cycle detector.
pub const MAX_PLAN_DEPTH: usize = 7;

// =============================================================================
// ARCHIVE LAYOUT
// =============================================================================

/// Manifest file name at the archive root.
pub const MANIFEST_FILE: &str = "data.json";

/// Directory of media binary payloads at the archive root and inside a
/// store instance's data directory.
pub const UPLOADS_DIR: &str = "uploads";

/// Default output directory for export archives.
pub const EXPORT_DIR: &str = "export-data";

/// File name prefix for export archives: `export-<timestamp>.tar.gz`.
pub const EXPORT_PREFIX: &str = "export-";

/// File name suffix for export archives.
pub const EXPORT_SUFFIX: &str = ".tar.gz";

// =============================================================================
// NORMALIZATION
// =============================================================================

/// Payload keys that never survive normalization: store-local row
/// identifiers, attribution/audit metadata, and envelope fields that some
/// stores leak into attribute payloads.
pub const STRIPPED_FIELDS: &[&str] = &[
    "id",
    "created_at",
    "updated_at",
    "created_by",
    "updated_by",
    "stable_id",
    "locale",
    "published_at",
];

/// Reserved payload key carrying the member tag of a fragment-union
/// element. Preserved verbatim across export and import.
pub const UNION_TAG_FIELD: &str = "__fragment";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stripped_fields_contain_row_identity() {
        assert!(STRIPPED_FIELDS.contains(&"id"));
        assert!(STRIPPED_FIELDS.contains(&"created_by"));
        assert!(!STRIPPED_FIELDS.contains(&UNION_TAG_FIELD));
    }

    #[test]
    fn test_archive_names() {
        assert_eq!(MANIFEST_FILE, "data.json");
        assert!(EXPORT_SUFFIX.ends_with(".tar.gz"));
    }
}
