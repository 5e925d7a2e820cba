//! Outcome reporting for export, import, and cleanup runs.
//!
//! Every mutating phase reports per-item outcomes instead of aborting: a
//! failed entry is terminal for that entry only. In dry-run mode the same
//! structures carry what *would* happen.

use std::collections::BTreeMap;
use std::fmt;

use ferry_core::Manifest;

// =============================================================================
// ENTRY STATE MACHINE
// =============================================================================

/// Per-entry import progress:
/// `Pending → Created|Updated → Linked → (Published) → Done`, or `Failed`
/// at any step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Pending,
    Created,
    Updated,
    Linked,
    Published,
    Done,
    Failed,
}

impl fmt::Display for EntryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntryState::Pending => "pending",
            EntryState::Created => "created",
            EntryState::Updated => "updated",
            EntryState::Linked => "linked",
            EntryState::Published => "published",
            EntryState::Done => "done",
            EntryState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Whether phase 1 found an existing destination entry or made a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportAction {
    Created,
    Updated,
}

/// Outcome of one manifest entry across both import phases.
#[derive(Debug, Clone)]
pub struct EntryOutcome {
    pub content_type: String,
    pub stable_id: String,
    pub locale: Option<String>,
    pub action: Option<ImportAction>,
    pub state: EntryState,
    /// Cause, when `state` is `Failed`.
    pub detail: Option<String>,
}

impl EntryOutcome {
    pub fn new(content_type: &str, stable_id: &str, locale: Option<&str>) -> Self {
        Self {
            content_type: content_type.to_string(),
            stable_id: stable_id.to_string(),
            locale: locale.map(str::to_string),
            action: None,
            state: EntryState::Pending,
            detail: None,
        }
    }

    pub fn fail(&mut self, detail: impl Into<String>) {
        self.state = EntryState::Failed;
        self.detail = Some(detail.into());
    }
}

// =============================================================================
// MEDIA
// =============================================================================

/// Counters for media asset resolution across one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MediaStats {
    /// Resolved to an asset already present at the destination (hash hit).
    pub reused: usize,
    /// Created at the destination from manifest bytes (or would be, in a
    /// dry run).
    pub created: usize,
    /// Source payload unavailable; reference dropped.
    pub missing: usize,
    /// Resolution raised an error; reference dropped.
    pub failed: usize,
}

impl MediaStats {
    pub fn resolved(&self) -> usize {
        self.reused + self.created
    }
}

// =============================================================================
// CLEANUP
// =============================================================================

/// Outcome of a scoped-deletion pass.
#[derive(Debug, Clone, Default)]
pub struct CleanupReport {
    pub dry_run: bool,
    pub entries_deleted: usize,
    pub assets_deleted: usize,
    /// Deletions the store rejected; cleanup is best-effort.
    pub failed: usize,
}

impl fmt::Display for CleanupReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = if self.dry_run { "would delete" } else { "deleted" };
        write!(
            f,
            "cleanup: {} {} entries, {} assets ({} failed)",
            verb, self.entries_deleted, self.assets_deleted, self.failed
        )
    }
}

// =============================================================================
// IMPORT
// =============================================================================

/// Full outcome of one import run.
#[derive(Debug, Clone, Default)]
pub struct ImportReport {
    pub dry_run: bool,
    pub items: Vec<EntryOutcome>,
    pub media: MediaStats,
    pub cleanup: Option<CleanupReport>,
    pub layouts_written: usize,
    pub locales_created: usize,
}

impl ImportReport {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            ..Default::default()
        }
    }

    pub fn count(&self, state: EntryState) -> usize {
        self.items.iter().filter(|i| i.state == state).count()
    }

    pub fn created(&self) -> usize {
        self.items
            .iter()
            .filter(|i| i.action == Some(ImportAction::Created))
            .count()
    }

    pub fn updated(&self) -> usize {
        self.items
            .iter()
            .filter(|i| i.action == Some(ImportAction::Updated))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.count(EntryState::Failed)
    }

    pub fn completed(&self) -> usize {
        self.items.len() - self.failed()
    }
}

impl fmt::Display for ImportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.dry_run {
            writeln!(f, "import (dry run): no mutations performed")?;
        }
        writeln!(
            f,
            "entries: {} processed, {} failed",
            self.items.len(),
            self.failed()
        )?;
        writeln!(
            f,
            "media: {} reused, {} created, {} missing, {} failed",
            self.media.reused, self.media.created, self.media.missing, self.media.failed
        )?;
        if let Some(cleanup) = &self.cleanup {
            writeln!(f, "{}", cleanup)?;
        }
        for item in self.items.iter().filter(|i| i.state == EntryState::Failed) {
            writeln!(
                f,
                "  failed: {} {} ({}): {}",
                item.content_type,
                item.stable_id,
                item.locale.as_deref().unwrap_or("-"),
                item.detail.as_deref().unwrap_or("unknown cause"),
            )?;
        }
        Ok(())
    }
}

// =============================================================================
// EXPORT
// =============================================================================

/// Summary of an export run, derived from the assembled manifest.
#[derive(Debug, Clone, Default)]
pub struct ExportReport {
    pub entries_per_type: BTreeMap<String, usize>,
    pub media_count: usize,
    pub layout_count: usize,
    pub locale_count: usize,
}

impl ExportReport {
    pub fn from_manifest(manifest: &Manifest) -> Self {
        Self {
            entries_per_type: manifest
                .entries
                .iter()
                .map(|(name, entries)| (name.clone(), entries.len()))
                .collect(),
            media_count: manifest.media.len(),
            layout_count: manifest.layouts.len(),
            locale_count: manifest.locales.len(),
        }
    }

    pub fn entry_count(&self) -> usize {
        self.entries_per_type.values().sum()
    }
}

impl fmt::Display for ExportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, count) in &self.entries_per_type {
            writeln!(f, "  {}: {} entries", name, count)?;
        }
        write!(
            f,
            "total: {} entries, {} media assets, {} layouts, {} locales",
            self.entry_count(),
            self.media_count,
            self.layout_count,
            self.locale_count
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_outcome_failure() {
        let mut outcome = EntryOutcome::new("post", "p1", Some("en"));
        assert_eq!(outcome.state, EntryState::Pending);

        outcome.fail("store rejected");
        assert_eq!(outcome.state, EntryState::Failed);
        assert_eq!(outcome.detail.as_deref(), Some("store rejected"));
    }

    #[test]
    fn test_import_report_counts() {
        let mut report = ImportReport::new(false);
        let mut a = EntryOutcome::new("post", "p1", None);
        a.state = EntryState::Done;
        let mut b = EntryOutcome::new("post", "p2", None);
        b.fail("boom");
        report.items.push(a);
        report.items.push(b);

        assert_eq!(report.count(EntryState::Done), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.completed(), 1);
    }

    #[test]
    fn test_display_mentions_dry_run() {
        let report = ImportReport::new(true);
        assert!(report.to_string().contains("dry run"));
    }
}
