//! Import orchestrator: two-phase, cycle-safe, idempotent reconstruction.
//!
//! Phase 1 creates or updates every entry with relations stripped, so any
//! entry may reference any other regardless of manifest order. Phase 2
//! normalizes again with relations resolved against the now-populated
//! destination, updates each entry with the fully linked payload, and
//! issues publish actions. Singleton types get a dedicated one-step pass
//! between the phases: their collection-entry targets exist after phase 1,
//! and collection entries that reference them resolve in phase 2.
//!
//! Failure is per entry and terminal for that entry only; the run continues
//! and the report carries every outcome. In dry-run mode every lookup still
//! executes but all writes are suppressed.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use ferry_core::{
    ContentStore, ContentTypeSchema, CreateEntryRequest, Error, ExportedEntry, JsonMap, Manifest,
    Result, SchemaRegistry,
};

use crate::cleanup::{execute_cleanup, plan_cleanup};
use crate::media::MediaResolver;
use crate::normalize::{Normalizer, RelationMode};
use crate::report::{EntryOutcome, EntryState, ImportAction, ImportReport};

/// Options for one import run.
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Delete manifest-scoped destination entries and assets first.
    pub clean: bool,
    /// Skip the bulk media pre-pass (embedded references still resolve
    /// just-in-time during normalization).
    pub skip_media: bool,
    /// Skip layout-blob and locale-definition import.
    pub skip_schema: bool,
    /// Compute and report everything, mutate nothing.
    pub dry_run: bool,
    /// Directory of source binary payloads extracted from the archive.
    pub source_uploads: Option<PathBuf>,
}

/// Two-phase upsert orchestrator against one destination store.
pub struct Importer {
    dest: Arc<dyn ContentStore>,
    options: ImportOptions,
}

/// Work item carried between the phases: indexes into the report plus the
/// manifest entry it tracks.
struct WorkItem<'m> {
    item_index: usize,
    type_name: &'m str,
    schema: &'m ContentTypeSchema,
    entry: &'m ExportedEntry,
}

impl Importer {
    pub fn new(dest: Arc<dyn ContentStore>, options: ImportOptions) -> Self {
        Self { dest, options }
    }

    /// Run the full import pipeline for a manifest.
    ///
    /// Setup failures (unreachable store, unknown registry) abort before
    /// any mutation; everything after that is per-item.
    pub async fn run(&self, manifest: &Manifest) -> Result<ImportReport> {
        let registry = self.dest.registry().await?;
        let media = MediaResolver::new(
            self.dest.clone(),
            self.options.source_uploads.clone(),
            self.options.dry_run,
        );
        let mut report = ImportReport::new(self.options.dry_run);

        info!(
            subsystem = "import",
            entry_count = manifest.entry_count(),
            asset_count = manifest.media.len(),
            dry_run = self.options.dry_run,
            "import: starting"
        );

        if self.options.clean {
            let plan = plan_cleanup(self.dest.as_ref(), manifest, &registry).await?;
            report.cleanup =
                Some(execute_cleanup(self.dest.as_ref(), &plan, self.options.dry_run).await);
        }

        if !self.options.skip_schema {
            self.import_locales(manifest, &mut report).await?;
            self.import_layouts(manifest, &mut report).await;
        }

        if !self.options.skip_media {
            media.import_all(manifest).await;
        }

        // Partition manifest types against the destination registry.
        let mut collections: Vec<(&str, &ContentTypeSchema, &Vec<ExportedEntry>)> = Vec::new();
        let mut singletons: Vec<(&str, &ContentTypeSchema, &Vec<ExportedEntry>)> = Vec::new();
        for (type_name, entries) in &manifest.entries {
            match registry.content_type(type_name) {
                Some(schema) if schema.is_singleton() => {
                    singletons.push((type_name.as_str(), schema, entries))
                }
                Some(schema) => collections.push((type_name.as_str(), schema, entries)),
                None => {
                    warn!(content_type = %type_name, "import: content type not present at destination, skipped");
                    for entry in entries {
                        let mut outcome =
                            EntryOutcome::new(type_name, &entry.stable_id, entry.locale.as_deref());
                        outcome.fail("content type not present at destination");
                        report.items.push(outcome);
                    }
                }
            }
        }

        // Phase 1: create/update with relations stripped.
        let mut work: Vec<WorkItem> = Vec::new();
        for &(type_name, schema, entries) in &collections {
            for entry in entries.iter() {
                let mut outcome =
                    EntryOutcome::new(type_name, &entry.stable_id, entry.locale.as_deref());
                match self
                    .phase1_entry(&registry, &media, type_name, schema, entry)
                    .await
                {
                    Ok(action) => {
                        outcome.action = Some(action);
                        outcome.state = match action {
                            ImportAction::Created => EntryState::Created,
                            ImportAction::Updated => EntryState::Updated,
                        };
                    }
                    Err(e) => {
                        warn!(
                            content_type = %type_name,
                            stable_id = %entry.stable_id,
                            phase = "phase1",
                            error = %e,
                            "import: entry failed"
                        );
                        outcome.fail(e.to_string());
                    }
                }
                let item_index = report.items.len();
                report.items.push(outcome);
                work.push(WorkItem {
                    item_index,
                    type_name,
                    schema,
                    entry,
                });
            }
        }

        // Singleton pass: one-step upsert with relations resolved.
        for &(type_name, schema, entries) in &singletons {
            for entry in entries.iter() {
                let mut outcome =
                    EntryOutcome::new(type_name, &entry.stable_id, entry.locale.as_deref());
                match self
                    .singleton_entry(&registry, &media, type_name, schema, entry)
                    .await
                {
                    Ok((action, state)) => {
                        outcome.action = Some(action);
                        outcome.state = state;
                    }
                    Err(e) => {
                        warn!(
                            content_type = %type_name,
                            stable_id = %entry.stable_id,
                            phase = "singleton",
                            error = %e,
                            "import: entry failed"
                        );
                        outcome.fail(e.to_string());
                    }
                }
                report.items.push(outcome);
            }
        }

        // Phase 2: resolve relations and publish.
        for item in &work {
            if report.items[item.item_index].state == EntryState::Failed {
                continue;
            }
            match self
                .phase2_entry(&registry, &media, item.type_name, item.schema, item.entry)
                .await
            {
                Ok(state) => report.items[item.item_index].state = state,
                Err(e) => {
                    warn!(
                        content_type = %item.type_name,
                        stable_id = %item.entry.stable_id,
                        phase = "phase2",
                        error = %e,
                        "import: entry failed"
                    );
                    report.items[item.item_index].fail(e.to_string());
                }
            }
        }

        report.media = media.stats().await;
        info!(
            subsystem = "import",
            entry_count = report.items.len(),
            failed = report.failed(),
            dry_run = self.options.dry_run,
            "import: finished"
        );
        Ok(report)
    }

    /// Phase 1 for one entry: upsert by (stable identifier, locale) with
    /// relations stripped. Updates force draft state so partial,
    /// relation-less data is never live; creations carry the source's
    /// stable identifier.
    async fn phase1_entry(
        &self,
        registry: &SchemaRegistry,
        media: &MediaResolver,
        type_name: &str,
        schema: &ContentTypeSchema,
        entry: &ExportedEntry,
    ) -> Result<ImportAction> {
        let normalizer =
            Normalizer::new(registry, self.dest.as_ref(), media, RelationMode::Strip);
        let data = normalizer
            .normalize_entry(&entry.data, &schema.attributes, entry.locale.as_deref())
            .await?;

        let existing = self
            .dest
            .find_entry(type_name, &entry.stable_id, entry.locale.as_deref())
            .await?;
        match existing {
            Some(record) => {
                if !self.options.dry_run {
                    self.update_with_retry(type_name, &record.id, data, schema)
                        .await?;
                    if schema.draft_publish {
                        self.dest
                            .unpublish_entry(type_name, &entry.stable_id, entry.locale.as_deref())
                            .await?;
                    }
                }
                Ok(ImportAction::Updated)
            }
            None => {
                if !self.options.dry_run {
                    // No draft channel means the entry must be born
                    // published.
                    let published_at = if schema.draft_publish {
                        None
                    } else {
                        Some(entry.published_at.unwrap_or_else(Utc::now))
                    };
                    self.create_with_retry(
                        type_name,
                        CreateEntryRequest {
                            stable_id: Some(entry.stable_id.clone()),
                            locale: entry.locale.clone(),
                            published_at,
                            data,
                        },
                        schema,
                    )
                    .await?;
                }
                Ok(ImportAction::Created)
            }
        }
    }

    /// Phase 2 for one entry: write the fully resolved payload and restore
    /// the publish state recorded in the manifest.
    async fn phase2_entry(
        &self,
        registry: &SchemaRegistry,
        media: &MediaResolver,
        type_name: &str,
        schema: &ContentTypeSchema,
        entry: &ExportedEntry,
    ) -> Result<EntryState> {
        let normalizer =
            Normalizer::new(registry, self.dest.as_ref(), media, RelationMode::Resolve);
        let data = normalizer
            .normalize_entry(&entry.data, &schema.attributes, entry.locale.as_deref())
            .await?;

        let existing = self
            .dest
            .find_entry(type_name, &entry.stable_id, entry.locale.as_deref())
            .await?;
        let record = match existing {
            Some(record) => record,
            // In a dry run phase 1 never created the entry; report the
            // linking that would happen.
            None if self.options.dry_run => return Ok(EntryState::Linked),
            None => {
                return Err(Error::Internal(format!(
                    "entry ({}, {:?}) missing after phase 1",
                    entry.stable_id, entry.locale
                )))
            }
        };

        if !self.options.dry_run {
            self.update_with_retry(type_name, &record.id, data, schema)
                .await?;
        }

        if schema.draft_publish {
            if let Some(at) = entry.published_at {
                if !self.options.dry_run {
                    self.dest
                        .publish_entry(type_name, &entry.stable_id, entry.locale.as_deref(), at)
                        .await?;
                }
                return Ok(EntryState::Published);
            }
            return Ok(EntryState::Done);
        }
        // Publish tracking disabled: already live, no explicit publish.
        Ok(EntryState::Done)
    }

    /// Dedicated singleton pass: update-or-create per source locale with
    /// relations resolved directly in one step.
    async fn singleton_entry(
        &self,
        registry: &SchemaRegistry,
        media: &MediaResolver,
        type_name: &str,
        schema: &ContentTypeSchema,
        entry: &ExportedEntry,
    ) -> Result<(ImportAction, EntryState)> {
        let normalizer =
            Normalizer::new(registry, self.dest.as_ref(), media, RelationMode::Resolve);
        let data = normalizer
            .normalize_entry(&entry.data, &schema.attributes, entry.locale.as_deref())
            .await?;

        let existing = self
            .dest
            .first_entry(type_name, entry.locale.as_deref())
            .await?;
        let (action, stable_id) = match existing {
            Some(record) => {
                if !self.options.dry_run {
                    self.update_with_retry(type_name, &record.id, data, schema)
                        .await?;
                }
                (ImportAction::Updated, record.stable_id)
            }
            None => {
                if !self.options.dry_run {
                    let published_at = if schema.draft_publish {
                        None
                    } else {
                        Some(entry.published_at.unwrap_or_else(Utc::now))
                    };
                    self.create_with_retry(
                        type_name,
                        CreateEntryRequest {
                            stable_id: Some(entry.stable_id.clone()),
                            locale: entry.locale.clone(),
                            published_at,
                            data,
                        },
                        schema,
                    )
                    .await?;
                }
                (ImportAction::Created, entry.stable_id.clone())
            }
        };

        if schema.draft_publish {
            if let Some(at) = entry.published_at {
                if !self.options.dry_run {
                    self.dest
                        .publish_entry(type_name, &stable_id, entry.locale.as_deref(), at)
                        .await?;
                }
                return Ok((action, EntryState::Published));
            }
        }
        Ok((action, EntryState::Done))
    }

    /// Update, retrying once with undeclared fields omitted when the store
    /// rejects the write. The retry is an alternate strategy, never a
    /// repeat of the identical operation.
    async fn update_with_retry(
        &self,
        type_name: &str,
        id: &str,
        data: JsonMap,
        schema: &ContentTypeSchema,
    ) -> Result<()> {
        match self.dest.update_entry(type_name, id, data.clone()).await {
            Ok(_) => Ok(()),
            Err(Error::Validation(msg)) => {
                warn!(
                    content_type = %type_name,
                    error = %msg,
                    "import: write rejected, retrying with undeclared fields omitted"
                );
                let stripped = retain_declared(data, schema);
                self.dest
                    .update_entry(type_name, id, stripped)
                    .await
                    .map(|_| ())
            }
            Err(e) => Err(e),
        }
    }

    async fn create_with_retry(
        &self,
        type_name: &str,
        req: CreateEntryRequest,
        schema: &ContentTypeSchema,
    ) -> Result<()> {
        match self.dest.create_entry(type_name, req.clone()).await {
            Ok(_) => Ok(()),
            Err(Error::Validation(msg)) => {
                warn!(
                    content_type = %type_name,
                    error = %msg,
                    "import: create rejected, retrying with undeclared fields omitted"
                );
                let mut retry = req;
                retry.data = retain_declared(retry.data, schema);
                self.dest.create_entry(type_name, retry).await.map(|_| ())
            }
            Err(e) => Err(e),
        }
    }

    async fn import_locales(&self, manifest: &Manifest, report: &mut ImportReport) -> Result<()> {
        let existing = self.dest.locales().await?;
        for locale in &manifest.locales {
            if existing.iter().any(|l| l.code == locale.code) {
                continue;
            }
            if !self.options.dry_run {
                if let Err(e) = self.dest.create_locale(locale).await {
                    warn!(locale = %locale.code, error = %e, "import: locale creation rejected");
                    continue;
                }
            }
            report.locales_created += 1;
        }
        Ok(())
    }

    async fn import_layouts(&self, manifest: &Manifest, report: &mut ImportReport) {
        for (key, value) in &manifest.layouts {
            if !self.options.dry_run {
                if let Err(e) = self.dest.set_layout(key, value.clone()).await {
                    warn!(layout = %key, error = %e, "import: layout write rejected");
                    continue;
                }
            }
            report.layouts_written += 1;
        }
    }
}

/// Keep only payload keys declared in the destination schema.
fn retain_declared(mut data: JsonMap, schema: &ContentTypeSchema) -> JsonMap {
    data.retain(|key, _| schema.attributes.contains_key(key));
    data
}
