//! Scoped-deletion planning and execution.
//!
//! Deletion is strictly scoped to manifest membership: for each content
//! type only destination entries whose stable identifier appears in the
//! manifest are deleted — never a full-table wipe. Singleton types lose
//! their local entry outright, since the import that follows replaces it
//! wholesale. Media deletion is scoped to assets whose content hash appears
//! in the manifest. Execution is best-effort: a rejected delete is logged
//! and skipped.

use std::collections::HashSet;

use tracing::{info, warn};

use ferry_core::{
    ContentStore, Manifest, PopulationPlan, PublicationState, Result, SchemaRegistry,
};

use crate::report::CleanupReport;

/// One planned entry deletion, resolved to a store-local id at plan time.
#[derive(Debug, Clone)]
pub struct EntryDeletion {
    pub content_type: String,
    pub stable_id: String,
    pub locale: Option<String>,
    pub local_id: String,
}

/// One planned media asset deletion.
#[derive(Debug, Clone)]
pub struct AssetDeletion {
    pub hash: String,
    pub local_id: String,
}

/// A computed scoped-deletion plan. Planning only reads; execution (or a
/// dry run) happens separately.
#[derive(Debug, Clone, Default)]
pub struct CleanupPlan {
    pub entries: Vec<EntryDeletion>,
    pub assets: Vec<AssetDeletion>,
}

impl CleanupPlan {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.assets.is_empty()
    }
}

/// Compute the deletion plan for a manifest against a destination store.
pub async fn plan_cleanup(
    dest: &dyn ContentStore,
    manifest: &Manifest,
    registry: &SchemaRegistry,
) -> Result<CleanupPlan> {
    let mut plan = CleanupPlan::default();
    let no_population = PopulationPlan::default();

    for (type_name, entries) in &manifest.entries {
        let Some(schema) = registry.content_type(type_name) else {
            continue;
        };
        let rows = dest
            .fetch_entries(type_name, &no_population, PublicationState::Draft)
            .await?;

        if schema.is_singleton() {
            // Replaced wholesale by the import that follows.
            for row in rows {
                plan.entries.push(EntryDeletion {
                    content_type: type_name.clone(),
                    stable_id: row.stable_id,
                    locale: row.locale,
                    local_id: row.id,
                });
            }
        } else {
            let members: HashSet<&str> = entries.iter().map(|e| e.stable_id.as_str()).collect();
            for row in rows {
                if members.contains(row.stable_id.as_str()) {
                    plan.entries.push(EntryDeletion {
                        content_type: type_name.clone(),
                        stable_id: row.stable_id,
                        locale: row.locale,
                        local_id: row.id,
                    });
                }
            }
        }
    }

    let mut seen = HashSet::new();
    for asset in &manifest.media {
        if let Some(existing) = dest.find_asset_by_hash(&asset.hash).await? {
            if seen.insert(existing.id.clone()) {
                plan.assets.push(AssetDeletion {
                    hash: asset.hash.clone(),
                    local_id: existing.id,
                });
            }
        }
    }

    info!(
        subsystem = "cleanup",
        entry_count = plan.entries.len(),
        asset_count = plan.assets.len(),
        "cleanup: plan computed"
    );
    Ok(plan)
}

/// Execute (or simulate) a deletion plan. Per-item failures are swallowed.
pub async fn execute_cleanup(
    dest: &dyn ContentStore,
    plan: &CleanupPlan,
    dry_run: bool,
) -> CleanupReport {
    let mut report = CleanupReport {
        dry_run,
        ..Default::default()
    };

    for deletion in &plan.entries {
        if dry_run {
            report.entries_deleted += 1;
            continue;
        }
        match dest
            .delete_entry(&deletion.content_type, &deletion.local_id)
            .await
        {
            Ok(()) => report.entries_deleted += 1,
            Err(e) => {
                warn!(
                    content_type = %deletion.content_type,
                    stable_id = %deletion.stable_id,
                    error = %e,
                    "cleanup: entry deletion rejected"
                );
                report.failed += 1;
            }
        }
    }

    for deletion in &plan.assets {
        if dry_run {
            report.assets_deleted += 1;
            continue;
        }
        match dest.delete_asset(&deletion.local_id).await {
            Ok(()) => report.assets_deleted += 1,
            Err(e) => {
                warn!(
                    asset_hash = %deletion.hash,
                    error = %e,
                    "cleanup: asset deletion rejected"
                );
                report.failed += 1;
            }
        }
    }

    report
}
