//! Export traversal: schema-driven deep data collection into a manifest.
//!
//! For each selected content type the exporter builds a population plan,
//! fetches the draft-state entries across all locales (the canonical
//! "latest data" snapshot) and the published-state entries separately, and
//! merges the two by (stable identifier, locale): a draft entry carries the
//! matching published timestamp if and only if a published counterpart
//! exists for that exact pair. Every media asset transitively reachable in
//! the fetched payloads is collected into the manifest's deduplicated media
//! list, keyed by the asset's source store-local identifier.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use regex::Regex;
use tracing::{debug, info, warn};

use ferry_core::defaults::MAX_PLAN_DEPTH;
use ferry_core::{
    Attribute, ContentStore, EntryRecord, Error, ExportedEntry, JsonMap, Manifest, MediaAsset,
    PublicationState, Result, SchemaRegistry,
};

use crate::walker::build_plan;

/// Selection and filtering options for one export run.
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    /// Explicitly selected content types. Unknown names are a setup error.
    pub types: Vec<String>,
    /// Select every content type in the registry.
    pub all: bool,
    /// Additionally select content types whose name matches.
    pub type_filter: Option<Regex>,
    /// Restrict fragment-named layout blobs to names that match.
    pub fragment_filter: Option<Regex>,
}

/// Export traversal over one source store instance.
pub struct Exporter {
    source: Arc<dyn ContentStore>,
}

impl Exporter {
    pub fn new(source: Arc<dyn ContentStore>) -> Self {
        Self { source }
    }

    /// Assemble the portable manifest for the selected content types.
    /// Read-only against the source store.
    pub async fn export(&self, options: &ExportOptions) -> Result<Manifest> {
        let registry = self.source.registry().await?;
        let selected = select_types(&registry, options)?;
        info!(
            subsystem = "export",
            type_count = selected.len(),
            "export: starting traversal"
        );

        let mut manifest = Manifest::new(Utc::now());
        let mut media: BTreeMap<String, MediaAsset> = BTreeMap::new();

        for type_name in &selected {
            let schema = registry
                .content_type(type_name)
                .ok_or_else(|| Error::UnknownContentType(type_name.clone()))?;
            let plan = build_plan(&registry, type_name, MAX_PLAN_DEPTH)?;

            let drafts = self
                .source
                .fetch_entries(type_name, &plan, PublicationState::Draft)
                .await?;
            let published = self
                .source
                .fetch_entries(type_name, &plan, PublicationState::Published)
                .await?;
            let merged = merge_states(type_name, drafts, published);

            for entry in &merged {
                collect_media(&entry.data, &schema.attributes, &registry, &mut media);
            }
            info!(
                subsystem = "export",
                content_type = %type_name,
                entry_count = merged.len(),
                "export: content type collected"
            );
            manifest.entries.insert(type_name.clone(), merged);
        }

        manifest.media = media.into_values().collect();
        manifest.layouts = self.select_layouts(&registry, &selected, options).await?;
        manifest.locales = self.source.locales().await?;

        info!(
            subsystem = "export",
            entry_count = manifest.entry_count(),
            asset_count = manifest.media.len(),
            "export: manifest assembled"
        );
        Ok(manifest)
    }

    async fn select_layouts(
        &self,
        registry: &SchemaRegistry,
        selected: &[String],
        options: &ExportOptions,
    ) -> Result<BTreeMap<String, serde_json::Value>> {
        let mut layouts = BTreeMap::new();
        for (key, value) in self.source.layouts().await? {
            let keep = if selected.iter().any(|t| t == &key) {
                true
            } else if registry.fragment(&key).is_some() {
                options
                    .fragment_filter
                    .as_ref()
                    .map(|re| re.is_match(&key))
                    .unwrap_or(true)
            } else {
                false
            };
            if keep {
                layouts.insert(key, value);
            }
        }
        Ok(layouts)
    }
}

/// Resolve the selected content-type names: explicit list, `--all`, and the
/// type-name filter, deduplicated in registry order.
fn select_types(registry: &SchemaRegistry, options: &ExportOptions) -> Result<Vec<String>> {
    for name in &options.types {
        if registry.content_type(name).is_none() {
            return Err(Error::UnknownContentType(name.clone()));
        }
    }

    let mut selected = Vec::new();
    for name in registry.type_names() {
        let explicit = options.types.iter().any(|t| t == &name);
        let filtered = options
            .type_filter
            .as_ref()
            .map(|re| re.is_match(&name))
            .unwrap_or(false);
        if options.all || explicit || filtered {
            selected.push(name);
        }
    }
    Ok(selected)
}

/// Merge draft and published row sets by (stable identifier, locale).
///
/// The draft fetch is canonical; published rows only contribute their
/// timestamp. A published row with no draft counterpart is dropped with a
/// warning — the store exposed a live copy without a working copy, which
/// the merge cannot represent.
fn merge_states(
    type_name: &str,
    drafts: Vec<EntryRecord>,
    published: Vec<EntryRecord>,
) -> Vec<ExportedEntry> {
    let mut published_at: HashMap<(String, Option<String>), DateTime<Utc>> = published
        .into_iter()
        .filter_map(|row| {
            row.published_at
                .map(|at| ((row.stable_id, row.locale), at))
        })
        .collect();

    let merged: Vec<ExportedEntry> = drafts
        .into_iter()
        .map(|row| {
            let key = (row.stable_id.clone(), row.locale.clone());
            ExportedEntry {
                stable_id: row.stable_id,
                locale: row.locale,
                published_at: published_at.remove(&key),
                data: row.data,
            }
        })
        .collect();

    for ((stable_id, locale), _) in published_at {
        warn!(
            content_type = %type_name,
            stable_id = %stable_id,
            locale = locale.as_deref().unwrap_or("-"),
            "export: published entry without draft counterpart dropped"
        );
    }
    merged
}

/// Walk an entry payload by schema shape and collect every embedded media
/// asset, keyed by source store-local id (falling back to the content hash
/// when a reference carries no id).
fn collect_media(
    data: &JsonMap,
    attributes: &BTreeMap<String, Attribute>,
    registry: &SchemaRegistry,
    out: &mut BTreeMap<String, MediaAsset>,
) {
    for (key, value) in data {
        match attributes.get(key) {
            Some(Attribute::Media { multiple }) => {
                if *multiple {
                    if let Some(items) = value.as_array() {
                        for item in items {
                            collect_one_asset(item, out);
                        }
                    }
                } else {
                    collect_one_asset(value, out);
                }
            }
            Some(Attribute::Fragment {
                fragment,
                repeatable,
            }) => {
                let Some(schema) = registry.fragment(fragment) else {
                    continue;
                };
                if *repeatable {
                    if let Some(items) = value.as_array() {
                        for item in items {
                            if let Some(map) = item.as_object() {
                                collect_media(map, &schema.attributes, registry, out);
                            }
                        }
                    }
                } else if let Some(map) = value.as_object() {
                    collect_media(map, &schema.attributes, registry, out);
                }
            }
            Some(Attribute::FragmentUnion { .. }) => {
                let Some(items) = value.as_array() else {
                    continue;
                };
                for item in items {
                    let Some(map) = item.as_object() else {
                        continue;
                    };
                    let Some(tag) = map
                        .get(ferry_core::defaults::UNION_TAG_FIELD)
                        .and_then(serde_json::Value::as_str)
                    else {
                        continue;
                    };
                    if let Some(schema) = registry.fragment(tag) {
                        collect_media(map, &schema.attributes, registry, out);
                    }
                }
            }
            _ => {}
        }
    }
}

fn collect_one_asset(value: &serde_json::Value, out: &mut BTreeMap<String, MediaAsset>) {
    if value.is_null() {
        return;
    }
    match serde_json::from_value::<MediaAsset>(value.clone()) {
        Ok(asset) => {
            let key = if asset.id.is_empty() {
                asset.hash.clone()
            } else {
                asset.id.clone()
            };
            out.entry(key).or_insert(asset);
        }
        Err(e) => {
            debug!(error = %e, "export: embedded media value not collectable");
        }
    }
}
