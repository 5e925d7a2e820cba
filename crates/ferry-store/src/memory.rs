//! In-memory content store.
//!
//! `MemoryStore` is the reference implementation of [`ContentStore`]: typed
//! tables behind a `tokio` RwLock, UUIDv7 store-local identifiers, and
//! asset binary payloads on the filesystem. It backs the integration test
//! suite and, via [`crate::FileStore`], the CLI.
//!
//! Draft rows are canonical: every entry variant exists as one row whose
//! `published_at` timestamp, when set, materializes the published copy.
//! Content types with publish tracking disabled hold rows that are born
//! published and never revert to draft.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use ferry_core::{
    ContentStore, CreateAssetRequest, CreateEntryRequest, EntryRecord, Error, JsonMap, Locale,
    MediaAsset, PopulationPlan, PublicationState, Result, SchemaRegistry,
};

use crate::backend::{compute_content_hash, FilesystemBackend, StorageBackend};

/// Snapshot of every table held by a [`MemoryStore`].
///
/// Serializable so a directory-persisted store can flush and reload it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct Tables {
    pub entries: BTreeMap<String, Vec<EntryRecord>>,
    pub assets: BTreeMap<String, MediaAsset>,
    pub layouts: BTreeMap<String, JsonValue>,
    pub locales: Vec<Locale>,
}

/// In-memory implementation of [`ContentStore`].
#[derive(Debug)]
pub struct MemoryStore {
    registry: SchemaRegistry,
    asset_dir: PathBuf,
    backend: FilesystemBackend,
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Create an empty store with the given schema registry. Asset binary
    /// payloads are read from and written to `asset_dir`.
    pub fn new(registry: SchemaRegistry, asset_dir: impl Into<PathBuf>) -> Self {
        Self::with_tables(registry, asset_dir, Tables::default())
    }

    pub(crate) fn with_tables(
        registry: SchemaRegistry,
        asset_dir: impl Into<PathBuf>,
        tables: Tables,
    ) -> Self {
        let asset_dir = asset_dir.into();
        Self {
            registry,
            backend: FilesystemBackend::new(&asset_dir),
            asset_dir,
            tables: RwLock::new(tables),
        }
    }

    /// Round-trip the asset storage backend to surface filesystem problems
    /// before any migration work runs.
    pub async fn validate(&self) -> Result<()> {
        self.backend
            .validate()
            .await
            .map_err(Error::Store)
    }

    pub(crate) async fn snapshot(&self) -> Tables {
        self.tables.read().await.clone()
    }

    /// Total number of entry rows across all content types.
    pub async fn entry_count(&self) -> usize {
        let tables = self.tables.read().await;
        tables.entries.values().map(Vec::len).sum()
    }

    /// Number of media asset records.
    pub async fn asset_count(&self) -> usize {
        self.tables.read().await.assets.len()
    }

    fn require_type(&self, type_name: &str) -> Result<()> {
        if self.registry.content_type(type_name).is_none() {
            return Err(Error::UnknownContentType(type_name.to_string()));
        }
        Ok(())
    }

    fn new_id() -> String {
        Uuid::now_v7().to_string()
    }

    /// Detect the MIME type of an asset payload from its magic bytes.
    async fn detect_mime(&self, file_name: &str) -> String {
        match self.backend.read(file_name).await {
            Ok(data) => infer::get(&data)
                .map(|kind| kind.mime_type().to_string())
                .unwrap_or_else(|| "application/octet-stream".to_string()),
            Err(_) => "application/octet-stream".to_string(),
        }
    }
}

fn locale_matches(row: &EntryRecord, locale: Option<&str>) -> bool {
    match locale {
        Some(code) => row.locale.as_deref() == Some(code),
        None => true,
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn registry(&self) -> Result<SchemaRegistry> {
        Ok(self.registry.clone())
    }

    async fn fetch_entries(
        &self,
        type_name: &str,
        _plan: &PopulationPlan,
        state: PublicationState,
    ) -> Result<Vec<EntryRecord>> {
        self.require_type(type_name)?;
        let tables = self.tables.read().await;
        let rows = tables.entries.get(type_name).cloned().unwrap_or_default();
        // Rows are stored fully populated, so the plan needs no pruning
        // here; a remote store would use it to bound its fetch.
        let rows: Vec<EntryRecord> = match state {
            PublicationState::Draft => rows,
            PublicationState::Published => {
                rows.into_iter().filter(|r| r.published_at.is_some()).collect()
            }
        };
        debug!(content_type = %type_name, count = rows.len(), state = ?state, "memory_store: fetch_entries");
        Ok(rows)
    }

    async fn find_entry(
        &self,
        type_name: &str,
        stable_id: &str,
        locale: Option<&str>,
    ) -> Result<Option<EntryRecord>> {
        self.require_type(type_name)?;
        let tables = self.tables.read().await;
        Ok(tables
            .entries
            .get(type_name)
            .and_then(|rows| {
                rows.iter()
                    .find(|r| r.stable_id == stable_id && locale_matches(r, locale))
            })
            .cloned())
    }

    async fn first_entry(
        &self,
        type_name: &str,
        locale: Option<&str>,
    ) -> Result<Option<EntryRecord>> {
        self.require_type(type_name)?;
        let tables = self.tables.read().await;
        Ok(tables
            .entries
            .get(type_name)
            .and_then(|rows| rows.iter().find(|r| locale_matches(r, locale)))
            .cloned())
    }

    async fn create_entry(
        &self,
        type_name: &str,
        req: CreateEntryRequest,
    ) -> Result<EntryRecord> {
        self.require_type(type_name)?;
        let mut tables = self.tables.write().await;
        let rows = tables.entries.entry(type_name.to_string()).or_default();

        let stable_id = req.stable_id.unwrap_or_else(Self::new_id);
        if rows
            .iter()
            .any(|r| r.stable_id == stable_id && r.locale == req.locale)
        {
            return Err(Error::Validation(format!(
                "duplicate entry ({}, {:?}) in {}",
                stable_id, req.locale, type_name
            )));
        }

        let record = EntryRecord {
            id: Self::new_id(),
            stable_id,
            locale: req.locale,
            published_at: req.published_at,
            data: req.data,
        };
        rows.push(record.clone());
        debug!(content_type = %type_name, stable_id = %record.stable_id, "memory_store: create_entry");
        Ok(record)
    }

    async fn update_entry(&self, type_name: &str, id: &str, data: JsonMap) -> Result<EntryRecord> {
        self.require_type(type_name)?;
        let mut tables = self.tables.write().await;
        let rows = tables
            .entries
            .get_mut(type_name)
            .ok_or_else(|| Error::NotFound(format!("entry {} in {}", id, type_name)))?;
        let row = rows
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| Error::NotFound(format!("entry {} in {}", id, type_name)))?;
        row.data = data;
        Ok(row.clone())
    }

    async fn delete_entry(&self, type_name: &str, id: &str) -> Result<()> {
        self.require_type(type_name)?;
        let mut tables = self.tables.write().await;
        let rows = tables
            .entries
            .get_mut(type_name)
            .ok_or_else(|| Error::NotFound(format!("entry {} in {}", id, type_name)))?;
        let before = rows.len();
        rows.retain(|r| r.id != id);
        if rows.len() == before {
            return Err(Error::NotFound(format!("entry {} in {}", id, type_name)));
        }
        Ok(())
    }

    async fn publish_entry(
        &self,
        type_name: &str,
        stable_id: &str,
        locale: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<()> {
        self.require_type(type_name)?;
        let mut tables = self.tables.write().await;
        let row = tables
            .entries
            .get_mut(type_name)
            .and_then(|rows| {
                rows.iter_mut()
                    .find(|r| r.stable_id == stable_id && r.locale.as_deref() == locale)
            })
            .ok_or_else(|| {
                Error::NotFound(format!("entry ({}, {:?}) in {}", stable_id, locale, type_name))
            })?;
        row.published_at = Some(at);
        Ok(())
    }

    async fn unpublish_entry(
        &self,
        type_name: &str,
        stable_id: &str,
        locale: Option<&str>,
    ) -> Result<()> {
        self.require_type(type_name)?;
        let mut tables = self.tables.write().await;
        let row = tables
            .entries
            .get_mut(type_name)
            .and_then(|rows| {
                rows.iter_mut()
                    .find(|r| r.stable_id == stable_id && r.locale.as_deref() == locale)
            })
            .ok_or_else(|| {
                Error::NotFound(format!("entry ({}, {:?}) in {}", stable_id, locale, type_name))
            })?;
        row.published_at = None;
        Ok(())
    }

    async fn find_asset_by_hash(&self, hash: &str) -> Result<Option<MediaAsset>> {
        let tables = self.tables.read().await;
        Ok(tables.assets.values().find(|a| a.hash == hash).cloned())
    }

    async fn create_asset(&self, req: CreateAssetRequest) -> Result<MediaAsset> {
        let mime = if req.mime.is_empty() {
            self.detect_mime(&req.file_name).await
        } else {
            req.mime
        };
        // A record without a content hash would be invisible to
        // deduplication; derive it from the payload when possible.
        let hash = if req.hash.is_empty() {
            match self.backend.read(&req.file_name).await {
                Ok(data) => compute_content_hash(&data),
                Err(_) => req.hash,
            }
        } else {
            req.hash
        };
        let mut tables = self.tables.write().await;
        let asset = MediaAsset {
            id: Self::new_id(),
            hash,
            name: req.name,
            file_name: req.file_name,
            mime,
            size: req.size,
            renditions: req.renditions,
        };
        tables.assets.insert(asset.id.clone(), asset.clone());
        debug!(asset_id = %asset.id, asset_hash = %asset.hash, "memory_store: create_asset");
        Ok(asset)
    }

    async fn delete_asset(&self, id: &str) -> Result<()> {
        let asset = {
            let mut tables = self.tables.write().await;
            tables
                .assets
                .remove(id)
                .ok_or_else(|| Error::NotFound(format!("asset {}", id)))?
        };
        // Payload removal is best-effort; the record is already gone.
        if let Err(e) = self.backend.delete(&asset.file_name).await {
            tracing::warn!(asset_id = %id, error = %e, "memory_store: payload removal failed");
        }
        for rendition in asset.renditions.values() {
            if let Err(e) = self.backend.delete(&rendition.file_name).await {
                tracing::warn!(asset_id = %id, error = %e, "memory_store: rendition removal failed");
            }
        }
        Ok(())
    }

    fn asset_dir(&self) -> &Path {
        &self.asset_dir
    }

    async fn layouts(&self) -> Result<BTreeMap<String, JsonValue>> {
        Ok(self.tables.read().await.layouts.clone())
    }

    async fn get_layout(&self, key: &str) -> Result<Option<JsonValue>> {
        Ok(self.tables.read().await.layouts.get(key).cloned())
    }

    async fn set_layout(&self, key: &str, value: JsonValue) -> Result<()> {
        self.tables
            .write()
            .await
            .layouts
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn locales(&self) -> Result<Vec<Locale>> {
        Ok(self.tables.read().await.locales.clone())
    }

    async fn create_locale(&self, locale: &Locale) -> Result<()> {
        let mut tables = self.tables.write().await;
        if !tables.locales.iter().any(|l| l.code == locale.code) {
            tables.locales.push(locale.clone());
        }
        Ok(())
    }
}
