//! Directory-persisted content store.
//!
//! `FileStore` is a [`MemoryStore`] loaded from and flushed back to one
//! store directory:
//!
//! ```text
//! <root>/schema.json    content-type and fragment schemas (required)
//! <root>/records.json   entries, asset records, layouts, locales
//! <root>/uploads/       media binary payloads, named by basename
//! ```
//!
//! This is the store instance the `ferry` binary operates against. Writes
//! stay in memory until [`FileStore::flush`] is called, so a dry run that
//! never flushes leaves the directory untouched.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

use ferry_core::defaults::UPLOADS_DIR;
use ferry_core::{
    ContentStore, CreateAssetRequest, CreateEntryRequest, EntryRecord, Error, JsonMap, Locale,
    MediaAsset, PopulationPlan, PublicationState, Result, SchemaRegistry,
};

use crate::memory::{MemoryStore, Tables};

const SCHEMA_FILE: &str = "schema.json";
const RECORDS_FILE: &str = "records.json";

/// Content store persisted as JSON files in one directory.
#[derive(Debug)]
pub struct FileStore {
    inner: MemoryStore,
    root: PathBuf,
}

impl FileStore {
    /// Open a store directory. `schema.json` must exist; `records.json` is
    /// optional (a schema-only directory opens as an empty store).
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();

        let schema_path = root.join(SCHEMA_FILE);
        let schema_text = fs::read_to_string(&schema_path).await.map_err(|e| {
            Error::Config(format!(
                "cannot read store schema {}: {}",
                schema_path.display(),
                e
            ))
        })?;
        let registry: SchemaRegistry = serde_json::from_str(&schema_text)
            .map_err(|e| Error::Config(format!("invalid schema.json: {}", e)))?;

        let records_path = root.join(RECORDS_FILE);
        let tables = match fs::read_to_string(&records_path).await {
            Ok(text) => serde_json::from_str(&text)
                .map_err(|e| Error::Config(format!("invalid records.json: {}", e)))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Tables::default(),
            Err(e) => return Err(e.into()),
        };

        let inner = MemoryStore::with_tables(registry, root.join(UPLOADS_DIR), tables);
        info!(root = %root.display(), "file_store: opened");
        Ok(Self { inner, root })
    }

    /// Write all tables back to `records.json`.
    pub async fn flush(&self) -> Result<()> {
        let tables = self.inner.snapshot().await;
        let text = serde_json::to_string_pretty(&tables)?;
        fs::create_dir_all(&self.root).await?;
        fs::write(self.root.join(RECORDS_FILE), text).await?;
        info!(root = %self.root.display(), "file_store: flushed");
        Ok(())
    }

    /// The store directory this instance was opened from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Round-trip the asset storage backend to surface filesystem problems
    /// before any mutation runs.
    pub async fn validate(&self) -> Result<()> {
        self.inner.validate().await
    }
}

#[async_trait]
impl ContentStore for FileStore {
    async fn registry(&self) -> Result<SchemaRegistry> {
        self.inner.registry().await
    }

    async fn fetch_entries(
        &self,
        type_name: &str,
        plan: &PopulationPlan,
        state: PublicationState,
    ) -> Result<Vec<EntryRecord>> {
        self.inner.fetch_entries(type_name, plan, state).await
    }

    async fn find_entry(
        &self,
        type_name: &str,
        stable_id: &str,
        locale: Option<&str>,
    ) -> Result<Option<EntryRecord>> {
        self.inner.find_entry(type_name, stable_id, locale).await
    }

    async fn first_entry(
        &self,
        type_name: &str,
        locale: Option<&str>,
    ) -> Result<Option<EntryRecord>> {
        self.inner.first_entry(type_name, locale).await
    }

    async fn create_entry(
        &self,
        type_name: &str,
        req: CreateEntryRequest,
    ) -> Result<EntryRecord> {
        self.inner.create_entry(type_name, req).await
    }

    async fn update_entry(&self, type_name: &str, id: &str, data: JsonMap) -> Result<EntryRecord> {
        self.inner.update_entry(type_name, id, data).await
    }

    async fn delete_entry(&self, type_name: &str, id: &str) -> Result<()> {
        self.inner.delete_entry(type_name, id).await
    }

    async fn publish_entry(
        &self,
        type_name: &str,
        stable_id: &str,
        locale: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<()> {
        self.inner.publish_entry(type_name, stable_id, locale, at).await
    }

    async fn unpublish_entry(
        &self,
        type_name: &str,
        stable_id: &str,
        locale: Option<&str>,
    ) -> Result<()> {
        self.inner.unpublish_entry(type_name, stable_id, locale).await
    }

    async fn find_asset_by_hash(&self, hash: &str) -> Result<Option<MediaAsset>> {
        self.inner.find_asset_by_hash(hash).await
    }

    async fn create_asset(&self, req: CreateAssetRequest) -> Result<MediaAsset> {
        self.inner.create_asset(req).await
    }

    async fn delete_asset(&self, id: &str) -> Result<()> {
        self.inner.delete_asset(id).await
    }

    fn asset_dir(&self) -> &Path {
        self.inner.asset_dir()
    }

    async fn layouts(&self) -> Result<BTreeMap<String, JsonValue>> {
        self.inner.layouts().await
    }

    async fn get_layout(&self, key: &str) -> Result<Option<JsonValue>> {
        self.inner.get_layout(key).await
    }

    async fn set_layout(&self, key: &str, value: JsonValue) -> Result<()> {
        self.inner.set_layout(key, value).await
    }

    async fn locales(&self) -> Result<Vec<Locale>> {
        self.inner.locales().await
    }

    async fn create_locale(&self, locale: &Locale) -> Result<()> {
        self.inner.create_locale(locale).await
    }
}
