//! Core traits for ferry abstractions.
//!
//! The engine consumes source and destination store instances exclusively
//! through [`ContentStore`], enabling pluggable backends and testability.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::Result;
use crate::models::*;
use crate::plan::PopulationPlan;

// =============================================================================
// CONTENT STORE TRAIT
// =============================================================================

/// Request for creating a new entry.
#[derive(Debug, Clone)]
pub struct CreateEntryRequest {
    /// Stable identifier to tag the entry with. `None` lets the store
    /// generate one; an import run always supplies the source's identifier
    /// to preserve cross-reference integrity.
    pub stable_id: Option<String>,
    pub locale: Option<String>,
    /// Initial publish timestamp. Only meaningful for content types with
    /// publish tracking disabled, which have no draft channel and must be
    /// created directly in published state.
    pub published_at: Option<DateTime<Utc>>,
    pub data: JsonMap,
}

/// Request for creating a media asset record from portable metadata.
///
/// The binary payload is expected to already exist under the destination's
/// asset directory; this call only creates the record.
#[derive(Debug, Clone)]
pub struct CreateAssetRequest {
    pub hash: String,
    pub name: String,
    pub file_name: String,
    pub mime: String,
    pub size: Option<i64>,
    pub renditions: BTreeMap<String, MediaRendition>,
}

/// One instance of a schema-described, document-oriented content store.
///
/// Entries are addressed by (stable identifier, locale); media assets by
/// store-local id for mutation and by content hash for deduplication.
/// All mutating operations may be rejected per item; callers treat such
/// rejections as per-entry failures, not fatal errors.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Snapshot of the store's schema registry.
    async fn registry(&self) -> Result<SchemaRegistry>;

    /// Fetch entries of a content type across all locales, filtered by
    /// publication state, populated according to `plan`.
    async fn fetch_entries(
        &self,
        type_name: &str,
        plan: &PopulationPlan,
        state: PublicationState,
    ) -> Result<Vec<EntryRecord>>;

    /// Look up one entry by stable identifier. `locale: None` matches any
    /// locale variant (first match wins).
    async fn find_entry(
        &self,
        type_name: &str,
        stable_id: &str,
        locale: Option<&str>,
    ) -> Result<Option<EntryRecord>>;

    /// Look up the single entry of a singleton type for a locale.
    /// `locale: None` matches any variant.
    async fn first_entry(&self, type_name: &str, locale: Option<&str>)
        -> Result<Option<EntryRecord>>;

    /// Create a new entry. Draft state unless `published_at` is set.
    async fn create_entry(&self, type_name: &str, req: CreateEntryRequest)
        -> Result<EntryRecord>;

    /// Replace the payload of an existing entry, addressed by store-local id.
    async fn update_entry(&self, type_name: &str, id: &str, data: JsonMap) -> Result<EntryRecord>;

    /// Delete an entry by store-local id.
    async fn delete_entry(&self, type_name: &str, id: &str) -> Result<()>;

    /// Publish the (stable identifier, locale) variant with the given
    /// timestamp.
    async fn publish_entry(
        &self,
        type_name: &str,
        stable_id: &str,
        locale: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<()>;

    /// Revert the (stable identifier, locale) variant to draft state.
    async fn unpublish_entry(
        &self,
        type_name: &str,
        stable_id: &str,
        locale: Option<&str>,
    ) -> Result<()>;

    // ─── Media assets ──────────────────────────────────────────────────────

    /// Look up an asset whose content hash matches.
    async fn find_asset_by_hash(&self, hash: &str) -> Result<Option<MediaAsset>>;

    /// Create an asset record from portable metadata.
    async fn create_asset(&self, req: CreateAssetRequest) -> Result<MediaAsset>;

    /// Delete an asset record by store-local id.
    async fn delete_asset(&self, id: &str) -> Result<()>;

    /// Directory holding asset binary payloads (primary files and
    /// renditions, named by basename).
    fn asset_dir(&self) -> &Path;

    // ─── View/layout configuration ─────────────────────────────────────────

    /// All view/layout configuration blobs, keyed by type or fragment name.
    async fn layouts(&self) -> Result<BTreeMap<String, JsonValue>>;

    /// Read one layout blob.
    async fn get_layout(&self, key: &str) -> Result<Option<JsonValue>>;

    /// Write one layout blob verbatim.
    async fn set_layout(&self, key: &str, value: JsonValue) -> Result<()>;

    // ─── Locales ───────────────────────────────────────────────────────────

    /// Locale definitions known to this instance.
    async fn locales(&self) -> Result<Vec<Locale>>;

    /// Register a locale definition.
    async fn create_locale(&self, locale: &Locale) -> Result<()>;
}
