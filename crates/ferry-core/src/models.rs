//! Core data models for ferry.
//!
//! These types are shared across all ferry crates and represent the portable
//! migration domain: content-type schemas, entries, media assets, and the
//! manifest that carries them between store instances.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// JSON object payload of an entry, keyed by attribute name.
pub type JsonMap = serde_json::Map<String, JsonValue>;

// =============================================================================
// SCHEMA TYPES
// =============================================================================

/// Instance cardinality of a content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    /// Many entries, each with its own stable identifier.
    Collection,
    /// At most one entry; fan-out by locale only.
    Singleton,
}

/// One typed attribute of a content-type or fragment schema.
///
/// This is the closed set of attribute kinds the engine dispatches on.
/// Anything a store exposes beyond these kinds is treated as `Scalar`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Attribute {
    /// Plain value (string, number, bool, date, rich text...). Copied as-is.
    Scalar,
    /// Reference to one or more media assets.
    Media {
        #[serde(default)]
        multiple: bool,
    },
    /// Reference to one or more entries of another content type.
    Relation {
        target: String,
        #[serde(default)]
        multiple: bool,
    },
    /// Single nested structure described by a named fragment schema.
    Fragment {
        fragment: String,
        #[serde(default)]
        repeatable: bool,
    },
    /// Ordered list of tagged fragments chosen from a fixed member set
    /// (mixed-content zone). Each element carries its member tag.
    FragmentUnion { members: Vec<String> },
}

/// Schema of a content type: a named set of typed attributes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentTypeSchema {
    pub name: String,
    pub kind: TypeKind,
    /// Whether the store tracks a separate draft and published copy for
    /// entries of this type. When false only one state exists.
    pub draft_publish: bool,
    pub attributes: BTreeMap<String, Attribute>,
}

impl ContentTypeSchema {
    pub fn is_singleton(&self) -> bool {
        self.kind == TypeKind::Singleton
    }
}

/// Schema of a reusable nested fragment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FragmentSchema {
    pub name: String,
    pub attributes: BTreeMap<String, Attribute>,
}

/// Full schema registry of a store instance: all content types and all
/// fragment schemas, used to resolve nested fragment and relation targets.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaRegistry {
    pub types: BTreeMap<String, ContentTypeSchema>,
    pub fragments: BTreeMap<String, FragmentSchema>,
}

impl SchemaRegistry {
    pub fn content_type(&self, name: &str) -> Option<&ContentTypeSchema> {
        self.types.get(name)
    }

    pub fn fragment(&self, name: &str) -> Option<&FragmentSchema> {
        self.fragments.get(name)
    }

    /// Names of all collection and singleton types, sorted.
    pub fn type_names(&self) -> Vec<String> {
        self.types.keys().cloned().collect()
    }
}

// =============================================================================
// ENTRY TYPES
// =============================================================================

/// Publication state used to filter store queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublicationState {
    /// Latest working copy.
    Draft,
    /// Live copy, timestamped.
    Published,
}

/// An entry as returned by a store instance.
///
/// `id` is the store-local row identifier and is never portable; it is
/// discarded on export. `stable_id` survives transfer between instances.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryRecord {
    pub id: String,
    pub stable_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    pub data: JsonMap,
}

/// An entry in manifest form: locale/state-merged, no store-local id.
///
/// `published_at` is set if and only if a published counterpart existed for
/// this exact (stable_id, locale) pair at export time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedEntry {
    pub stable_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    pub data: JsonMap,
}

// =============================================================================
// MEDIA TYPES
// =============================================================================

/// A named derived rendition of a media asset (e.g. a resized variant).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaRendition {
    pub hash: String,
    pub file_name: String,
    pub mime: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
}

/// A binary media asset.
///
/// Identity for deduplication purposes is `hash` (content hash), never the
/// store-local `id`. The `id` travels in the manifest only so an import run
/// can map source ids to destination ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaAsset {
    /// Store-local identifier at the instance the asset was read from.
    #[serde(default)]
    pub id: String,
    pub hash: String,
    /// Logical name as shown to users.
    pub name: String,
    /// Basename of the primary file in the uploads directory.
    pub file_name: String,
    pub mime: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub renditions: BTreeMap<String, MediaRendition>,
}

// =============================================================================
// LOCALE TYPES
// =============================================================================

/// A locale definition known to a store instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Locale {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub is_default: bool,
}

// =============================================================================
// MANIFEST
// =============================================================================

/// The portable export artifact.
///
/// Serialized as `data.json` at the root of an export archive, next to an
/// `uploads/` directory holding the primary and rendition files for every
/// media asset, named by basename.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub created_at: DateTime<Utc>,
    /// Exported entries per content-type name, already locale/state-merged.
    pub entries: BTreeMap<String, Vec<ExportedEntry>>,
    /// Deduplicated media assets referenced anywhere in `entries`.
    #[serde(default)]
    pub media: Vec<MediaAsset>,
    /// Opaque per-type/per-fragment view configuration blobs, passed
    /// through verbatim.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub layouts: BTreeMap<String, JsonValue>,
    /// Locale definitions in use at export time.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locales: Vec<Locale>,
}

impl Manifest {
    pub fn new(created_at: DateTime<Utc>) -> Self {
        Self {
            created_at,
            entries: BTreeMap::new(),
            media: Vec::new(),
            layouts: BTreeMap::new(),
            locales: Vec::new(),
        }
    }

    /// Total number of exported entries across all content types.
    pub fn entry_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// Whether the manifest carries nothing to import.
    pub fn is_empty(&self) -> bool {
        self.entry_count() == 0 && self.media.is_empty() && self.layouts.is_empty()
    }
}
