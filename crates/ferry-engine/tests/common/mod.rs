//! Shared fixtures for the engine integration tests.
#![allow(dead_code)]
//!
//! Builds a small but representative content graph: a `post` collection
//! with media, relations, an embedded fragment and a mixed-content zone; a
//! publish-tracking-disabled `author` collection; a `tag` collection; and a
//! `homepage` singleton referencing a post.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde_json::{json, Value as JsonValue};

use ferry_core::{
    Attribute, ContentStore, ContentTypeSchema, CreateEntryRequest, FragmentSchema, JsonMap,
    Locale, SchemaRegistry, TypeKind,
};
use ferry_store::MemoryStore;

pub fn registry() -> SchemaRegistry {
    let mut registry = SchemaRegistry::default();

    registry.types.insert(
        "post".to_string(),
        ContentTypeSchema {
            name: "post".to_string(),
            kind: TypeKind::Collection,
            draft_publish: true,
            attributes: BTreeMap::from([
                ("title".to_string(), Attribute::Scalar),
                ("cover".to_string(), Attribute::Media { multiple: false }),
                (
                    "author".to_string(),
                    Attribute::Relation {
                        target: "author".to_string(),
                        multiple: false,
                    },
                ),
                (
                    "related".to_string(),
                    Attribute::Relation {
                        target: "post".to_string(),
                        multiple: true,
                    },
                ),
                (
                    "seo".to_string(),
                    Attribute::Fragment {
                        fragment: "seo".to_string(),
                        repeatable: false,
                    },
                ),
                (
                    "blocks".to_string(),
                    Attribute::FragmentUnion {
                        members: vec!["quote".to_string(), "gallery".to_string()],
                    },
                ),
            ]),
        },
    );

    registry.types.insert(
        "author".to_string(),
        ContentTypeSchema {
            name: "author".to_string(),
            kind: TypeKind::Collection,
            draft_publish: false,
            attributes: BTreeMap::from([
                ("name".to_string(), Attribute::Scalar),
                ("avatar".to_string(), Attribute::Media { multiple: false }),
            ]),
        },
    );

    registry.types.insert(
        "tag".to_string(),
        ContentTypeSchema {
            name: "tag".to_string(),
            kind: TypeKind::Collection,
            draft_publish: true,
            attributes: BTreeMap::from([("name".to_string(), Attribute::Scalar)]),
        },
    );

    registry.types.insert(
        "homepage".to_string(),
        ContentTypeSchema {
            name: "homepage".to_string(),
            kind: TypeKind::Singleton,
            draft_publish: true,
            attributes: BTreeMap::from([
                ("headline".to_string(), Attribute::Scalar),
                (
                    "featured".to_string(),
                    Attribute::Relation {
                        target: "post".to_string(),
                        multiple: false,
                    },
                ),
            ]),
        },
    );

    registry.fragments.insert(
        "seo".to_string(),
        FragmentSchema {
            name: "seo".to_string(),
            attributes: BTreeMap::from([
                ("meta_title".to_string(), Attribute::Scalar),
                ("image".to_string(), Attribute::Media { multiple: false }),
            ]),
        },
    );
    registry.fragments.insert(
        "quote".to_string(),
        FragmentSchema {
            name: "quote".to_string(),
            attributes: BTreeMap::from([
                ("text".to_string(), Attribute::Scalar),
                ("attribution".to_string(), Attribute::Scalar),
            ]),
        },
    );
    registry.fragments.insert(
        "gallery".to_string(),
        FragmentSchema {
            name: "gallery".to_string(),
            attributes: BTreeMap::from([(
                "images".to_string(),
                Attribute::Media { multiple: true },
            )]),
        },
    );

    registry
}

/// An embedded media reference value as a populating store would return it.
pub fn media_value(id: &str, hash: &str, file_name: &str) -> JsonValue {
    json!({
        "id": id,
        "hash": hash,
        "name": file_name.trim_end_matches(".png"),
        "file_name": file_name,
        "mime": "image/png",
        "size": 64,
    })
}

pub fn object(value: JsonValue) -> JsonMap {
    value.as_object().cloned().expect("object fixture")
}

/// Seed a source store with the standard graph and write its binary
/// payloads under `<asset_dir>`.
pub async fn seed_source(asset_dir: &Path) -> MemoryStore {
    let store = MemoryStore::new(registry(), asset_dir);

    std::fs::create_dir_all(asset_dir).unwrap();
    std::fs::write(asset_dir.join("cover.png"), b"cover-bytes").unwrap();
    std::fs::write(asset_dir.join("cover_thumb.png"), b"cover-thumb-bytes").unwrap();
    std::fs::write(asset_dir.join("seo.png"), b"seo-bytes").unwrap();
    std::fs::write(asset_dir.join("avatar.png"), b"avatar-bytes").unwrap();

    store
        .create_locale(&Locale {
            code: "en".to_string(),
            name: "English".to_string(),
            is_default: true,
        })
        .await
        .unwrap();
    store
        .create_locale(&Locale {
            code: "fr".to_string(),
            name: "French".to_string(),
            is_default: false,
        })
        .await
        .unwrap();

    store
        .set_layout("post", json!({"columns": ["title", "author"]}))
        .await
        .unwrap();
    store
        .set_layout("seo", json!({"collapsed": true}))
        .await
        .unwrap();

    store
        .create_entry(
            "author",
            CreateEntryRequest {
                stable_id: Some("a1".to_string()),
                locale: None,
                published_at: Some(Utc::now()),
                data: object(json!({
                    "name": "Ada",
                    "avatar": media_value("m-avatar", "blake3:avatar", "avatar.png"),
                })),
            },
        )
        .await
        .unwrap();

    let cover = json!({
        "id": "m-cover",
        "hash": "abc123",
        "name": "cover",
        "file_name": "cover.png",
        "mime": "image/png",
        "size": 64,
        "renditions": {
            "thumbnail": {
                "hash": "abc123-thumb",
                "file_name": "cover_thumb.png",
                "mime": "image/png",
            }
        }
    });

    store
        .create_entry(
            "post",
            CreateEntryRequest {
                stable_id: Some("p1".to_string()),
                locale: Some("en".to_string()),
                published_at: Some(published_at()),
                data: object(json!({
                    "title": "Hello",
                    "cover": cover.clone(),
                    "author": {"stable_id": "a1", "name": "Ada"},
                    "related": [{"stable_id": "p2"}],
                    "seo": {
                        "meta_title": "Hello SEO",
                        "image": media_value("m-seo", "blake3:seo", "seo.png"),
                    },
                    "blocks": [
                        {"__fragment": "quote", "text": "Ship it", "attribution": "Ada"},
                        {"__fragment": "gallery", "images": [cover]},
                    ],
                })),
            },
        )
        .await
        .unwrap();

    // Draft-only French variant of the same logical document.
    store
        .create_entry(
            "post",
            CreateEntryRequest {
                stable_id: Some("p1".to_string()),
                locale: Some("fr".to_string()),
                published_at: None,
                data: object(json!({"title": "Bonjour"})),
            },
        )
        .await
        .unwrap();

    // p2 references p1 back: the graph is cyclic.
    store
        .create_entry(
            "post",
            CreateEntryRequest {
                stable_id: Some("p2".to_string()),
                locale: Some("en".to_string()),
                published_at: None,
                data: object(json!({
                    "title": "Second",
                    "related": [{"stable_id": "p1"}],
                })),
            },
        )
        .await
        .unwrap();

    store
        .create_entry(
            "tag",
            CreateEntryRequest {
                stable_id: Some("t1".to_string()),
                locale: None,
                published_at: None,
                data: object(json!({"name": "news"})),
            },
        )
        .await
        .unwrap();

    store
        .create_entry(
            "homepage",
            CreateEntryRequest {
                stable_id: Some("home".to_string()),
                locale: Some("en".to_string()),
                published_at: Some(published_at()),
                data: object(json!({
                    "headline": "Welcome",
                    "featured": {"stable_id": "p1"},
                })),
            },
        )
        .await
        .unwrap();

    store
}

/// Fixed publish timestamp so assertions can compare exact values.
pub fn published_at() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-08-01T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

/// Fresh empty destination store sharing the fixture registry.
pub fn empty_dest(asset_dir: &Path) -> MemoryStore {
    MemoryStore::new(registry(), asset_dir)
}
