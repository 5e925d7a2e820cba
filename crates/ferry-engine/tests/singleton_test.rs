//! Singleton reconciliation: one-step upsert per source locale against
//! whatever single local entry the destination holds.

mod common;

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tempfile::TempDir;

use ferry_core::{ContentStore, CreateEntryRequest, ExportedEntry, Manifest};
use ferry_engine::{ImportOptions, Importer};

fn homepage_entry(locale: &str, headline: &str) -> ExportedEntry {
    ExportedEntry {
        stable_id: "home".to_string(),
        locale: Some(locale.to_string()),
        published_at: None,
        data: common::object(json!({"headline": headline})),
    }
}

#[tokio::test]
async fn test_existing_local_singleton_is_updated_in_place() {
    let work = TempDir::new().unwrap();
    let dest = Arc::new(common::empty_dest(&work.path().join("uploads")));

    // The destination's singleton has a different stable identifier; it is
    // still the one local entry for this type and locale.
    let local = dest
        .create_entry(
            "homepage",
            CreateEntryRequest {
                stable_id: Some("local-home".to_string()),
                locale: Some("en".to_string()),
                published_at: None,
                data: common::object(json!({"headline": "local"})),
            },
        )
        .await
        .unwrap();

    let mut manifest = Manifest::new(Utc::now());
    manifest
        .entries
        .insert("homepage".to_string(), vec![homepage_entry("en", "imported")]);

    let report = Importer::new(dest.clone(), ImportOptions::default())
        .run(&manifest)
        .await
        .unwrap();
    assert_eq!(report.failed(), 0);
    assert_eq!(report.updated(), 1);
    assert_eq!(report.created(), 0);

    // Updated in place: same row, new payload, no second entry.
    let home = dest
        .first_entry("homepage", Some("en"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(home.id, local.id);
    assert_eq!(home.data["headline"], "imported");
    assert_eq!(dest.entry_count().await, 1);
}

#[tokio::test]
async fn test_singleton_fans_out_by_locale_only() {
    let work = TempDir::new().unwrap();
    let dest = Arc::new(common::empty_dest(&work.path().join("uploads")));

    let mut manifest = Manifest::new(Utc::now());
    manifest.entries.insert(
        "homepage".to_string(),
        vec![
            homepage_entry("en", "Welcome"),
            homepage_entry("fr", "Bienvenue"),
        ],
    );

    let report = Importer::new(dest.clone(), ImportOptions::default())
        .run(&manifest)
        .await
        .unwrap();
    assert_eq!(report.failed(), 0);
    assert_eq!(report.created(), 2);

    let en = dest
        .first_entry("homepage", Some("en"))
        .await
        .unwrap()
        .unwrap();
    let fr = dest
        .first_entry("homepage", Some("fr"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(en.data["headline"], "Welcome");
    assert_eq!(fr.data["headline"], "Bienvenue");
    assert_eq!(en.stable_id, fr.stable_id);
}

#[tokio::test]
async fn test_singleton_relation_to_collection_entry_resolves() {
    let work = TempDir::new().unwrap();
    let dest = Arc::new(common::empty_dest(&work.path().join("uploads")));

    let mut manifest = Manifest::new(Utc::now());
    manifest.entries.insert(
        "post".to_string(),
        vec![ExportedEntry {
            stable_id: "p1".to_string(),
            locale: Some("en".to_string()),
            published_at: None,
            data: common::object(json!({"title": "Featured"})),
        }],
    );
    manifest.entries.insert(
        "homepage".to_string(),
        vec![ExportedEntry {
            stable_id: "home".to_string(),
            locale: Some("en".to_string()),
            published_at: None,
            data: common::object(json!({
                "headline": "Welcome",
                "featured": {"stable_id": "p1"},
            })),
        }],
    );

    let report = Importer::new(dest.clone(), ImportOptions::default())
        .run(&manifest)
        .await
        .unwrap();
    assert_eq!(report.failed(), 0);

    // The singleton pass runs after phase 1, so the post already exists.
    let p1 = dest
        .find_entry("post", "p1", Some("en"))
        .await
        .unwrap()
        .unwrap();
    let home = dest
        .first_entry("homepage", Some("en"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(home.data["featured"], json!(p1.id));
}
