//! Round-trip identity: exporting a content graph and importing it into an
//! empty destination yields entries with the same stable identifiers,
//! locales, publish states, and equivalent field values — with media
//! re-addressed by content hash and relations rewired to destination ids.

mod common;

use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;

use ferry_core::ContentStore;
use ferry_engine::{archive, ExportOptions, Exporter, ImportOptions, Importer};

#[tokio::test]
async fn test_full_round_trip_through_archive() {
    let work = TempDir::new().unwrap();
    let source_uploads = work.path().join("source-uploads");
    let source = Arc::new(common::seed_source(&source_uploads).await);

    // Export everything.
    let exporter = Exporter::new(source.clone());
    let manifest = exporter
        .export(&ExportOptions {
            all: true,
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(manifest.entries["post"].len(), 3);
    assert_eq!(manifest.entries["author"].len(), 1);
    assert_eq!(manifest.entries["homepage"].len(), 1);
    // Media deduplicated by source-local id: cover, seo image, avatar.
    assert_eq!(manifest.media.len(), 3);
    assert_eq!(manifest.locales.len(), 2);
    assert!(manifest.layouts.contains_key("post"));
    assert!(manifest.layouts.contains_key("seo"));

    // Pack through the real archive and load it back.
    let staging = work.path().join("staging");
    let staged = archive::stage_uploads(&manifest, &source_uploads, &staging).unwrap();
    // cover + thumbnail rendition + seo image + avatar
    assert_eq!(staged, 4);
    let archive_path = work.path().join("export.tar.gz");
    archive::pack(&manifest, Some(&staging), &archive_path).unwrap();
    let loaded = archive::load_source(&archive_path).unwrap();

    // Import into an empty destination.
    let dest_uploads = work.path().join("dest-uploads");
    let dest = Arc::new(common::empty_dest(&dest_uploads));
    let importer = Importer::new(
        dest.clone(),
        ImportOptions {
            source_uploads: loaded.uploads.clone(),
            ..Default::default()
        },
    );
    let report = importer.run(&loaded.manifest).await.unwrap();
    assert_eq!(report.failed(), 0, "report: {}", report);
    assert_eq!(report.created(), 6);

    // Identity: stable ids, locales, publish states, scalar values.
    let p1_en = dest
        .find_entry("post", "p1", Some("en"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(p1_en.data["title"], "Hello");
    assert_eq!(p1_en.published_at, Some(common::published_at()));

    let p1_fr = dest
        .find_entry("post", "p1", Some("fr"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(p1_fr.data["title"], "Bonjour");
    assert!(p1_fr.published_at.is_none());

    // Media: re-created at the destination, addressed by content hash.
    let cover = dest.find_asset_by_hash("abc123").await.unwrap().unwrap();
    assert_eq!(p1_en.data["cover"], json!(cover.id));
    assert_eq!(
        std::fs::read(dest_uploads.join("cover.png")).unwrap(),
        b"cover-bytes"
    );
    assert_eq!(
        std::fs::read(dest_uploads.join("cover_thumb.png")).unwrap(),
        b"cover-thumb-bytes"
    );

    // Relations: rewired to destination store-local ids.
    let author = dest.find_entry("author", "a1", None).await.unwrap().unwrap();
    assert_eq!(p1_en.data["author"], json!(author.id));
    // Publish tracking disabled: born published.
    assert!(author.published_at.is_some());

    let p2 = dest
        .find_entry("post", "p2", Some("en"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(p1_en.data["related"], json!([p2.id]));
    assert_eq!(p2.data["related"], json!([p1_en.id]));

    // Embedded fragment: values preserved, media inside resolved.
    assert_eq!(p1_en.data["seo"]["meta_title"], "Hello SEO");
    let seo_image = dest
        .find_asset_by_hash("blake3:seo")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(p1_en.data["seo"]["image"], json!(seo_image.id));

    // Fragment union: tags preserved, per-member normalization applied.
    let blocks = p1_en.data["blocks"].as_array().unwrap();
    assert_eq!(blocks[0]["__fragment"], "quote");
    assert_eq!(blocks[0]["text"], "Ship it");
    assert_eq!(blocks[1]["__fragment"], "gallery");
    assert_eq!(blocks[1]["images"], json!([cover.id]));

    // Singleton: created per locale with its relation resolved.
    let home = dest
        .first_entry("homepage", Some("en"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(home.stable_id, "home");
    assert_eq!(home.data["featured"], json!(p1_en.id));
    assert_eq!(home.published_at, Some(common::published_at()));

    // Ambient config: locales and layouts carried over.
    assert_eq!(dest.locales().await.unwrap().len(), 2);
    assert_eq!(
        dest.get_layout("post").await.unwrap().unwrap(),
        json!({"columns": ["title", "author"]})
    );

    // Exactly the three manifest assets exist.
    assert_eq!(dest.asset_count().await, 3);
}
