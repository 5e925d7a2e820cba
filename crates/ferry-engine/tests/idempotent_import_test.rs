//! Idempotent re-import: running the same import twice against one
//! destination updates instead of creating, and deduplicates media by
//! content hash — no duplicate entries, no duplicate assets.

mod common;

use std::sync::Arc;

use tempfile::TempDir;

use ferry_core::ContentStore;
use ferry_engine::{archive, ExportOptions, Exporter, ImportOptions, Importer};

#[tokio::test]
async fn test_second_import_updates_instead_of_creating() {
    let work = TempDir::new().unwrap();
    let source_uploads = work.path().join("source-uploads");
    let source = Arc::new(common::seed_source(&source_uploads).await);

    let manifest = Exporter::new(source.clone())
        .export(&ExportOptions {
            all: true,
            ..Default::default()
        })
        .await
        .unwrap();

    let staging = work.path().join("staging");
    archive::stage_uploads(&manifest, &source_uploads, &staging).unwrap();

    let dest = Arc::new(common::empty_dest(&work.path().join("dest-uploads")));
    let options = ImportOptions {
        source_uploads: Some(staging.clone()),
        ..Default::default()
    };

    let first = Importer::new(dest.clone(), options.clone())
        .run(&manifest)
        .await
        .unwrap();
    assert_eq!(first.failed(), 0, "first run: {}", first);
    assert_eq!(first.created(), 6);
    assert_eq!(first.updated(), 0);

    let entries_after_first = dest.entry_count().await;
    let assets_after_first = dest.asset_count().await;
    assert_eq!(entries_after_first, 6);
    assert_eq!(assets_after_first, 3);

    let second = Importer::new(dest.clone(), options)
        .run(&manifest)
        .await
        .unwrap();
    assert_eq!(second.failed(), 0, "second run: {}", second);
    assert_eq!(second.created(), 0);
    assert_eq!(second.updated(), 6);
    // Media resolved purely by hash lookup the second time.
    assert_eq!(second.media.created, 0);
    assert!(second.media.reused > 0);

    assert_eq!(dest.entry_count().await, entries_after_first);
    assert_eq!(dest.asset_count().await, assets_after_first);

    // Publish states survive the re-import: the published variant is
    // re-published, the draft-only variant stays draft.
    let p1_en = dest
        .find_entry("post", "p1", Some("en"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(p1_en.published_at, Some(common::published_at()));
    let p1_fr = dest
        .find_entry("post", "p1", Some("fr"))
        .await
        .unwrap()
        .unwrap();
    assert!(p1_fr.published_at.is_none());
}
