//! Media resolver: content-addressed asset reconciliation.
//!
//! Owns the per-run mapping from source asset identifiers to destination
//! identifiers. Resolution is a three-step procedure:
//!
//! 1. already mapped → return the mapping;
//! 2. destination has an asset with the same content hash → reuse it;
//! 3. source bytes are available next to the manifest → copy the primary
//!    file and renditions into the destination's asset directory and create
//!    a record from the portable metadata.
//!
//! Anything else resolves to `None` and the caller drops the field rather
//! than writing a dangling reference. The resolver is invoked both in bulk
//! (pre-pass over the manifest media list) and just-in-time from payload
//! normalization, so a partial manifest or hash mismatch never leaves an
//! embedded reference unresolvable by construction.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, trace, warn};

use ferry_core::{
    ContentStore, CreateAssetRequest, Error, Manifest, MediaAsset, Result,
};

use crate::report::MediaStats;

#[derive(Default)]
struct ResolverState {
    /// Source store-local id → destination store-local id.
    map: HashMap<String, String>,
    stats: MediaStats,
}

/// Per-run media asset resolver.
///
/// One instance lives for exactly one import run; the identifier map is
/// engine-local state and is discarded with the resolver.
pub struct MediaResolver {
    dest: Arc<dyn ContentStore>,
    /// Directory of source binary payloads (the extracted `uploads/`), when
    /// available.
    source_uploads: Option<PathBuf>,
    dry_run: bool,
    state: Mutex<ResolverState>,
}

impl MediaResolver {
    pub fn new(
        dest: Arc<dyn ContentStore>,
        source_uploads: Option<PathBuf>,
        dry_run: bool,
    ) -> Self {
        Self {
            dest,
            source_uploads,
            dry_run,
            state: Mutex::new(ResolverState::default()),
        }
    }

    /// Counters accumulated so far.
    pub async fn stats(&self) -> MediaStats {
        self.state.lock().await.stats
    }

    /// Bulk pre-pass: resolve every asset in the manifest's media list.
    /// Per-asset failures are recorded and skipped.
    pub async fn import_all(&self, manifest: &Manifest) {
        for asset in &manifest.media {
            match self.resolve(asset).await {
                Ok(Some(_)) => {}
                Ok(None) => {}
                Err(e) => {
                    warn!(
                        asset_id = %asset.id,
                        asset_hash = %asset.hash,
                        error = %e,
                        "media: bulk resolution failed"
                    );
                    self.state.lock().await.stats.failed += 1;
                }
            }
        }
    }

    /// Resolve an embedded media reference value from an entry payload.
    ///
    /// Returns the destination identifier, or `None` when the value does
    /// not parse as an asset reference or cannot be resolved.
    pub async fn resolve_value(&self, value: &serde_json::Value) -> Result<Option<String>> {
        let asset: MediaAsset = match serde_json::from_value(value.clone()) {
            Ok(asset) => asset,
            Err(e) => {
                warn!(error = %e, "media: unparseable embedded reference dropped");
                return Ok(None);
            }
        };
        self.resolve(&asset).await
    }

    /// Resolve one asset reference to a destination identifier.
    pub async fn resolve(&self, asset: &MediaAsset) -> Result<Option<String>> {
        // Step 1: already mapped.
        if !asset.id.is_empty() {
            if let Some(mapped) = self.state.lock().await.map.get(&asset.id) {
                return Ok(Some(mapped.clone()));
            }
        }

        // Step 2: deduplicate by content hash against the destination.
        if let Some(existing) = self.dest.find_asset_by_hash(&asset.hash).await? {
            debug!(asset_hash = %asset.hash, dest_id = %existing.id, "media: reusing destination asset");
            let mut state = self.state.lock().await;
            state.stats.reused += 1;
            if !asset.id.is_empty() {
                state.map.insert(asset.id.clone(), existing.id.clone());
            }
            return Ok(Some(existing.id));
        }

        // Step 3: create from source bytes, when we have them.
        let Some(source_dir) = self.source_uploads.as_deref() else {
            self.note_missing(asset).await;
            return Ok(None);
        };
        let primary = source_dir.join(&asset.file_name);
        if !fs::try_exists(&primary).await? {
            self.note_missing(asset).await;
            return Ok(None);
        }

        if self.dry_run {
            // Simulate the creation: hand out a placeholder identifier so
            // counting and downstream normalization behave as they would.
            let placeholder = format!("dry-run:{}", asset.hash);
            let mut state = self.state.lock().await;
            state.stats.created += 1;
            if !asset.id.is_empty() {
                state.map.insert(asset.id.clone(), placeholder.clone());
            }
            return Ok(Some(placeholder));
        }

        let dest_dir = self.dest.asset_dir().to_path_buf();
        copy_payload(&primary, &dest_dir, &asset.file_name).await?;

        let mut renditions = std::collections::BTreeMap::new();
        for (key, rendition) in &asset.renditions {
            let src = source_dir.join(&rendition.file_name);
            if !fs::try_exists(&src).await? {
                warn!(
                    asset_hash = %asset.hash,
                    rendition = %key,
                    "media: rendition payload missing, dropped"
                );
                continue;
            }
            copy_payload(&src, &dest_dir, &rendition.file_name).await?;
            renditions.insert(key.clone(), rendition.clone());
        }

        let created = self
            .dest
            .create_asset(CreateAssetRequest {
                hash: asset.hash.clone(),
                name: asset.name.clone(),
                file_name: asset.file_name.clone(),
                mime: asset.mime.clone(),
                size: asset.size,
                renditions,
            })
            .await?;
        debug!(asset_hash = %asset.hash, dest_id = %created.id, "media: created destination asset");

        let mut state = self.state.lock().await;
        state.stats.created += 1;
        if !asset.id.is_empty() {
            state.map.insert(asset.id.clone(), created.id.clone());
        }
        Ok(Some(created.id))
    }

    async fn note_missing(&self, asset: &MediaAsset) {
        warn!(
            asset_id = %asset.id,
            asset_hash = %asset.hash,
            "media: no source payload, reference dropped"
        );
        self.state.lock().await.stats.missing += 1;
    }
}

/// Copy one binary payload into the destination asset directory.
///
/// A destination file that already exists with byte-identical content is
/// left alone; a same-named file with different content is overwritten.
async fn copy_payload(src: &Path, dest_dir: &Path, name: &str) -> Result<()> {
    let dest = dest_dir.join(name);
    if fs::try_exists(&dest).await? {
        if file_hash(&dest).await? == file_hash(src).await? {
            trace!(name = %name, "media: payload already present, skipped");
            return Ok(());
        }
        warn!(name = %name, "media: same-named payload differs, overwriting");
    }
    fs::create_dir_all(dest_dir).await?;
    fs::copy(src, &dest).await.map_err(|e| {
        Error::Store(format!(
            "copying asset payload {} to {}: {}",
            src.display(),
            dest.display(),
            e
        ))
    })?;
    trace!(name = %name, "media: payload copied");
    Ok(())
}

async fn file_hash(path: &Path) -> Result<blake3::Hash> {
    let data = fs::read(path).await?;
    Ok(blake3::hash(&data))
}
