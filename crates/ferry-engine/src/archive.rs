//! Archive codec: the portable export artifact on disk.
//!
//! An export archive is a compressed tarball whose root contains
//! `data.json` (the manifest) and an `uploads/` directory holding the
//! primary and rendition files for every media asset, named by basename.
//! Import accepts either an archive file or a directory that already
//! contains `data.json`.

use std::fs::File;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use tar::{Archive, Builder};
use tempfile::TempDir;
use tracing::{info, warn};

use ferry_core::defaults::{MANIFEST_FILE, UPLOADS_DIR};
use ferry_core::{Error, Manifest, Result};

/// Pack a manifest and its uploads directory into a tar.gz archive.
pub fn pack(manifest: &Manifest, uploads_dir: Option<&Path>, out_path: &Path) -> Result<()> {
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(out_path)
        .map_err(|e| Error::Archive(format!("cannot create {}: {}", out_path.display(), e)))?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = Builder::new(encoder);

    let data = serde_json::to_vec_pretty(manifest)?;
    let mut header = tar::Header::new_gnu();
    header.set_size(data.len() as u64);
    header.set_mode(0o644);
    header.set_mtime(manifest.created_at.timestamp().max(0) as u64);
    header.set_cksum();
    builder
        .append_data(&mut header, MANIFEST_FILE, data.as_slice())
        .map_err(|e| Error::Archive(format!("adding manifest: {}", e)))?;

    if let Some(dir) = uploads_dir {
        if dir.is_dir() {
            builder
                .append_dir_all(UPLOADS_DIR, dir)
                .map_err(|e| Error::Archive(format!("adding uploads: {}", e)))?;
        }
    }

    let encoder = builder
        .into_inner()
        .map_err(|e| Error::Archive(format!("finishing tar: {}", e)))?;
    encoder
        .finish()
        .map_err(|e| Error::Archive(format!("finishing gzip: {}", e)))?;
    info!(path = %out_path.display(), "archive: packed");
    Ok(())
}

/// Stage the binary payloads of every manifest media asset (primary files
/// and renditions) from a store's asset directory into `staging`, so the
/// packed archive carries exactly the manifest's membership and nothing
/// else. Missing payloads are logged and skipped. Returns the number of
/// files staged.
pub fn stage_uploads(manifest: &Manifest, source_dir: &Path, staging: &Path) -> Result<usize> {
    std::fs::create_dir_all(staging)?;
    let mut staged = 0;

    let mut names: Vec<&str> = Vec::new();
    for asset in &manifest.media {
        names.push(asset.file_name.as_str());
        for rendition in asset.renditions.values() {
            names.push(rendition.file_name.as_str());
        }
    }
    names.sort_unstable();
    names.dedup();

    for name in names {
        let src = source_dir.join(name);
        if !src.is_file() {
            warn!(name = %name, "archive: media payload missing at source, skipped");
            continue;
        }
        std::fs::copy(&src, staging.join(name))
            .map_err(|e| Error::Archive(format!("staging {}: {}", name, e)))?;
        staged += 1;
    }
    Ok(staged)
}

/// Extract an archive into a directory. Entries that would escape the
/// target directory are skipped.
pub fn extract(archive_path: &Path, into: &Path) -> Result<()> {
    let file = File::open(archive_path)
        .map_err(|e| Error::Archive(format!("cannot open {}: {}", archive_path.display(), e)))?;
    let decoder = GzDecoder::new(file);
    let mut archive = Archive::new(decoder);
    std::fs::create_dir_all(into)?;

    for entry in archive
        .entries()
        .map_err(|e| Error::Archive(format!("reading {}: {}", archive_path.display(), e)))?
    {
        let mut entry =
            entry.map_err(|e| Error::Archive(format!("corrupt archive entry: {}", e)))?;
        let unpacked = entry
            .unpack_in(into)
            .map_err(|e| Error::Archive(format!("extracting entry: {}", e)))?;
        if !unpacked {
            warn!(
                path = %entry.path().map(|p| p.display().to_string()).unwrap_or_default(),
                "archive: entry escaping the target directory skipped"
            );
        }
    }
    Ok(())
}

/// A loaded import source: the parsed manifest plus the location of the
/// binary payloads, keeping any temporary extraction directory alive for
/// the duration of the run.
#[derive(Debug)]
pub struct ImportSource {
    pub manifest: Manifest,
    pub uploads: Option<PathBuf>,
    _extracted: Option<TempDir>,
}

/// Load an import source from a local path: either a directory already
/// containing `data.json` or a tar.gz archive to extract first.
pub fn load_source(path: &Path) -> Result<ImportSource> {
    if path.is_dir() {
        let (manifest, uploads) = read_source_dir(path)?;
        return Ok(ImportSource {
            manifest,
            uploads,
            _extracted: None,
        });
    }
    if path.is_file() {
        let extracted = TempDir::new()?;
        extract(path, extracted.path())?;
        let (manifest, uploads) = read_source_dir(extracted.path())?;
        return Ok(ImportSource {
            manifest,
            uploads,
            _extracted: Some(extracted),
        });
    }
    Err(Error::Archive(format!("no such path: {}", path.display())))
}

fn read_source_dir(dir: &Path) -> Result<(Manifest, Option<PathBuf>)> {
    let manifest_path = dir.join(MANIFEST_FILE);
    let text = std::fs::read_to_string(&manifest_path).map_err(|e| {
        Error::Manifest(format!("cannot read {}: {}", manifest_path.display(), e))
    })?;
    let manifest: Manifest = serde_json::from_str(&text)
        .map_err(|e| Error::Manifest(format!("corrupt {}: {}", MANIFEST_FILE, e)))?;

    let uploads = dir.join(UPLOADS_DIR);
    let uploads = uploads.is_dir().then_some(uploads);
    Ok((manifest, uploads))
}
