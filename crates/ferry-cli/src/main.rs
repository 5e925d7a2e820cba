//! ferry: move structured content between store instances.
//!
//! `ferry export` walks a source store and packs a portable tar.gz archive
//! (`data.json` + `uploads/`); `ferry import` reconciles an archive,
//! directory, or remote URL into a destination store. Store directories
//! come from `--store` or the `FERRY_SOURCE`/`FERRY_DEST` environment
//! variables (loaded via dotenv).
//!
//! Exit code 0 on completion, including "nothing to do"; 1 on unrecoverable
//! setup failure. Per-item failures are logged and reported but do not
//! change the exit code.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use regex::Regex;
use tempfile::TempDir;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ferry_core::defaults::{EXPORT_DIR, EXPORT_PREFIX, EXPORT_SUFFIX};
use ferry_core::ContentStore;
use ferry_engine::{
    load_source, pack, ExportOptions, ExportReport, Exporter, ImportOptions, Importer,
};
use ferry_store::FileStore;

#[derive(Parser)]
#[command(name = "ferry")]
#[command(author, version, about = "Content migration between structured-content stores")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export content types into a portable archive
    Export {
        /// Content types to export (by name)
        types: Vec<String>,

        /// Export every content type in the registry
        #[arg(long)]
        all: bool,

        /// Regex selecting additional content types by name
        #[arg(long = "filter-api")]
        filter_api: Option<String>,

        /// Regex restricting fragment layout blobs by name
        #[arg(long = "filter-components")]
        filter_components: Option<String>,

        /// Compute and report without writing an archive
        #[arg(long)]
        dry_run: bool,

        /// Source store directory (default: $FERRY_SOURCE)
        #[arg(long)]
        store: Option<PathBuf>,

        /// Output directory for the archive (default: $FERRY_EXPORT_DIR or ./export-data)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Import a portable archive into a store
    Import {
        /// Archive file, directory containing data.json, or http(s) URL
        source: String,

        /// Delete manifest-scoped destination entries and assets first
        #[arg(long)]
        clean: bool,

        /// Skip the bulk media pre-pass
        #[arg(long)]
        skip_media: bool,

        /// Skip layout and locale-definition import
        #[arg(long)]
        skip_schema: bool,

        /// Compute and report without mutating the destination
        #[arg(long)]
        dry_run: bool,

        /// Destination store directory (default: $FERRY_DEST)
        #[arg(long)]
        store: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Export {
            types,
            all,
            filter_api,
            filter_components,
            dry_run,
            store,
            out,
        } => {
            let store_dir = resolve_store_dir(store, "FERRY_SOURCE", "source")?;
            let store = Arc::new(FileStore::open(&store_dir).await?);

            let options = ExportOptions {
                types,
                all,
                type_filter: compile_filter(filter_api.as_deref(), "--filter-api")?,
                fragment_filter: compile_filter(
                    filter_components.as_deref(),
                    "--filter-components",
                )?,
            };
            let exporter = Exporter::new(store.clone());
            let manifest = exporter.export(&options).await?;

            let report = ExportReport::from_manifest(&manifest);
            println!("{}", report);

            if manifest.is_empty() {
                println!("nothing to export");
                return Ok(());
            }
            if dry_run {
                println!("dry run: no archive written");
                return Ok(());
            }

            let out_dir = out
                .or_else(|| std::env::var_os("FERRY_EXPORT_DIR").map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from(EXPORT_DIR));
            let archive_path = out_dir.join(format!(
                "{}{}{}",
                EXPORT_PREFIX,
                manifest.created_at.format("%Y%m%d%H%M%S"),
                EXPORT_SUFFIX
            ));

            // Stage only manifest-listed payloads so the archive carries
            // exactly what the manifest names.
            let staging = TempDir::new()?;
            let staged =
                ferry_engine::archive::stage_uploads(&manifest, store.asset_dir(), staging.path())?;
            let uploads = (staged > 0).then(|| staging.path());
            pack(&manifest, uploads, &archive_path)?;

            info!(path = %archive_path.display(), "export archive written");
            println!("wrote {}", archive_path.display());
            Ok(())
        }

        Commands::Import {
            source,
            clean,
            skip_media,
            skip_schema,
            dry_run,
            store,
        } => {
            let store_dir = resolve_store_dir(store, "FERRY_DEST", "destination")?;
            let dest = Arc::new(FileStore::open(&store_dir).await?);
            if !dry_run {
                dest.validate()
                    .await
                    .context("destination asset storage failed validation")?;
            }

            // A remote URL is downloaded before extraction; everything
            // else is a local path.
            let downloaded;
            let local_path: PathBuf = if is_url(&source) {
                downloaded = download_archive(&source).await?;
                downloaded.1.clone()
            } else {
                PathBuf::from(&source)
            };

            let loaded = load_source(&local_path)?;
            let importer = Importer::new(
                dest.clone(),
                ImportOptions {
                    clean,
                    skip_media,
                    skip_schema,
                    dry_run,
                    source_uploads: loaded.uploads.clone(),
                },
            );
            let report = importer.run(&loaded.manifest).await?;
            print!("{}", report);

            if !dry_run {
                dest.flush().await?;
            }
            Ok(())
        }
    }
}

fn resolve_store_dir(
    flag: Option<PathBuf>,
    env_var: &str,
    role: &str,
) -> anyhow::Result<PathBuf> {
    if let Some(dir) = flag {
        return Ok(dir);
    }
    if let Some(dir) = std::env::var_os(env_var) {
        return Ok(PathBuf::from(dir));
    }
    bail!("no {} store: pass --store or set {}", role, env_var)
}

fn compile_filter(pattern: Option<&str>, flag: &str) -> anyhow::Result<Option<Regex>> {
    pattern
        .map(|p| Regex::new(p).with_context(|| format!("invalid {} regex", flag)))
        .transpose()
}

fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Download a remote archive to a temporary file. The TempDir keeps the
/// file alive until the run ends.
async fn download_archive(url: &str) -> anyhow::Result<(TempDir, PathBuf)> {
    info!(url = %url, "downloading archive");
    let response = reqwest::get(url)
        .await
        .with_context(|| format!("downloading {}", url))?
        .error_for_status()
        .with_context(|| format!("downloading {}", url))?;
    let bytes = response.bytes().await?;

    let dir = TempDir::new()?;
    let path = dir.path().join("download.tar.gz");
    tokio::fs::write(&path, &bytes).await?;
    Ok((dir, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/export.tar.gz"));
        assert!(is_url("http://example.com/export.tar.gz"));
        assert!(!is_url("export-data/export-20260807.tar.gz"));
        assert!(!is_url("/var/exports/data"));
    }

    #[test]
    fn test_compile_filter_rejects_bad_regex() {
        assert!(compile_filter(Some("("), "--filter-api").is_err());
        assert!(compile_filter(Some("^post$"), "--filter-api")
            .unwrap()
            .is_some());
        assert!(compile_filter(None, "--filter-api").unwrap().is_none());
    }

    #[test]
    fn test_cli_parses_export() {
        let cli = Cli::try_parse_from([
            "ferry",
            "export",
            "post",
            "tag",
            "--all",
            "--filter-api",
            "^api",
            "--dry-run",
        ])
        .unwrap();
        match cli.command {
            Commands::Export {
                types,
                all,
                filter_api,
                dry_run,
                ..
            } => {
                assert_eq!(types, vec!["post", "tag"]);
                assert!(all);
                assert_eq!(filter_api.as_deref(), Some("^api"));
                assert!(dry_run);
            }
            _ => panic!("Expected export command"),
        }
    }

    #[test]
    fn test_cli_parses_import() {
        let cli = Cli::try_parse_from([
            "ferry",
            "import",
            "export.tar.gz",
            "--clean",
            "--skip-media",
        ])
        .unwrap();
        match cli.command {
            Commands::Import {
                source,
                clean,
                skip_media,
                skip_schema,
                dry_run,
                ..
            } => {
                assert_eq!(source, "export.tar.gz");
                assert!(clean);
                assert!(skip_media);
                assert!(!skip_schema);
                assert!(!dry_run);
            }
            _ => panic!("Expected import command"),
        }
    }
}
