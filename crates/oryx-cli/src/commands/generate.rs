//! `oryx generate` command implementation.
//!
//! Runs the full pipeline: scan descriptors, crawl the registry, build
//! closures, and write the WORKSPACE, third-party and per-package BUILD
//! files under the repository root.

use miette::{IntoDiagnostic, Result};
use oryx_core::config::{Config, GenOptions, Layout};
use oryx_core::paths::repo_root;
use oryx_core::{GenError, GenReport, GenSession};
use oryx_util::hash::blake3_file;
use std::time::Instant;
use tracing::info;

/// Run the generate command.
pub fn run(
    config: &Config,
    registry: Option<String>,
    concurrency: Option<usize>,
    json: bool,
) -> Result<()> {
    let started = Instant::now();

    let mut options = GenOptions::default();
    if let Some(url) = registry {
        options.registry_url = url;
    }
    if let Some(n) = concurrency {
        options.concurrency = n;
    }

    let runtime = tokio::runtime::Runtime::new().into_diagnostic()?;
    let outcome = runtime.block_on(run_pipeline(config, &options));

    match outcome {
        Ok(report) => {
            let elapsed_ms = started.elapsed().as_millis() as u64;
            if json {
                println!(
                    "{}",
                    serde_json::json!({
                        "ok": true,
                        "local_packages": report.local_packages,
                        "external_modules": report.external_modules,
                        "fetches": report.fetches,
                        "waves": report.waves,
                        "snapshot_written": report.snapshot_written,
                        "workspace_written": report.workspace_written,
                        "builds_written": report.builds_written,
                        "builds_skipped": report.builds_skipped,
                        "elapsed_ms": elapsed_ms
                    })
                );
            } else {
                info!(
                    local_packages = report.local_packages,
                    external_modules = report.external_modules,
                    fetches = report.fetches,
                    waves = report.waves,
                    builds_written = report.builds_written,
                    builds_skipped = report.builds_skipped,
                    elapsed_ms, "generation complete"
                );
            }
            Ok(())
        }
        Err(err) => {
            if json {
                println!(
                    "{}",
                    serde_json::json!({
                        "ok": false,
                        "error": {
                            "code": error_code(&err),
                            "message": err.to_string()
                        }
                    })
                );
                std::process::exit(1);
            }
            Err(err).into_diagnostic()
        }
    }
}

async fn run_pipeline(config: &Config, options: &GenOptions) -> Result<GenReport, GenError> {
    let root = repo_root(&config.cwd).ok_or_else(|| GenError::RootNotFound {
        start: config.cwd.clone(),
    })?;
    let layout = Layout::new(&root);

    info!(root = %root.display(), registry = %options.registry_url, "starting generation");

    let mut session = GenSession::new(&layout, options)?;

    // Digest each package descriptor for the hash record. Read failures
    // here mean the tree changed underneath us since the scan.
    let digests: Vec<(String, String)> = session
        .local_packages()
        .iter()
        .map(|pkg| {
            blake3_file(&pkg.descriptor_path)
                .map(|digest| (pkg.dir.clone(), digest))
                .map_err(|source| GenError::DescriptorRead {
                    path: pkg.descriptor_path.clone(),
                    source,
                })
        })
        .collect::<Result<_, _>>()?;
    for (dir, digest) in digests {
        session.record_package_hash(dir, digest);
    }

    session.generate(&layout, options).await
}

/// Stable machine-readable code for each failure, used in `--json` error
/// output. Wrapper variants report the code of the underlying cause.
fn error_code(err: &GenError) -> &'static str {
    match err {
        GenError::Io(_) => "IO",
        GenError::Write { .. } => "WRITE_FAILED",
        GenError::DescriptorRead { .. } => "DESCRIPTOR_READ",
        GenError::DescriptorParse { .. } => "DESCRIPTOR_PARSE",
        GenError::SnapshotRead { .. } => "SNAPSHOT_READ",
        GenError::SnapshotParse { .. } => "SNAPSHOT_PARSE",
        GenError::RegistryUrl { .. } => "REGISTRY_URL",
        GenError::Dns { .. } => "DNS",
        GenError::PackageNotFound { .. } => "PACKAGE_NOT_FOUND",
        GenError::RegistryStatus { .. } => "REGISTRY_STATUS",
        GenError::RegistryRequest { .. } => "REGISTRY_REQUEST",
        GenError::RegistryParse { .. } => "REGISTRY_PARSE",
        GenError::VersionInvalid { .. } => "VERSION_INVALID",
        GenError::RangeInvalid { .. } => "RANGE_INVALID",
        GenError::Unresolvable { .. } => "UNRESOLVABLE",
        GenError::EntryMissing { .. } => "ENTRY_MISSING",
        GenError::DependencyOf { source, .. } => error_code(source),
        GenError::RootNotFound { .. } => "ROOT_NOT_FOUND",
        GenError::Other(_) => "ERROR",
    }
}
