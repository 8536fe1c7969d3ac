//! One generation run, from descriptor scan to written artifacts.

use std::collections::{BTreeMap, BTreeSet};
use serde::Serialize;

use oryx_util::fs::{atomic_write, write_if_changed};

use crate::cache::RegistryCache;
use crate::closure::ClosureBuilder;
use crate::config::{GenOptions, Layout};
use crate::crawl::crawl;
use crate::descriptor::{scan_local_packages, LocalPackage};
use crate::error::GenError;
use crate::manifest::{render_local_build, render_thirdparty_build, render_workspace};
use crate::resolve::VersionResolver;
use crate::rules::ModuleId;

/// All state of one generation run: the scanned local packages, the
/// registry cache, and the resolver memo. Built once, consumed by
/// [`GenSession::generate`].
pub struct GenSession {
    locals: Vec<LocalPackage>,
    local_names: BTreeSet<String>,
    local_dirs: BTreeMap<String, String>,
    externals: BTreeSet<(String, String)>,
    cache: RegistryCache,
    resolver: VersionResolver,
    package_hashes: BTreeMap<String, String>,
}

/// Counters for what a finished run did, for logging and `--json` output.
#[derive(Debug, Serialize)]
pub struct GenReport {
    pub local_packages: usize,
    pub external_modules: usize,
    pub fetches: usize,
    pub waves: usize,
    pub snapshot_written: bool,
    pub workspace_written: bool,
    pub builds_written: usize,
    pub builds_skipped: usize,
}

impl GenSession {
    /// Scan the repository under `layout` and load the snapshot. The
    /// session holds everything generation needs; nothing is written and
    /// no registry connection is made yet.
    pub fn new(layout: &Layout, options: &GenOptions) -> Result<Self, GenError> {
        let locals = scan_local_packages(&layout.root)?;

        let mut local_dirs = BTreeMap::new();
        for pkg in &locals {
            local_dirs.insert(pkg.descriptor.name.clone(), pkg.dir.clone());
        }
        let local_names: BTreeSet<String> = local_dirs.keys().cloned().collect();

        let mut externals = BTreeSet::new();
        for pkg in &locals {
            for (name, range) in pkg.descriptor.all_dependencies() {
                if local_names.contains(name) {
                    continue;
                }
                externals.insert((name.to_string(), range.to_string()));
            }
        }

        let cache = RegistryCache::load(&options.registry_url, &layout.registry_snapshot)?;

        Ok(Self {
            locals,
            local_names,
            local_dirs,
            externals,
            cache,
            resolver: VersionResolver::new(),
            package_hashes: BTreeMap::new(),
        })
    }

    /// Local packages in scan order.
    #[must_use]
    pub fn local_packages(&self) -> &[LocalPackage] {
        &self.locals
    }

    /// Record one entry of the package-hash file written at the end of
    /// the run. Population is the caller's concern.
    pub fn record_package_hash(&mut self, key: impl Into<String>, digest: impl Into<String>) {
        self.package_hashes.insert(key.into(), digest.into());
    }

    /// Run the pipeline: crawl to quiescence, build closures, render all
    /// three artifact kinds, and write them under the layout's paths.
    pub async fn generate(
        mut self,
        layout: &Layout,
        options: &GenOptions,
    ) -> Result<GenReport, GenError> {
        let outcome = crawl(
            &self.cache,
            &mut self.resolver,
            &self.local_names,
            self.externals.iter().cloned(),
            options.concurrency,
        )
        .await?;

        // The crawl is done: freeze the cache and compute everything else
        // synchronously from the frozen view.
        let snapshot = self.cache.snapshot().await;
        let registry = self.cache.registry_url().clone();
        let mut builder = ClosureBuilder::new(&snapshot, &self.local_names, registry);
        for id in &outcome.modules {
            builder.closure(&mut self.resolver, id)?;
        }
        // Sets are complete only after every top-level call has returned,
        // so copying them out is a separate pass.
        let mut closures: BTreeMap<String, BTreeSet<ModuleId>> = BTreeMap::new();
        for id in &outcome.modules {
            let set = builder.closure(&mut self.resolver, id)?;
            closures.insert(id.rule_name(), set.borrow().clone());
        }
        let urls = builder.into_workspace_urls();

        let thirdparty = render_thirdparty_build(&closures);
        let workspace = render_workspace(&urls);
        let mut local_builds = Vec::with_capacity(self.locals.len());
        for pkg in &self.locals {
            let rendered =
                render_local_build(pkg, &self.local_dirs, &mut self.resolver, &snapshot)?;
            local_builds.push((pkg.build_path(&layout.root), rendered));
        }

        layout.ensure_dirs()?;

        let write = |path: &std::path::Path, contents: &str| {
            atomic_write(path, contents.as_bytes()).map_err(|err| GenError::Write {
                path: path.to_path_buf(),
                source: err,
            })
        };
        write(&layout.thirdparty_build, &thirdparty)?;

        let workspace_written = write_if_changed(&layout.workspace_file, &workspace)
            .map_err(|err| GenError::Write {
                path: layout.workspace_file.clone(),
                source: err,
            })?;

        let mut builds_written = 0;
        let mut builds_skipped = 0;
        for (path, rendered) in &local_builds {
            let changed = write_if_changed(path, rendered).map_err(|err| GenError::Write {
                path: path.clone(),
                source: err,
            })?;
            if changed {
                builds_written += 1;
            } else {
                builds_skipped += 1;
            }
        }

        let mut hashes = serde_json::to_string_pretty(&self.package_hashes)
            .map_err(|err| GenError::other(format!("serialize package hashes: {err}")))?;
        hashes.push('\n');
        write(&layout.package_hashes, &hashes)?;

        let snapshot_written = self.cache.save_if_dirty().await?;

        Ok(GenReport {
            local_packages: self.locals.len(),
            external_modules: outcome.modules.len(),
            fetches: self.cache.fetch_count().await,
            waves: outcome.waves,
            snapshot_written,
            workspace_written,
            builds_written,
            builds_skipped,
        })
    }
}
