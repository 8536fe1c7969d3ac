//! Discovery and parsing of local package descriptors.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use oryx_util::fs::read_to_string_opt;

use crate::config::THIRDPARTY_DIR;
use crate::error::GenError;

/// The slice of `package.json` the generator reads.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageDescriptor {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,

    #[serde(default, rename = "devDependencies")]
    pub dev_dependencies: BTreeMap<String, String>,
}

impl PackageDescriptor {
    /// Runtime and development dependencies together. External crawling
    /// seeds from this union; transitively only runtime dependencies
    /// matter.
    pub fn all_dependencies(&self) -> impl Iterator<Item = (&str, &str)> {
        self.dependencies
            .iter()
            .chain(self.dev_dependencies.iter())
            .map(|(name, range)| (name.as_str(), range.as_str()))
    }
}

/// One local package found in the repository tree.
#[derive(Debug, Clone)]
pub struct LocalPackage {
    pub descriptor: PackageDescriptor,

    /// Directory relative to the repo root, forward slashes.
    pub dir: String,

    /// Absolute path of the `package.json` that defined this package.
    pub descriptor_path: PathBuf,
}

impl LocalPackage {
    /// Rule name for the package, the basename of its directory.
    #[must_use]
    pub fn rule_name(&self) -> &str {
        self.dir.rsplit('/').next().unwrap_or(&self.dir)
    }

    /// Label other packages use to depend on this one.
    #[must_use]
    pub fn label(&self) -> String {
        format!("//{}", self.dir)
    }

    /// Path of this package's generated build file.
    #[must_use]
    pub fn build_path(&self, root: &Path) -> PathBuf {
        root.join(&self.dir).join("BUILD")
    }
}

/// Find every `package.json` under `root`, excluding the root's own
/// descriptor, `node_modules` trees, hidden directories, and the
/// generated third-party tree. Unreadable directories are skipped; an
/// unparseable or nameless descriptor is fatal. Local-name shadowing
/// keys off the name, so every package must carry one.
///
/// The result is sorted by directory so downstream output is stable.
pub fn scan_local_packages(root: &Path) -> Result<Vec<LocalPackage>, GenError> {
    let mut packages = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| !is_pruned(entry));

    for entry in walker.flatten() {
        if entry.depth() < 2
            || !entry.file_type().is_file()
            || entry.file_name() != "package.json"
        {
            continue;
        }
        let descriptor_path = entry.path().to_path_buf();
        let raw = read_to_string_opt(&descriptor_path)
            .map_err(|err| GenError::DescriptorRead {
                path: descriptor_path.clone(),
                source: err,
            })?
            .unwrap_or_default();
        let descriptor: PackageDescriptor =
            serde_json::from_str(&raw).map_err(|err| GenError::DescriptorParse {
                path: descriptor_path.clone(),
                source: err,
            })?;
        if descriptor.name.is_empty() {
            return Err(GenError::other(format!(
                "package descriptor {} has no \"name\"",
                descriptor_path.display()
            )));
        }

        let parent = descriptor_path.parent().unwrap_or(root);
        let rel = parent
            .strip_prefix(root)
            .map_err(|_| GenError::other(format!("package outside root: {}", parent.display())))?;
        let dir = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");

        packages.push(LocalPackage {
            descriptor,
            dir,
            descriptor_path,
        });
    }

    packages.sort_by(|a, b| a.dir.cmp(&b.dir));
    Ok(packages)
}

fn is_pruned(entry: &DirEntry) -> bool {
    // Depth 0 is the scan root itself, which may be a dotdir.
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    if entry.file_name() == "node_modules" {
        return true;
    }
    // The generated third-party tree can hold unpacked descriptors.
    let thirdparty_root = THIRDPARTY_DIR.split('/').next().unwrap_or(THIRDPARTY_DIR);
    if entry.depth() == 1 && entry.file_name() == thirdparty_root {
        return true;
    }
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}
