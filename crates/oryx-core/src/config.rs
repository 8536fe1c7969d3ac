use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default npm registry URL.
pub const DEFAULT_REGISTRY: &str = "https://registry.npmjs.org/";

/// Environment variable to override the registry URL.
pub const REGISTRY_ENV: &str = "ORYX_NPM_REGISTRY";

/// Default cap on simultaneous outbound registry connections.
pub const DEFAULT_CONCURRENCY: usize = 40;

/// Runtime configuration for the oryx CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Current working directory.
    pub cwd: PathBuf,

    /// Whether to emit JSON logs.
    pub json_logs: bool,

    /// Verbosity level (0 = INFO, 1 = DEBUG, 2+ = TRACE).
    pub verbosity: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            json_logs: false,
            verbosity: 0,
        }
    }
}

impl Config {
    /// Create a new config with the given working directory.
    #[must_use]
    pub fn new(cwd: PathBuf) -> Self {
        Self {
            cwd,
            ..Default::default()
        }
    }

    /// Set verbosity level.
    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set JSON log output.
    #[must_use]
    pub fn with_json_logs(mut self, json: bool) -> Self {
        self.json_logs = json;
        self
    }
}

/// Options for one generation run.
#[derive(Debug, Clone)]
pub struct GenOptions {
    /// Registry base URL.
    pub registry_url: String,

    /// Cap on simultaneous outbound registry connections.
    pub concurrency: usize,
}

impl Default for GenOptions {
    fn default() -> Self {
        Self {
            registry_url: registry_from_env(),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

/// Registry URL from the environment, falling back to the public default.
#[must_use]
pub fn registry_from_env() -> String {
    std::env::var(REGISTRY_ENV).unwrap_or_else(|_| DEFAULT_REGISTRY.to_string())
}

/// Directory of the third-party rules file, relative to the repo root.
///
/// Local build files reference third-party rules as
/// `//{THIRDPARTY_DIR}:{rule}`, so the label prefix and the output path
/// must stay in sync.
pub const THIRDPARTY_DIR: &str = "thirdparty/npm";

/// Directory of the persisted caches, relative to the repo root.
pub const CACHE_DIR: &str = "tools/cache";

/// Filesystem layout of inputs and generated artifacts for one repo.
#[derive(Debug, Clone)]
pub struct Layout {
    /// Repository root.
    pub root: PathBuf,

    /// Persisted registry snapshot.
    pub registry_snapshot: PathBuf,

    /// Persisted package-hash record.
    pub package_hashes: PathBuf,

    /// Third-party rules file.
    pub thirdparty_build: PathBuf,

    /// Workspace fetch manifest.
    pub workspace_file: PathBuf,
}

impl Layout {
    #[must_use]
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            registry_snapshot: root.join(CACHE_DIR).join("npm-registry.json"),
            package_hashes: root.join(CACHE_DIR).join("npm-package-hashes.json"),
            thirdparty_build: root.join(THIRDPARTY_DIR).join("BUILD"),
            workspace_file: root.join("WORKSPACE"),
        }
    }

    /// Create the output directories that generated files land in.
    ///
    /// # Errors
    /// Returns an error if a directory cannot be created.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.root.join(CACHE_DIR))?;
        std::fs::create_dir_all(self.root.join(THIRDPARTY_DIR))?;
        Ok(())
    }
}
