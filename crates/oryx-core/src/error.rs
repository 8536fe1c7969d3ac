use std::path::PathBuf;
use thiserror::Error;

/// Core error type for a generation run.
///
/// Every variant is fatal: the pipeline performs no retries and no partial
/// output, so errors propagate straight to the top level.
#[derive(Error, Debug)]
pub enum GenError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read descriptor at {path}: {source}")]
    DescriptorRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse descriptor at {path}: {source}")]
    DescriptorParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to read registry snapshot at {path}: {source}")]
    SnapshotRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse registry snapshot at {path}: {source}")]
    SnapshotParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid registry URL '{url}': {reason}")]
    RegistryUrl { url: String, reason: String },

    #[error("Failed to resolve registry host '{host}': {source}")]
    Dns {
        host: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Package '{name}' not found in registry")]
    PackageNotFound { name: String },

    #[error("Registry returned status {status} for '{name}'")]
    RegistryStatus { name: String, status: u16 },

    #[error("Registry request for '{name}' failed: {source}")]
    RegistryRequest {
        name: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Malformed registry response for '{name}': {source}")]
    RegistryParse {
        name: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Invalid version '{version}': {reason}")]
    VersionInvalid { version: String, reason: String },

    #[error("Invalid version range '{range}': {reason}")]
    RangeInvalid { range: String, reason: String },

    #[error("No published version of '{name}' satisfies '{range}'")]
    Unresolvable { name: String, range: String },

    #[error("No registry entry for '{name}' while resolving '{range}'")]
    EntryMissing { name: String, range: String },

    #[error("While resolving a dependency of {context}: {source}")]
    DependencyOf {
        context: String,
        #[source]
        source: Box<GenError>,
    },

    #[error("Repository root not found from {start}")]
    RootNotFound { start: PathBuf },

    #[error("{0}")]
    Other(String),
}

impl GenError {
    #[must_use]
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Wrap an error with the module whose dependency was being resolved.
    #[must_use]
    pub fn while_resolving_dep_of(self, context: impl Into<String>) -> Self {
        Self::DependencyOf {
            context: context.into(),
            source: Box::new(self),
        }
    }
}
