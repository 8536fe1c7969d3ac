#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::too_many_lines
)]

//! Engine for generating build manifests from npm package descriptors.
//!
//! A run scans the repository for local packages, crawls their external
//! dependency graph through a cached registry client, resolves every
//! version range to a concrete version, computes transitive closures,
//! and renders deterministic build files plus a workspace fetch
//! manifest. [`GenSession`] owns one run end to end.

pub mod cache;
pub mod closure;
pub mod config;
pub mod crawl;
pub mod descriptor;
pub mod error;
pub mod manifest;
pub mod paths;
pub mod registry;
pub mod resolve;
pub mod rules;
pub mod session;
pub mod version;

pub use config::{
    registry_from_env, Config, GenOptions, Layout, CACHE_DIR, DEFAULT_CONCURRENCY,
    DEFAULT_REGISTRY, REGISTRY_ENV, THIRDPARTY_DIR,
};
pub use error::GenError;
pub use session::{GenReport, GenSession};
