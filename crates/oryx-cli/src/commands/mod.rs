//! Command implementations for the oryx CLI.

pub mod generate;
pub mod packages;
pub mod semver;
pub mod version;
