//! Rendering of the generated build artifacts.
//!
//! Renderers are pure string builders over already-resolved data. All
//! ordering is imposed here by sorting on rule identifiers, never by
//! discovery or network arrival order.

mod local;
mod thirdparty;
mod workspace;

pub use local::render_local_build;
pub use thirdparty::render_thirdparty_build;
pub use workspace::{render_workspace, WORKSPACE_PREAMBLE};

use crate::config::THIRDPARTY_DIR;

pub(crate) const GENERATED_HEADER: &str = "# Generated by oryx. Do not edit.";

/// Rules file the generated build files load their macros from.
pub(crate) const RULES_BZL: &str = "//tools/npm:rules.bzl";

pub(crate) fn thirdparty_label(rule_name: &str) -> String {
    format!("//{THIRDPARTY_DIR}:{rule_name}")
}
