//! The workspace fetch manifest.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use super::GENERATED_HEADER;

/// Fixed preamble ahead of the generated fetch rules: workspace identity,
/// the `http_file` load, and the node toolchain. Nothing in it depends on
/// resolved state.
pub const WORKSPACE_PREAMBLE: &str = r#"workspace(name = "monorepo")

load("@bazel_tools//tools/build_defs/repo:http.bzl", "http_file")
load("//tools/npm:rules.bzl", "node_toolchain")

node_toolchain(name = "node")
"#;

/// Render the workspace file: preamble plus one `http_file` per entry of
/// `urls`, keyed and ordered by rule name.
#[must_use]
pub fn render_workspace(urls: &BTreeMap<String, String>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{GENERATED_HEADER}");
    let _ = writeln!(out);
    out.push_str(WORKSPACE_PREAMBLE);

    for (rule_name, url) in urls {
        let _ = writeln!(out);
        let _ = writeln!(out, "http_file(");
        let _ = writeln!(out, "    name = \"{rule_name}\",");
        let _ = writeln!(out, "    urls = [\"{url}\"],");
        let _ = writeln!(out, ")");
    }

    out
}
