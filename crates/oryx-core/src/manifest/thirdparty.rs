//! The third-party rules file, one rule per resolved external module.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

use super::{thirdparty_label, GENERATED_HEADER, RULES_BZL};
use crate::rules::ModuleId;

/// Render the third-party build file. `closures` maps each module's rule
/// name to its transitive runtime dependencies; map order is the emission
/// order. A module with an empty closure gets no `runtime_deps`
/// attribute at all.
#[must_use]
pub fn render_thirdparty_build(closures: &BTreeMap<String, BTreeSet<ModuleId>>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{GENERATED_HEADER}");
    let _ = writeln!(out);
    let _ = writeln!(out, "load(\"{RULES_BZL}\", \"npm_module\")");

    for (rule_name, closure) in closures {
        let _ = writeln!(out);
        let _ = writeln!(out, "npm_module(");
        let _ = writeln!(out, "    name = \"{rule_name}\",");
        let _ = writeln!(out, "    tarball = \"@{rule_name}//file\",");
        let labels: BTreeSet<String> = closure
            .iter()
            .map(|member| thirdparty_label(&member.rule_name()))
            .collect();
        if !labels.is_empty() {
            let _ = writeln!(out, "    runtime_deps = [");
            for label in labels {
                let _ = writeln!(out, "        \"{label}\",");
            }
            let _ = writeln!(out, "    ],");
        }
        let _ = writeln!(out, "    visibility = [\"//visibility:public\"],");
        let _ = writeln!(out, ")");
    }

    out
}
