//! Per-package build files for local packages.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

use super::{thirdparty_label, GENERATED_HEADER, RULES_BZL};
use crate::cache::RegistrySnapshot;
use crate::descriptor::LocalPackage;
use crate::error::GenError;
use crate::resolve::VersionResolver;
use crate::rules::ModuleId;

/// Render the build file for one local package.
///
/// Declared dependencies translate to labels: a name owned by a local
/// package becomes a path reference to that package, anything else
/// becomes a third-party rule reference at its resolved version. Both
/// dependency lists are always present, empty or not.
pub fn render_local_build(
    pkg: &LocalPackage,
    local_dirs: &BTreeMap<String, String>,
    resolver: &mut VersionResolver,
    snapshot: &RegistrySnapshot,
) -> Result<String, GenError> {
    let context = pkg.label();
    let deps = dep_labels(
        &pkg.descriptor.dependencies,
        &context,
        local_dirs,
        resolver,
        snapshot,
    )?;
    let dev_deps = dep_labels(
        &pkg.descriptor.dev_dependencies,
        &context,
        local_dirs,
        resolver,
        snapshot,
    )?;

    let mut out = String::new();
    let _ = writeln!(out, "{GENERATED_HEADER}");
    let _ = writeln!(out);
    let _ = writeln!(out, "load(\"{RULES_BZL}\", \"npm_package\")");
    let _ = writeln!(out);
    let _ = writeln!(out, "npm_package(");
    let _ = writeln!(out, "    name = \"{}\",", pkg.rule_name());
    let _ = writeln!(
        out,
        "    srcs = glob([\"**\"], exclude = [\"BUILD\", \"node_modules/**\"]),"
    );
    let _ = writeln!(out, "    descriptor = \"package.json\",");
    write_label_list(&mut out, "deps", &deps);
    write_label_list(&mut out, "dev_deps", &dev_deps);
    let _ = writeln!(out, "    visibility = [\"//visibility:public\"],");
    let _ = writeln!(out, ")");
    Ok(out)
}

fn dep_labels(
    declared: &BTreeMap<String, String>,
    context: &str,
    local_dirs: &BTreeMap<String, String>,
    resolver: &mut VersionResolver,
    snapshot: &RegistrySnapshot,
) -> Result<BTreeSet<String>, GenError> {
    let mut labels = BTreeSet::new();
    for (name, range) in declared {
        if let Some(dir) = local_dirs.get(name) {
            labels.insert(format!("//{dir}"));
            continue;
        }
        let version = resolver
            .resolve(name, range, snapshot.get(name))
            .map_err(|err| err.while_resolving_dep_of(context.to_string()))?;
        let id = ModuleId::new(name.clone(), version);
        labels.insert(thirdparty_label(&id.rule_name()));
    }
    Ok(labels)
}

fn write_label_list(out: &mut String, attr: &str, labels: &BTreeSet<String>) {
    if labels.is_empty() {
        let _ = writeln!(out, "    {attr} = [],");
        return;
    }
    let _ = writeln!(out, "    {attr} = [");
    for label in labels {
        let _ = writeln!(out, "        \"{label}\",");
    }
    let _ = writeln!(out, "    ],");
}
