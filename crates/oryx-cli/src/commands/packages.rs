//! `oryx packages` command implementation.
//!
//! List the local packages the generator would discover, without touching
//! the network or writing anything.

use miette::{IntoDiagnostic, Result};
use oryx_core::descriptor::scan_local_packages;
use oryx_core::paths::repo_root;
use oryx_core::GenError;
use std::path::Path;

/// Run the packages command.
pub fn run(cwd: &Path, json: bool) -> Result<()> {
    let root = repo_root(cwd)
        .ok_or_else(|| GenError::RootNotFound {
            start: cwd.to_path_buf(),
        })
        .into_diagnostic()?;

    let packages = scan_local_packages(&root).into_diagnostic()?;

    if json {
        let pkg_list: Vec<_> = packages
            .iter()
            .map(|p| {
                serde_json::json!({
                    "name": p.descriptor.name,
                    "dir": p.dir,
                    "dependencies": p.descriptor.dependencies.len(),
                    "dev_dependencies": p.descriptor.dev_dependencies.len()
                })
            })
            .collect();

        println!(
            "{}",
            serde_json::json!({
                "ok": true,
                "root": root.to_string_lossy(),
                "packages": pkg_list
            })
        );
    } else {
        println!("Repository root: {}", root.display());
        println!();
        println!("Packages ({}):", packages.len());
        for pkg in &packages {
            println!(
                "  {} ({} deps, {} dev)",
                pkg.descriptor.name,
                pkg.descriptor.dependencies.len(),
                pkg.descriptor.dev_dependencies.len()
            );
            println!("    {}", pkg.dir);
        }
    }

    Ok(())
}
