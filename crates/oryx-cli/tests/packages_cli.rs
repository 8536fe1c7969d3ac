//! Integration tests for `oryx packages`.

use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

fn cargo_bin() -> Command {
    let mut cmd = Command::new(env!("CARGO"));
    cmd.args(["run", "-p", "oryx-cli", "--bin", "oryx", "--"]);
    cmd
}

fn write_pkg(root: &Path, dir: &str, contents: &str) {
    let pkg_dir = root.join(dir);
    fs::create_dir_all(&pkg_dir).unwrap();
    fs::write(pkg_dir.join("package.json"), contents).unwrap();
}

/// A repo root is recognized by its `.git` directory.
fn git_repo() -> tempfile::TempDir {
    let dir = tempdir().unwrap();
    fs::create_dir(dir.path().join(".git")).unwrap();
    dir
}

#[test]
fn test_packages_json_lists_all() {
    let dir = git_repo();
    write_pkg(
        dir.path(),
        "app",
        r#"{"name": "app", "dependencies": {"left-pad": "^1.0.0", "shared": "1.0.0"}}"#,
    );
    write_pkg(
        dir.path(),
        "packages/shared",
        r#"{"name": "shared", "devDependencies": {"typescript": "^5.0.0"}}"#,
    );

    let output = cargo_bin()
        .args(["--json", "packages", "--cwd"])
        .arg(dir.path())
        .output()
        .expect("Failed to run oryx packages");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let json: serde_json::Value =
        serde_json::from_str(&stdout).unwrap_or_else(|_| panic!("stdout should be JSON: {stdout}"));

    assert_eq!(json["ok"].as_bool(), Some(true));
    let packages = json["packages"].as_array().unwrap();
    assert_eq!(packages.len(), 2);

    // Scan order is by directory
    assert_eq!(packages[0]["name"], "app");
    assert_eq!(packages[0]["dir"], "app");
    assert_eq!(packages[0]["dependencies"], 2);
    assert_eq!(packages[0]["dev_dependencies"], 0);
    assert_eq!(packages[1]["name"], "shared");
    assert_eq!(packages[1]["dir"], "packages/shared");
    assert_eq!(packages[1]["dev_dependencies"], 1);
}

#[test]
fn test_packages_human_output() {
    let dir = git_repo();
    write_pkg(dir.path(), "app", r#"{"name": "app"}"#);

    let output = cargo_bin()
        .args(["packages", "--cwd"])
        .arg(dir.path())
        .output()
        .expect("Failed to run oryx packages");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Packages (1):"), "got: {stdout}");
    assert!(stdout.contains("app"));
}

#[test]
fn test_packages_skips_node_modules() {
    let dir = git_repo();
    write_pkg(dir.path(), "app", r#"{"name": "app"}"#);
    write_pkg(
        dir.path(),
        "app/node_modules/left-pad",
        r#"{"name": "left-pad"}"#,
    );

    let output = cargo_bin()
        .args(["--json", "packages", "--cwd"])
        .arg(dir.path())
        .output()
        .expect("Failed to run oryx packages");
    assert!(output.status.success());

    let json: serde_json::Value =
        serde_json::from_str(&String::from_utf8_lossy(&output.stdout)).unwrap();
    let packages = json["packages"].as_array().unwrap();
    assert_eq!(packages.len(), 1);
    assert_eq!(packages[0]["name"], "app");
}

#[test]
fn test_packages_malformed_descriptor_fails() {
    let dir = git_repo();
    write_pkg(dir.path(), "app", "{not json");

    let output = cargo_bin()
        .args(["packages", "--cwd"])
        .arg(dir.path())
        .output()
        .expect("Failed to run oryx packages");
    assert!(!output.status.success());
}

#[test]
fn test_packages_outside_a_repo_fails() {
    // No .git anywhere above the temp dir, so there is no root to scan.
    let dir = tempdir().unwrap();
    write_pkg(dir.path(), "app", r#"{"name": "app"}"#);

    let output = cargo_bin()
        .args(["packages", "--cwd"])
        .arg(dir.path())
        .output()
        .expect("Failed to run oryx packages");
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Repository root not found"), "got: {stderr}");
}
