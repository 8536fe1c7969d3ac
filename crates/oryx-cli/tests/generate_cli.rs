//! Integration tests for `oryx generate`.
//!
//! These tests run the real binary against a mock npm registry (or a
//! pre-seeded snapshot for the offline cases) and check the written
//! artifacts and the `--json` report.

use axum::extract::{Path as AxumPath, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use std::collections::HashMap;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::process::Command;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tempfile::tempdir;

/// Global port counter for unique mock server ports.
static PORT_COUNTER: AtomicU16 = AtomicU16::new(20100);

fn cargo_bin() -> Command {
    let mut cmd = Command::new(env!("CARGO"));
    cmd.args(["run", "-p", "oryx-cli", "--bin", "oryx", "--"]);
    cmd
}

type Packuments = Arc<HashMap<String, serde_json::Value>>;

async fn handle_packument(
    AxumPath(name): AxumPath<String>,
    State(packuments): State<Packuments>,
) -> impl IntoResponse {
    match packuments.get(&name) {
        Some(doc) => (StatusCode::OK, doc.to_string()),
        None => (StatusCode::NOT_FOUND, "Not found".to_string()),
    }
}

/// Serve `packuments` on a fresh port, returning the registry base URL.
fn start_mock_registry(packuments: HashMap<String, serde_json::Value>) -> String {
    let port = PORT_COUNTER.fetch_add(1, Ordering::SeqCst);
    let addr: SocketAddr = ([127, 0, 0, 1], port).into();
    let base_url = format!("http://127.0.0.1:{port}/");

    thread::spawn(move || {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let app = Router::new()
                .route("/:name", get(handle_packument))
                .with_state(Arc::new(packuments));
            let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
            axum::serve(listener, app).await.unwrap();
        });
    });

    // Give the server time to start
    thread::sleep(Duration::from_millis(100));

    base_url
}

fn packument(name: &str, versions: &[(&str, &[(&str, &str)])]) -> serde_json::Value {
    let mut version_map = serde_json::Map::new();
    for (version, deps) in versions {
        let dep_map: serde_json::Map<String, serde_json::Value> = deps
            .iter()
            .map(|(dep, range)| ((*dep).to_string(), serde_json::json!(range)))
            .collect();
        version_map.insert(
            (*version).to_string(),
            serde_json::json!({ "dependencies": dep_map }),
        );
    }
    serde_json::json!({ "name": name, "versions": version_map })
}

fn write_pkg(root: &Path, dir: &str, contents: &str) {
    let pkg_dir = root.join(dir);
    fs::create_dir_all(&pkg_dir).unwrap();
    fs::write(pkg_dir.join("package.json"), contents).unwrap();
}

fn git_repo() -> tempfile::TempDir {
    let dir = tempdir().unwrap();
    fs::create_dir(dir.path().join(".git")).unwrap();
    dir
}

fn run_generate(root: &Path, registry: &str) -> std::process::Output {
    cargo_bin()
        .args(["--json", "generate", "--registry", registry, "--cwd"])
        .arg(root)
        .output()
        .expect("Failed to run oryx generate")
}

fn json_stdout(output: &std::process::Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&stdout).unwrap_or_else(|_| panic!("stdout should be JSON: {stdout}"))
}

#[test]
fn test_generate_full_run() {
    let registry = start_mock_registry(HashMap::from([(
        "left-pad".to_string(),
        packument("left-pad", &[("1.0.0", &[]), ("1.3.0", &[])]),
    )]));

    let dir = git_repo();
    write_pkg(
        dir.path(),
        "app",
        r#"{"name": "app", "dependencies": {"left-pad": "^1.0.0", "shared": "1.0.0"}}"#,
    );
    write_pkg(dir.path(), "packages/shared", r#"{"name": "shared"}"#);

    let output = run_generate(dir.path(), &registry);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let report = json_stdout(&output);
    assert_eq!(report["ok"].as_bool(), Some(true));
    assert_eq!(report["local_packages"], 2);
    assert_eq!(report["external_modules"], 1);
    assert_eq!(report["fetches"], 1);
    assert_eq!(report["builds_written"], 2);
    assert_eq!(report["builds_skipped"], 0);
    assert_eq!(report["snapshot_written"].as_bool(), Some(true));

    let workspace = fs::read_to_string(dir.path().join("WORKSPACE")).unwrap();
    assert!(workspace.contains(&format!("{registry}left-pad/-/left-pad-1.3.0.tgz")));

    let thirdparty = fs::read_to_string(dir.path().join("thirdparty/npm/BUILD")).unwrap();
    assert!(thirdparty.contains("name = \"left_pad_1_3_0\""));

    let app_build = fs::read_to_string(dir.path().join("app/BUILD")).unwrap();
    assert!(app_build.contains("//thirdparty/npm:left_pad_1_3_0"));
    assert!(app_build.contains("//packages/shared"));

    assert!(dir.path().join("tools/cache/npm-registry.json").exists());
}

#[test]
fn test_generate_records_descriptor_hashes() {
    let registry = start_mock_registry(HashMap::new());

    let dir = git_repo();
    write_pkg(dir.path(), "app", r#"{"name": "app"}"#);

    let output = run_generate(dir.path(), &registry);
    assert!(output.status.success());

    let hashes: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(dir.path().join("tools/cache/npm-package-hashes.json")).unwrap(),
    )
    .unwrap();
    let digest = hashes["app"].as_str().unwrap();
    assert_eq!(digest.len(), 64);
    assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn test_generate_offline_with_seeded_snapshot() {
    let dir = git_repo();
    write_pkg(
        dir.path(),
        "app",
        r#"{"name": "app", "dependencies": {"left-pad": "^1.0.0"}}"#,
    );
    fs::create_dir_all(dir.path().join("tools/cache")).unwrap();
    fs::write(
        dir.path().join("tools/cache/npm-registry.json"),
        r#"{"left-pad": {"versions": {"1.3.0": {}}}}"#,
    )
    .unwrap();

    // Port 1 never listens; a snapshot hit must not touch the network
    let output = run_generate(dir.path(), "http://127.0.0.1:1/");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let report = json_stdout(&output);
    assert_eq!(report["ok"].as_bool(), Some(true));
    assert_eq!(report["fetches"], 0);
    assert_eq!(report["snapshot_written"].as_bool(), Some(false));
}

#[test]
fn test_generate_unreachable_registry_fails_json() {
    let dir = git_repo();
    write_pkg(
        dir.path(),
        "app",
        r#"{"name": "app", "dependencies": {"left-pad": "^1.0.0"}}"#,
    );

    let output = run_generate(dir.path(), "http://127.0.0.1:1/");
    assert!(!output.status.success());

    let report = json_stdout(&output);
    assert_eq!(report["ok"].as_bool(), Some(false));
    assert_eq!(report["error"]["code"], "REGISTRY_REQUEST");
    assert!(report["error"]["message"].as_str().unwrap().contains("left-pad"));

    // A failed run must not leave a third-party BUILD behind
    assert!(!dir.path().join("thirdparty/npm/BUILD").exists());
}

#[test]
fn test_generate_outside_repo_fails() {
    let dir = tempdir().unwrap();

    let output = cargo_bin()
        .args(["--json", "generate", "--registry", "http://127.0.0.1:1/", "--cwd"])
        .arg(dir.path())
        .output()
        .expect("Failed to run oryx generate");
    assert!(!output.status.success());

    let report = json_stdout(&output);
    assert_eq!(report["ok"].as_bool(), Some(false));
    assert_eq!(report["error"]["code"], "ROOT_NOT_FOUND");
}

#[test]
fn test_registry_flag_overrides_env() {
    let registry = start_mock_registry(HashMap::new());

    let dir = git_repo();
    write_pkg(dir.path(), "app", r#"{"name": "app"}"#);

    let output = cargo_bin()
        .args(["--json", "generate", "--registry", &registry, "--cwd"])
        .arg(dir.path())
        .env("ORYX_NPM_REGISTRY", "not a url")
        .output()
        .expect("Failed to run oryx generate");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert_eq!(json_stdout(&output)["ok"].as_bool(), Some(true));
}
