//! Integration tests for taproot
//!
//! These drive the whole stack: a real source tree on disk, the incremental
//! builder behind the rebuild task, and the HTTP router or the CLI binary.

use std::fs;
use std::path::Path;
use std::process::Command;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use taproot_core::{SnapshotCell, DEFAULT_DEPTH_CAP};
use taproot_indexer::{BuildConfig, Builder, ParserPool};
use taproot_rebuild::{RebuildHandle, RebuildOptions, RebuildScheduler, TreeSource};
use taproot_server::{create_router, ServerState};
use tempfile::TempDir;
use tower::ServiceExt;

fn write(root: &Path, path: &str, content: &str) {
    let full = root.join(path);
    fs::create_dir_all(full.parent().unwrap()).unwrap();
    fs::write(full, content).unwrap();
}

/// `app/main.py → app/routes.py → app/db.py`, plus docs pointing at the db.
fn trip_service() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "app/__init__.py", "");
    write(root, "app/main.py", "from .routes import router\n\ndef main():\n    pass\n");
    write(root, "app/routes.py", "from .db import connect\n\ndef router():\n    pass\n");
    write(root, "app/db.py", "import sqlite3\n\ndef connect():\n    pass\n");
    write(root, "docs/storage.md", "# Storage Layer\n\nSee [db](../app/db.py).\n");
    dir
}

struct Service {
    app: Router,
    cell: Arc<SnapshotCell>,
    rebuild: RebuildHandle,
}

fn start(root: &Path) -> Service {
    let builder = Builder::with_parser_pool(BuildConfig::default(), ParserPool::new(2));
    let cell = Arc::new(SnapshotCell::default());
    let options = RebuildOptions { interval: None, persist_root: Some(root.to_path_buf()) };
    let rebuild = RebuildScheduler::spawn(Arc::new(TreeSource::new(root, builder)), cell.clone(), options);
    let state = ServerState::new(cell.clone(), rebuild.clone(), DEFAULT_DEPTH_CAP);
    Service { app: create_router(Arc::new(state)), cell, rebuild }
}

async fn wait_for_version(cell: &SnapshotCell, version: u64) {
    tokio::time::timeout(Duration::from_secs(30), async {
        while cell.current().version() < version {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("snapshot was not published in time");
}

async fn call(app: &Router, method: Method, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri).body(Body::empty()).unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn paths(body: &Value) -> Vec<String> {
    body.as_array()
        .unwrap()
        .iter()
        .map(|item| item["path"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn serves_queries_over_a_real_tree() {
    let repo = trip_service();
    let service = start(repo.path());

    let (_, body) = call(&service.app, Method::GET, "/health").await;
    assert_eq!(body["status"], "empty");

    service.rebuild.trigger();
    wait_for_version(&service.cell, 1).await;

    let (status, body) = call(&service.app, Method::GET, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["snapshot_version"], 1);

    let (_, body) = call(&service.app, Method::GET, "/impact?path=app/db.py&relation=imports").await;
    assert_eq!(paths(&body), vec!["app/routes.py", "app/main.py"]);

    let (_, body) = call(&service.app, Method::GET, "/impact?path=app/db.py").await;
    assert!(paths(&body).contains(&"docs/storage.md".to_string()));

    let (_, body) = call(&service.app, Method::GET, "/search?q=storage").await;
    assert_eq!(paths(&body)[0], "docs/storage.md");

    let (_, body) = call(&service.app, Method::GET, "/impact?path=sqlite3").await;
    assert_eq!(paths(&body)[0], "app/db.py");
}

#[tokio::test]
async fn rebuild_picks_up_changes_incrementally() {
    let repo = trip_service();
    let service = start(repo.path());
    service.rebuild.trigger();
    wait_for_version(&service.cell, 1).await;
    let before = service.cell.current();

    write(repo.path(), "app/jobs.py", "from .db import connect\n");
    let (status, body) = call(&service.app, Method::POST, "/rebuild").await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "scheduled");
    wait_for_version(&service.cell, 2).await;

    let after = service.cell.current();
    assert_eq!(after.stats().parsed, 1);
    assert_eq!(after.stats().reused, before.stats().parsed);

    let (_, body) = call(&service.app, Method::GET, "/impact?path=app/db.py&max_depth=1&relation=imports").await;
    let mut direct = paths(&body);
    direct.sort();
    assert_eq!(direct, vec!["app/jobs.py", "app/routes.py"]);

    // the reader that started before the publish still sees its own graph
    assert_eq!(before.version(), 1);
    assert!(before.store().get_node_by_path("app/jobs.py").is_err());
}

#[tokio::test]
async fn failed_rebuild_keeps_serving() {
    let repo = trip_service();
    let service = start(repo.path());
    service.rebuild.trigger();
    wait_for_version(&service.cell, 1).await;

    for entry in ["app", "docs"] {
        fs::remove_dir_all(repo.path().join(entry)).unwrap();
    }
    service.rebuild.trigger();
    tokio::time::timeout(Duration::from_secs(30), async {
        while service.rebuild.status().failed == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    let (_, body) = call(&service.app, Method::GET, "/health").await;
    assert_eq!(body["snapshot_version"], 1);
    assert!(body["last_rebuild_error"].as_str().unwrap().contains("no indexable files"));
    let (status, _) = call(&service.app, Method::GET, "/node?path=app/db.py").await;
    assert_eq!(status, StatusCode::OK);
}

fn taproot(root: &Path, args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_taproot"))
        .arg("--root")
        .arg(root)
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .expect("failed to run taproot")
}

#[test]
fn cli_index_search_impact_and_clear() {
    let repo = trip_service();

    let output = taproot(repo.path(), &["index"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(String::from_utf8_lossy(&output.stdout).contains("Snapshot v1"));
    assert!(repo.path().join(".taproot/snapshot.bin").is_file());

    // second run starts from the cache
    let output = taproot(repo.path(), &["search", "connect"]);
    assert!(output.status.success());
    let hits: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(paths(&hits).contains(&"app/db.py".to_string()));

    let output = taproot(repo.path(), &["impact", "app/db.py", "--relation", "imports", "--max-depth", "1"]);
    assert!(output.status.success());
    let impacted: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(paths(&impacted), vec!["app/routes.py"]);

    let output = taproot(repo.path(), &["impact", "missing.py"]);
    assert!(!output.status.success());

    let output = taproot(repo.path(), &["clear"]);
    assert!(output.status.success());
    assert!(!repo.path().join(".taproot").exists());
}
