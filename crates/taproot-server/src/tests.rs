//! HTTP tests driving the router with `tower::ServiceExt::oneshot`

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::routing::get;
use axum::Router;
use serde_json::Value;
use taproot_core::{
    GraphStore, Link, Node, NodeId, NodeKind, Relation, Result, Snapshot, SnapshotCell, DEFAULT_DEPTH_CAP,
};
use taproot_rebuild::{RebuildOptions, RebuildScheduler, SnapshotSource};
use tower::ServiceExt;
use tower_http::catch_panic::CatchPanicLayer;

use crate::error::handle_panic;
use crate::{create_router, ServerState};

fn id(path: &str) -> NodeId {
    NodeId::new(NodeKind::File, path)
}

/// `C → B → A` by imports, `docs/A.md → A` by reference.
fn fixture(version: u64) -> Snapshot {
    let mut store = GraphStore::new();
    store
        .put_nodes(["A", "B", "C", "docs/A.md"].map(|p| Node::new(NodeKind::File, p).with_terms(p)))
        .unwrap();
    store
        .put_links([
            Link::new(id("B"), id("A"), Relation::Imports),
            Link::new(id("C"), id("B"), Relation::Imports),
            Link::new(id("docs/A.md"), id("A"), Relation::References),
        ])
        .unwrap();
    store.snapshot(version)
}

struct FixtureSource;

impl SnapshotSource for FixtureSource {
    fn build(&self, previous: &Snapshot) -> Result<Snapshot> {
        Ok(fixture(previous.version() + 1))
    }
}

fn app_with(cell: Arc<SnapshotCell>) -> Router {
    let rebuild = RebuildScheduler::spawn(Arc::new(FixtureSource), cell.clone(), RebuildOptions::default());
    create_router(Arc::new(ServerState::new(cell, rebuild, DEFAULT_DEPTH_CAP)))
}

fn app() -> Router {
    app_with(Arc::new(SnapshotCell::new(fixture(1))))
}

async fn send(app: Router, method: Method, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri).body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::GET, uri).await
}

fn paths(body: &Value) -> Vec<&str> {
    body.as_array().unwrap().iter().map(|item| item["path"].as_str().unwrap()).collect()
}

fn assert_error(status: StatusCode, body: &Value, expected_status: StatusCode, kind: &str) {
    assert_eq!(status, expected_status, "body: {body}");
    assert_eq!(body["error_kind"], kind);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn health_reports_the_published_snapshot() {
    let (status, body) = get_json(app(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["node_count"], 4);
    assert_eq!(body["link_count"], 3);
    assert_eq!(body["snapshot_version"], 1);
    assert_eq!(body["rebuild_in_progress"], false);
    assert!(body["last_rebuild_error"].is_null());
}

#[tokio::test]
async fn health_before_the_first_build() {
    let (status, body) = get_json(app_with(Arc::new(SnapshotCell::default())), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "empty");
    assert_eq!(body["snapshot_version"], 0);
    assert_eq!(body["node_count"], 0);
}

#[tokio::test]
async fn search_ranks_and_paginates() {
    let (status, body) = get_json(app(), "/search?q=A").await;
    assert_eq!(status, StatusCode::OK);
    // equal scores: the shorter path first
    assert_eq!(paths(&body), vec!["A", "docs/A.md"]);
    assert_eq!(body[0]["node_id"], id("A").to_string());
    assert_eq!(body[0]["kind"], "file");
    assert_eq!(body[0]["score"], 1);

    let (_, body) = get_json(app(), "/search?q=A&limit=1&offset=1").await;
    assert_eq!(paths(&body), vec!["docs/A.md"]);

    let (status, body) = get_json(app(), "/search?q=nothing").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::Array(vec![]));
}

#[tokio::test]
async fn search_rejects_bad_parameters() {
    for uri in [
        "/search",
        "/search?q=A&limit=0",
        "/search?q=A&limit=5000",
        "/search?q=A&limit=ten",
        "/search?q=A&offset=-1",
    ] {
        let (status, body) = get_json(app(), uri).await;
        assert_error(status, &body, StatusCode::BAD_REQUEST, "invalid_argument");
    }
}

#[tokio::test]
async fn impact_by_path_and_id() {
    let (status, body) = get_json(app(), "/impact?path=A&relation=imports").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paths(&body), vec!["B", "C"]);
    assert_eq!(body[0]["distance"], 1);
    assert_eq!(body[1]["distance"], 2);

    let uri = format!("/impact?id={}&direction=incoming&max_depth=1", id("A"));
    let (_, body) = get_json(app(), &uri).await;
    let mut direct = paths(&body);
    direct.sort();
    assert_eq!(direct, vec!["B", "docs/A.md"]);

    let (_, body) = get_json(app(), "/impact?path=C&direction=outgoing").await;
    assert_eq!(paths(&body), vec!["B", "A"]);
}

#[tokio::test]
async fn impact_accepts_repeated_relations() {
    let (status, body) = get_json(app(), "/impact?path=A&relation=imports&relation=references").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 3);

    let (_, body) = get_json(app(), "/impact?path=A&relation=references").await;
    assert_eq!(paths(&body), vec!["docs/A.md"]);
}

#[tokio::test]
async fn impact_errors() {
    let (status, body) = get_json(app(), "/impact?path=missing.rs").await;
    assert_error(status, &body, StatusCode::NOT_FOUND, "not_found");

    let (status, body) = get_json(app(), "/impact?id=00000000000000ff").await;
    assert_error(status, &body, StatusCode::NOT_FOUND, "not_found");

    for uri in [
        "/impact",
        "/impact?path=A&id=00000000000000ff",
        "/impact?id=not-hex",
        "/impact?path=A&direction=sideways",
        "/impact?path=A&max_depth=0",
        "/impact?path=A&max_depth=-2",
        "/impact?path=A&relation=calls",
    ] {
        let (status, body) = get_json(app(), uri).await;
        assert_error(status, &body, StatusCode::BAD_REQUEST, "invalid_argument");
    }
}

#[tokio::test]
async fn node_lists_one_hop_neighbors() {
    let (status, body) = get_json(app(), "/node?path=B").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["node"]["path"], "B");
    assert_eq!(body["node"]["kind"], "file");
    assert_eq!(body["outgoing"][0]["path"], "A");
    assert_eq!(body["incoming"][0]["path"], "C");

    let (status, body) = get_json(app(), "/node?path=nope").await;
    assert_error(status, &body, StatusCode::NOT_FOUND, "not_found");
}

#[tokio::test]
async fn rebuild_returns_immediately_and_publishes_later() {
    let cell = Arc::new(SnapshotCell::new(fixture(1)));
    let app = app_with(cell.clone());

    let (status, body) = send(app.clone(), Method::POST, "/rebuild").await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert!(body["status"] == "scheduled" || body["status"] == "coalesced");
    assert!(body["snapshot_version"].as_u64().unwrap() >= 1);

    tokio::time::timeout(Duration::from_secs(10), async {
        while cell.current().version() < 2 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    let (_, body) = get_json(app, "/health").await;
    assert_eq!(body["snapshot_version"], 2);
}

#[tokio::test]
async fn rebuild_after_the_worker_stopped_is_reported() {
    let cell = Arc::new(SnapshotCell::new(fixture(1)));
    let worker_cell = cell.clone();
    // a runtime cannot be dropped inside another, so the worker lives on its own thread
    let rebuild = std::thread::spawn(move || {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let handle = runtime.block_on(async {
            RebuildScheduler::spawn(Arc::new(FixtureSource), worker_cell, RebuildOptions::default())
        });
        drop(runtime);
        handle
    })
    .join()
    .unwrap();
    let app = create_router(Arc::new(ServerState::new(cell, rebuild, DEFAULT_DEPTH_CAP)));

    let (status, body) = send(app.clone(), Method::POST, "/rebuild").await;
    assert_error(status, &body, StatusCode::INTERNAL_SERVER_ERROR, "internal");

    let (_, body) = get_json(app, "/health").await;
    assert_eq!(body["snapshot_version"], 1);
    assert_eq!(body["rebuild_in_progress"], false);
    assert_eq!(body["last_rebuild_error"], "rebuild worker has stopped");
}

#[tokio::test]
async fn unknown_routes_use_the_envelope() {
    let (status, body) = get_json(app(), "/graph").await;
    assert_error(status, &body, StatusCode::NOT_FOUND, "not_found");
}

async fn boom() -> &'static str {
    panic!("boom")
}

#[tokio::test]
async fn panics_become_internal_errors() {
    let app = Router::new()
        .route("/boom", get(boom))
        .layer(CatchPanicLayer::custom(handle_panic));
    let (status, body) = get_json(app, "/boom").await;
    assert_error(status, &body, StatusCode::INTERNAL_SERVER_ERROR, "internal");
    // no internal detail leaks out
    assert_eq!(body["message"], "internal error");
}
