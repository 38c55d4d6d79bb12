//! Integration tests for the content API
//!
//! Exercises the router directly with `tower::ServiceExt::oneshot` against
//! a temporary content tree.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use nomad_site::api::{api_router, AppContext};
use nomad_site::content::ContentStore;
use serde_json::Value;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

/// Build a content tree with one document of each kind
fn content_fixture() -> TempDir {
    let dir = TempDir::new().unwrap();
    let write = |rel: &str, contents: &str| {
        let path = dir.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    };

    write(
        "devlogs/017-rations.md",
        "+++\ntitle = \"Rations\"\ndate = \"2025-03-14\"\nsummary = \"Counting tins.\"\norder = 17\n+++\nWe counted the tins again.\n",
    );
    write(
        "devlogs/001-signal.md",
        "+++\ntitle = \"Signal Acquired\"\norder = 1\n+++\nFirst contact with the relay.\n",
    );
    write(
        "lore/the-drift.md",
        "+++\ntitle = \"The Drift\"\ncategory = \"World\"\nsummary = \"Where signals go to die.\"\n+++\nNobody maps the Drift.\n",
    );
    write(
        "systems/relay-network.md",
        "+++\ntitle = \"Relay Network\"\nsummary = \"Backbone comms.\"\nost = \"archives\"\n+++\nHops between dead stations.\n",
    );
    write(
        "gallery/gallery.json",
        r#"[{"id": "g1", "filename": "relay.png", "caption": "The relay", "type": "image"}]"#,
    );

    dir
}

fn test_router(dir: &TempDir) -> Router {
    api_router(AppContext {
        content: Arc::new(ContentStore::new(dir.path())),
    })
}

/// Helper to make GET requests to the test router
async fn get(app: &Router, path: &str) -> (StatusCode, Option<Value>) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(path)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        None
    } else {
        serde_json::from_slice(&body).ok()
    };
    (status, json)
}

#[tokio::test]
async fn health_reports_healthy() {
    let dir = content_fixture();
    let app = test_router(&dir);

    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    let body = body.unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["module"], "nomad_site");
}

#[tokio::test]
async fn devlogs_are_listed_in_display_order() {
    let dir = content_fixture();
    let app = test_router(&dir);

    let (status, body) = get(&app, "/api/devlogs").await;
    assert_eq!(status, StatusCode::OK);
    let devlogs = body.unwrap();
    let devlogs = devlogs.as_array().unwrap();
    assert_eq!(devlogs.len(), 2);
    assert_eq!(devlogs[0]["id"], "001-signal");
    assert_eq!(devlogs[1]["id"], "017-rations");
    assert_eq!(devlogs[1]["date"], "2025-03-14");
}

#[tokio::test]
async fn devlog_by_id_round_trips() {
    let dir = content_fixture();
    let app = test_router(&dir);

    let (status, body) = get(&app, "/api/devlogs/017-rations").await;
    assert_eq!(status, StatusCode::OK);
    let devlog = body.unwrap();
    assert_eq!(devlog["title"], "Rations");
    assert_eq!(devlog["summary"], "Counting tins.");
    assert!(devlog["content"]
        .as_str()
        .unwrap()
        .contains("counted the tins"));
}

#[tokio::test]
async fn missing_devlog_is_a_404_with_json_error() {
    let dir = content_fixture();
    let app = test_router(&dir);

    let (status, body) = get(&app, "/api/devlogs/nonexistent").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body.unwrap()["error"], "Devlog not found");
}

#[tokio::test]
async fn lore_carries_its_category() {
    let dir = content_fixture();
    let app = test_router(&dir);

    let (status, body) = get(&app, "/api/lore/the-drift").await;
    assert_eq!(status, StatusCode::OK);
    let entry = body.unwrap();
    assert_eq!(entry["category"], "World");

    let (status, _) = get(&app, "/api/lore/elsewhere").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn system_docs_expose_the_ost_override() {
    let dir = content_fixture();
    let app = test_router(&dir);

    let (status, body) = get(&app, "/api/systems").await;
    assert_eq!(status, StatusCode::OK);
    let systems = body.unwrap();
    assert_eq!(systems[0]["id"], "relay-network");
    assert_eq!(systems[0]["ost"], "archives");
}

#[tokio::test]
async fn gallery_lists_items_from_json() {
    let dir = content_fixture();
    let app = test_router(&dir);

    let (status, body) = get(&app, "/api/gallery").await;
    assert_eq!(status, StatusCode::OK);
    let gallery = body.unwrap();
    assert_eq!(gallery[0]["filename"], "relay.png");
    assert_eq!(gallery[0]["type"], "image");
}

#[tokio::test]
async fn empty_content_tree_serves_empty_collections() {
    let dir = TempDir::new().unwrap();
    let app = test_router(&dir);

    for path in ["/api/devlogs", "/api/lore", "/api/systems", "/api/gallery"] {
        let (status, body) = get(&app, path).await;
        assert_eq!(status, StatusCode::OK, "{path}");
        assert_eq!(body.unwrap().as_array().unwrap().len(), 0, "{path}");
    }
}
