//! End-to-end integration tests — a started server on a random port, driven
//! over real HTTP.

use axum::Router;
use axum::extract::Request;
use axum::response::IntoResponse;
use axum::routing::get;
use hydyco_protocol::ServerConfig;
use hydyco_server::{LifecycleController, is_authenticated};
use hydyco_store::{MappingStore, RootResolver};
use hydyco_transport::{BoxHandler, HttpServer, Next, from_fn, router};
use serde_json::{Value, json};
use tempfile::TempDir;

const SECRET: &str = "integration-secret";

struct TestServer {
    // Held so the store root outlives the server.
    dir: TempDir,
    server: HttpServer,
    client: reqwest::Client,
}

impl TestServer {
    fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{}", self.server.port(), path)
    }

    async fn stop(mut self) {
        drop(self.client);
        self.server.stop().await;
    }
}

/// Start a server with a temp store, a status database handler, and one
/// route that reports whether the request was authenticated.
async fn start_test_server() -> TestServer {
    let dir = TempDir::new().unwrap();
    let store = MappingStore::open(&RootResolver::fixed(dir.path())).unwrap();

    let config = ServerConfig::default()
        .with_port(0)
        .with_logger(false)
        .with_secret(SECRET);
    let mut controller = LifecycleController::with_store(config, store);

    let database = Router::new().route("/database", get(|| async { axum::Json(json!({ "ok": true })) }));
    controller
        .register_database(BoxHandler::new(router("test-database", database)))
        .unwrap();

    let whoami = BoxHandler::new(from_fn("whoami", |req: Request, next: Next| async move {
        if req.uri().path() != "/whoami" {
            return next.run(req).await;
        }
        let who = if is_authenticated(&req) { "user" } else { "guest" };
        axum::Json(json!({ "who": who })).into_response()
    }));
    controller.register_routes([whoami]).unwrap();

    let server = controller.start().await.unwrap();
    TestServer {
        dir,
        server,
        client: reqwest::Client::new(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Built-in pages
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_welcome_and_admin_ui() {
    let ts = start_test_server().await;

    let resp = ts.client.get(ts.url("/")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    assert!(resp.text().await.unwrap().contains("Welcome to Hydyco"));

    let resp = ts.client.get(ts.url("/admin-ui")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    assert!(resp.text().await.unwrap().contains("Hydyco Admin"));

    ts.stop().await;
}

#[tokio::test]
async fn test_database_handler_under_admin() {
    let ts = start_test_server().await;

    let body: Value = ts
        .client
        .get(ts.url("/admin/database"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body, json!({ "ok": true }));

    let resp = ts.client.get(ts.url("/database")).send().await.unwrap();
    assert_eq!(resp.status(), 404);

    ts.stop().await;
}

#[tokio::test]
async fn test_unknown_path_is_json_404() {
    let ts = start_test_server().await;

    let resp = ts.client.get(ts.url("/nope")).send().await.unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "not_found");
    assert_eq!(body["error"], "Cannot GET /nope");

    ts.stop().await;
}

// ─────────────────────────────────────────────────────────────────────────────
// Auth
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_auth_token() {
    let ts = start_test_server().await;

    let body: Value = ts
        .client
        .get(ts.url("/whoami"))
        .bearer_auth(SECRET)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["who"], "user");

    let body: Value = ts
        .client
        .get(ts.url("/whoami"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["who"], "guest");

    let resp = ts
        .client
        .get(ts.url("/whoami"))
        .bearer_auth("wrong")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    ts.stop().await;
}

// ─────────────────────────────────────────────────────────────────────────────
// File plugin
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_file_plugin_over_http() {
    let ts = start_test_server().await;

    let doc = json!({ "name": "Post", "fields": { "title": "string" } });
    let resp = ts
        .client
        .post(ts.url("/admin/file/Post.json"))
        .json(&doc)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.json::<Value>().await.unwrap(), json!({ "name": "post" }));
    assert!(ts.dir.path().join(".hydyco/post.json").is_file());

    let fetched: Value = ts
        .client
        .get(ts.url("/admin/file/post"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched, doc);

    let names: Value = ts
        .client
        .get(ts.url("/admin/file?namesOnly=true"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(names, json!(["post"]));

    let resp = ts.client.delete(ts.url("/admin/file/POST")).send().await.unwrap();
    assert_eq!(resp.status(), 200);

    let resp = ts.client.get(ts.url("/admin/file/post")).send().await.unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Model name post not found");

    ts.stop().await;
}

#[tokio::test]
async fn test_invalid_json_rejected() {
    let ts = start_test_server().await;

    let resp = ts
        .client
        .post(ts.url("/admin/file/broken"))
        .header("content-type", "application/json")
        .body("{ not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    assert!(!ts.dir.path().join(".hydyco/broken.json").exists());

    ts.stop().await;
}

#[tokio::test]
async fn test_docs_plugin() {
    let ts = start_test_server().await;

    let body: Value = ts
        .client
        .get(ts.url("/admin/docs"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(body["paths"]["/admin/file"].is_object());

    ts.stop().await;
}

// ─────────────────────────────────────────────────────────────────────────────
// Lifecycle
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_stop_closes_port() {
    let ts = start_test_server().await;
    let url = ts.url("/");
    ts.stop().await;

    let result = reqwest::Client::new().get(&url).send().await;
    assert!(result.is_err());
}
