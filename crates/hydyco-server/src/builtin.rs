//! Admin UI and welcome page.

use axum::Router;
use axum::extract::Request;
use axum::http::Method;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use hydyco_protocol::ADMIN_UI_PATH;
use hydyco_transport::{BoxHandler, Handler, Next, router};

const ADMIN_UI_HTML: &str = r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Hydyco Admin</title>
</head>
<body>
  <main id="hydyco-admin">
    <h1>Hydyco Admin</h1>
    <p>Mappings are served from <code>/admin/file</code>.</p>
    <p>API description: <a href="/admin/docs">/admin/docs</a></p>
  </main>
</body>
</html>
"#;

const WELCOME_HTML: &str = r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Hydyco</title>
</head>
<body>
  <h1>Welcome to Hydyco</h1>
  <p>The server is up. Open the <a href="/admin-ui">admin UI</a> to manage mappings.</p>
</body>
</html>
"#;

/// The admin UI page at `/admin-ui`.
pub fn admin_ui() -> BoxHandler {
    let routes = Router::new().route(ADMIN_UI_PATH, get(|| async { Html(ADMIN_UI_HTML) }));
    BoxHandler::new(router("admin-ui", routes))
}

/// Last handler in the chain. Answers `GET /` and leaves everything else to
/// the pipeline's 404.
pub struct Welcome;

impl Handler for Welcome {
    async fn handle(&self, req: Request, next: Next) -> Response {
        let is_root = req.uri().path() == "/";
        let readable = req.method() == Method::GET || req.method() == Method::HEAD;
        if is_root && readable {
            return Html(WELCOME_HTML).into_response();
        }
        next.run(req).await
    }

    fn name(&self) -> &str {
        "welcome"
    }
}

pub fn welcome() -> BoxHandler {
    BoxHandler::new(Welcome)
}
