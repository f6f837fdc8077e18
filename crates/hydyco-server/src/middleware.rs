//! Built-in middleware: JSON body parsing, request logging, CORS and auth.
//!
//! The controller installs these itself. Body parsing and logging run ahead
//! of everything; CORS and auth are the first two entries of the
//! middleware list.

use std::time::Duration;

use axum::body::Body;
use axum::extract::Request;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method};
use axum::response::Response;
use hydyco_protocol::{CorsOptions, ErrorBody, ErrorCode};
use hydyco_transport::{BoxHandler, Handler, Next, error_response, layer};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tower_http::LatencyUnit;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::trace::{DefaultOnResponse, TraceLayer};
use tracing::{Level, debug, warn};

/// Largest JSON body the parser will buffer.
pub const JSON_BODY_LIMIT: usize = 100 * 1024;

// ─────────────────────────────────────────────────────────────────────────────
// JSON body parsing
// ─────────────────────────────────────────────────────────────────────────────

/// Parsed JSON request body, stored in request extensions.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonBody(pub Value);

/// Parses `application/json` bodies up front. Invalid JSON never reaches
/// another handler.
pub struct JsonBodyParser {
    limit: usize,
}

impl JsonBodyParser {
    pub fn new() -> Self {
        Self {
            limit: JSON_BODY_LIMIT,
        }
    }

    pub fn with_limit(limit: usize) -> Self {
        Self { limit }
    }
}

impl Default for JsonBodyParser {
    fn default() -> Self {
        Self::new()
    }
}

impl Handler for JsonBodyParser {
    async fn handle(&self, req: Request, next: Next) -> Response {
        if !is_json(req.headers()) {
            return next.run(req).await;
        }

        let (mut parts, body) = req.into_parts();
        let bytes = match axum::body::to_bytes(body, self.limit).await {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!("Rejected request body: {e}");
                return error_response(ErrorBody::new(
                    ErrorCode::PayloadTooLarge,
                    format!("Request body exceeds {} bytes", self.limit),
                ));
            }
        };

        if !bytes.is_empty() {
            match serde_json::from_slice::<Value>(&bytes) {
                Ok(value) => {
                    parts.extensions.insert(JsonBody(value));
                }
                Err(e) => {
                    return error_response(ErrorBody::bad_request(format!("Invalid JSON body: {e}")));
                }
            }
        }

        next.run(Request::from_parts(parts, Body::from(bytes))).await
    }

    fn name(&self) -> &str {
        "json"
    }
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|mime| {
            let mime = mime.trim().to_ascii_lowercase();
            mime == "application/json" || mime.ends_with("+json")
        })
        .unwrap_or(false)
}

// ─────────────────────────────────────────────────────────────────────────────
// Request logging
// ─────────────────────────────────────────────────────────────────────────────

/// One span per request, tagged with a fresh request id, and an info line
/// per response with status and latency.
pub fn request_logger() -> BoxHandler {
    let trace = TraceLayer::new_for_http()
        .make_span_with(|req: &Request| {
            let id = uuid::Uuid::new_v4();
            tracing::info_span!(
                "request",
                %id,
                method = %req.method(),
                path = %req.uri().path()
            )
        })
        .on_response(
            DefaultOnResponse::new()
                .level(Level::INFO)
                .latency_unit(LatencyUnit::Millis),
        );
    BoxHandler::new(layer("logger", trace))
}

// ─────────────────────────────────────────────────────────────────────────────
// CORS
// ─────────────────────────────────────────────────────────────────────────────

/// CORS handler configured from the server's CORS options.
pub fn cors(options: &CorsOptions) -> BoxHandler {
    BoxHandler::new(layer("cors", cors_layer(options)))
}

/// Build a `CorsLayer` from the configured CORS options. With no options it
/// allows any origin and the common methods, and mirrors requested headers.
///
/// Recognized keys: `origin`, `methods`, `allowedHeaders`, `exposedHeaders`,
/// `credentials`, `maxAge`.
pub fn cors_layer(options: &CorsOptions) -> CorsLayer {
    let credentials = options
        .get("credentials")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let mut layer = CorsLayer::new()
        .allow_origin(allow_origin(options.get("origin"), credentials))
        .allow_methods(allow_methods(options.get("methods")))
        .allow_headers(allow_headers(options.get("allowedHeaders")))
        .allow_credentials(credentials);

    if let Some(exposed) = options.get("exposedHeaders") {
        layer = layer.expose_headers(header_names(exposed));
    }
    if let Some(secs) = options.get("maxAge").and_then(Value::as_u64) {
        layer = layer.max_age(Duration::from_secs(secs));
    }

    for key in options.keys() {
        if !matches!(
            key.as_str(),
            "origin" | "methods" | "allowedHeaders" | "exposedHeaders" | "credentials" | "maxAge"
        ) {
            debug!("Ignoring unsupported CORS option: {key}");
        }
    }

    layer
}

fn allow_origin(origin: Option<&Value>, credentials: bool) -> AllowOrigin {
    let wildcard = || {
        // A literal `*` cannot be combined with credentials.
        if credentials {
            AllowOrigin::mirror_request()
        } else {
            AllowOrigin::any()
        }
    };

    match origin {
        None | Some(Value::Null) => wildcard(),
        Some(Value::Bool(true)) => AllowOrigin::mirror_request(),
        Some(Value::Bool(false)) => AllowOrigin::list(Vec::<HeaderValue>::new()),
        Some(Value::String(s)) if s == "*" => wildcard(),
        Some(other) => {
            let origins: Vec<HeaderValue> = string_list(other)
                .iter()
                .filter(|o| o.as_str() != "*")
                .filter_map(|o| HeaderValue::from_str(o).ok())
                .collect();
            AllowOrigin::list(origins)
        }
    }
}

fn allow_methods(methods: Option<&Value>) -> Vec<Method> {
    let Some(methods) = methods else {
        return vec![
            Method::GET,
            Method::HEAD,
            Method::PUT,
            Method::PATCH,
            Method::POST,
            Method::DELETE,
        ];
    };

    string_list(methods)
        .iter()
        .filter_map(|m| match Method::from_bytes(m.to_ascii_uppercase().as_bytes()) {
            Ok(method) => Some(method),
            Err(_) => {
                warn!("Ignoring invalid CORS method: {m}");
                None
            }
        })
        .collect()
}

fn allow_headers(headers: Option<&Value>) -> AllowHeaders {
    match headers {
        None => AllowHeaders::mirror_request(),
        Some(headers) => AllowHeaders::list(header_names(headers)),
    }
}

fn header_names(value: &Value) -> Vec<HeaderName> {
    string_list(value)
        .iter()
        .filter_map(|h| match HeaderName::from_bytes(h.as_bytes()) {
            Ok(name) => Some(name),
            Err(_) => {
                warn!("Ignoring invalid CORS header name: {h}");
                None
            }
        })
        .collect()
}

/// `"a, b"` or `["a", "b"]` as a list of trimmed strings.
fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(|s| s.trim().to_string())
            .collect(),
        _ => Vec::new(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Auth
// ─────────────────────────────────────────────────────────────────────────────

/// Marker inserted into request extensions once the bearer token checks out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Authenticated;

/// Whether the auth handler accepted this request's token.
pub fn is_authenticated(req: &Request) -> bool {
    req.extensions().get::<Authenticated>().is_some()
}

/// Shared-secret bearer token check.
///
/// No `Authorization` header: passes through unauthenticated. Matching
/// `Bearer <secret>`: passes through marked [`Authenticated`]. Anything
/// else: 401.
pub struct SharedSecretAuth {
    secret: SecretString,
}

impl SharedSecretAuth {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: SecretString::from(secret.into()),
        }
    }
}

impl Handler for SharedSecretAuth {
    async fn handle(&self, mut req: Request, next: Next) -> Response {
        if !req.headers().contains_key(AUTHORIZATION) {
            return next.run(req).await;
        }

        let valid = req
            .headers()
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer ").or_else(|| v.strip_prefix("bearer ")))
            .is_some_and(|token| token.trim() == self.secret.expose_secret());

        if !valid {
            warn!("Rejected request with invalid token: {} {}", req.method(), req.uri().path());
            return error_response(ErrorBody::unauthorized("Invalid authentication token"));
        }

        req.extensions_mut().insert(Authenticated);
        next.run(req).await
    }

    fn name(&self) -> &str {
        "auth"
    }
}
