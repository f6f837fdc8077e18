//! Built-in plugins, mounted under the admin prefix.
//!
//! - file plugin: CRUD over the mapping store at `/file`
//! - docs plugin: API description at `/docs`

use std::sync::{Arc, OnceLock};

use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use hydyco_protocol::{ADMIN_PREFIX, ErrorBody};
use hydyco_store::{MappingStore, StoreError, normalize};
use hydyco_transport::{BoxHandler, error_response, router};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{error, info};

// ─────────────────────────────────────────────────────────────────────────────
// File plugin
// ─────────────────────────────────────────────────────────────────────────────

/// Where the file plugin gets its store from.
#[derive(Clone)]
struct FileState {
    store: Arc<OnceLock<MappingStore>>,
}

impl FileState {
    /// The cached store, opening it from the install location on first use.
    /// A failed open is not cached.
    fn store(&self) -> Result<MappingStore, StoreError> {
        if let Some(store) = self.store.get() {
            return Ok(store.clone());
        }
        let opened = MappingStore::open_default()?;
        info!("Mapping store opened at {}", opened.root().display());
        Ok(self.store.get_or_init(|| opened).clone())
    }

    /// Run one store operation on a blocking thread.
    async fn run<T, F>(&self, op: F) -> Result<T, Response>
    where
        T: Send + 'static,
        F: FnOnce(&MappingStore) -> Result<T, StoreError> + Send + 'static,
    {
        let state = self.clone();
        let joined = tokio::task::spawn_blocking(move || {
            let store = state.store()?;
            op(&store)
        })
        .await;

        match joined {
            Ok(result) => result.map_err(|e| store_error_response(&e)),
            Err(e) => {
                error!("Mapping store task failed: {e}");
                Err(error_response(ErrorBody::internal("Mapping store task failed")))
            }
        }
    }
}

/// Map a store failure onto an HTTP error.
pub fn store_error_response(err: &StoreError) -> Response {
    match err {
        StoreError::NotFound { .. } => error_response(ErrorBody::not_found(err.to_string())),
        StoreError::InvalidName { .. } => error_response(ErrorBody::bad_request(err.to_string())),
        StoreError::RootNotFound { .. } | StoreError::Io { .. } | StoreError::Serialize { .. } => {
            error!("Mapping store error: {err}");
            error_response(ErrorBody::internal(err.to_string()))
        }
    }
}

/// Built-in file plugin backed by the mapping store.
///
/// Routes, relative to the admin prefix:
///
/// | Method       | Path           | Action                           |
/// |--------------|----------------|----------------------------------|
/// | GET          | `/file`        | list (`?namesOnly=true` for names) |
/// | GET          | `/file/{name}` | read                             |
/// | POST, PUT    | `/file/{name}` | write the JSON body              |
/// | DELETE       | `/file/{name}` | delete                           |
pub struct FilePlugin {
    state: FileState,
}

impl FilePlugin {
    /// Use an already opened store.
    pub fn new(store: MappingStore) -> Self {
        let cell = OnceLock::new();
        let _ = cell.set(store);
        Self {
            state: FileState {
                store: Arc::new(cell),
            },
        }
    }

    /// Open the store from the install location on the first request.
    pub fn lazy() -> Self {
        Self {
            state: FileState {
                store: Arc::new(OnceLock::new()),
            },
        }
    }

    pub fn into_handler(self) -> BoxHandler {
        let routes = Router::new()
            .route("/file", get(list_files))
            .route(
                "/file/{name}",
                get(read_file).post(write_file).put(write_file).delete(delete_file),
            )
            .with_state(self.state);
        BoxHandler::new(router("file-plugin", routes))
    }
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    #[serde(rename = "namesOnly", default)]
    names_only: bool,
}

async fn list_files(State(state): State<FileState>, Query(query): Query<ListQuery>) -> Response {
    match state.run(move |store| store.list(query.names_only)).await {
        Ok(listing) => Json(listing.into_value()).into_response(),
        Err(response) => response,
    }
}

async fn read_file(State(state): State<FileState>, Path(name): Path<String>) -> Response {
    match state.run(move |store| store.read(&name)).await {
        Ok(document) => Json(document).into_response(),
        Err(response) => response,
    }
}

async fn write_file(
    State(state): State<FileState>,
    Path(name): Path<String>,
    Json(document): Json<Value>,
) -> Response {
    let normalized = normalize(&name);
    match state.run(move |store| store.write(&name, &document)).await {
        Ok(()) => Json(json!({ "name": normalized })).into_response(),
        Err(response) => response,
    }
}

async fn delete_file(State(state): State<FileState>, Path(name): Path<String>) -> Response {
    let normalized = normalize(&name);
    match state.run(move |store| store.delete(&name)).await {
        Ok(()) => Json(json!({ "deleted": normalized })).into_response(),
        Err(response) => response,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Docs plugin
// ─────────────────────────────────────────────────────────────────────────────

/// Built-in docs plugin: `GET /docs` describes the file plugin's API.
pub fn docs_plugin() -> BoxHandler {
    let routes = Router::new().route("/docs", get(|| async { Json(api_description()) }));
    BoxHandler::new(router("docs-plugin", routes))
}

/// OpenAPI-style description of the built-in endpoints.
pub fn api_description() -> Value {
    let file = format!("{ADMIN_PREFIX}/file");
    let file_by_name = format!("{ADMIN_PREFIX}/file/{{name}}");
    let name_param = json!({ "name": "name", "in": "path", "required": true, "schema": { "type": "string" } });

    json!({
        "openapi": "3.0.0",
        "info": {
            "title": "Hydyco",
            "version": env!("CARGO_PKG_VERSION"),
        },
        "paths": {
            file: {
                "get": {
                    "summary": "List mapping files",
                    "parameters": [
                        { "name": "namesOnly", "in": "query", "schema": { "type": "boolean" } }
                    ],
                }
            },
            file_by_name: {
                "get": { "summary": "Read a mapping file", "parameters": [name_param.clone()] },
                "post": { "summary": "Create or overwrite a mapping file", "parameters": [name_param.clone()] },
                "put": { "summary": "Create or overwrite a mapping file", "parameters": [name_param.clone()] },
                "delete": { "summary": "Delete a mapping file", "parameters": [name_param] },
            }
        }
    })
}
