//! Ordered handler pipeline.
//!
//! Handlers run in the order they were added. Each one is mounted either
//! globally or under a path prefix; a prefixed handler only sees requests
//! at or below its prefix, with the prefix stripped from the URI. Whatever
//! is left unanswered at the end of the chain gets a JSON 404.

use std::convert::Infallible;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::extract::Request;
use axum::http::Uri;
use axum::http::uri::PathAndQuery;
use axum::response::Response;
use hydyco_protocol::ErrorBody;
use tower::Service;

use crate::handler::{BoxFuture, BoxHandler};
use crate::response::error_response;

/// Where a handler is mounted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mount {
    /// Sees every request.
    Global,
    /// Sees requests at or below the prefix, with the prefix stripped.
    Prefix(String),
}

impl Mount {
    /// Prefix mount. `""` and `"/"` collapse to [`Mount::Global`].
    pub fn prefix(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let trimmed = prefix.trim_end_matches('/');
        if trimmed.is_empty() {
            return Self::Global;
        }
        if trimmed.starts_with('/') {
            Self::Prefix(trimmed.to_string())
        } else {
            Self::Prefix(format!("/{trimmed}"))
        }
    }

    /// The path a mounted handler sees for `path`, or None if the mount
    /// does not cover it.
    fn mounted_path<'a>(&self, path: &'a str) -> Option<&'a str> {
        match self {
            Self::Global => Some(path),
            Self::Prefix(prefix) => match path.strip_prefix(prefix.as_str()) {
                Some("") => Some("/"),
                Some(rest) if rest.starts_with('/') => Some(rest),
                _ => None,
            },
        }
    }
}

impl std::fmt::Display for Mount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Global => f.write_str("*"),
            Self::Prefix(prefix) => f.write_str(prefix),
        }
    }
}

/// Name and mount point of one pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageInfo {
    pub name: String,
    pub mount: Mount,
}

#[derive(Clone)]
struct Stage {
    mount: Mount,
    handler: BoxHandler,
}

/// The URI a request had before it entered a prefix mount.
#[derive(Clone)]
struct MountedFrom(Uri);

/// Collects stages in order, then freezes them into a [`Pipeline`].
#[derive(Clone, Default)]
pub struct PipelineBuilder {
    stages: Vec<Stage>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler at the given mount.
    pub fn push(&mut self, mount: Mount, handler: BoxHandler) {
        self.stages.push(Stage { mount, handler });
    }

    /// Append a globally mounted handler.
    pub fn push_global(&mut self, handler: BoxHandler) {
        self.push(Mount::Global, handler);
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn build(self) -> Pipeline {
        Pipeline {
            stages: self.stages.into(),
        }
    }
}

/// An immutable, shareable chain of mounted handlers.
#[derive(Clone)]
pub struct Pipeline {
    stages: Arc<[Stage]>,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Stage names and mounts, in dispatch order.
    pub fn describe(&self) -> Vec<StageInfo> {
        self.stages
            .iter()
            .map(|stage| StageInfo {
                name: stage.handler.name().to_string(),
                mount: stage.mount.clone(),
            })
            .collect()
    }

    /// Run a request through the chain from the first stage.
    pub async fn dispatch(&self, req: Request) -> Response {
        Next {
            stages: self.stages.clone(),
            index: 0,
        }
        .run(req)
        .await
    }
}

impl Service<Request> for Pipeline {
    type Response = Response;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Response, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let pipeline = self.clone();
        Box::pin(async move { Ok(pipeline.dispatch(req).await) })
    }
}

/// The remainder of the chain after the current handler.
#[derive(Clone)]
pub struct Next {
    stages: Arc<[Stage]>,
    index: usize,
}

impl Next {
    /// Continue with the first remaining stage whose mount covers the
    /// request. Answers 404 when the chain is exhausted.
    pub async fn run(self, mut req: Request) -> Response {
        leave_mount(&mut req);

        let mut index = self.index;
        while let Some(stage) = self.stages.get(index) {
            index += 1;

            let Some(path) = stage.mount.mounted_path(req.uri().path()) else {
                continue;
            };
            if let Mount::Prefix(_) = stage.mount {
                let Some(stripped) = with_path(req.uri(), path) else {
                    continue;
                };
                let original = std::mem::replace(req.uri_mut(), stripped);
                req.extensions_mut().insert(MountedFrom(original));
            }

            let next = Next {
                stages: self.stages.clone(),
                index,
            };
            return stage.handler.call(req, next).await;
        }

        error_response(ErrorBody::not_found(format!(
            "Cannot {} {}",
            req.method(),
            req.uri().path()
        )))
    }
}

/// Restore the URI a prefix mount stripped.
fn leave_mount(req: &mut Request) {
    if let Some(MountedFrom(original)) = req.extensions_mut().remove::<MountedFrom>() {
        *req.uri_mut() = original;
    }
}

fn with_path(uri: &Uri, path: &str) -> Option<Uri> {
    let path_and_query = match uri.query() {
        Some(query) => format!("{path}?{query}"),
        None => path.to_string(),
    };
    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(PathAndQuery::try_from(path_and_query).ok()?);
    Uri::from_parts(parts).ok()
}
