//! Hydyco Transport Layer
//!
//! Provides the request handler capability and the HTTP listener.
//! The transport layer handles:
//! - The `Handler` trait ("handle a request, optionally pass it on")
//! - Adapters for axum routers, async closures, and tower layers
//! - Mounting handlers under a path prefix
//! - Binding the composed pipeline to a TCP port
//!
//! The transport is decoupled from the lifecycle controller: it knows how to
//! run an ordered list of handlers, not which handlers exist.

pub mod handler;
pub mod pipeline;
pub mod response;
pub mod server;

pub use handler::{BoxHandler, FnHandler, Handler, LayerHandler, NextService, RouterHandler, from_fn, layer, router};
pub use pipeline::{Mount, Next, Pipeline, PipelineBuilder, StageInfo};
pub use response::error_response;
pub use server::{HttpServer, ListenConfig, ListenError};
