//! The request handler capability.
//!
//! A handler receives a request and either answers it or hands it to the
//! rest of the chain through [`Next`]. Anything that can do that can be
//! mounted: an axum [`Router`], an async closure, or a tower [`Layer`].

use std::convert::Infallible;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::{Body, Bytes, HttpBody};
use axum::extract::{OriginalUri, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{BoxError, Router};
use parking_lot::Mutex;
use tower::{Layer, Service, ServiceExt};

use crate::pipeline::Next;

pub(crate) type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Trait for request handlers.
pub trait Handler: Send + Sync + 'static {
    /// Answer the request, or pass it on with `next.run(req)`.
    fn handle(&self, req: Request, next: Next) -> impl Future<Output = Response> + Send;

    /// Handler name for debugging and pipeline descriptions.
    fn name(&self) -> &str;
}

/// Object-safe version of the Handler trait.
trait HandlerDyn: Send + Sync {
    fn handle_dyn<'a>(&'a self, req: Request, next: Next) -> BoxFuture<'a, Response>;
    fn name_dyn(&self) -> &str;
}

impl<T: Handler> HandlerDyn for T {
    fn handle_dyn<'a>(&'a self, req: Request, next: Next) -> BoxFuture<'a, Response> {
        Box::pin(self.handle(req, next))
    }

    fn name_dyn(&self) -> &str {
        self.name()
    }
}

/// A type-erased, cheaply cloneable handler.
#[derive(Clone)]
pub struct BoxHandler {
    inner: Arc<dyn HandlerDyn>,
}

impl BoxHandler {
    pub fn new<H: Handler>(handler: H) -> Self {
        Self {
            inner: Arc::new(handler),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.name_dyn()
    }

    pub(crate) fn call(&self, req: Request, next: Next) -> BoxFuture<'_, Response> {
        self.inner.handle_dyn(req, next)
    }
}

impl std::fmt::Debug for BoxHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("BoxHandler").field(&self.name()).finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// axum Router
// ─────────────────────────────────────────────────────────────────────────────

/// Request that no route of a wrapped router matched. Carried back out of
/// the router in the fallback response so it can continue down the chain.
#[derive(Clone)]
struct Unmatched(Arc<Mutex<Option<Request>>>);

/// Handler backed by an axum [`Router`]. Requests that match none of the
/// router's routes, by path or by method, fall through to the next handler.
pub struct RouterHandler {
    name: String,
    router: Router,
}

/// Wrap an axum router as a handler. Add all routes before wrapping: the
/// method fallback only covers routes already on `router`.
pub fn router(name: impl Into<String>, router: Router) -> RouterHandler {
    RouterHandler {
        name: name.into(),
        router: router
            .fallback(fall_through)
            .method_not_allowed_fallback(fall_through),
    }
}

async fn fall_through(mut req: Request) -> Response {
    // The router stamps the URI it saw; the next router must stamp its own.
    req.extensions_mut().remove::<OriginalUri>();
    let mut response = StatusCode::NOT_FOUND.into_response();
    response
        .extensions_mut()
        .insert(Unmatched(Arc::new(Mutex::new(Some(req)))));
    response
}

impl Handler for RouterHandler {
    async fn handle(&self, req: Request, next: Next) -> Response {
        let mut response = match self.router.clone().oneshot(req).await {
            Ok(response) => response,
            Err(never) => match never {},
        };

        if let Some(Unmatched(slot)) = response.extensions_mut().remove::<Unmatched>() {
            // Release the lock before the rest of the chain runs.
            let taken = slot.lock().take();
            if let Some(req) = taken {
                return next.run(req).await;
            }
        }

        response
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Closures
// ─────────────────────────────────────────────────────────────────────────────

/// Handler backed by an async closure.
pub struct FnHandler<F> {
    name: String,
    f: F,
}

/// Wrap an async closure `|req, next| async { ... }` as a handler.
pub fn from_fn<F, Fut, R>(name: impl Into<String>, f: F) -> FnHandler<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse,
{
    FnHandler { name: name.into(), f }
}

impl<F, Fut, R> Handler for FnHandler<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse,
{
    fn handle(&self, req: Request, next: Next) -> impl Future<Output = Response> + Send {
        let fut = (self.f)(req, next);
        async move { fut.await.into_response() }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// tower Layers
// ─────────────────────────────────────────────────────────────────────────────

/// The rest of the chain as a tower [`Service`], so a tower [`Layer`] can
/// wrap it.
#[derive(Clone)]
pub struct NextService {
    next: Next,
}

impl NextService {
    pub fn new(next: Next) -> Self {
        Self { next }
    }
}

impl Service<Request> for NextService {
    type Response = Response;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Response, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let next = self.next.clone();
        Box::pin(async move { Ok(next.run(req).await) })
    }
}

/// Handler backed by a tower layer wrapped around the rest of the chain.
pub struct LayerHandler<L, B> {
    name: String,
    layer: L,
    _body: PhantomData<fn() -> B>,
}

/// Wrap a tower layer (e.g. `CorsLayer`, `TraceLayer`) as a handler.
pub fn layer<L, B>(name: impl Into<String>, layer: L) -> LayerHandler<L, B> {
    LayerHandler {
        name: name.into(),
        layer,
        _body: PhantomData,
    }
}

impl<L, B> Handler for LayerHandler<L, B>
where
    L: Layer<NextService> + Send + Sync + 'static,
    L::Service: Service<Request, Response = axum::http::Response<B>, Error = Infallible> + Send + 'static,
    <L::Service as Service<Request>>::Future: Send + 'static,
    B: HttpBody<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    fn handle(&self, req: Request, next: Next) -> impl Future<Output = Response> + Send {
        let service = self.layer.layer(NextService::new(next));
        async move {
            match service.oneshot(req).await {
                Ok(response) => response.map(Body::new),
                Err(never) => match never {},
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}
