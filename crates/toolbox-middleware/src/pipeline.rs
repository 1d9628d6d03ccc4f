//! Ordered middleware chain.
//!
//! A [`Chain`] is an ordered list of [`Middleware`] plus a terminal
//! [`Handler`]. For layers `[A, B, C]` a request runs A's pre-logic, then
//! B's, then C's, then the handler, then C's post-logic, B's and A's. The
//! chain is assembled back to front so that the first declared layer is the
//! outermost one.
//!
//! When an [`ExclusionMatcher`] is configured it is evaluated once per
//! request before anything else; a matching request goes straight to the
//! handler with a default [`RequestContext`] and skips every layer,
//! including panic recovery.
//!
//! ## Example
//!
//! ```
//! use toolbox_core::{body, ContextKey, Request, RequestContext, Response};
//! use toolbox_middleware::stages::{OrganizationMiddleware, TraceIdMiddleware};
//! use toolbox_middleware::{Chain, ExclusionSet};
//!
//! async fn whoami(ctx: RequestContext, _request: Request) -> Response {
//!     http::Response::new(body::full(ctx.org_id().to_owned()))
//! }
//!
//! let chain = Chain::builder()
//!     .layer(TraceIdMiddleware::new())
//!     .layer(OrganizationMiddleware::new())
//!     .exclude(ExclusionSet::new().path("/healthz"))
//!     .build(whoami);
//!
//! assert_eq!(chain.stage_names(), vec!["trace_id", "organization"]);
//! ```

use crate::context::MiddlewareContext;
use crate::exclusion::ExclusionMatcher;
use crate::middleware::{BoxFuture, Middleware, Next};
use std::future::Future;
use std::sync::Arc;
use toolbox_core::{Request, RequestContext, Response};

/// A type-erased middleware that can be stored in a vector.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// The terminal request handler at the end of a chain.
///
/// Implemented for every `Fn(RequestContext, Request) -> impl Future<Output = Response>`.
/// The handler receives an owned snapshot of the enriched context; the same
/// snapshot is also stored in the request's extensions.
pub trait Handler: Send + Sync + 'static {
    /// Handles the request.
    fn call(&self, ctx: RequestContext, request: Request) -> BoxFuture<'static, Response>;
}

impl<F, Fut> Handler for F
where
    F: Fn(RequestContext, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    fn call(&self, ctx: RequestContext, request: Request) -> BoxFuture<'static, Response> {
        Box::pin(self(ctx, request))
    }
}

/// An immutable, composed middleware chain.
///
/// Cloning is cheap; clones share the same layers, matcher and handler and
/// can serve requests concurrently.
#[derive(Clone)]
pub struct Chain {
    layers: Vec<BoxedMiddleware>,
    exclusion: Option<Arc<dyn ExclusionMatcher>>,
    handler: Arc<dyn Handler>,
}

impl std::fmt::Debug for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chain")
            .field("layers", &self.stage_names())
            .field("exclusion", &self.exclusion.is_some())
            .finish_non_exhaustive()
    }
}

impl Chain {
    /// Creates a new chain builder.
    #[must_use]
    pub fn builder() -> ChainBuilder {
        ChainBuilder::new()
    }

    /// Processes one request through the chain.
    pub async fn handle(&self, mut request: Request) -> Response {
        if self.is_excluded(&request) {
            let ctx = RequestContext::new();
            request.extensions_mut().insert(ctx.clone());
            return self.handler.call(ctx, request).await;
        }

        let mut ctx = MiddlewareContext::new();
        let handler = Arc::clone(&self.handler);
        let next = self.build_chain(move |ctx: &mut MiddlewareContext, mut request: Request| {
            let snapshot = ctx.snapshot();
            request.extensions_mut().insert(snapshot.clone());
            handler.call(snapshot, request)
        });
        next.run(&mut ctx, request).await
    }

    /// Returns true if the request bypasses every layer.
    #[must_use]
    pub fn is_excluded(&self, request: &Request) -> bool {
        self.exclusion
            .as_ref()
            .is_some_and(|matcher| matcher.skip(request.uri().path()))
    }

    fn build_chain<'a, H>(&'a self, handler: H) -> Next<'a>
    where
        H: FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, Response> + Send + 'a,
    {
        let mut next = Next::handler(handler);
        for middleware in self.layers.iter().rev() {
            next = Next::new(middleware.as_ref(), next);
        }
        next
    }

    /// Returns the names of all layers in execution order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.layers.iter().map(|mw| mw.name()).collect()
    }

    /// Returns the number of layers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Returns true if the chain has no layers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

/// Builder for constructing a [`Chain`].
///
/// Layers run in the order they are added.
#[derive(Default)]
pub struct ChainBuilder {
    layers: Vec<BoxedMiddleware>,
    exclusion: Option<Arc<dyn ExclusionMatcher>>,
}

impl ChainBuilder {
    /// Creates a builder with no layers and no exclusion.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a layer.
    #[must_use]
    pub fn layer<M: Middleware>(mut self, middleware: M) -> Self {
        self.layers.push(Arc::new(middleware));
        self
    }

    /// Appends an already shared layer.
    #[must_use]
    pub fn layer_arc(mut self, middleware: BoxedMiddleware) -> Self {
        self.layers.push(middleware);
        self
    }

    /// Sets the exclusion matcher, replacing any previous one.
    #[must_use]
    pub fn exclude<E: ExclusionMatcher>(mut self, matcher: E) -> Self {
        self.exclusion = Some(Arc::new(matcher));
        self
    }

    /// Composes the layers around `handler`.
    ///
    /// An empty builder yields a chain that only calls `handler`.
    #[must_use]
    pub fn build<H: Handler>(self, handler: H) -> Chain {
        Chain {
            layers: self.layers,
            exclusion: self.exclusion,
            handler: Arc::new(handler),
        }
    }
}
