//! Core middleware trait and types.
//!
//! This module defines the [`Middleware`] trait that every chain layer
//! implements. A middleware sees the request on the way in, decides whether
//! to call the rest of the chain through [`Next`], and sees the response on
//! the way out.
//!
//! # Example
//!
//! ```
//! use toolbox_middleware::{BoxFuture, Middleware, MiddlewareContext, Next};
//! use toolbox_core::{Request, Response};
//!
//! struct Timing;
//!
//! impl Middleware for Timing {
//!     fn name(&self) -> &'static str {
//!         "timing"
//!     }
//!
//!     fn process<'a>(
//!         &'a self,
//!         ctx: &'a mut MiddlewareContext,
//!         request: Request,
//!         next: Next<'a>,
//!     ) -> BoxFuture<'a, Response> {
//!         Box::pin(async move {
//!             let response = next.run(ctx, request).await;
//!             tracing::debug!(elapsed = ?ctx.elapsed(), "handled");
//!             response
//!         })
//!     }
//! }
//! ```

use crate::context::MiddlewareContext;
use std::future::Future;
use std::pin::Pin;
use toolbox_core::{Request, Response};

/// A boxed future that returns a response.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The core middleware trait.
///
/// A middleware receives the per-request context, the incoming request and
/// a [`Next`] handle for the remainder of the chain.
///
/// # Invariants
///
/// - Middleware MUST call `next.run()` at most once
/// - Middleware that does not call `next.run()` short-circuits the chain and
///   returns its own response
/// - Middleware holds only configuration captured at construction; all
///   per-request state lives in the [`MiddlewareContext`]
pub trait Middleware: Send + Sync + 'static {
    /// Returns the name of this middleware, used in logs.
    fn name(&self) -> &'static str;

    /// Process the request through this middleware.
    ///
    /// # Arguments
    ///
    /// * `ctx` - The per-request middleware context
    /// * `request` - The incoming HTTP request
    /// * `next` - Handle to invoke the rest of the chain
    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response>;
}

/// Handle to the rest of the chain.
///
/// `Next` is consumed by [`Next::run`], so it can be invoked at most once.
pub struct Next<'a> {
    inner: NextInner<'a>,
}

enum NextInner<'a> {
    /// More middleware to process
    Chain {
        middleware: &'a dyn Middleware,
        next: Box<Next<'a>>,
    },
    /// End of chain
    Handler(
        Box<dyn FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, Response> + Send + 'a>,
    ),
}

impl<'a> Next<'a> {
    /// Creates a `Next` that will invoke `middleware`, then `next`.
    pub(crate) fn new(middleware: &'a dyn Middleware, next: Next<'a>) -> Self {
        Self {
            inner: NextInner::Chain {
                middleware,
                next: Box::new(next),
            },
        }
    }

    /// Creates a terminal `Next` that invokes the handler.
    pub(crate) fn handler<F>(f: F) -> Self
    where
        F: FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, Response> + Send + 'a,
    {
        Self {
            inner: NextInner::Handler(Box::new(f)),
        }
    }

    /// Invokes the next middleware or the terminal handler.
    pub async fn run(self, ctx: &mut MiddlewareContext, request: Request) -> Response {
        match self.inner {
            NextInner::Chain { middleware, next } => {
                middleware.process(ctx, request, *next).await
            }
            NextInner::Handler(handler) => handler(ctx, request).await,
        }
    }
}

/// A middleware built from a closure.
///
/// # Example
///
/// ```
/// use toolbox_middleware::{BoxFuture, FnMiddleware, MiddlewareContext, Next};
/// use toolbox_core::{Request, Response};
///
/// fn tag<'a>(
///     ctx: &'a mut MiddlewareContext,
///     request: Request,
///     next: Next<'a>,
/// ) -> BoxFuture<'a, Response> {
///     Box::pin(async move {
///         let mut response = next.run(ctx, request).await;
///         response
///             .headers_mut()
///             .insert("x-served-by", http::HeaderValue::from_static("toolbox"));
///         response
///     })
/// }
///
/// let middleware = FnMiddleware::new("tag", tag);
/// ```
pub struct FnMiddleware<F> {
    name: &'static str,
    func: F,
}

impl<F> FnMiddleware<F> {
    /// Creates a new closure-based middleware.
    pub const fn new(name: &'static str, func: F) -> Self {
        Self { name, func }
    }
}

impl<F> Middleware for FnMiddleware<F>
where
    F: for<'a> Fn(&'a mut MiddlewareContext, Request, Next<'a>) -> BoxFuture<'a, Response>
        + Send
        + Sync
        + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        (self.func)(ctx, request, next)
    }
}
