//! Middleware context types.
//!
//! The [`MiddlewareContext`] carries per-request state through the chain.
//! It owns the current [`RequestContext`] overlay: each enrichment stage
//! binds a key, which replaces the overlay with a new one, and the terminal
//! handler receives an owned snapshot of the final overlay.
//!
//! A context is created by the chain for one request and dropped when the
//! response is produced; it is never shared between requests.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use toolbox_core::{ContextKey, RequestContext};

/// Context that flows through the middleware chain.
///
/// # Example
///
/// ```
/// use toolbox_middleware::MiddlewareContext;
/// use toolbox_core::ContextKey;
///
/// let mut ctx = MiddlewareContext::new();
/// assert_eq!(ctx.trace_id(), "unknown");
///
/// ctx.bind(ContextKey::TraceId, "abc-123");
/// assert_eq!(ctx.trace_id(), "abc-123");
/// assert_eq!(ctx.snapshot().trace_id(), "abc-123");
/// ```
#[derive(Debug)]
pub struct MiddlewareContext {
    /// The current metadata overlay.
    request: RequestContext,

    /// When the request entered the chain.
    started_at: Instant,

    /// Type-erased extension data for middleware-to-middleware hand-off.
    extensions: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl MiddlewareContext {
    /// Creates a context with an empty overlay.
    #[must_use]
    pub fn new() -> Self {
        Self::with_request_context(RequestContext::new())
    }

    /// Creates a context seeded with an existing overlay.
    #[must_use]
    pub fn with_request_context(request: RequestContext) -> Self {
        Self {
            request,
            started_at: Instant::now(),
            extensions: HashMap::new(),
        }
    }

    /// Returns the current overlay.
    #[must_use]
    pub fn request_context(&self) -> &RequestContext {
        &self.request
    }

    /// Returns an owned copy of the current overlay.
    #[must_use]
    pub fn snapshot(&self) -> RequestContext {
        self.request.clone()
    }

    /// Binds `key` to `value`, replacing the overlay with a new one.
    pub fn bind(&mut self, key: ContextKey, value: impl Into<String>) {
        self.request = std::mem::take(&mut self.request).with(key, value);
    }

    /// Binds the roles list, replacing the overlay with a new one.
    pub fn bind_roles<I, S>(&mut self, roles: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.request = std::mem::take(&mut self.request).with_roles(roles);
    }

    /// Returns the bound trace id, or `"unknown"`.
    #[must_use]
    pub fn trace_id(&self) -> &str {
        self.request.trace_id()
    }

    /// Returns when the request entered the chain.
    #[must_use]
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Returns the time elapsed since the request entered the chain.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Stores a typed extension value.
    pub fn set_extension<T: Send + Sync + 'static>(&mut self, value: T) {
        self.extensions.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Retrieves a typed extension value.
    #[must_use]
    pub fn get_extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref())
    }

    /// Removes and returns a typed extension value.
    pub fn remove_extension<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.extensions
            .remove(&TypeId::of::<T>())
            .and_then(|v| v.downcast().ok())
            .map(|b| *b)
    }

    /// Checks if an extension of the given type exists.
    #[must_use]
    pub fn has_extension<T: Send + Sync + 'static>(&self) -> bool {
        self.extensions.contains_key(&TypeId::of::<T>())
    }
}

impl Default for MiddlewareContext {
    fn default() -> Self {
        Self::new()
    }
}
