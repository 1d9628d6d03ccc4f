//! Organization id middleware.

use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::stages::bind_from_header;
use toolbox_core::{ContextKey, Request, Response};

/// Binds [`ContextKey::OrgId`] from `X-Org-Id`, defaulting to `no-x-org-id`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrganizationMiddleware;

impl OrganizationMiddleware {
    /// Creates the middleware.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Middleware for OrganizationMiddleware {
    fn name(&self) -> &'static str {
        "organization"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        bind_from_header(ctx, &request, ContextKey::OrgId);
        Box::pin(next.run(ctx, request))
    }
}
