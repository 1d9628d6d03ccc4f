//! User identity middleware.
//!
//! An upstream identity proxy forwards the authenticated user's claims as
//! plain headers. [`UserInfoMiddleware`] binds all of them; [`RolesMiddleware`]
//! binds only the roles list for services that need nothing else.
//!
//! | Header | Key | Default |
//! |--------|-----|---------|
//! | `X-Sub` | [`ContextKey::Sub`] | `no-x-sub-provided` |
//! | `X-Name` | [`ContextKey::Name`] | `no-x-name-provided` |
//! | `X-Nickname` | [`ContextKey::Nickname`] | `no-x-nickname-provided` |
//! | `X-Email` | [`ContextKey::Email`] | `no-x-email-provided` |
//! | `X-Email-Verified` | [`ContextKey::EmailVerified`] | `no-x-email-verified-provided` |
//! | `X-Picture` | [`ContextKey::Picture`] | `no-x-picture-provided` |
//! | `X-Roles` | [`ContextKey::Roles`] | empty list |

use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::stages::bind_from_header;
use toolbox_core::{ContextKey, Request, Response};

/// Keys bound by [`UserInfoMiddleware`].
const USER_KEYS: [ContextKey; 7] = [
    ContextKey::Sub,
    ContextKey::Name,
    ContextKey::Nickname,
    ContextKey::Email,
    ContextKey::EmailVerified,
    ContextKey::Picture,
    ContextKey::Roles,
];

/// Binds every user identity field and the roles list.
#[derive(Debug, Clone, Copy, Default)]
pub struct UserInfoMiddleware;

impl UserInfoMiddleware {
    /// Creates the middleware.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Middleware for UserInfoMiddleware {
    fn name(&self) -> &'static str {
        "user_info"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        for key in USER_KEYS {
            bind_from_header(ctx, &request, key);
        }
        Box::pin(next.run(ctx, request))
    }
}

/// Binds only the roles list from `X-Roles`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RolesMiddleware;

impl RolesMiddleware {
    /// Creates the middleware.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Middleware for RolesMiddleware {
    fn name(&self) -> &'static str {
        "roles"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        bind_from_header(ctx, &request, ContextKey::Roles);
        Box::pin(next.run(ctx, request))
    }
}
