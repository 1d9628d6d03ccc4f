//! Tenant middleware.
//!
//! Binds [`ContextKey::TenantId`] from `X-Tenant-Id` and
//! [`ContextKey::TenantDisplayName`] from `X-Tenant-Display-Name`. Each field
//! has its own [`TenantPolicy`]: a required field that is missing ends the
//! request with `400 {"error": "Tenant ID is required"}` (or the display name
//! equivalent), an optional one falls back to its sentinel default.

use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::stages::header_str;
use std::fmt;
use toolbox_core::{ContextKey, Request, Response};
use toolbox_responder::JsonResponder;

/// Message sent when a required tenant id is missing.
pub const TENANT_ID_REQUIRED: &str = "Tenant ID is required";

/// Message sent when a required tenant display name is missing.
pub const TENANT_DISPLAY_NAME_REQUIRED: &str = "Tenant display name is required";

/// Whether a tenant header must be present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TenantPolicy {
    /// Missing header ends the request with 400.
    Required,
    /// Missing header binds the sentinel default.
    #[default]
    Optional,
}

/// Middleware that binds the tenant id and display name.
///
/// # Example
///
/// ```
/// use toolbox_middleware::stages::{TenantMiddleware, TenantPolicy};
///
/// // Multi-tenant deployment: the id is mandatory, the display name is not
/// let tenant = TenantMiddleware::required().display_name(TenantPolicy::Optional);
/// ```
#[derive(Debug, Clone, Default)]
pub struct TenantMiddleware {
    id: TenantPolicy,
    display_name: TenantPolicy,
    responder: JsonResponder,
}

#[derive(Debug)]
struct MissingTenantField(&'static str);

impl fmt::Display for MissingTenantField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl TenantMiddleware {
    /// Requires both the tenant id and the display name.
    #[must_use]
    pub fn required() -> Self {
        Self {
            id: TenantPolicy::Required,
            display_name: TenantPolicy::Required,
            responder: JsonResponder::new(),
        }
    }

    /// Binds sentinel defaults for missing fields.
    #[must_use]
    pub fn optional() -> Self {
        Self::default()
    }

    /// Sets the policy for the tenant id.
    #[must_use]
    pub fn id(mut self, policy: TenantPolicy) -> Self {
        self.id = policy;
        self
    }

    /// Sets the policy for the tenant display name.
    #[must_use]
    pub fn display_name(mut self, policy: TenantPolicy) -> Self {
        self.display_name = policy;
        self
    }

    /// Uses `responder` to write the 400 envelope.
    #[must_use]
    pub fn with_responder(mut self, responder: JsonResponder) -> Self {
        self.responder = responder;
        self
    }

    /// Resolves one field, or returns the rejection message.
    fn resolve<'r>(
        request: &'r Request,
        key: ContextKey,
        policy: TenantPolicy,
        message: &'static str,
    ) -> Result<&'r str, MissingTenantField> {
        match (header_str(request, key.header()), policy) {
            (Some(value), _) => Ok(value),
            (None, TenantPolicy::Optional) => Ok(key.default_value()),
            (None, TenantPolicy::Required) => Err(MissingTenantField(message)),
        }
    }
}

impl Middleware for TenantMiddleware {
    fn name(&self) -> &'static str {
        "tenant"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        let resolved = Self::resolve(&request, ContextKey::TenantId, self.id, TENANT_ID_REQUIRED)
            .and_then(|id| {
                let display_name = Self::resolve(
                    &request,
                    ContextKey::TenantDisplayName,
                    self.display_name,
                    TENANT_DISPLAY_NAME_REQUIRED,
                )?;
                Ok((id.to_owned(), display_name.to_owned()))
            });

        match resolved {
            Ok((id, display_name)) => {
                ctx.bind(ContextKey::TenantId, id);
                ctx.bind(ContextKey::TenantDisplayName, display_name);
                Box::pin(next.run(ctx, request))
            }
            Err(missing) => {
                let response = self.responder.bad_request_response(&request, &missing);
                Box::pin(async move { response })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use serde_json::{json, Value};
    use toolbox_core::body;

    fn create_request(id: Option<&str>, display_name: Option<&str>) -> Request {
        let mut builder = http::Request::builder().uri("/v1/projects");
        if let Some(id) = id {
            builder = builder.header("X-Tenant-Id", id);
        }
        if let Some(display_name) = display_name {
            builder = builder.header("X-Tenant-Display-Name", display_name);
        }
        builder.body(body::empty()).unwrap()
    }

    fn create_handler() -> Next<'static> {
        Next::handler(|_ctx, _req| Box::pin(async { http::Response::new(body::full("OK")) }))
    }

    async fn body_json(response: Response) -> Value {
        let bytes = body::to_bytes(response.into_body()).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_required_binds_both() {
        let mut ctx = MiddlewareContext::new();
        let response = TenantMiddleware::required()
            .process(&mut ctx, create_request(Some("t-1"), Some("Acme")), create_handler())
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(ctx.request_context().tenant_id(), "t-1");
        assert_eq!(ctx.request_context().tenant_display_name(), "Acme");
    }

    #[tokio::test]
    async fn test_required_id_missing() {
        let mut ctx = MiddlewareContext::new();
        let response = TenantMiddleware::required()
            .process(&mut ctx, create_request(None, Some("Acme")), create_handler())
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await, json!({"error": "Tenant ID is required"}));
        assert!(!ctx.request_context().is_bound(ContextKey::TenantId));
    }

    #[tokio::test]
    async fn test_required_display_name_missing() {
        let mut ctx = MiddlewareContext::new();
        let response = TenantMiddleware::required()
            .process(&mut ctx, create_request(Some("t-1"), Some("")), create_handler())
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({"error": "Tenant display name is required"})
        );
    }

    #[tokio::test]
    async fn test_optional_defaults() {
        let mut ctx = MiddlewareContext::new();
        let response = TenantMiddleware::optional()
            .process(&mut ctx, create_request(None, None), create_handler())
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(ctx.request_context().tenant_id(), "no-x-tenant-id");
        assert_eq!(
            ctx.request_context().tenant_display_name(),
            "no-x-tenant-display-name"
        );
    }

    #[tokio::test]
    async fn test_mixed_policy() {
        let mut ctx = MiddlewareContext::new();
        let response = TenantMiddleware::required()
            .display_name(TenantPolicy::Optional)
            .process(&mut ctx, create_request(Some("t-9"), None), create_handler())
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(ctx.request_context().tenant_id(), "t-9");
        assert_eq!(
            ctx.request_context().tenant_display_name(),
            "no-x-tenant-display-name"
        );
    }

    #[tokio::test]
    async fn test_required_accepts_utf8_display_name() {
        let request = http::Request::builder()
            .uri("/v1/projects")
            .header("X-Tenant-Id", "t1")
            .header(
                "X-Tenant-Display-Name",
                http::HeaderValue::from_bytes("Bäckerei GmbH".as_bytes()).unwrap(),
            )
            .body(body::empty())
            .unwrap();

        let mut ctx = MiddlewareContext::new();
        let response = TenantMiddleware::required()
            .process(&mut ctx, request, create_handler())
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(ctx.request_context().tenant_id(), "t1");
        assert_eq!(ctx.request_context().tenant_display_name(), "Bäckerei GmbH");
    }
}
