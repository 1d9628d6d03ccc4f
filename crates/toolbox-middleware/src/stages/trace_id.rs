//! Trace id middleware.
//!
//! Binds [`ContextKey::TraceId`] from the first non-empty header among
//! `X-Request-Id`, `X-Trace-Id` and `X-Correlation-Id`. When none is sent the
//! key is bound to its `"unknown"` default, unless the stage was built with
//! [`TraceIdMiddleware::generate_missing`], in which case a fresh UUID v7 is
//! bound instead.
//!
//! UUID v7 is time-ordered, so generated ids sort by arrival.

use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::stages::header_str;
use http::HeaderValue;
use toolbox_core::{ContextKey, Request, Response};
use uuid::Uuid;

/// Headers consulted for an inbound trace id, in priority order.
pub const TRACE_ID_HEADERS: [&str; 3] = ["x-request-id", "x-trace-id", "x-correlation-id"];

/// Middleware that binds the request's trace id.
///
/// # Example
///
/// ```
/// use toolbox_middleware::stages::TraceIdMiddleware;
///
/// // Sentinel default when no header is present
/// let strict = TraceIdMiddleware::new();
///
/// // Generate a UUID v7 and echo it on the response
/// let edge = TraceIdMiddleware::new().generate_missing().echo_response_header();
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct TraceIdMiddleware {
    generate_missing: bool,
    echo_response_header: bool,
}

impl TraceIdMiddleware {
    /// Creates a trace id middleware that falls back to `"unknown"`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Generates a UUID v7 when the request carries no trace id.
    #[must_use]
    pub fn generate_missing(mut self) -> Self {
        self.generate_missing = true;
        self
    }

    /// Sets `X-Request-Id` on the response to the bound trace id.
    #[must_use]
    pub fn echo_response_header(mut self) -> Self {
        self.echo_response_header = true;
        self
    }

    fn extract(&self, request: &Request) -> Option<String> {
        TRACE_ID_HEADERS
            .iter()
            .find_map(|name| header_str(request, name))
            .map(String::from)
            .or_else(|| self.generate_missing.then(|| Uuid::now_v7().to_string()))
    }
}

impl Middleware for TraceIdMiddleware {
    fn name(&self) -> &'static str {
        "trace_id"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let trace_id = self
                .extract(&request)
                .unwrap_or_else(|| ContextKey::TraceId.default_value().to_owned());
            ctx.bind(ContextKey::TraceId, trace_id);

            let mut response = next.run(ctx, request).await;

            if self.echo_response_header {
                if let Ok(value) = HeaderValue::from_str(ctx.trace_id()) {
                    response.headers_mut().insert(TRACE_ID_HEADERS[0], value);
                }
            }

            response
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use toolbox_core::{body, RequestContext};

    fn create_test_request() -> Request {
        http::Request::builder()
            .uri("/test")
            .body(body::empty())
            .unwrap()
    }

    fn create_request_with(header: &str, value: &str) -> Request {
        http::Request::builder()
            .uri("/test")
            .header(header, value)
            .body(body::empty())
            .unwrap()
    }

    fn create_handler() -> Next<'static> {
        Next::handler(|ctx, _req| {
            let trace_id = ctx.trace_id().to_owned();
            Box::pin(async move {
                http::Response::builder()
                    .status(StatusCode::OK)
                    .body(body::full(trace_id))
                    .unwrap()
            })
        })
    }

    async fn run(middleware: TraceIdMiddleware, request: Request) -> (RequestContext, Response) {
        let mut ctx = MiddlewareContext::new();
        let response = middleware.process(&mut ctx, request, create_handler()).await;
        (ctx.snapshot(), response)
    }

    #[tokio::test]
    async fn test_missing_header_binds_default() {
        let (ctx, response) = run(TraceIdMiddleware::new(), create_test_request()).await;

        assert_eq!(ctx.trace_id(), "unknown");
        assert!(ctx.is_bound(ContextKey::TraceId));
        assert!(response.headers().get("x-request-id").is_none());
    }

    #[tokio::test]
    async fn test_header_priority() {
        let request = http::Request::builder()
            .uri("/test")
            .header("X-Trace-Id", "from-trace")
            .header("X-Request-Id", "from-request")
            .body(body::empty())
            .unwrap();

        let (ctx, _) = run(TraceIdMiddleware::new(), request).await;
        assert_eq!(ctx.trace_id(), "from-request");
    }

    #[tokio::test]
    async fn test_fallback_headers() {
        let (ctx, _) = run(
            TraceIdMiddleware::new(),
            create_request_with("X-Trace-Id", "t-1"),
        )
        .await;
        assert_eq!(ctx.trace_id(), "t-1");

        let (ctx, _) = run(
            TraceIdMiddleware::new(),
            create_request_with("X-Correlation-Id", "c-1"),
        )
        .await;
        assert_eq!(ctx.trace_id(), "c-1");
    }

    #[tokio::test]
    async fn test_empty_header_is_absent() {
        let request = http::Request::builder()
            .uri("/test")
            .header("X-Request-Id", "")
            .header("X-Trace-Id", "t-2")
            .body(body::empty())
            .unwrap();

        let (ctx, _) = run(TraceIdMiddleware::new(), request).await;
        assert_eq!(ctx.trace_id(), "t-2");
    }

    #[tokio::test]
    async fn test_generate_missing_uses_uuid_v7() {
        let middleware = TraceIdMiddleware::new().generate_missing();
        let (ctx, _) = run(middleware, create_test_request()).await;

        let uuid = Uuid::parse_str(ctx.trace_id()).unwrap();
        assert_eq!(uuid.get_version_num(), 7);
    }

    #[tokio::test]
    async fn test_echo_response_header() {
        let middleware = TraceIdMiddleware::new().echo_response_header();
        let (_, response) = run(middleware, create_request_with("X-Request-Id", "abc")).await;

        assert_eq!(response.headers()["x-request-id"], "abc");
        let bytes = body::to_bytes(response.into_body()).await.unwrap();
        assert_eq!(bytes, "abc");
    }
}
