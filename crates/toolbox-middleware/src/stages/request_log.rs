//! Request logging middleware.
//!
//! Emits one `info` event per request once the response is known:
//!
//! ```text
//! INFO request completed trace_id=... method=GET path=/v1/items status=200 size=512 duration_ms=1.2
//! ```
//!
//! The trace id is read after the rest of the chain has run, so placing
//! this stage after the trace id enricher is enough for it to be logged.
//! `size` is the exact body length when the response declares one.

use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use http::{Method, StatusCode};
use http_body::Body as _;
use toolbox_core::{Request, Response};

/// What was logged for a request.
///
/// Also stored as a context extension so outer layers can reuse it.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestLogEntry {
    /// Trace id bound when the response came back.
    pub trace_id: String,
    /// HTTP method.
    pub method: Method,
    /// Request path.
    pub path: String,
    /// Response status.
    pub status: StatusCode,
    /// Exact response body size, when known.
    pub size: Option<u64>,
    /// Time spent in the rest of the chain, in milliseconds.
    pub duration_ms: f64,
}

/// Middleware that logs every completed request.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestLogMiddleware;

impl RequestLogMiddleware {
    /// Creates the middleware.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Middleware for RequestLogMiddleware {
    fn name(&self) -> &'static str {
        "request_log"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let started = std::time::Instant::now();
            let method = request.method().clone();
            let path = request.uri().path().to_owned();

            let response = next.run(ctx, request).await;

            let entry = RequestLogEntry {
                trace_id: ctx.trace_id().to_owned(),
                method,
                path,
                status: response.status(),
                size: response.body().size_hint().exact(),
                duration_ms: started.elapsed().as_secs_f64() * 1000.0,
            };

            tracing::info!(
                trace_id = %entry.trace_id,
                http.method = %entry.method,
                http.path = %entry.path,
                http.status_code = entry.status.as_u16(),
                http.response_size = ?entry.size,
                duration_ms = entry.duration_ms,
                "request completed"
            );

            ctx.set_extension(entry);
            response
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolbox_core::{body, ContextKey};

    fn create_test_request() -> Request {
        http::Request::builder()
            .method(Method::POST)
            .uri("/v1/items?draft=true")
            .body(body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_entry_recorded() {
        let mut ctx = MiddlewareContext::new();
        ctx.bind(ContextKey::TraceId, "trace-1");
        let next = Next::handler(|_ctx, _req| {
            Box::pin(async {
                http::Response::builder()
                    .status(StatusCode::CREATED)
                    .body(body::full("created"))
                    .unwrap()
            })
        });

        let response = RequestLogMiddleware::new()
            .process(&mut ctx, create_test_request(), next)
            .await;

        assert_eq!(response.status(), StatusCode::CREATED);
        let entry = ctx.get_extension::<RequestLogEntry>().unwrap();
        assert_eq!(entry.trace_id, "trace-1");
        assert_eq!(entry.method, Method::POST);
        assert_eq!(entry.path, "/v1/items");
        assert_eq!(entry.status, StatusCode::CREATED);
        assert_eq!(entry.size, Some(7));
        assert!(entry.duration_ms >= 0.0);
    }

    #[tokio::test]
    async fn test_trace_id_bound_downstream_is_logged() {
        let mut ctx = MiddlewareContext::new();
        let next = Next::handler(|ctx, _req| {
            ctx.bind(ContextKey::TraceId, "late");
            Box::pin(async { http::Response::new(body::empty()) })
        });

        RequestLogMiddleware::new()
            .process(&mut ctx, create_test_request(), next)
            .await;

        assert_eq!(ctx.get_extension::<RequestLogEntry>().unwrap().trace_id, "late");
    }
}
