//! End-to-end chain integration tests.
//!
//! These tests run full chains with the built-in stages in the recommended
//! order:
//!
//! 1. Recover - Panic boundary
//! 2. Trace id - Bind the trace id
//! 3. Request log - Log completed requests
//! 4. CORS - Origin headers and preflight
//! 5. Compression - Gzip response bodies
//! 6. Enrichers - User info, organization, tenant

use flate2::read::GzDecoder;
use http::{header, Method, StatusCode};
use serde_json::{json, Value};
use std::io::Read;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use toolbox_core::{body, ContextKey, Request, RequestContext, Response};
use toolbox_middleware::stages::{
    CompressionMiddleware, CorsMiddleware, OrganizationMiddleware, RecoverMiddleware,
    RequestLogMiddleware, TenantMiddleware, TraceIdMiddleware, UserInfoMiddleware,
};
use toolbox_middleware::{BoxFuture, Chain, ExclusionSet, Middleware, MiddlewareContext, Next};

/// Creates a test request with the given headers.
fn make_request(method: Method, path: &str, headers: &[(&str, &str)]) -> Request {
    let mut builder = http::Request::builder().method(method).uri(path);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(body::empty()).unwrap()
}

/// Creates a JSON handler response.
fn json_response(payload: Vec<u8>) -> Response {
    http::Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body::full(payload))
        .unwrap()
}

/// A handler that echoes the enriched context as JSON.
async fn echo_context(ctx: RequestContext, request: Request) -> Response {
    if request.uri().path() == "/panic" {
        panic!("handler failure");
    }
    let payload = json!({
        "trace_id": ctx.trace_id(),
        "sub": ctx.sub(),
        "roles": ctx.roles(),
        "org_id": ctx.org_id(),
        "tenant_id": ctx.tenant_id(),
    });
    json_response(serde_json::to_vec(&payload).unwrap())
}

async fn body_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body()).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn full_chain() -> Chain {
    Chain::builder()
        .layer(RecoverMiddleware::new())
        .layer(TraceIdMiddleware::new())
        .layer(RequestLogMiddleware::new())
        .layer(
            CorsMiddleware::builder()
                .allow_origin("https://example.com")
                .build()
                .unwrap(),
        )
        .layer(CompressionMiddleware::builder().min_size(0).build())
        .layer(UserInfoMiddleware::new())
        .layer(OrganizationMiddleware::new())
        .layer(TenantMiddleware::optional())
        .exclude(ExclusionSet::new().path("/healthz").prefix("/static/"))
        .build(echo_context)
}

// =============================================================================
// Ordering
// =============================================================================

struct Recorder {
    name: &'static str,
    log: Arc<Mutex<Vec<String>>>,
}

impl Middleware for Recorder {
    fn name(&self) -> &'static str {
        self.name
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            self.log.lock().unwrap().push(format!("{}:pre", self.name));
            let response = next.run(ctx, request).await;
            self.log.lock().unwrap().push(format!("{}:post", self.name));
            response
        })
    }
}

fn recorder(name: &'static str, log: Arc<Mutex<Vec<String>>>) -> Recorder {
    Recorder { name, log }
}

#[tokio::test]
async fn test_onion_ordering() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let handler_log = Arc::clone(&log);

    let chain = Chain::builder()
        .layer(recorder("A", Arc::clone(&log)))
        .layer(recorder("B", Arc::clone(&log)))
        .layer(recorder("C", Arc::clone(&log)))
        .build(move |_ctx: RequestContext, _request: Request| {
            let log = Arc::clone(&handler_log);
            async move {
                log.lock().unwrap().push("H".to_string());
                http::Response::new(body::empty())
            }
        });

    chain.handle(make_request(Method::GET, "/", &[])).await;

    assert_eq!(
        *log.lock().unwrap(),
        vec!["A:pre", "B:pre", "C:pre", "H", "C:post", "B:post", "A:post"]
    );
}

// =============================================================================
// Enrichment
// =============================================================================

#[tokio::test]
async fn test_enrichers_reach_handler() {
    let chain = full_chain();
    let request = make_request(
        Method::GET,
        "/v1/me",
        &[
            ("X-Request-Id", "req-123"),
            ("X-Sub", "user-1"),
            ("X-Roles", "admin,viewer"),
            ("X-Org-Id", "org-9"),
        ],
    );

    let response = chain.handle(request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({
            "trace_id": "req-123",
            "sub": "user-1",
            "roles": ["admin", "viewer"],
            "org_id": "org-9",
            "tenant_id": "no-x-tenant-id",
        })
    );
}

// =============================================================================
// Exclusion
// =============================================================================

struct Counter(Arc<AtomicUsize>);

impl Middleware for Counter {
    fn name(&self) -> &'static str {
        "counter"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Box::pin(next.run(ctx, request))
    }
}

#[tokio::test]
async fn test_excluded_path_bypasses_every_layer() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Counter(Arc::clone(&calls));

    let chain = Chain::builder()
        .layer(counter)
        .layer(TraceIdMiddleware::new())
        .layer(UserInfoMiddleware::new())
        .exclude(ExclusionSet::new().path("/healthz"))
        .build(|ctx: RequestContext, _request: Request| async move {
            let bound = ContextKey::all().iter().any(|key| ctx.is_bound(*key));
            http::Response::new(body::full(if bound { "enriched" } else { "bare" }))
        });

    let response = chain
        .handle(make_request(Method::GET, "/healthz", &[("X-Request-Id", "r-1")]))
        .await;
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(body::to_bytes(response.into_body()).await.unwrap(), "bare");

    let response = chain.handle(make_request(Method::GET, "/v1/items", &[])).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(body::to_bytes(response.into_body()).await.unwrap(), "enriched");
}

#[tokio::test]
async fn test_excluded_prefix_skips_cors_and_gzip() {
    let chain = full_chain();
    let response = chain
        .handle(make_request(
            Method::GET,
            "/static/app.js",
            &[("Origin", "https://example.com"), ("Accept-Encoding", "gzip")],
        ))
        .await;

    assert!(response.headers().get("access-control-allow-origin").is_none());
    assert!(response.headers().get(header::CONTENT_ENCODING).is_none());
}

// =============================================================================
// Panic recovery
// =============================================================================

#[tokio::test]
async fn test_panic_yields_500_and_serving_continues() {
    let chain = full_chain();

    let response = chain
        .handle(make_request(Method::GET, "/panic", &[("X-Request-Id", "boom-1")]))
        .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.headers()[header::CONNECTION], "close");
    assert_eq!(
        body_json(response).await,
        json!({"error": "internal server error", "trace_id": "boom-1"})
    );

    let response = chain.handle(make_request(Method::GET, "/v1/me", &[])).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_concurrent_requests_keep_their_own_context() {
    let chain = full_chain();
    let mut tasks = Vec::new();

    for i in 0..16 {
        let chain = chain.clone();
        tasks.push(tokio::spawn(async move {
            let trace_id = format!("req-{i}");
            let path = if i % 4 == 0 { "/panic" } else { "/v1/me" };
            let response = chain
                .handle(make_request(Method::GET, path, &[("X-Request-Id", trace_id.as_str())]))
                .await;
            (trace_id, body_json(response).await)
        }));
    }

    for task in tasks {
        let (trace_id, body) = task.await.unwrap();
        assert_eq!(body["trace_id"], trace_id.as_str());
    }
}

// =============================================================================
// Compression
// =============================================================================

#[tokio::test]
async fn test_gzip_allow_list() {
    let payload: Vec<u8> = br#"{"message":"hello"}"#.repeat(100);
    let json_payload = payload.clone();
    let png_payload = payload.clone();

    let json_chain = Chain::builder()
        .layer(CompressionMiddleware::new())
        .build(move |_ctx: RequestContext, _request: Request| {
            let payload = json_payload.clone();
            async move { json_response(payload) }
        });
    let png_chain = Chain::builder()
        .layer(CompressionMiddleware::new())
        .build(move |_ctx: RequestContext, _request: Request| {
            let payload = png_payload.clone();
            async move {
                http::Response::builder()
                    .header(header::CONTENT_TYPE, "image/png")
                    .body(body::full(payload))
                    .unwrap()
            }
        });

    let accept = [("Accept-Encoding", "gzip")];

    let response = json_chain.handle(make_request(Method::GET, "/data", &accept)).await;
    assert_eq!(response.headers()[header::CONTENT_ENCODING], "gzip");
    let compressed = body::to_bytes(response.into_body()).await.unwrap();
    let mut decoded = Vec::new();
    GzDecoder::new(&compressed[..]).read_to_end(&mut decoded).unwrap();
    assert_eq!(decoded, payload);

    let response = png_chain.handle(make_request(Method::GET, "/logo.png", &accept)).await;
    assert!(response.headers().get(header::CONTENT_ENCODING).is_none());
    assert_eq!(body::to_bytes(response.into_body()).await.unwrap(), payload);
}

#[tokio::test]
async fn test_default_gzip_compresses_small_json() {
    let chain = Chain::builder()
        .layer(CompressionMiddleware::new())
        .build(|_ctx: RequestContext, _request: Request| async {
            json_response(br#"{"status":"available"}"#.to_vec())
        });

    let response = chain
        .handle(make_request(Method::GET, "/v1/healthcheck", &[("Accept-Encoding", "gzip")]))
        .await;

    assert_eq!(response.headers()[header::CONTENT_ENCODING], "gzip");
    let compressed = body::to_bytes(response.into_body()).await.unwrap();
    let mut decoded = Vec::new();
    GzDecoder::new(&compressed[..]).read_to_end(&mut decoded).unwrap();
    assert_eq!(decoded, br#"{"status":"available"}"#);
}

// =============================================================================
// CORS
// =============================================================================

fn cors_chain(allowed: &str) -> Chain {
    Chain::builder()
        .layer(CorsMiddleware::builder().allow_origin(allowed).build().unwrap())
        .build(|_ctx: RequestContext, _request: Request| async {
            http::Response::new(body::full("OK"))
        })
}

#[tokio::test]
async fn test_cors_origin_match() {
    let origin = [("Origin", "https://example.com")];

    let response = cors_chain("https://example.com")
        .handle(make_request(Method::GET, "/api", &origin))
        .await;
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "https://example.com"
    );

    let response = cors_chain("https://other.com")
        .handle(make_request(Method::GET, "/api", &origin))
        .await;
    assert!(response.headers().get("access-control-allow-origin").is_none());
}

#[tokio::test]
async fn test_cors_preflight_never_reaches_handler() {
    let chain = full_chain();
    let response = chain
        .handle(make_request(
            Method::OPTIONS,
            "/panic",
            &[("Origin", "https://example.com")],
        ))
        .await;

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "https://example.com"
    );
}

// =============================================================================
// Tenant policy
// =============================================================================

#[tokio::test]
async fn test_required_tenant_short_circuits() {
    let chain = Chain::builder()
        .layer(RecoverMiddleware::new())
        .layer(TenantMiddleware::required())
        .build(echo_context);

    let response = chain.handle(make_request(Method::GET, "/panic", &[])).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await, json!({"error": "Tenant ID is required"}));
}
