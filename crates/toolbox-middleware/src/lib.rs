//! # Toolbox Middleware
//!
//! Composable middleware chain for HTTP services.
//!
//! A [`Chain`] runs an ordered list of [`Middleware`] around a terminal
//! [`Handler`]. Layers run first-declared-first on the way in and in reverse
//! on the way out:
//!
//! ```text
//! Request → Recover → TraceId → Cors → Compression → Enrichers → Handler
//!                                                                  ↓
//! Response ← Recover ← TraceId ← Cors ← Compression ← Enrichers ←──┘
//! ```
//!
//! Requests matching the chain's [`ExclusionMatcher`] skip every layer.
//!
//! ## Stages
//!
//! | Stage | Middleware | Purpose |
//! |-------|------------|---------|
//! | `recover` | [`RecoverMiddleware`](stages::RecoverMiddleware) | Turn panics into a 500 envelope |
//! | `trace_id` | [`TraceIdMiddleware`](stages::TraceIdMiddleware) | Bind the trace id |
//! | `request_log` | [`RequestLogMiddleware`](stages::RequestLogMiddleware) | Log each completed request |
//! | `cors` | [`CorsMiddleware`](stages::CorsMiddleware) | CORS headers and preflight |
//! | `compression` | [`CompressionMiddleware`](stages::CompressionMiddleware) | Gzip response bodies |
//! | `user_info` | [`UserInfoMiddleware`](stages::UserInfoMiddleware) | Bind identity fields and roles |
//! | `roles` | [`RolesMiddleware`](stages::RolesMiddleware) | Bind roles only |
//! | `organization` | [`OrganizationMiddleware`](stages::OrganizationMiddleware) | Bind the organization id |
//! | `tenant` | [`TenantMiddleware`](stages::TenantMiddleware) | Bind tenant id and display name |
//!
//! ## Example
//!
//! ```
//! use toolbox_core::{body, Request, RequestContext, Response};
//! use toolbox_middleware::stages::{RecoverMiddleware, TraceIdMiddleware, UserInfoMiddleware};
//! use toolbox_middleware::{Chain, ExclusionSet};
//!
//! async fn profile(ctx: RequestContext, _request: Request) -> Response {
//!     http::Response::new(body::full(format!("{} ({})", ctx.name(), ctx.trace_id())))
//! }
//!
//! # tokio_test::block_on(async {
//! let chain = Chain::builder()
//!     .layer(RecoverMiddleware::new())
//!     .layer(TraceIdMiddleware::new())
//!     .layer(UserInfoMiddleware::new())
//!     .exclude(ExclusionSet::new().path("/healthz"))
//!     .build(profile);
//!
//! let request = http::Request::builder()
//!     .uri("/me")
//!     .header("X-Request-Id", "req-1")
//!     .header("X-Name", "Ada")
//!     .body(body::empty())
//!     .unwrap();
//!
//! let response = chain.handle(request).await;
//! let bytes = body::to_bytes(response.into_body()).await.unwrap();
//! assert_eq!(bytes, "Ada (req-1)");
//! # });
//! ```

#![doc(html_root_url = "https://docs.rs/toolbox-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod context;
pub mod exclusion;
pub mod middleware;
pub mod pipeline;
pub mod stages;

pub use context::MiddlewareContext;
pub use exclusion::{ExclusionMatcher, ExclusionSet};
pub use middleware::{BoxFuture, FnMiddleware, Middleware, Next};
pub use pipeline::{BoxedMiddleware, Chain, ChainBuilder, Handler};
