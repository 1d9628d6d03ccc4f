//! # Toolbox
//!
//! **HTTP middleware toolkit for JSON services**
//!
//! - **Chain builder** – ordered middleware around a terminal handler, with
//!   an exclusion fast path for health and static routes
//! - **Context enrichers** – trace id, identity, roles, organization and
//!   tenant bound from trusted gateway headers
//! - **Panic boundary** – a failing handler becomes a 500 JSON envelope
//! - **Response decorators** – gzip compression and CORS
//! - **Strict JSON** – size-capped decoding that rejects unknown keys and
//!   trailing values, plus envelope responses and field validation
//!
//! ## Quick Start
//!
//! ```rust
//! use toolbox::prelude::*;
//!
//! async fn whoami(ctx: RequestContext, _request: Request) -> Response {
//!     JsonResponder::new()
//!         .write_json(StatusCode::OK, &Envelope::new().with("sub", ctx.sub()), None)
//!         .unwrap()
//! }
//!
//! # tokio_test::block_on(async {
//! let config = ToolboxConfig::default();
//! let chain = config
//!     .chain_builder()
//!     .unwrap()
//!     .layer(UserInfoMiddleware::new())
//!     .build(whoami);
//!
//! let request = http::Request::builder()
//!     .uri("/whoami")
//!     .header("X-Sub", "user-1")
//!     .body(body::empty())
//!     .unwrap();
//!
//! let response = chain.handle(request).await;
//! assert_eq!(response.status(), StatusCode::OK);
//! # });
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Request → Recover → TraceId → RequestLog → Cors → Compression → Enrichers → Handler
//!                                                                                ↓
//! Response ← Recover ← TraceId ← RequestLog ← Cors ← Compression ←──────────────┘
//! ```

#![doc(html_root_url = "https://docs.rs/toolbox/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Request context, envelope and body types
pub use toolbox_core as core;

// Chain, exclusion and built-in stages
pub use toolbox_middleware as middleware;

// JSON decoding and responses
pub use toolbox_responder as responder;

// Logging setup
pub use toolbox_telemetry as telemetry;

// Layered configuration
pub use toolbox_config as config;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use toolbox::prelude::*;
///
/// let chain = Chain::builder()
///     .layer(RecoverMiddleware::new())
///     .layer(TraceIdMiddleware::new())
///     .build(|ctx: RequestContext, _request: Request| async move {
///         http::Response::new(body::full(ctx.trace_id().to_owned()))
///     });
/// assert_eq!(chain.stage_names(), vec!["recover", "trace_id"]);
/// ```
pub mod prelude {
    pub use http::StatusCode;

    pub use toolbox_core::{body, ContextKey, Envelope, Request, RequestContext, Response};

    pub use toolbox_middleware::stages::{
        CompressionMiddleware, CorsMiddleware, OrganizationMiddleware, RecoverMiddleware,
        RequestLogMiddleware, RolesMiddleware, TenantMiddleware, TenantPolicy, TraceIdMiddleware,
        UserInfoMiddleware,
    };
    pub use toolbox_middleware::{
        BoxFuture, Chain, ChainBuilder, ExclusionSet, Middleware, MiddlewareContext, Next,
    };

    pub use toolbox_responder::{DecodeError, JsonResponder, Validator};

    pub use toolbox_telemetry::{init_logging, LogConfig};

    pub use toolbox_config::{ConfigLoader, ToolboxConfig};
}
