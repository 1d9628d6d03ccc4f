//! Built-in middleware stages.
//!
//! ## Context enrichment
//!
//! - [`trace_id`] - Trace id from `X-Request-Id` / `X-Trace-Id` / `X-Correlation-Id`
//! - [`user`] - Identity fields and roles from the `X-Sub`, `X-Name`, ... headers
//! - [`organization`] - Organization id from `X-Org-Id`
//! - [`tenant`] - Tenant id and display name, optionally required
//!
//! ## Cross-cutting
//!
//! - [`recover`] - Panic boundary; belongs at the outermost position
//! - [`request_log`] - One structured log event per request
//! - [`compression`] - Gzip response bodies
//! - [`cors`] - CORS headers and preflight handling
//!
//! A typical order is recover, trace id, request log, CORS, compression,
//! then the enrichers the handlers depend on.

pub mod compression;
pub mod cors;
pub mod organization;
pub mod recover;
pub mod request_log;
pub mod tenant;
pub mod trace_id;
pub mod user;

pub use compression::{CompressionBuilder, CompressionConfig, CompressionMiddleware, GzipBody};
pub use cors::{AllowedOrigins, CorsBuilder, CorsConfig, CorsConfigError, CorsMiddleware};
pub use organization::OrganizationMiddleware;
pub use recover::RecoverMiddleware;
pub use request_log::RequestLogMiddleware;
pub use tenant::{TenantMiddleware, TenantPolicy};
pub use trace_id::TraceIdMiddleware;
pub use user::{RolesMiddleware, UserInfoMiddleware};

use crate::context::MiddlewareContext;
use toolbox_core::{ContextKey, Request};

/// Returns the first value of `name`, or `None` when absent or empty.
///
/// Values are decoded as UTF-8 so names like `Zoë` survive; bytes that are
/// not valid UTF-8 count as absent.
pub(crate) fn header_str<'r>(request: &'r Request, name: &str) -> Option<&'r str> {
    request
        .headers()
        .get(name)
        .and_then(|value| std::str::from_utf8(value.as_bytes()).ok())
        .filter(|value| !value.is_empty())
}

/// Binds `key` from its header, falling back to the key's default.
///
/// The roles default is the empty string, which binds an empty list.
pub(crate) fn bind_from_header(ctx: &mut MiddlewareContext, request: &Request, key: ContextKey) {
    let value = header_str(request, key.header()).unwrap_or(key.default_value());
    ctx.bind(key, value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;
    use toolbox_core::body;

    fn create_request(value: HeaderValue) -> Request {
        http::Request::builder()
            .uri("/")
            .header("X-Name", value)
            .body(body::empty())
            .unwrap()
    }

    #[test]
    fn test_header_str_decodes_utf8() {
        let value = HeaderValue::from_bytes("Zoë Müller".as_bytes()).unwrap();
        let request = create_request(value);
        assert_eq!(header_str(&request, "x-name"), Some("Zoë Müller"));
    }

    #[test]
    fn test_header_str_empty_and_invalid_are_absent() {
        let request = create_request(HeaderValue::from_static(""));
        assert_eq!(header_str(&request, "x-name"), None);

        let request = create_request(HeaderValue::from_bytes(&[0x5a, 0xff, 0x6f]).unwrap());
        assert_eq!(header_str(&request, "x-name"), None);

        assert_eq!(header_str(&request, "x-missing"), None);
    }
}
