//! HTTP request and response types used throughout the toolbox.
//!
//! Bodies are boxed so that decorators (such as gzip compression) can wrap
//! the outgoing stream without changing the response type.

use bytes::Bytes;
use http_body_util::{BodyExt, Empty, Full};

/// Error type carried by boxed bodies.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A boxed, streaming HTTP body.
pub type BoxBody = http_body_util::combinators::BoxBody<Bytes, BoxError>;

/// The HTTP request type used in the middleware chain.
pub type Request = http::Request<BoxBody>;

/// The HTTP response type used in the middleware chain.
pub type Response = http::Response<BoxBody>;

/// Creates a body holding the given bytes in a single frame.
pub fn full(data: impl Into<Bytes>) -> BoxBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed()
}

/// Creates an empty body.
pub fn empty() -> BoxBody {
    Empty::<Bytes>::new()
        .map_err(|never| match never {})
        .boxed()
}

/// Collects a body into a single buffer.
///
/// Intended for tests and small payloads; request bodies that must respect a
/// size ceiling should go through the JSON responder instead.
pub async fn to_bytes(body: BoxBody) -> Result<Bytes, BoxError> {
    Ok(body.collect().await?.to_bytes())
}
