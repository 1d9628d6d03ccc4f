//! Gzip compression middleware.
//!
//! Compresses response bodies when the client advertises gzip in
//! `Accept-Encoding`. Whether a response is compressed is decided once,
//! when the handler's response head passes back through this stage, because
//! only then is the handler's `Content-Type` known:
//!
//! 1. `HEAD` requests and responses that already carry `Content-Encoding`
//!    are left alone
//! 2. The media type must start with one of the configured content types
//!    (an empty list accepts every type); otherwise the response is sent
//!    unchanged
//! 3. Compressible responses get `Vary: Accept-Encoding`
//! 4. Empty bodies, and bodies whose declared `Content-Length` is below the
//!    minimum, are sent uncompressed
//! 5. Everything else gets `Content-Encoding: gzip`, loses its
//!    `Content-Length`, and has its body wrapped in a [`GzipBody`]
//!
//! The body is compressed frame by frame as it streams; the gzip trailer is
//! written exactly once, after the inner body ends. Dropping the body early
//! releases the encoder without writing anything further.
//!
//! ## Example
//!
//! ```
//! use toolbox_middleware::stages::CompressionMiddleware;
//!
//! let compression = CompressionMiddleware::builder()
//!     .level(6)
//!     .min_size(512)
//!     .content_types(["application/json", "text/"])
//!     .build();
//! ```

use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use bytes::Bytes;
use flate2::write::GzEncoder;
use flate2::Compression;
use http::{header, HeaderMap, HeaderValue, Method};
use http_body::{Body, Frame, SizeHint};
use http_body_util::BodyExt;
use std::io::Write;
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use toolbox_core::{BoxBody, BoxError, Request, Response};

/// Default gzip level.
pub const DEFAULT_LEVEL: u32 = 6;

/// Default minimum body size worth compressing, in bytes.
pub const DEFAULT_MIN_SIZE: usize = 1024;

/// Content types compressed by default.
pub const DEFAULT_CONTENT_TYPES: [&str; 8] = [
    "text/html",
    "text/css",
    "text/javascript",
    "application/javascript",
    "application/json",
    "application/xml",
    "text/xml",
    "text/plain",
];

/// Compression middleware configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressionConfig {
    /// Gzip level, 0 (store) to 9 (best).
    level: u32,
    /// Minimum body size to compress, checked against `Content-Length`.
    min_size: usize,
    /// Lowercase media type prefixes; empty means every type.
    content_types: Vec<String>,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LEVEL,
            min_size: DEFAULT_MIN_SIZE,
            content_types: DEFAULT_CONTENT_TYPES.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

impl CompressionConfig {
    /// Returns the gzip level.
    #[must_use]
    pub fn level(&self) -> u32 {
        self.level
    }

    /// Returns the minimum body size.
    #[must_use]
    pub fn min_size(&self) -> usize {
        self.min_size
    }

    /// Returns the content type prefixes.
    #[must_use]
    pub fn content_types(&self) -> &[String] {
        &self.content_types
    }

    /// Checks a `Content-Type` value against the allow-list.
    #[must_use]
    pub fn is_compressible(&self, content_type: Option<&str>) -> bool {
        if self.content_types.is_empty() {
            return true;
        }
        let Some(content_type) = content_type else {
            return false;
        };
        let content_type = content_type.trim().to_ascii_lowercase();
        self.content_types
            .iter()
            .any(|allowed| content_type.starts_with(allowed.as_str()))
    }
}

/// Builder for [`CompressionMiddleware`].
#[derive(Debug, Clone, Default)]
pub struct CompressionBuilder {
    config: CompressionConfig,
}

impl CompressionBuilder {
    /// Creates a builder with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the gzip level; values above 9 are clamped.
    #[must_use]
    pub fn level(mut self, level: u32) -> Self {
        self.config.level = level.min(9);
        self
    }

    /// Sets the minimum body size to compress.
    #[must_use]
    pub fn min_size(mut self, min_size: usize) -> Self {
        self.config.min_size = min_size;
        self
    }

    /// Replaces the content type allow-list.
    #[must_use]
    pub fn content_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.content_types = types
            .into_iter()
            .map(|t| t.into().to_ascii_lowercase())
            .collect();
        self
    }

    /// Compresses every content type.
    #[must_use]
    pub fn any_content_type(mut self) -> Self {
        self.config.content_types.clear();
        self
    }

    /// Builds the middleware.
    #[must_use]
    pub fn build(self) -> CompressionMiddleware {
        CompressionMiddleware {
            config: self.config,
        }
    }
}

/// Gzip compression middleware.
///
/// # Headers
///
/// - Reads: `Accept-Encoding` from the request
/// - Writes: `Content-Encoding: gzip` and `Vary: Accept-Encoding`
/// - Removes: `Content-Length` from compressed responses
#[derive(Debug, Clone, Default)]
pub struct CompressionMiddleware {
    config: CompressionConfig,
}

impl CompressionMiddleware {
    /// Creates a compression middleware with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder for custom configuration.
    #[must_use]
    pub fn builder() -> CompressionBuilder {
        CompressionBuilder::new()
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &CompressionConfig {
        &self.config
    }

    /// Returns true if the `Accept-Encoding` value allows gzip.
    ///
    /// An explicit `gzip` entry decides on its own; otherwise a `*` entry
    /// applies. A quality of zero refuses the encoding.
    pub fn accepts_gzip(accept_encoding: &str) -> bool {
        let mut wildcard = None;
        for (coding, quality) in parse_accept_encoding(accept_encoding) {
            if coding.eq_ignore_ascii_case("gzip") || coding.eq_ignore_ascii_case("x-gzip") {
                return quality > 0.0;
            }
            if coding == "*" {
                wildcard = Some(quality > 0.0);
            }
        }
        wildcard.unwrap_or(false)
    }

    /// Applies the compression decision to a finished response head.
    fn encode(&self, response: Response) -> Response {
        let headers = response.headers();
        if headers.contains_key(header::CONTENT_ENCODING) {
            return response;
        }

        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok());
        if !self.config.is_compressible(content_type) {
            return response;
        }

        let (mut parts, body) = response.into_parts();
        parts
            .headers
            .append(header::VARY, HeaderValue::from_static("Accept-Encoding"));

        let min_size = u64::try_from(self.config.min_size).unwrap_or(u64::MAX);
        let too_small = declared_length(&parts.headers).is_some_and(|n| n < min_size);
        if body.is_end_stream() || too_small {
            return Response::from_parts(parts, body);
        }

        parts.headers.remove(header::CONTENT_LENGTH);
        parts
            .headers
            .insert(header::CONTENT_ENCODING, HeaderValue::from_static("gzip"));

        Response::from_parts(parts, GzipBody::new(body, self.config.level).boxed())
    }
}

impl Middleware for CompressionMiddleware {
    fn name(&self) -> &'static str {
        "compression"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let wants_gzip = request.method() != Method::HEAD
                && request
                    .headers()
                    .get(header::ACCEPT_ENCODING)
                    .and_then(|v| v.to_str().ok())
                    .is_some_and(Self::accepts_gzip);

            let response = next.run(ctx, request).await;

            if wants_gzip {
                self.encode(response)
            } else {
                response
            }
        })
    }
}

/// Parses `Accept-Encoding` into `(coding, quality)` pairs.
fn parse_accept_encoding(value: &str) -> impl Iterator<Item = (&str, f32)> {
    value.split(',').filter_map(|part| {
        let mut params = part.split(';');
        let coding = params.next()?.trim();
        if coding.is_empty() {
            return None;
        }
        let quality = params
            .filter_map(|p| p.trim().strip_prefix("q="))
            .find_map(|q| q.trim().parse::<f32>().ok())
            .map_or(1.0, |q| q.clamp(0.0, 1.0));
        Some((coding, quality))
    })
}

/// Body size declared by the `Content-Length` header.
fn declared_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

/// A body that gzips another body as it streams.
///
/// Each data frame of the inner body is fed to the encoder and whatever
/// compressed output is ready is yielded. When the inner body ends the
/// encoder is finished, its remaining output yielded, and any trailers
/// forwarded last.
pub struct GzipBody {
    inner: BoxBody,
    encoder: Option<GzEncoder<Vec<u8>>>,
    trailers: Option<HeaderMap>,
}

impl GzipBody {
    /// Wraps `inner`, compressing at `level` (0..=9).
    pub fn new(inner: BoxBody, level: u32) -> Self {
        Self {
            inner,
            encoder: Some(GzEncoder::new(Vec::new(), Compression::new(level.min(9)))),
            trailers: None,
        }
    }
}

impl std::fmt::Debug for GzipBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GzipBody")
            .field("finished", &self.encoder.is_none())
            .finish_non_exhaustive()
    }
}

impl Body for GzipBody {
    type Data = Bytes;
    type Error = BoxError;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();

        loop {
            let Some(encoder) = this.encoder.as_mut() else {
                return Poll::Ready(this.trailers.take().map(|t| Ok(Frame::trailers(t))));
            };

            match ready!(Pin::new(&mut this.inner).poll_frame(cx)) {
                Some(Ok(frame)) => match frame.into_data() {
                    Ok(data) => {
                        if let Err(err) = encoder.write_all(&data) {
                            this.encoder = None;
                            return Poll::Ready(Some(Err(err.into())));
                        }
                        let out = std::mem::take(encoder.get_mut());
                        if !out.is_empty() {
                            return Poll::Ready(Some(Ok(Frame::data(Bytes::from(out)))));
                        }
                    }
                    Err(frame) => {
                        if let Ok(trailers) = frame.into_trailers() {
                            match this.trailers.as_mut() {
                                Some(existing) => existing.extend(trailers),
                                None => this.trailers = Some(trailers),
                            }
                        }
                    }
                },
                Some(Err(err)) => {
                    this.encoder = None;
                    this.trailers = None;
                    return Poll::Ready(Some(Err(err)));
                }
                None => {
                    let Some(encoder) = this.encoder.take() else {
                        continue;
                    };
                    match encoder.finish() {
                        Ok(out) if !out.is_empty() => {
                            return Poll::Ready(Some(Ok(Frame::data(Bytes::from(out)))));
                        }
                        Ok(_) => {}
                        Err(err) => return Poll::Ready(Some(Err(err.into()))),
                    }
                }
            }
        }
    }

    fn is_end_stream(&self) -> bool {
        self.encoder.is_none() && self.trailers.is_none()
    }

    fn size_hint(&self) -> SizeHint {
        if self.is_end_stream() {
            SizeHint::with_exact(0)
        } else {
            SizeHint::default()
        }
    }
}
