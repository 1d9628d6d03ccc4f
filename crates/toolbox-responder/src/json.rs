//! JSON request decoding and response encoding.
//!
//! [`JsonResponder`] is the single place where request bodies are turned
//! into typed values and envelopes are turned into responses. Decoding is
//! strict:
//!
//! - the body is capped at a configurable byte ceiling before parsing
//! - keys the destination type does not declare are rejected
//! - exactly one JSON value is accepted; trailing content is an error
//!
//! Every failure maps to one [`DecodeError`] whose message is safe to send
//! back to the client.

use crate::DecodeError;
use crate::ResponderError;
use bytes::Bytes;
use http::{header, HeaderMap, HeaderValue, StatusCode};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use serde::de::DeserializeOwned;
use serde_json::error::Category;
use toolbox_core::body::{self, BoxBody};
use toolbox_core::{Envelope, Request, Response};

/// Default maximum request body size (1 MiB).
pub const DEFAULT_MAX_BYTES: usize = 1_048_576;

/// Reads JSON request bodies and writes JSON envelope responses.
///
/// A responder is built once at startup and shared by every handler.
///
/// # Example
///
/// ```rust
/// use toolbox_responder::JsonResponder;
///
/// let responder = JsonResponder::new()
///     .with_max_bytes(64 * 1024)
///     .with_service_id("billing");
///
/// assert_eq!(responder.max_bytes(), 65_536);
/// ```
#[derive(Debug, Clone)]
pub struct JsonResponder {
    max_bytes: usize,
    service_id: String,
}

impl Default for JsonResponder {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonResponder {
    /// Creates a responder with the default 1 MiB body ceiling.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_BYTES,
            service_id: String::new(),
        }
    }

    /// Sets the maximum request body size in bytes.
    #[must_use]
    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Sets the service identifier attached to logged server errors.
    #[must_use]
    pub fn with_service_id(mut self, service_id: impl Into<String>) -> Self {
        self.service_id = service_id.into();
        self
    }

    /// Returns the configured body ceiling.
    #[must_use]
    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Returns the configured service identifier.
    #[must_use]
    pub fn service_id(&self) -> &str {
        &self.service_id
    }

    /// Reads the request body and decodes it into `T`.
    ///
    /// The body is taken out of the request, leaving an empty body behind,
    /// so the request head stays available for the error helpers.
    ///
    /// # Example
    ///
    /// ```rust
    /// use serde::Deserialize;
    /// use toolbox_core::body;
    /// use toolbox_responder::JsonResponder;
    ///
    /// #[derive(Deserialize)]
    /// struct CreateUser {
    ///     name: String,
    /// }
    ///
    /// # tokio_test::block_on(async {
    /// let mut request = http::Request::new(body::full(r#"{"name":"Alice"}"#));
    /// let user: CreateUser = JsonResponder::new().read_json(&mut request).await.unwrap();
    /// assert_eq!(user.name, "Alice");
    /// # });
    /// ```
    pub async fn read_json<T>(&self, request: &mut Request) -> Result<T, DecodeError>
    where
        T: DeserializeOwned,
    {
        let body = std::mem::replace(request.body_mut(), body::empty());
        let bytes = self.read_body(body).await?;
        self.decode(&bytes)
    }

    /// Decodes an already-buffered body into `T`.
    pub fn decode<T>(&self, bytes: &[u8]) -> Result<T, DecodeError>
    where
        T: DeserializeOwned,
    {
        if bytes.len() > self.max_bytes {
            return Err(DecodeError::OversizedBody {
                limit: self.max_bytes,
            });
        }

        if bytes.iter().all(|b| is_json_whitespace(*b)) {
            return Err(DecodeError::EmptyBody);
        }

        let mut de = serde_json::Deserializer::from_slice(bytes);
        let mut unknown: Option<String> = None;

        let result = {
            let mut on_ignored = |path: serde_ignored::Path<'_>| {
                if unknown.is_none() {
                    unknown = Some(path.to_string());
                }
            };
            let tracked = serde_ignored::Deserializer::new(&mut de, &mut on_ignored);
            serde_path_to_error::deserialize::<_, T>(tracked)
        };

        let value = match result {
            Ok(value) => value,
            Err(err) => {
                let field = field_name(err.path());
                return Err(classify(bytes, err.into_inner(), field, unknown));
            }
        };

        if let Some(field) = unknown {
            return Err(DecodeError::UnknownField { field });
        }

        if de.end().is_err() {
            return Err(DecodeError::MultipleValues);
        }

        Ok(value)
    }

    async fn read_body(&self, body: BoxBody) -> Result<Bytes, DecodeError> {
        match collect_limited(body, self.max_bytes).await {
            Ok(collected) => Ok(collected.to_bytes()),
            Err(err) if err.downcast_ref::<LengthLimitError>().is_some() => {
                Err(DecodeError::OversizedBody {
                    limit: self.max_bytes,
                })
            }
            Err(err) => Err(DecodeError::Unrecoverable {
                message: err.to_string(),
            }),
        }
    }

    /// Serializes `envelope` into a response with the given status.
    ///
    /// Caller-supplied headers are applied first; `Content-Type` is always
    /// forced to `application/json` afterwards. Fails only if the envelope
    /// cannot be serialized.
    ///
    /// # Example
    ///
    /// ```rust
    /// use http::StatusCode;
    /// use toolbox_core::Envelope;
    /// use toolbox_responder::JsonResponder;
    ///
    /// let envelope = Envelope::new().with("status", "available");
    /// let response = JsonResponder::new()
    ///     .write_json(StatusCode::OK, &envelope, None)
    ///     .unwrap();
    ///
    /// assert_eq!(response.status(), StatusCode::OK);
    /// assert_eq!(response.headers()["content-type"], "application/json");
    /// ```
    pub fn write_json(
        &self,
        status: StatusCode,
        envelope: &Envelope,
        headers: Option<HeaderMap>,
    ) -> Result<Response, ResponderError> {
        let payload = serde_json::to_vec(envelope)?;

        let mut response = http::Response::new(body::full(payload));
        *response.status_mut() = status;

        if let Some(headers) = headers {
            response.headers_mut().extend(headers);
        }
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );

        Ok(response)
    }
}

/// Collects `body` with a byte limit behind a boxed `Send` future, so callers'
/// async blocks stay `Send` (works around a higher-ranked lifetime inference
/// limitation with `Limited<BoxBody>`).
fn collect_limited(
    body: BoxBody,
    limit: usize,
) -> std::pin::Pin<
    Box<
        dyn std::future::Future<
                Output = Result<http_body_util::Collected<Bytes>, toolbox_core::BoxError>,
            > + Send,
    >,
> {
    Box::pin(Limited::new(body, limit).collect())
}

fn is_json_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\n' | b'\r' | b'\t')
}

fn field_name(path: &serde_path_to_error::Path) -> Option<String> {
    let rendered = path.to_string();
    (rendered != ".").then_some(rendered)
}

/// Name from serde's "missing field `name`" message.
///
/// serde reports absent fields only through the message text.
fn missing_field(err: &serde_json::Error) -> Option<String> {
    let message = err.to_string();
    let rest = message.strip_prefix("missing field `")?;
    let (name, _) = rest.split_once('`')?;
    Some(name.to_string())
}

fn classify(
    bytes: &[u8],
    err: serde_json::Error,
    field: Option<String>,
    unknown: Option<String>,
) -> DecodeError {
    match err.classify() {
        Category::Syntax => DecodeError::MalformedSyntax {
            offset: byte_offset(bytes, err.line(), err.column()),
        },
        Category::Eof => DecodeError::UnexpectedEnd,
        // An unknown key seen before the failing value is reported first.
        Category::Data => match (unknown, missing_field(&err)) {
            (Some(field), _) => DecodeError::UnknownField { field },
            (None, Some(name)) => DecodeError::MissingField {
                field: match field {
                    Some(parent) => format!("{parent}.{name}"),
                    None => name,
                },
            },
            (None, None) => DecodeError::TypeMismatch {
                field,
                offset: byte_offset(bytes, err.line(), err.column()),
            },
        },
        Category::Io => DecodeError::Unrecoverable {
            message: err.to_string(),
        },
    }
}

/// Converts a 1-based line/column position into a byte offset.
fn byte_offset(bytes: &[u8], line: usize, column: usize) -> usize {
    let line_start: usize = bytes
        .split(|b| *b == b'\n')
        .take(line.saturating_sub(1))
        .map(|segment| segment.len() + 1)
        .sum();
    (line_start + column).min(bytes.len())
}
