//! Error-response helpers.
//!
//! Each helper picks a fixed status code, sets an authentication challenge
//! where relevant, and writes an `{"error": ...}` envelope through
//! [`JsonResponder::write_json`]. If the envelope cannot be serialized the
//! helper falls back to an empty 500 response.
//!
//! | Helper | Status | Logged |
//! |--------|--------|--------|
//! | [`server_error_response`](JsonResponder::server_error_response) | 500 | yes |
//! | [`not_found`](JsonResponder::not_found) | 404 | yes |
//! | [`bad_request_response`](JsonResponder::bad_request_response) | 400 | no |
//! | [`failed_validation_response`](JsonResponder::failed_validation_response) | 422 | no |
//! | [`invalid_credentials_response`](JsonResponder::invalid_credentials_response) | 401 | no |
//! | [`invalid_bearer_authentication_token_response`](JsonResponder::invalid_bearer_authentication_token_response) | 401 | no |
//! | [`invalid_cookie_authentication_token_response`](JsonResponder::invalid_cookie_authentication_token_response) | 401 | no |

use crate::JsonResponder;
use http::{header, HeaderMap, HeaderValue, StatusCode};
use indexmap::IndexMap;
use serde_json::Value;
use std::fmt::Display;
use toolbox_core::body;
use toolbox_core::{ContextKey, Envelope, RequestContext, Response};

/// Client-facing message for internal failures.
pub const INTERNAL_SERVER_ERROR_MESSAGE: &str = "internal server error";

/// Message returned when login credentials are rejected.
pub const INVALID_CREDENTIALS_MESSAGE: &str = "invalid authentication credentials";

/// Message returned when a bearer or cookie token is rejected.
pub const INVALID_TOKEN_MESSAGE: &str = "invalid or missing authentication token";

impl JsonResponder {
    /// Logs `err` with request metadata and responds 500.
    ///
    /// The client only sees a generic message; the detail stays in the log.
    pub fn server_error_response<B>(
        &self,
        request: &http::Request<B>,
        err: &dyn Display,
    ) -> Response {
        self.log_error(request, err);
        self.error_response(
            request,
            StatusCode::INTERNAL_SERVER_ERROR,
            INTERNAL_SERVER_ERROR_MESSAGE,
            None,
        )
    }

    /// Logs `err` with request metadata and responds 404 with its message.
    pub fn not_found<B>(&self, request: &http::Request<B>, err: &dyn Display) -> Response {
        self.log_error(request, err);
        self.error_response(request, StatusCode::NOT_FOUND, err.to_string(), None)
    }

    /// Responds 400 with the error's message.
    pub fn bad_request_response<B>(
        &self,
        request: &http::Request<B>,
        err: &dyn Display,
    ) -> Response {
        self.error_response(request, StatusCode::BAD_REQUEST, err.to_string(), None)
    }

    /// Responds 422 with a field-to-message map.
    pub fn failed_validation_response<B>(
        &self,
        request: &http::Request<B>,
        errors: &IndexMap<String, String>,
    ) -> Response {
        let map: serde_json::Map<String, Value> = errors
            .iter()
            .map(|(field, message)| (field.clone(), Value::from(message.as_str())))
            .collect();
        self.error_response(
            request,
            StatusCode::UNPROCESSABLE_ENTITY,
            Value::Object(map),
            None,
        )
    }

    /// Responds 401 for rejected login credentials.
    pub fn invalid_credentials_response<B>(&self, request: &http::Request<B>) -> Response {
        self.error_response(
            request,
            StatusCode::UNAUTHORIZED,
            INVALID_CREDENTIALS_MESSAGE,
            None,
        )
    }

    /// Responds 401 with `WWW-Authenticate: Bearer`.
    pub fn invalid_bearer_authentication_token_response<B>(
        &self,
        request: &http::Request<B>,
    ) -> Response {
        self.error_response(
            request,
            StatusCode::UNAUTHORIZED,
            INVALID_TOKEN_MESSAGE,
            Some(challenge("Bearer")),
        )
    }

    /// Responds 401 with `WWW-Authenticate: Cookie`.
    pub fn invalid_cookie_authentication_token_response<B>(
        &self,
        request: &http::Request<B>,
    ) -> Response {
        self.error_response(
            request,
            StatusCode::UNAUTHORIZED,
            INVALID_TOKEN_MESSAGE,
            Some(challenge("Cookie")),
        )
    }

    fn error_response<B>(
        &self,
        request: &http::Request<B>,
        status: StatusCode,
        message: impl Into<Value>,
        headers: Option<HeaderMap>,
    ) -> Response {
        let envelope = Envelope::error(message);
        match self.write_json(status, &envelope, headers) {
            Ok(response) => response,
            Err(err) => {
                self.log_error(request, &err);
                let mut response = http::Response::new(body::empty());
                *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                response
            }
        }
    }

    fn log_error<B>(&self, request: &http::Request<B>, err: &dyn Display) {
        let trace_id = request
            .extensions()
            .get::<RequestContext>()
            .map_or(ContextKey::TraceId.default_value(), RequestContext::trace_id);
        let host = request
            .headers()
            .get(header::HOST)
            .and_then(|value| value.to_str().ok())
            .or_else(|| request.uri().host())
            .unwrap_or_default();

        tracing::error!(
            service = %self.service_id(),
            trace_id = %trace_id,
            host = %host,
            proto = ?request.version(),
            method = %request.method(),
            uri = %request.uri(),
            error = %err,
            "request failed"
        );
    }
}

fn challenge(scheme: &'static str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::WWW_AUTHENTICATE, HeaderValue::from_static(scheme));
    headers
}
