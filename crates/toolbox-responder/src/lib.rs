//! # Toolbox Responder
//!
//! Strict JSON request decoding and envelope-based JSON responses.
//!
//! - [`JsonResponder::read_json`] enforces a byte ceiling, rejects unknown
//!   keys and trailing values, and classifies every failure as a
//!   [`DecodeError`]
//! - [`JsonResponder::write_json`] serializes an [`Envelope`](toolbox_core::Envelope)
//!   with `Content-Type: application/json`
//! - The error helpers (`server_error_response`, `bad_request_response`, ...)
//!   produce `{"error": ...}` envelopes with fixed status codes
//! - [`Validator`] collects per-field validation messages
//!
//! ## Example
//!
//! ```rust
//! use http::StatusCode;
//! use serde::Deserialize;
//! use toolbox_core::{body, Envelope};
//! use toolbox_responder::JsonResponder;
//!
//! #[derive(Deserialize)]
//! struct Input {
//!     title: String,
//! }
//!
//! # tokio_test::block_on(async {
//! let responder = JsonResponder::new();
//! let mut request = http::Request::new(body::full(r#"{"title":"x","extra":1}"#));
//!
//! let response = match responder.read_json::<Input>(&mut request).await {
//!     Ok(input) => responder
//!         .write_json(StatusCode::OK, &Envelope::new().with("title", input.title), None)
//!         .unwrap(),
//!     Err(err) => responder.bad_request_response(&request, &err),
//! };
//!
//! assert_eq!(response.status(), StatusCode::BAD_REQUEST);
//! # });
//! ```

#![doc(html_root_url = "https://docs.rs/toolbox-responder/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod json;
pub mod response;
pub mod validator;

pub use error::{DecodeError, DecodeErrorKind, ResponderError};
pub use json::{JsonResponder, DEFAULT_MAX_BYTES};
pub use validator::Validator;
