//! Responder error types.
//!
//! [`DecodeError`] is returned by [`JsonResponder::read_json`](crate::JsonResponder::read_json)
//! and carries the detail needed to build a user-facing message. Its
//! [`Display`](std::fmt::Display) output is that message, so handlers
//! usually pass it straight to
//! [`bad_request_response`](crate::JsonResponder::bad_request_response).

use thiserror::Error;

/// Failure to decode a JSON request body.
///
/// # Example
///
/// ```rust
/// use toolbox_responder::{DecodeError, DecodeErrorKind};
///
/// let err = DecodeError::UnknownField { field: "b".into() };
/// assert_eq!(err.kind(), DecodeErrorKind::UnknownField);
/// assert_eq!(err.to_string(), r#"body contains unknown key "b""#);
/// assert!(err.is_client_error());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The body is not syntactically valid JSON.
    #[error("body contains badly-formed JSON (at character {offset})")]
    MalformedSyntax {
        /// Byte offset just past the offending character.
        offset: usize,
    },

    /// The body ended in the middle of a JSON value.
    #[error("body contains badly-formed JSON")]
    UnexpectedEnd,

    /// A JSON value does not fit the destination type.
    #[error("{}", type_mismatch_message(.field, .offset))]
    TypeMismatch {
        /// Dotted path of the offending field, if one could be determined.
        field: Option<String>,
        /// Byte offset just past the offending value.
        offset: usize,
    },

    /// A field the destination type requires is absent.
    #[error("body is missing required field \"{field}\"")]
    MissingField {
        /// Dotted path of the missing field.
        field: String,
    },

    /// The body is empty or contains only whitespace.
    #[error("body must not be empty")]
    EmptyBody,

    /// The body contains a key the destination type does not declare.
    #[error("body contains unknown key \"{field}\"")]
    UnknownField {
        /// Dotted path of the unknown key.
        field: String,
    },

    /// The body exceeds the configured byte ceiling.
    #[error("body must not be larger than {limit} bytes")]
    OversizedBody {
        /// The configured ceiling in bytes.
        limit: usize,
    },

    /// Non-whitespace content follows the first JSON value.
    #[error("body must only contain a single JSON value")]
    MultipleValues,

    /// The body could not be read at all.
    ///
    /// This is a server-side failure, not a client input error.
    #[error("failed to read request body: {message}")]
    Unrecoverable {
        /// Description of the underlying failure.
        message: String,
    },
}

fn type_mismatch_message(field: &Option<String>, offset: &usize) -> String {
    match field {
        Some(field) => format!("body contains incorrect JSON type for field \"{field}\""),
        None => format!("body contains incorrect JSON type (at character {offset})"),
    }
}

/// Classification of a [`DecodeError`] without its detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecodeErrorKind {
    /// See [`DecodeError::MalformedSyntax`].
    MalformedSyntax,
    /// See [`DecodeError::UnexpectedEnd`].
    UnexpectedEnd,
    /// See [`DecodeError::TypeMismatch`].
    TypeMismatch,
    /// See [`DecodeError::MissingField`].
    MissingField,
    /// See [`DecodeError::EmptyBody`].
    EmptyBody,
    /// See [`DecodeError::UnknownField`].
    UnknownField,
    /// See [`DecodeError::OversizedBody`].
    OversizedBody,
    /// See [`DecodeError::MultipleValues`].
    MultipleValues,
    /// See [`DecodeError::Unrecoverable`].
    Unrecoverable,
}

impl DecodeError {
    /// Returns the kind of this error.
    #[must_use]
    pub fn kind(&self) -> DecodeErrorKind {
        match self {
            Self::MalformedSyntax { .. } => DecodeErrorKind::MalformedSyntax,
            Self::UnexpectedEnd => DecodeErrorKind::UnexpectedEnd,
            Self::TypeMismatch { .. } => DecodeErrorKind::TypeMismatch,
            Self::MissingField { .. } => DecodeErrorKind::MissingField,
            Self::EmptyBody => DecodeErrorKind::EmptyBody,
            Self::UnknownField { .. } => DecodeErrorKind::UnknownField,
            Self::OversizedBody { .. } => DecodeErrorKind::OversizedBody,
            Self::MultipleValues => DecodeErrorKind::MultipleValues,
            Self::Unrecoverable { .. } => DecodeErrorKind::Unrecoverable,
        }
    }

    /// Returns true if the failure was caused by client input.
    ///
    /// Client errors should be answered with a 400 response; anything else
    /// is a server error.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Unrecoverable { .. })
    }
}

/// Failure to build a JSON response.
#[derive(Debug, Error)]
pub enum ResponderError {
    /// The envelope could not be serialized.
    #[error("failed to serialize response body: {0}")]
    Serialize(#[from] serde_json::Error),
}
