//! Field validation.
//!
//! A [`Validator`] accumulates one message per field so that every problem
//! with an input can be reported at once through
//! [`JsonResponder::failed_validation_response`](crate::JsonResponder::failed_validation_response).
//!
//! # Example
//!
//! ```rust
//! use toolbox_responder::validator::{self, Validator};
//!
//! let email = "not-an-email";
//! let mut v = Validator::new();
//! v.check(!email.is_empty(), "email", "must be provided");
//! v.check(validator::matches(email, validator::email_rx()), "email", "must be a valid email address");
//!
//! assert!(!v.is_valid());
//! assert_eq!(v.errors()["email"], "must be a valid email address");
//! ```

use indexmap::IndexMap;
use regex::Regex;
use std::collections::HashSet;
use std::hash::Hash;
use std::sync::OnceLock;

const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$";

static EMAIL_RX: OnceLock<Regex> = OnceLock::new();

/// Returns the compiled email address pattern.
pub fn email_rx() -> &'static Regex {
    EMAIL_RX.get_or_init(|| Regex::new(EMAIL_PATTERN).expect("email pattern is valid"))
}

/// Accumulates validation errors keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validator {
    errors: IndexMap<String, String>,
}

impl Validator {
    /// Creates a validator with no errors.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if no errors have been recorded.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Records `message` for `key` unless the field already has an error.
    pub fn add_error(&mut self, key: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(key.into())
            .or_insert_with(|| message.into());
    }

    /// Records `message` for `key` when `ok` is false.
    pub fn check(&mut self, ok: bool, key: impl Into<String>, message: impl Into<String>) {
        if !ok {
            self.add_error(key, message);
        }
    }

    /// Returns the recorded errors in insertion order.
    #[must_use]
    pub fn errors(&self) -> &IndexMap<String, String> {
        &self.errors
    }

    /// Consumes the validator and returns the recorded errors.
    #[must_use]
    pub fn into_errors(self) -> IndexMap<String, String> {
        self.errors
    }
}

/// Returns true if `value` is one of `permitted`.
pub fn permitted_value<T: PartialEq>(value: &T, permitted: &[T]) -> bool {
    permitted.contains(value)
}

/// Returns true if `value` matches `rx`.
pub fn matches(value: &str, rx: &Regex) -> bool {
    rx.is_match(value)
}

/// Returns true if no value appears twice.
pub fn unique<T: Eq + Hash>(values: &[T]) -> bool {
    let mut seen = HashSet::with_capacity(values.len());
    values.iter().all(|value| seen.insert(value))
}
