//! # Toolbox Core
//!
//! Foundational types shared by every toolbox crate:
//!
//! - [`ContextKey`] - The closed set of metadata keys a request can carry
//! - [`RequestContext`] - Immutable per-request overlay with one typed slot per key
//! - [`Envelope`] - The single JSON object shape used for every response body
//! - [`Request`] / [`Response`] - HTTP types with a boxed, streaming body

#![doc(html_root_url = "https://docs.rs/toolbox-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod body;
mod context;
mod envelope;

pub use body::{BoxBody, BoxError, Request, Response};
pub use context::{parse_roles, ContextKey, RequestContext};
pub use envelope::Envelope;
