//! Path exclusion.
//!
//! An [`ExclusionMatcher`] decides, once per request and before any
//! middleware runs, whether the request bypasses the chain and goes straight
//! to the terminal handler. Health and readiness endpoints are the usual
//! candidates.
//!
//! Matchers are built before serving starts and only read afterwards, so
//! they are shared between requests without locking.
//!
//! # Example
//!
//! ```
//! use toolbox_middleware::{ExclusionMatcher, ExclusionSet};
//!
//! let set = ExclusionSet::new()
//!     .path("/healthz")
//!     .prefix("/internal/");
//!
//! assert!(set.skip("/healthz"));
//! assert!(set.skip("/internal/metrics"));
//! assert!(!set.skip("/healthz/deep"));
//! assert!(!set.skip("/v1/users"));
//! ```

use regex::Regex;
use std::collections::HashSet;

/// Decides whether a request path bypasses the middleware chain.
///
/// Implementations must be free of side effects.
pub trait ExclusionMatcher: Send + Sync + 'static {
    /// Returns true if the request at `path` skips every middleware.
    fn skip(&self, path: &str) -> bool;
}

impl<F> ExclusionMatcher for F
where
    F: Fn(&str) -> bool + Send + Sync + 'static,
{
    fn skip(&self, path: &str) -> bool {
        self(path)
    }
}

/// Exact paths, path prefixes and an optional pattern.
///
/// A path is excluded when any of the three matches. Exact lookups are
/// constant time; prefixes are scanned in order.
#[derive(Debug, Clone, Default)]
pub struct ExclusionSet {
    exact: HashSet<String>,
    prefixes: Vec<String>,
    pattern: Option<Regex>,
}

impl ExclusionSet {
    /// Creates an empty set that excludes nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an exact path.
    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.exact.insert(path.into());
        self
    }

    /// Adds several exact paths.
    #[must_use]
    pub fn paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exact.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Adds a path prefix.
    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefixes.push(prefix.into());
        self
    }

    /// Adds several path prefixes.
    #[must_use]
    pub fn prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prefixes.extend(prefixes.into_iter().map(Into::into));
        self
    }

    /// Sets the exclusion pattern, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns the compile error if `pattern` is not a valid regular expression.
    pub fn pattern(mut self, pattern: &str) -> Result<Self, regex::Error> {
        self.pattern = Some(Regex::new(pattern)?);
        Ok(self)
    }

    /// Sets an already compiled exclusion pattern.
    #[must_use]
    pub fn regex(mut self, regex: Regex) -> Self {
        self.pattern = Some(regex);
        self
    }

    /// Returns true if nothing is excluded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.prefixes.is_empty() && self.pattern.is_none()
    }
}

impl ExclusionMatcher for ExclusionSet {
    fn skip(&self, path: &str) -> bool {
        self.exact.contains(path)
            || self.prefixes.iter().any(|prefix| path.starts_with(prefix.as_str()))
            || self.pattern.as_ref().is_some_and(|rx| rx.is_match(path))
    }
}
