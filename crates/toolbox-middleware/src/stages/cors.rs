//! CORS (Cross-Origin Resource Sharing) middleware.
//!
//! ## Behavior
//!
//! For every request whose `Origin` header matches the allowed origins
//! (exact match or a `*` wildcard), the response gets
//! `Access-Control-Allow-Origin` set to the echoed origin, never to `*`, plus
//! `Access-Control-Allow-Credentials` and `Access-Control-Expose-Headers`
//! when configured, and `Vary: Origin`.
//!
//! Any `OPTIONS` request is treated as a preflight: it additionally gets
//! `Access-Control-Allow-Methods`, `Access-Control-Allow-Headers` and
//! `Access-Control-Max-Age`, and is answered with `204 No Content` without
//! reaching the handler. With [`CorsBuilder::options_passthrough`] the
//! request continues down the chain instead and the headers are added to
//! the handler's response.
//!
//! A wildcard origin combined with credentials is rejected when the
//! middleware is built.
//!
//! ## Example
//!
//! ```
//! use toolbox_middleware::stages::CorsMiddleware;
//! use http::Method;
//! use std::time::Duration;
//!
//! let cors = CorsMiddleware::builder()
//!     .allow_origin("https://app.example.com")
//!     .allow_origin("https://admin.example.com")
//!     .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
//!     .allow_headers(["Content-Type", "Authorization", "X-Request-Id"])
//!     .allow_credentials(true)
//!     .max_age(Duration::from_secs(3600))
//!     .build()
//!     .unwrap();
//! ```

use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use http::{HeaderMap, HeaderValue, Method, StatusCode};
use std::time::Duration;
use thiserror::Error;
use toolbox_core::{body, Request, Response};

/// CORS header names.
pub mod headers {
    /// `Access-Control-Allow-Origin` header.
    pub const ALLOW_ORIGIN: &str = "access-control-allow-origin";
    /// `Access-Control-Allow-Methods` header.
    pub const ALLOW_METHODS: &str = "access-control-allow-methods";
    /// `Access-Control-Allow-Headers` header.
    pub const ALLOW_HEADERS: &str = "access-control-allow-headers";
    /// `Access-Control-Allow-Credentials` header.
    pub const ALLOW_CREDENTIALS: &str = "access-control-allow-credentials";
    /// `Access-Control-Max-Age` header.
    pub const MAX_AGE: &str = "access-control-max-age";
    /// `Access-Control-Expose-Headers` header.
    pub const EXPOSE_HEADERS: &str = "access-control-expose-headers";
    /// `Origin` header.
    pub const ORIGIN: &str = "origin";
    /// `Vary` header.
    pub const VARY: &str = "vary";
}

/// Errors raised when a CORS policy is built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CorsConfigError {
    /// Credentials were enabled together with a wildcard origin.
    #[error("allow_credentials cannot be combined with a wildcard origin")]
    WildcardWithCredentials,

    /// A configured list cannot be sent as a header value.
    #[error("invalid value for {header}: {value:?}")]
    InvalidHeaderValue {
        /// The header being built.
        header: &'static str,
        /// The offending value.
        value: String,
    },
}

/// The set of allowed origins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedOrigins {
    /// Any origin (`*`).
    Any,
    /// Exactly these origins.
    List(Vec<String>),
}

impl AllowedOrigins {
    /// Builds the set from configured values; a `*` entry means any origin.
    pub fn from_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values: Vec<String> = values.into_iter().map(Into::into).collect();
        if values.iter().any(|v| v == "*") {
            Self::Any
        } else {
            Self::List(values)
        }
    }

    /// Checks if a non-empty origin is allowed.
    pub fn is_allowed(&self, origin: &str) -> bool {
        if origin.is_empty() {
            return false;
        }
        match self {
            Self::Any => true,
            Self::List(origins) => origins.iter().any(|o| o == origin),
        }
    }
}

/// Configuration for the CORS middleware.
///
/// The default is the permissive public-API policy: any origin,
/// `GET, POST, PUT, DELETE, OPTIONS, HEAD`,
/// `Accept, Authorization, Content-Type, X-CSRF-Token`, a one day max age
/// and no credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsConfig {
    /// Allowed origins.
    pub allowed_origins: AllowedOrigins,
    /// Methods listed in preflight responses.
    pub allowed_methods: Vec<String>,
    /// Request headers listed in preflight responses.
    pub allowed_headers: Vec<String>,
    /// Response headers exposed to scripts.
    pub expose_headers: Vec<String>,
    /// Whether to send `Access-Control-Allow-Credentials: true`.
    pub allow_credentials: bool,
    /// Preflight cache duration; `None` or zero omits the header.
    pub max_age: Option<Duration>,
    /// Let preflight requests reach the handler.
    pub options_passthrough: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: AllowedOrigins::Any,
            ..CorsConfig::restrictive()
        }
    }
}

impl CorsConfig {
    /// Default methods and headers with no allowed origins.
    fn restrictive() -> Self {
        Self {
            allowed_origins: AllowedOrigins::List(Vec::new()),
            allowed_methods: [
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
                Method::HEAD,
            ]
            .iter()
            .map(ToString::to_string)
            .collect(),
            allowed_headers: ["Accept", "Authorization", "Content-Type", "X-CSRF-Token"]
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            expose_headers: Vec::new(),
            allow_credentials: false,
            max_age: Some(Duration::from_secs(86400)),
            options_passthrough: false,
        }
    }

    /// Checks the policy invariants.
    pub fn validate(&self) -> Result<(), CorsConfigError> {
        if self.allow_credentials && self.allowed_origins == AllowedOrigins::Any {
            return Err(CorsConfigError::WildcardWithCredentials);
        }
        Ok(())
    }
}

/// Builder for CORS configuration.
///
/// Starts with no allowed origins and the default methods and headers.
#[derive(Debug, Clone)]
pub struct CorsBuilder {
    config: CorsConfig,
}

impl Default for CorsBuilder {
    fn default() -> Self {
        Self {
            config: CorsConfig::restrictive(),
        }
    }
}

impl CorsBuilder {
    /// Creates a new CORS builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing configuration.
    #[must_use]
    pub fn from_config(config: CorsConfig) -> Self {
        Self { config }
    }

    /// Allows any origin.
    #[must_use]
    pub fn allow_any_origin(mut self) -> Self {
        self.config.allowed_origins = AllowedOrigins::Any;
        self
    }

    /// Adds an allowed origin; `*` allows any origin.
    #[must_use]
    pub fn allow_origin(mut self, origin: impl Into<String>) -> Self {
        let origin = origin.into();
        if origin == "*" {
            self.config.allowed_origins = AllowedOrigins::Any;
        } else if let AllowedOrigins::List(origins) = &mut self.config.allowed_origins {
            origins.push(origin);
        }
        self
    }

    /// Replaces the allowed origins.
    #[must_use]
    pub fn allow_origins<I, S>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.allowed_origins = AllowedOrigins::from_values(origins);
        self
    }

    /// Replaces the allowed methods.
    #[must_use]
    pub fn allow_methods<I, M>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: AsRef<str>,
    {
        self.config.allowed_methods = methods
            .into_iter()
            .map(|m| m.as_ref().to_ascii_uppercase())
            .collect();
        self
    }

    /// Replaces the allowed request headers.
    #[must_use]
    pub fn allow_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.allowed_headers = headers.into_iter().map(Into::into).collect();
        self
    }

    /// Replaces the headers exposed to scripts.
    #[must_use]
    pub fn expose_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.expose_headers = headers.into_iter().map(Into::into).collect();
        self
    }

    /// Sets whether to allow credentials.
    #[must_use]
    pub fn allow_credentials(mut self, allow: bool) -> Self {
        self.config.allow_credentials = allow;
        self
    }

    /// Sets the preflight cache duration.
    #[must_use]
    pub fn max_age(mut self, duration: Duration) -> Self {
        self.config.max_age = Some(duration);
        self
    }

    /// Omits `Access-Control-Max-Age`.
    #[must_use]
    pub fn no_max_age(mut self) -> Self {
        self.config.max_age = None;
        self
    }

    /// Lets preflight requests continue to the handler.
    #[must_use]
    pub fn options_passthrough(mut self, passthrough: bool) -> Self {
        self.config.options_passthrough = passthrough;
        self
    }

    /// Validates the policy and builds the middleware.
    pub fn build(self) -> Result<CorsMiddleware, CorsConfigError> {
        CorsMiddleware::new(self.config)
    }
}

/// CORS middleware.
///
/// Header values are rendered once when the middleware is built.
#[derive(Debug, Clone)]
pub struct CorsMiddleware {
    config: CorsConfig,
    allow_methods: HeaderValue,
    allow_headers: HeaderValue,
    expose_headers: Option<HeaderValue>,
    max_age: Option<HeaderValue>,
}

impl CorsMiddleware {
    /// Validates `config` and builds the middleware.
    pub fn new(config: CorsConfig) -> Result<Self, CorsConfigError> {
        config.validate()?;

        let allow_methods = join(headers::ALLOW_METHODS, &config.allowed_methods)?;
        let allow_headers = join(headers::ALLOW_HEADERS, &config.allowed_headers)?;
        let expose_headers = if config.expose_headers.is_empty() {
            None
        } else {
            Some(join(headers::EXPOSE_HEADERS, &config.expose_headers)?)
        };
        let max_age = config
            .max_age
            .filter(|age| age.as_secs() > 0)
            .map(|age| HeaderValue::from(age.as_secs()));

        Ok(Self {
            config,
            allow_methods,
            allow_headers,
            expose_headers,
            max_age,
        })
    }

    /// Creates a new CORS builder.
    #[must_use]
    pub fn builder() -> CorsBuilder {
        CorsBuilder::new()
    }

    /// Allows every origin, method and header, without credentials.
    ///
    /// Intended for local development.
    #[must_use]
    pub fn allow_all() -> Self {
        Self {
            config: CorsConfig {
                allowed_origins: AllowedOrigins::Any,
                allowed_methods: vec!["*".to_string()],
                allowed_headers: vec!["*".to_string()],
                expose_headers: Vec::new(),
                allow_credentials: false,
                max_age: Some(Duration::from_secs(86400)),
                options_passthrough: false,
            },
            allow_methods: HeaderValue::from_static("*"),
            allow_headers: HeaderValue::from_static("*"),
            expose_headers: None,
            max_age: Some(HeaderValue::from_static("86400")),
        }
    }

    /// Returns the policy.
    #[must_use]
    pub fn config(&self) -> &CorsConfig {
        &self.config
    }

    /// Returns the origin to echo, if the request's origin is allowed.
    fn allowed_origin(&self, request: &Request) -> Option<HeaderValue> {
        let origin = request.headers().get(headers::ORIGIN)?;
        let allowed = origin
            .to_str()
            .is_ok_and(|o| self.config.allowed_origins.is_allowed(o));
        allowed.then(|| origin.clone())
    }

    fn apply(&self, target: &mut HeaderMap, origin: Option<HeaderValue>, preflight: bool) {
        if let Some(origin) = origin {
            target.insert(headers::ALLOW_ORIGIN, origin);
            target.append(headers::VARY, HeaderValue::from_static("Origin"));
            if self.config.allow_credentials {
                target.insert(headers::ALLOW_CREDENTIALS, HeaderValue::from_static("true"));
            }
            if let Some(expose) = &self.expose_headers {
                target.insert(headers::EXPOSE_HEADERS, expose.clone());
            }
        }

        if preflight {
            target.insert(headers::ALLOW_METHODS, self.allow_methods.clone());
            target.insert(headers::ALLOW_HEADERS, self.allow_headers.clone());
            if let Some(max_age) = &self.max_age {
                target.insert(headers::MAX_AGE, max_age.clone());
            }
        }
    }
}

fn join(header: &'static str, values: &[String]) -> Result<HeaderValue, CorsConfigError> {
    let joined = values.join(", ");
    HeaderValue::from_str(&joined).map_err(|_| CorsConfigError::InvalidHeaderValue {
        header,
        value: joined,
    })
}

impl Middleware for CorsMiddleware {
    fn name(&self) -> &'static str {
        "cors"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let origin = self.allowed_origin(&request);
            let preflight = request.method() == Method::OPTIONS;

            if preflight && !self.config.options_passthrough {
                let mut response = http::Response::new(body::empty());
                *response.status_mut() = StatusCode::NO_CONTENT;
                self.apply(response.headers_mut(), origin, true);
                return response;
            }

            let mut response = next.run(ctx, request).await;
            self.apply(response.headers_mut(), origin, preflight);
            response
        })
    }
}
