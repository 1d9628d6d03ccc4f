//! Configuration schema types.
//!
//! One struct per section of the configuration file. Every field has a
//! default, so a file only needs the keys it changes.

use serde::{Deserialize, Serialize};
use toolbox_middleware::stages::compression::{
    DEFAULT_CONTENT_TYPES, DEFAULT_LEVEL, DEFAULT_MIN_SIZE,
};
use toolbox_responder::DEFAULT_MAX_BYTES;

/// Paths that bypass the middleware chain.
///
/// # Example
///
/// ```toml
/// [exclusion]
/// paths = ["/healthz", "/readyz"]
/// prefixes = ["/static/"]
/// pattern = "^/internal/v[0-9]+/ping$"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default, deny_unknown_fields)]
pub struct ExclusionConfig {
    /// Exact request paths.
    pub paths: Vec<String>,

    /// Path prefixes.
    pub prefixes: Vec<String>,

    /// A regular expression matched against the path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

/// Trace id stage settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default, deny_unknown_fields)]
pub struct TraceIdConfig {
    /// Generate a UUID v7 when the request carries no trace id header.
    pub generate_missing: bool,

    /// Copy the trace id to the `X-Request-Id` response header.
    pub echo_response_header: bool,
}

/// CORS policy.
///
/// `"*"` in `allowed_origins` allows any origin and cannot be combined
/// with `allow_credentials = true`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CorsSection {
    /// Whether the CORS stage is installed.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Allowed origins, or `["*"]`.
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,

    /// Methods listed in preflight responses.
    #[serde(default = "default_allowed_methods")]
    pub allowed_methods: Vec<String>,

    /// Request headers listed in preflight responses.
    #[serde(default = "default_allowed_headers")]
    pub allowed_headers: Vec<String>,

    /// Response headers exposed to the browser.
    #[serde(default)]
    pub expose_headers: Vec<String>,

    /// Send `Access-Control-Allow-Credentials: true`.
    #[serde(default)]
    pub allow_credentials: bool,

    /// Preflight cache lifetime in seconds. Absent means no `Access-Control-Max-Age`.
    #[serde(
        default = "default_max_age_secs",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_age_secs: Option<u64>,

    /// Let preflight requests continue to the handler.
    #[serde(default)]
    pub options_passthrough: bool,
}

impl Default for CorsSection {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed_origins: default_allowed_origins(),
            allowed_methods: default_allowed_methods(),
            allowed_headers: default_allowed_headers(),
            expose_headers: Vec::new(),
            allow_credentials: false,
            max_age_secs: default_max_age_secs(),
            options_passthrough: false,
        }
    }
}

impl CorsSection {
    /// Whether `allowed_origins` contains the wildcard.
    pub fn is_wildcard(&self) -> bool {
        self.allowed_origins.iter().any(|origin| origin == "*")
    }
}

/// Gzip response compression.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CompressionSection {
    /// Whether the compression stage is installed.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Gzip level, 0 to 9.
    #[serde(default = "default_level")]
    pub level: u32,

    /// Responses declaring a `Content-Length` below this many bytes are sent as-is.
    #[serde(default = "default_min_size")]
    pub min_size: usize,

    /// Content type prefixes eligible for compression. Empty allows every type.
    #[serde(default = "default_content_types")]
    pub content_types: Vec<String>,
}

impl Default for CompressionSection {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_level(),
            min_size: default_min_size(),
            content_types: default_content_types(),
        }
    }
}

/// JSON request decoding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct JsonSection {
    /// Request body ceiling in bytes.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Identifier attached to logged server errors.
    #[serde(default)]
    pub service_id: String,
}

impl Default for JsonSection {
    fn default() -> Self {
        Self {
            max_bytes: default_max_bytes(),
            service_id: String::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_allowed_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_allowed_methods() -> Vec<String> {
    ["GET", "POST", "PUT", "DELETE", "OPTIONS", "HEAD"]
        .iter()
        .map(|s| (*s).to_string())
        .collect()
}

fn default_allowed_headers() -> Vec<String> {
    ["Accept", "Authorization", "Content-Type", "X-CSRF-Token"]
        .iter()
        .map(|s| (*s).to_string())
        .collect()
}

#[allow(clippy::unnecessary_wraps)]
fn default_max_age_secs() -> Option<u64> {
    Some(86_400)
}

fn default_level() -> u32 {
    DEFAULT_LEVEL
}

fn default_min_size() -> usize {
    DEFAULT_MIN_SIZE
}

fn default_content_types() -> Vec<String> {
    DEFAULT_CONTENT_TYPES
        .iter()
        .map(|s| (*s).to_string())
        .collect()
}

fn default_max_bytes() -> usize {
    DEFAULT_MAX_BYTES
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cors_defaults() {
        let cors = CorsSection::default();
        assert!(cors.enabled);
        assert!(cors.is_wildcard());
        assert!(!cors.allow_credentials);
        assert_eq!(cors.max_age_secs, Some(86_400));
        assert_eq!(cors.allowed_methods.len(), 6);
    }

    #[test]
    fn test_partial_cors_section() {
        let cors: CorsSection = toml::from_str(
            r#"
            allowed_origins = ["https://app.example.com"]
            allow_credentials = true
            "#,
        )
        .unwrap();

        assert!(!cors.is_wildcard());
        assert!(cors.allow_credentials);
        assert_eq!(cors.allowed_headers, default_allowed_headers());
    }

    #[test]
    fn test_compression_defaults_track_stage_defaults() {
        let compression = CompressionSection::default();
        assert_eq!(compression.level, DEFAULT_LEVEL);
        assert_eq!(compression.min_size, DEFAULT_MIN_SIZE);
        assert_eq!(compression.content_types.len(), DEFAULT_CONTENT_TYPES.len());
    }

    #[test]
    fn test_exclusion_pattern_optional() {
        let exclusion: ExclusionConfig = toml::from_str(r#"paths = ["/healthz"]"#).unwrap();
        assert_eq!(exclusion.paths, vec!["/healthz"]);
        assert!(exclusion.pattern.is_none());

        let rendered = toml::to_string(&exclusion).unwrap();
        assert!(!rendered.contains("pattern"));
    }

    #[test]
    fn test_unknown_section_field_rejected() {
        let result: Result<JsonSection, _> = toml::from_str("max_body = 10");
        assert!(result.is_err());
    }
}
