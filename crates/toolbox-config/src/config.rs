//! Main configuration type.
//!
//! [`ToolboxConfig`] holds every section and turns them into the stage
//! objects the chain is built from.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use toolbox_middleware::stages::{
    AllowedOrigins, CompressionMiddleware, CorsConfig, CorsMiddleware, RecoverMiddleware,
    RequestLogMiddleware, TraceIdMiddleware,
};
use toolbox_middleware::{ChainBuilder, ExclusionSet};
use toolbox_responder::JsonResponder;
use toolbox_telemetry::LogConfig;

use crate::{
    CompressionSection, ConfigError, CorsSection, ExclusionConfig, JsonSection, TraceIdConfig,
};

/// Complete toolbox configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load it from files and
/// environment variables.
///
/// # Example
///
/// ```
/// use toolbox_config::ToolboxConfig;
///
/// let config = ToolboxConfig::default();
/// assert!(config.cors.enabled);
/// assert_eq!(config.compression.level, 6);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct ToolboxConfig {
    /// Paths that bypass the chain.
    #[serde(default)]
    pub exclusion: ExclusionConfig,

    /// Trace id stage.
    #[serde(default)]
    pub trace_id: TraceIdConfig,

    /// CORS policy.
    #[serde(default)]
    pub cors: CorsSection,

    /// Gzip compression.
    #[serde(default)]
    pub compression: CompressionSection,

    /// JSON request decoding.
    #[serde(default)]
    pub json: JsonSection,

    /// Logging subscriber.
    #[serde(default)]
    pub logging: LogConfig,
}

impl ToolboxConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> ToolboxConfigBuilder {
        ToolboxConfigBuilder::new()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::Cors`] if a wildcard origin is combined with
    ///   credentials or a list cannot be sent as a header value
    /// - [`ConfigError::InvalidValue`] if the compression level is above 9,
    ///   the JSON body ceiling is zero, the exclusion pattern does not
    ///   compile, or the log filter does not parse
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cors.enabled {
            CorsMiddleware::new(self.cors_config())?;
        }

        if self.compression.level > 9 {
            return Err(ConfigError::invalid_value(
                "compression.level",
                format!("must be between 0 and 9, got {}", self.compression.level),
            ));
        }

        if self.json.max_bytes == 0 {
            return Err(ConfigError::invalid_value(
                "json.max_bytes",
                "must be greater than zero",
            ));
        }

        self.exclusion_set()?;

        self.logging
            .validate()
            .map_err(|e| ConfigError::invalid_value("logging.level", e.to_string()))?;

        Ok(())
    }

    /// Development preset: pretty debug logs, any CORS origin, trace ids
    /// generated and echoed.
    ///
    /// # Example
    ///
    /// ```
    /// use toolbox_config::ToolboxConfig;
    ///
    /// let config = ToolboxConfig::development();
    /// assert_eq!(config.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.logging = LogConfig::development();
        config.cors.allowed_origins = vec!["*".to_string()];
        config.trace_id.generate_missing = true;
        config.trace_id.echo_response_header = true;
        config
    }

    /// Production preset: JSON logs and no CORS origin until one is
    /// configured.
    ///
    /// # Example
    ///
    /// ```
    /// use toolbox_config::ToolboxConfig;
    /// use toolbox_telemetry::LogFormat;
    ///
    /// let config = ToolboxConfig::production();
    /// assert_eq!(config.logging.format, LogFormat::Json);
    /// assert!(config.cors.allowed_origins.is_empty());
    /// ```
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();
        config.logging = LogConfig::production();
        config.cors.allowed_origins = Vec::new();
        config.trace_id.generate_missing = true;
        config
    }

    /// Builds the exclusion matcher.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if `exclusion.pattern` does not compile.
    pub fn exclusion_set(&self) -> Result<ExclusionSet, ConfigError> {
        let set = ExclusionSet::new()
            .paths(self.exclusion.paths.iter().cloned())
            .prefixes(self.exclusion.prefixes.iter().cloned());

        match &self.exclusion.pattern {
            Some(pattern) => set
                .pattern(pattern)
                .map_err(|e| ConfigError::invalid_value("exclusion.pattern", e.to_string())),
            None => Ok(set),
        }
    }

    /// The CORS section as a stage policy.
    pub fn cors_config(&self) -> CorsConfig {
        let cors = &self.cors;
        let allowed_origins = if cors.is_wildcard() {
            AllowedOrigins::Any
        } else {
            AllowedOrigins::List(cors.allowed_origins.clone())
        };

        CorsConfig {
            allowed_origins,
            allowed_methods: cors
                .allowed_methods
                .iter()
                .map(|m| m.to_ascii_uppercase())
                .collect(),
            allowed_headers: cors.allowed_headers.clone(),
            expose_headers: cors.expose_headers.clone(),
            allow_credentials: cors.allow_credentials,
            max_age: cors.max_age_secs.map(Duration::from_secs),
            options_passthrough: cors.options_passthrough,
        }
    }

    /// Builds the CORS stage.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Cors`] if the policy is unusable.
    pub fn cors_middleware(&self) -> Result<CorsMiddleware, ConfigError> {
        Ok(CorsMiddleware::new(self.cors_config())?)
    }

    /// Builds the compression stage.
    pub fn compression_middleware(&self) -> CompressionMiddleware {
        CompressionMiddleware::builder()
            .level(self.compression.level)
            .min_size(self.compression.min_size)
            .content_types(self.compression.content_types.iter().cloned())
            .build()
    }

    /// Builds the trace id stage.
    pub fn trace_id_middleware(&self) -> TraceIdMiddleware {
        let mut stage = TraceIdMiddleware::new();
        if self.trace_id.generate_missing {
            stage = stage.generate_missing();
        }
        if self.trace_id.echo_response_header {
            stage = stage.echo_response_header();
        }
        stage
    }

    /// Builds the JSON responder.
    pub fn json_responder(&self) -> JsonResponder {
        JsonResponder::new()
            .with_max_bytes(self.json.max_bytes)
            .with_service_id(self.json.service_id.clone())
    }

    /// The logging section.
    pub fn log_config(&self) -> &LogConfig {
        &self.logging
    }

    /// Starts a chain with the configured cross-cutting stages.
    ///
    /// The builder holds, in order: recover, trace id, request log, CORS
    /// (when enabled) and compression (when enabled), plus the exclusion
    /// matcher. Add enrichers and call `build` with the handler.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`exclusion_set`](Self::exclusion_set)
    /// and [`cors_middleware`](Self::cors_middleware).
    pub fn chain_builder(&self) -> Result<ChainBuilder, ConfigError> {
        let mut builder = ChainBuilder::new()
            .layer(RecoverMiddleware::new().with_responder(self.json_responder()))
            .layer(self.trace_id_middleware())
            .layer(RequestLogMiddleware::new());

        if self.cors.enabled {
            builder = builder.layer(self.cors_middleware()?);
        }
        if self.compression.enabled {
            builder = builder.layer(self.compression_middleware());
        }

        let exclusion = self.exclusion_set()?;
        if !exclusion.is_empty() {
            builder = builder.exclude(exclusion);
        }
        Ok(builder)
    }
}

/// Builder for [`ToolboxConfig`].
#[derive(Debug, Default)]
pub struct ToolboxConfigBuilder {
    exclusion: Option<ExclusionConfig>,
    trace_id: Option<TraceIdConfig>,
    cors: Option<CorsSection>,
    compression: Option<CompressionSection>,
    json: Option<JsonSection>,
    logging: Option<LogConfig>,
}

impl ToolboxConfigBuilder {
    /// Create a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the exclusion section.
    #[must_use]
    pub fn exclusion(mut self, exclusion: ExclusionConfig) -> Self {
        self.exclusion = Some(exclusion);
        self
    }

    /// Set the trace id section.
    #[must_use]
    pub fn trace_id(mut self, trace_id: TraceIdConfig) -> Self {
        self.trace_id = Some(trace_id);
        self
    }

    /// Set the CORS section.
    #[must_use]
    pub fn cors(mut self, cors: CorsSection) -> Self {
        self.cors = Some(cors);
        self
    }

    /// Set the compression section.
    #[must_use]
    pub fn compression(mut self, compression: CompressionSection) -> Self {
        self.compression = Some(compression);
        self
    }

    /// Set the JSON section.
    #[must_use]
    pub fn json(mut self, json: JsonSection) -> Self {
        self.json = Some(json);
        self
    }

    /// Set the logging section.
    #[must_use]
    pub fn logging(mut self, logging: LogConfig) -> Self {
        self.logging = Some(logging);
        self
    }

    /// Build the configuration. Unset sections use their defaults.
    #[must_use]
    pub fn build(self) -> ToolboxConfig {
        ToolboxConfig {
            exclusion: self.exclusion.unwrap_or_default(),
            trace_id: self.trace_id.unwrap_or_default(),
            cors: self.cors.unwrap_or_default(),
            compression: self.compression.unwrap_or_default(),
            json: self.json.unwrap_or_default(),
            logging: self.logging.unwrap_or_default(),
        }
    }

    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if validation fails.
    pub fn build_validated(self) -> Result<ToolboxConfig, ConfigError> {
        let config = self.build();
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ToolboxConfig::default();
        assert!(config.exclusion.paths.is_empty());
        assert!(config.cors.is_wildcard());
        assert!(config.compression.enabled);
        assert_eq!(config.json.max_bytes, 1_048_576);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_sections() {
        let config = ToolboxConfig::builder()
            .exclusion(ExclusionConfig {
                paths: vec!["/healthz".to_string()],
                ..Default::default()
            })
            .json(JsonSection {
                max_bytes: 4096,
                service_id: "orders".to_string(),
            })
            .build();

        assert_eq!(config.exclusion.paths, vec!["/healthz"]);
        assert_eq!(config.json_responder().max_bytes(), 4096);
        assert_eq!(config.json_responder().service_id(), "orders");
        assert!(config.cors.enabled);
    }

    #[test]
    fn test_validate_wildcard_with_credentials() {
        let config = ToolboxConfig::builder()
            .cors(CorsSection {
                allow_credentials: true,
                ..Default::default()
            })
            .build();

        assert!(matches!(config.validate(), Err(ConfigError::Cors(_))));
    }

    #[test]
    fn test_wildcard_with_credentials_allowed_when_cors_disabled() {
        let config = ToolboxConfig::builder()
            .cors(CorsSection {
                enabled: false,
                allow_credentials: true,
                ..Default::default()
            })
            .build();

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_compression_level() {
        let config = ToolboxConfig::builder()
            .compression(CompressionSection {
                level: 12,
                ..Default::default()
            })
            .build();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("compression.level"));
    }

    #[test]
    fn test_validate_zero_max_bytes() {
        let config = ToolboxConfig::builder()
            .json(JsonSection {
                max_bytes: 0,
                ..Default::default()
            })
            .build_validated();

        assert!(config.unwrap_err().to_string().contains("json.max_bytes"));
    }

    #[test]
    fn test_validate_bad_pattern() {
        let config = ToolboxConfig::builder()
            .exclusion(ExclusionConfig {
                pattern: Some("(unclosed".to_string()),
                ..Default::default()
            })
            .build();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("exclusion.pattern"));
    }

    #[test]
    fn test_exclusion_set_matches_configured_paths() {
        use toolbox_middleware::ExclusionMatcher;

        let config = ToolboxConfig::builder()
            .exclusion(ExclusionConfig {
                paths: vec!["/healthz".to_string()],
                prefixes: vec!["/static/".to_string()],
                pattern: Some("^/internal/v[0-9]+/ping$".to_string()),
            })
            .build();

        let set = config.exclusion_set().unwrap();
        assert!(set.skip("/healthz"));
        assert!(set.skip("/static/app.css"));
        assert!(set.skip("/internal/v2/ping"));
        assert!(!set.skip("/api/users"));
    }

    #[test]
    fn test_cors_config_mapping() {
        let config = ToolboxConfig::builder()
            .cors(CorsSection {
                allowed_origins: vec!["https://app.example.com".to_string()],
                allowed_methods: vec!["get".to_string(), "patch".to_string()],
                allow_credentials: true,
                max_age_secs: None,
                ..Default::default()
            })
            .build();

        let cors = config.cors_config();
        assert_eq!(
            cors.allowed_origins,
            AllowedOrigins::List(vec!["https://app.example.com".to_string()])
        );
        assert_eq!(cors.allowed_methods, vec!["GET", "PATCH"]);
        assert!(cors.allow_credentials);
        assert!(cors.max_age.is_none());
        assert!(config.cors_middleware().is_ok());
    }

    #[test]
    fn test_compression_middleware_mapping() {
        let config = ToolboxConfig::builder()
            .compression(CompressionSection {
                level: 9,
                min_size: 0,
                content_types: vec!["application/json".to_string()],
                ..Default::default()
            })
            .build();

        let stage = config.compression_middleware();
        assert_eq!(stage.config().level(), 9);
        assert_eq!(stage.config().min_size(), 0);
        assert!(stage.config().is_compressible(Some("application/json")));
        assert!(!stage.config().is_compressible(Some("text/html")));
    }

    #[test]
    fn test_chain_builder_stage_order() {
        let names = |config: &ToolboxConfig| {
            config
                .chain_builder()
                .unwrap()
                .build(
                    |_ctx: toolbox_core::RequestContext, _request: toolbox_core::Request| async {
                        http::Response::new(toolbox_core::body::empty())
                    },
                )
                .stage_names()
        };

        assert_eq!(
            names(&ToolboxConfig::default()),
            vec!["recover", "trace_id", "request_log", "cors", "compression"]
        );

        let mut config = ToolboxConfig::default();
        config.cors.enabled = false;
        config.compression.enabled = false;
        assert_eq!(names(&config), vec!["recover", "trace_id", "request_log"]);
    }

    #[test]
    fn test_development_preset() {
        let config = ToolboxConfig::development();
        assert_eq!(config.logging.format, toolbox_telemetry::LogFormat::Pretty);
        assert!(config.trace_id.generate_missing);
        assert!(config.trace_id.echo_response_header);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_production_preset() {
        let config = ToolboxConfig::production();
        assert_eq!(config.logging.level, "info");
        assert!(config.cors.allowed_origins.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_serialization() {
        let config = ToolboxConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[cors]"));
        assert!(toml_str.contains("[compression]"));
        assert!(toml_str.contains("[logging]"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let toml_str = r#"
            [compression]
            level = 4
            algorithm = "br"
        "#;

        let result: Result<ToolboxConfig, _> = toml::from_str(toml_str);
        assert!(result.is_err());
    }
}
