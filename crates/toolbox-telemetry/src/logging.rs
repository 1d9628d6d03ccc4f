//! Logging subscriber setup.
//!
//! [`init_logging`] installs a global `tracing-subscriber` registry with a
//! single formatting layer. The layer is filtered by the directives in
//! [`LogConfig::level`], which accept anything [`EnvFilter`] accepts:
//!
//! ```text
//! info
//! warn,toolbox_middleware=debug
//! ```
//!
//! When `RUST_LOG` is set and [`LogConfig::respect_rust_log`] is on, the
//! environment wins over the configured level.

use crate::error::TelemetryError;
use crate::TelemetryResult;
use serde::{Deserialize, Serialize};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Output format of the log layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per event.
    #[default]
    Json,
    /// Multi-line, human readable.
    Pretty,
    /// Single-line text.
    Compact,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// Whether logging is enabled. When false, [`init_logging`] is a no-op.
    pub enabled: bool,

    /// Filter directives (e.g. `"info"` or `"warn,toolbox_middleware=debug"`).
    pub level: String,

    /// Output format.
    pub format: LogFormat,

    /// Emit span open/close events.
    pub span_events: bool,

    /// Include source file and line.
    pub file_line_info: bool,

    /// Include thread ids.
    pub thread_ids: bool,

    /// Include the event target (module path).
    pub include_target: bool,

    /// ANSI colors for text formats.
    pub ansi: bool,

    /// Let `RUST_LOG` override [`level`](Self::level).
    pub respect_rust_log: bool,

    /// Service name, logged when the subscriber starts.
    pub service_name: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            format: LogFormat::Json,
            span_events: false,
            file_line_info: false,
            thread_ids: false,
            include_target: true,
            ansi: false,
            respect_rust_log: true,
            service_name: "toolbox".to_string(),
        }
    }
}

impl LogConfig {
    /// Human-readable output at `debug`, with span events and source locations.
    #[must_use]
    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            format: LogFormat::Pretty,
            span_events: true,
            file_line_info: true,
            ansi: true,
            ..Self::default()
        }
    }

    /// JSON output at `info`.
    #[must_use]
    pub fn production() -> Self {
        Self::default()
    }

    /// Sets the filter directives.
    #[must_use]
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// Sets the service name.
    #[must_use]
    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    /// Sets the output format.
    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Checks that the filter directives parse.
    pub fn validate(&self) -> TelemetryResult<()> {
        create_env_filter(&self.level).map(|_| ())
    }

    fn filter(&self) -> TelemetryResult<EnvFilter> {
        if self.respect_rust_log {
            if let Ok(filter) = EnvFilter::try_from_default_env() {
                return Ok(filter);
            }
        }
        create_env_filter(&self.level)
    }

    fn fmt_span(&self) -> FmtSpan {
        if self.span_events {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        }
    }
}

/// Installs the global logging subscriber.
///
/// Returns `Ok(())` without doing anything when logging is disabled.
///
/// # Errors
///
/// - [`TelemetryError::InvalidFilter`] if the level directives do not parse
/// - [`TelemetryError::LoggingInit`] if a global subscriber is already set
pub fn init_logging(config: &LogConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let filter = config.filter()?;
    let base = tracing_subscriber::fmt::layer()
        .with_span_events(config.fmt_span())
        .with_file(config.file_line_info)
        .with_line_number(config.file_line_info)
        .with_thread_ids(config.thread_ids)
        .with_target(config.include_target);

    let layer = match config.format {
        LogFormat::Json => base.json().with_filter(filter).boxed(),
        LogFormat::Pretty => base.pretty().with_ansi(config.ansi).with_filter(filter).boxed(),
        LogFormat::Compact => base.compact().with_ansi(config.ansi).with_filter(filter).boxed(),
    };

    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;

    tracing::debug!(
        service.name = %config.service_name,
        format = ?config.format,
        "logging initialized"
    );
    Ok(())
}

/// Parses filter directives into an [`EnvFilter`].
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidFilter`] naming the directive.
pub fn create_env_filter(directives: &str) -> TelemetryResult<EnvFilter> {
    EnvFilter::try_new(directives).map_err(|e| TelemetryError::InvalidFilter {
        directive: directives.to_string(),
        reason: e.to_string(),
    })
}

/// Standard log field names.
///
/// The built-in stages log with these names; use them in handlers too so
/// one query finds every event for a request.
pub mod fields {
    /// Trace id bound by the trace id stage.
    pub const TRACE_ID: &str = "trace_id";

    /// HTTP method.
    pub const HTTP_METHOD: &str = "http.method";

    /// Request path.
    pub const HTTP_PATH: &str = "http.path";

    /// Response status code.
    pub const HTTP_STATUS: &str = "http.status_code";

    /// Response body size in bytes, when known.
    pub const HTTP_RESPONSE_SIZE: &str = "http.response_size";

    /// Handling time in milliseconds.
    pub const DURATION_MS: &str = "duration_ms";

    /// Error or panic message.
    pub const ERROR: &str = "error";

    /// Authenticated subject.
    pub const SUB: &str = "sub";

    /// Service name.
    pub const SERVICE_NAME: &str = "service.name";
}
