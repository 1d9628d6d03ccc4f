//! Structured logging for toolbox services.
//!
//! Every stage in `toolbox-middleware` reports through [`tracing`]. This
//! crate installs the subscriber those events go to:
//!
//! - JSON lines for production, or pretty / compact text for development
//! - Level and per-target filtering through [`EnvFilter`](tracing_subscriber::EnvFilter) directives
//! - Standard field names in [`logging::fields`] so log queries stay stable
//!
//! # Example
//!
//! ```rust,no_run
//! use toolbox_telemetry::logging::{init_logging, LogConfig};
//!
//! # fn main() -> toolbox_telemetry::TelemetryResult<()> {
//! init_logging(&LogConfig::production().with_service_name("orders"))?;
//!
//! tracing::info!(trace_id = "req-1", "service started");
//! # Ok(())
//! # }
//! ```

#![doc(html_root_url = "https://docs.rs/toolbox-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod logging;

pub use error::TelemetryError;
pub use logging::{init_logging, LogConfig, LogFormat};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
