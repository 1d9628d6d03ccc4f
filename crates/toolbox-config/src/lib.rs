//! Typed configuration for toolbox services.
//!
//! - TOML and JSON configuration files
//! - Environment variable overrides
//! - Strict schema (unknown keys are errors, reported with their path)
//! - Layered loading (defaults or preset → files → env), merged per key
//!
//! [`ToolboxConfig`] turns the loaded sections into stage objects:
//! [`exclusion_set`](ToolboxConfig::exclusion_set),
//! [`cors_middleware`](ToolboxConfig::cors_middleware),
//! [`compression_middleware`](ToolboxConfig::compression_middleware),
//! [`json_responder`](ToolboxConfig::json_responder) and
//! [`log_config`](ToolboxConfig::log_config), or all of the cross-cutting
//! ones at once through [`chain_builder`](ToolboxConfig::chain_builder).
//!
//! # Configuration File Format
//!
//! ```toml
//! [exclusion]
//! paths = ["/healthz", "/readyz"]
//! prefixes = ["/static/"]
//!
//! [trace_id]
//! generate_missing = true
//!
//! [cors]
//! allowed_origins = ["https://app.example.com"]
//! allow_credentials = true
//! max_age_secs = 600
//!
//! [compression]
//! level = 6
//! min_size = 1024
//!
//! [json]
//! max_bytes = 1048576
//! service_id = "orders"
//!
//! [logging]
//! level = "info,toolbox_middleware=debug"
//! format = "json"
//! ```
//!
//! # Environment Variable Overrides
//!
//! With `with_env_prefix("TOOLBOX")`:
//!
//! - `TOOLBOX__CORS__ALLOWED_ORIGINS=https://a.example,https://b.example`
//! - `TOOLBOX__COMPRESSION__ENABLED=false`
//! - `TOOLBOX__LOGGING__LEVEL=debug`

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::{ToolboxConfig, ToolboxConfigBuilder};
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;
