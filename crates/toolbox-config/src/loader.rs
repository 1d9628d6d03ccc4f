//! Layered configuration loader.
//!
//! Layers are merged key by key: a file that sets only `[cors]
//! allowed_origins` keeps every other value from the layers below it.
//! Tables merge recursively; arrays and scalars replace.

use std::env;
use std::fs;
use std::path::Path;

use serde_json::{Map, Value};

use crate::{ConfigError, ToolboxConfig};

/// Configuration loader with layered approach.
///
/// Layers, later ones overriding earlier ones:
/// 1. Defaults or a preset
/// 2. Configuration files and strings (TOML or JSON), in call order
/// 3. Environment variables (`PREFIX__SECTION__KEY`)
///
/// # Example
///
/// ```no_run
/// use toolbox_config::ConfigLoader;
///
/// # fn main() -> Result<(), toolbox_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_production()
///     .with_optional_file("toolbox.toml")?
///     .with_env_prefix("TOOLBOX")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigLoader {
    layered: Value,
    env_prefix: Option<String>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a loader starting from the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::from_base(&ToolboxConfig::default())
    }

    fn from_base(config: &ToolboxConfig) -> Self {
        Self {
            layered: serde_json::to_value(config).unwrap_or(Value::Object(Map::new())),
            env_prefix: None,
        }
    }

    /// Reset the base layer to the defaults.
    #[must_use]
    pub fn with_defaults(self) -> Self {
        self.with_base(&ToolboxConfig::default())
    }

    /// Reset the base layer to [`ToolboxConfig::development`].
    ///
    /// # Example
    ///
    /// ```
    /// use toolbox_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new().with_development().load().unwrap();
    /// assert_eq!(config.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn with_development(self) -> Self {
        self.with_base(&ToolboxConfig::development())
    }

    /// Reset the base layer to [`ToolboxConfig::production`].
    #[must_use]
    pub fn with_production(self) -> Self {
        self.with_base(&ToolboxConfig::production())
    }

    fn with_base(self, config: &ToolboxConfig) -> Self {
        Self {
            env_prefix: self.env_prefix,
            ..Self::from_base(config)
        }
    }

    /// Merge a configuration file. The format comes from the extension
    /// (`.toml` or `.json`).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file is missing, unreadable, not valid
    /// TOML/JSON, or has an unsupported extension.
    pub fn with_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;

        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| ConfigError::UnsupportedFormat(path.display().to_string()))?;

        self.with_string(&content, format)
    }

    /// Merge a configuration file if it exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be merged.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Merge configuration from a string in `format` (`"toml"` or `"json"`).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if parsing fails or the format is unknown.
    ///
    /// # Example
    ///
    /// ```
    /// use toolbox_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string("[json]\nmax_bytes = 4096", "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.json.max_bytes, 4096);
    /// assert!(config.cors.enabled);
    /// ```
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        let layer: Value = match format.to_lowercase().as_str() {
            "toml" => toml::from_str(content)?,
            "json" => serde_json::from_str(content)?,
            other => return Err(ConfigError::UnsupportedFormat(other.to_string())),
        };

        merge(&mut self.layered, layer);
        Ok(self)
    }

    /// Read overrides from environment variables named
    /// `PREFIX__SECTION__KEY`, e.g. `TOOLBOX__CORS__ALLOW_CREDENTIALS=true`.
    ///
    /// List values are comma-separated. Variables that name no known key
    /// are ignored.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Apply environment overrides, deserialize and validate.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an environment value does not parse, the
    /// merged layers do not match the schema, or validation fails.
    pub fn load(self) -> Result<ToolboxConfig, ConfigError> {
        let config = self.load_unvalidated()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides and deserialize, without validation.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an environment value does not parse or the
    /// merged layers do not match the schema.
    pub fn load_unvalidated(mut self) -> Result<ToolboxConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            self.apply_env_vars(&prefix, env::vars())?;
        }

        Ok(serde_path_to_error::deserialize(self.layered)?)
    }

    fn apply_env_vars<I>(&mut self, prefix: &str, vars: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            if key.starts_with(prefix) {
                self.apply_env_var(&key, &value, prefix)?;
            }
        }
        Ok(())
    }

    // Apply a single environment variable
    fn apply_env_var(&mut self, key: &str, value: &str, prefix: &str) -> Result<(), ConfigError> {
        let Some(rest) = key.strip_prefix(prefix).and_then(|k| k.strip_prefix("__")) else {
            return Ok(());
        };
        let parts: Vec<&str> = rest.split("__").collect();
        let [section, field] = parts.as_slice() else {
            return Ok(());
        };

        let parsed = match (*section, *field) {
            ("EXCLUSION", "PATHS" | "PREFIXES")
            | ("CORS", "ALLOWED_ORIGINS" | "ALLOWED_METHODS" | "ALLOWED_HEADERS" | "EXPOSE_HEADERS")
            | ("COMPRESSION", "CONTENT_TYPES") => parse_list(value),

            ("EXCLUSION", "PATTERN") | ("CORS", "MAX_AGE_SECS") if is_none(value) => Value::Null,
            ("EXCLUSION", "PATTERN")
            | ("JSON", "SERVICE_ID")
            | ("LOGGING", "LEVEL" | "SERVICE_NAME") => Value::String(value.to_string()),
            ("LOGGING", "FORMAT") => Value::String(value.to_lowercase()),

            ("TRACE_ID", "GENERATE_MISSING" | "ECHO_RESPONSE_HEADER")
            | ("CORS", "ENABLED" | "ALLOW_CREDENTIALS" | "OPTIONS_PASSTHROUGH")
            | ("COMPRESSION", "ENABLED")
            | (
                "LOGGING",
                "ENABLED" | "SPAN_EVENTS" | "FILE_LINE_INFO" | "THREAD_IDS" | "INCLUDE_TARGET"
                | "ANSI" | "RESPECT_RUST_LOG",
            ) => Value::Bool(
                parse_bool(value)
                    .ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))?,
            ),

            ("CORS", "MAX_AGE_SECS")
            | ("COMPRESSION", "LEVEL" | "MIN_SIZE")
            | ("JSON", "MAX_BYTES") => Value::from(
                value
                    .parse::<u64>()
                    .map_err(|_| ConfigError::env_parse_error(key, "expected integer"))?,
            ),

            // Unknown key - ignore
            _ => return Ok(()),
        };

        let section = section.to_lowercase();
        let field = field.to_lowercase();
        if let Value::Object(root) = &mut self.layered {
            let entry = root
                .entry(section)
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(table) = entry {
                table.insert(field, parsed);
            }
        }
        Ok(())
    }
}

/// Merge `overlay` into `base`. Objects merge per key; anything else replaces.
fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Split a comma-separated list, dropping empty items.
fn parse_list(s: &str) -> Value {
    Value::Array(
        s.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| Value::String(item.to_string()))
            .collect(),
    )
}

fn is_none(s: &str) -> bool {
    s.is_empty() || s.eq_ignore_ascii_case("none")
}

/// Parse a boolean from a string.
fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
