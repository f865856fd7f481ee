//! Template engine configuration.
//!
//! # Defaults
//!
//! ```rust
//! use sqlweave_core::{MarkerStyle, TemplateConfig};
//!
//! let config = TemplateConfig::default();
//! assert_eq!(config.placeholder_open, "{{");
//! assert_eq!(config.inline_open, "${");
//! assert_eq!(config.marker_style, MarkerStyle::Question);
//! ```
//!
//! # Environment
//!
//! ```rust
//! use sqlweave_core::{MapEnvSource, MarkerStyle, TemplateConfig};
//!
//! let env = MapEnvSource::new().set("SQLWEAVE_MARKER_STYLE", "dollar");
//! let config = TemplateConfig::from_source(&env).unwrap();
//! assert_eq!(config.marker_style, MarkerStyle::Dollar);
//! ```

use crate::error::{MapperError, MapperResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Source for environment variables.
pub trait EnvSource: Send + Sync {
    /// Get an environment variable value.
    fn get(&self, name: &str) -> Option<String>;

    /// Check if a variable exists.
    fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

/// Default environment source using std::env.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdEnvSource;

impl EnvSource for StdEnvSource {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// Environment source backed by a HashMap.
#[derive(Debug, Clone, Default)]
pub struct MapEnvSource {
    vars: HashMap<String, String>,
}

impl MapEnvSource {
    /// Create a new map-based environment source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variable.
    pub fn set(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    /// Add multiple variables.
    pub fn with_vars(mut self, vars: HashMap<String, String>) -> Self {
        self.vars.extend(vars);
        self
    }
}

impl EnvSource for MapEnvSource {
    fn get(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }
}

/// Positional marker written in place of each placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerStyle {
    /// `?` for every parameter (JDBC, MySQL, SQLite).
    #[default]
    Question,
    /// `$1`, `$2`, ... (PostgreSQL).
    Dollar,
}

impl MarkerStyle {
    /// Get the marker for the 1-based parameter index.
    pub fn marker(&self, index: usize) -> String {
        match self {
            Self::Question => "?".to_string(),
            Self::Dollar => format!("${}", index),
        }
    }

    /// Parse a style name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "question" | "?" | "mysql" | "sqlite" => Some(Self::Question),
            "dollar" | "$" | "postgres" | "postgresql" => Some(Self::Dollar),
            _ => None,
        }
    }
}

/// Configuration for template resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    /// Opening delimiter of placeholder expressions.
    pub placeholder_open: String,
    /// Closing delimiter of placeholder expressions.
    pub placeholder_close: String,
    /// Opening delimiter of inline splice expressions.
    pub inline_open: String,
    /// Closing delimiter of inline splice expressions.
    pub inline_close: String,
    /// Positional marker style.
    pub marker_style: MarkerStyle,
    /// Prefix of the unique aliases generated for iteration variables.
    pub iteration_prefix: String,
    /// Database identifier exposed to templates as `_databaseId`.
    pub database_id: Option<String>,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            placeholder_open: "{{".to_string(),
            placeholder_close: "}}".to_string(),
            inline_open: "${".to_string(),
            inline_close: "}".to_string(),
            marker_style: MarkerStyle::Question,
            iteration_prefix: "__frch_".to_string(),
            database_id: None,
        }
    }
}

impl TemplateConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the placeholder delimiters.
    pub fn with_placeholder(mut self, open: impl Into<String>, close: impl Into<String>) -> Self {
        self.placeholder_open = open.into();
        self.placeholder_close = close.into();
        self
    }

    /// Set the inline splice delimiters.
    pub fn with_inline(mut self, open: impl Into<String>, close: impl Into<String>) -> Self {
        self.inline_open = open.into();
        self.inline_close = close.into();
        self
    }

    /// Set the marker style.
    pub fn with_marker_style(mut self, style: MarkerStyle) -> Self {
        self.marker_style = style;
        self
    }

    /// Set the iteration alias prefix.
    pub fn with_iteration_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.iteration_prefix = prefix.into();
        self
    }

    /// Set the database identifier.
    pub fn with_database_id(mut self, id: impl Into<String>) -> Self {
        self.database_id = Some(id.into());
        self
    }

    /// Load configuration from the process environment.
    pub fn from_env() -> MapperResult<Self> {
        Self::from_source(&StdEnvSource)
    }

    /// Load configuration from an environment source.
    ///
    /// Recognized variables: `SQLWEAVE_MARKER_STYLE`, `SQLWEAVE_PLACEHOLDER_OPEN`,
    /// `SQLWEAVE_PLACEHOLDER_CLOSE`, `SQLWEAVE_INLINE_OPEN`, `SQLWEAVE_INLINE_CLOSE`,
    /// `SQLWEAVE_DATABASE_ID`.
    pub fn from_source(source: &impl EnvSource) -> MapperResult<Self> {
        let mut config = Self::default();

        if let Some(style) = source.get("SQLWEAVE_MARKER_STYLE") {
            config.marker_style = MarkerStyle::from_name(&style).ok_or_else(|| {
                MapperError::invalid_config(format!("Unknown marker style '{}'", style))
                    .with_suggestion("Use 'question' or 'dollar'")
            })?;
        }
        if let Some(open) = source.get("SQLWEAVE_PLACEHOLDER_OPEN") {
            config.placeholder_open = open;
        }
        if let Some(close) = source.get("SQLWEAVE_PLACEHOLDER_CLOSE") {
            config.placeholder_close = close;
        }
        if let Some(open) = source.get("SQLWEAVE_INLINE_OPEN") {
            config.inline_open = open;
        }
        if let Some(close) = source.get("SQLWEAVE_INLINE_CLOSE") {
            config.inline_close = close;
        }
        if let Some(id) = source.get("SQLWEAVE_DATABASE_ID") {
            config.database_id = Some(id);
        }

        config.validate()?;

        debug!(
            marker_style = ?config.marker_style,
            placeholder_open = %config.placeholder_open,
            inline_open = %config.inline_open,
            "TemplateConfig loaded from environment"
        );

        Ok(config)
    }

    /// Validate the delimiters.
    pub fn validate(&self) -> MapperResult<()> {
        let delimiters = [
            ("placeholder_open", &self.placeholder_open),
            ("placeholder_close", &self.placeholder_close),
            ("inline_open", &self.inline_open),
            ("inline_close", &self.inline_close),
        ];
        for (name, value) in delimiters {
            if value.is_empty() {
                return Err(MapperError::invalid_config(format!("{} must not be empty", name)));
            }
        }
        if self.placeholder_open.starts_with(self.inline_open.as_str())
            || self.inline_open.starts_with(self.placeholder_open.as_str())
        {
            return Err(MapperError::invalid_config(format!(
                "Placeholder opener '{}' and inline opener '{}' must not share a prefix",
                self.placeholder_open, self.inline_open
            ))
            .with_help("Inline splices and placeholders are resolved in separate stages"));
        }
        if self.iteration_prefix.is_empty() {
            return Err(MapperError::invalid_config("iteration_prefix must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_style() {
        assert_eq!(MarkerStyle::Question.marker(1), "?");
        assert_eq!(MarkerStyle::Question.marker(5), "?");
        assert_eq!(MarkerStyle::Dollar.marker(1), "$1");
        assert_eq!(MarkerStyle::Dollar.marker(5), "$5");
    }

    #[test]
    fn test_marker_style_from_name() {
        assert_eq!(MarkerStyle::from_name("Postgres"), Some(MarkerStyle::Dollar));
        assert_eq!(MarkerStyle::from_name("?"), Some(MarkerStyle::Question));
        assert_eq!(MarkerStyle::from_name("colon"), None);
    }

    #[test]
    fn test_from_source() {
        let env = MapEnvSource::new()
            .set("SQLWEAVE_PLACEHOLDER_OPEN", "#{")
            .set("SQLWEAVE_PLACEHOLDER_CLOSE", "}")
            .set("SQLWEAVE_DATABASE_ID", "postgres");

        let config = TemplateConfig::from_source(&env).unwrap();
        assert_eq!(config.placeholder_open, "#{");
        assert_eq!(config.placeholder_close, "}");
        assert_eq!(config.database_id.as_deref(), Some("postgres"));
    }

    #[test]
    fn test_from_source_rejects_unknown_style() {
        let env = MapEnvSource::new().set("SQLWEAVE_MARKER_STYLE", "colon");
        let err = TemplateConfig::from_source(&env).unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_validate_rejects_shared_delimiters() {
        let config = TemplateConfig::new().with_placeholder("${", "}");
        assert!(config.validate().is_err());

        let config = TemplateConfig::new().with_inline("", "}");
        assert!(config.validate().is_err());

        let config = TemplateConfig::new().with_inline("{", "}");
        assert!(config.validate().is_err());

        let config = TemplateConfig::new().with_placeholder("$", "$");
        assert!(config.validate().is_err());

        assert!(TemplateConfig::default().validate().is_ok());
    }
}
