//! Logging setup.
//!
//! sqlweave emits `tracing` events and installs no subscriber unless asked
//! to. [`init`] reads its settings from the environment:
//!
//! - `SQLWEAVE_DEBUG=true|1|yes` turns on debug output, including the
//!   per-node and per-wrap events of [`weave_debug!`](crate::weave_debug)
//!   and [`weave_trace!`](crate::weave_trace)
//! - `SQLWEAVE_LOG_LEVEL=trace|debug|info|warn|error` sets the level
//! - `SQLWEAVE_LOG_FORMAT=json|pretty|compact` sets the output format
//!   (default: json)
//!
//! ```rust,no_run
//! use sqlweave_core::logging::{self, LogFormat, LogSettings};
//!
//! // From the environment
//! logging::init();
//!
//! // Or explicitly
//! logging::init_with(LogSettings {
//!     debug: true,
//!     level: None,
//!     format: LogFormat::Pretty,
//! });
//! ```

use crate::config::{EnvSource, StdEnvSource};
use std::str::FromStr;
use std::sync::{Once, OnceLock};
use tracing::Level;

static INIT: Once = Once::new();
static DEBUG: OnceLock<bool> = OnceLock::new();

/// Output format of the installed subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per event.
    #[default]
    Json,
    /// Multi-line human readable output.
    Pretty,
    /// Single-line human readable output.
    Compact,
}

impl LogFormat {
    /// Parse a format name, ignoring case.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "pretty" => Some(Self::Pretty),
            "compact" => Some(Self::Compact),
            _ => None,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LogSettings {
    /// Verbose debugging, from `SQLWEAVE_DEBUG`.
    pub debug: bool,
    /// Explicit level, from `SQLWEAVE_LOG_LEVEL`.
    pub level: Option<Level>,
    /// Output format, from `SQLWEAVE_LOG_FORMAT`.
    pub format: LogFormat,
}

impl LogSettings {
    /// Read settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_source(&StdEnvSource)
    }

    /// Read settings from an environment source.
    ///
    /// Unrecognized levels and formats fall back to the defaults.
    pub fn from_source(source: &impl EnvSource) -> Self {
        let debug = source
            .get("SQLWEAVE_DEBUG")
            .is_some_and(|v| matches!(v.trim().to_lowercase().as_str(), "true" | "1" | "yes"));
        let level = source
            .get("SQLWEAVE_LOG_LEVEL")
            .and_then(|level| Level::from_str(level.trim()).ok());
        let format = source
            .get("SQLWEAVE_LOG_FORMAT")
            .and_then(|format| LogFormat::from_name(&format))
            .unwrap_or_default();

        Self { debug, level, format }
    }

    /// Whether a subscriber should be installed.
    pub fn is_enabled(&self) -> bool {
        self.debug || self.level.is_some()
    }

    /// The explicit level, else `debug` when debugging, else `warn`.
    pub fn effective_level(&self) -> Level {
        match (self.level, self.debug) {
            (Some(level), _) => level,
            (None, true) => Level::DEBUG,
            (None, false) => Level::WARN,
        }
    }

    /// Filter directive covering both sqlweave crates.
    pub fn filter_directive(&self) -> String {
        let level = self.effective_level().as_str().to_lowercase();
        format!("sqlweave={},sqlweave_core={}", level, level)
    }
}

/// Check whether verbose debugging is on.
///
/// Set by [`init_with`], or read from `SQLWEAVE_DEBUG` on first use.
#[inline]
pub fn is_debug_enabled() -> bool {
    *DEBUG.get_or_init(|| LogSettings::from_env().debug)
}

/// Install a subscriber configured from the environment.
pub fn init() {
    init_with(LogSettings::from_env());
}

/// Install a subscriber with explicit settings.
///
/// Only the first call in a process has an effect. Nothing is installed
/// when the settings are not [enabled](LogSettings::is_enabled), when the
/// application already set a global subscriber, or without the
/// `tracing-subscriber` feature.
pub fn init_with(settings: LogSettings) {
    INIT.call_once(|| {
        let _ = DEBUG.set(settings.debug);
        if !settings.is_enabled() {
            return;
        }

        #[cfg(feature = "tracing-subscriber")]
        {
            use tracing_subscriber::{EnvFilter, fmt, prelude::*};

            let filter = EnvFilter::try_new(settings.filter_directive())
                .unwrap_or_else(|_| EnvFilter::new("warn"));
            let registry = tracing_subscriber::registry().with(filter);

            let installed = match settings.format {
                LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
                LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init(),
                LogFormat::Compact => registry.with(fmt::layer().compact()).try_init(),
            };

            if installed.is_ok() {
                tracing::info!(
                    level = %settings.effective_level(),
                    format = ?settings.format,
                    "sqlweave logging initialized"
                );
            }
        }
    });
}

/// Debug event emitted only when [`is_debug_enabled`] is on.
#[macro_export]
macro_rules! weave_debug {
    ($($arg:tt)*) => {
        if $crate::logging::is_debug_enabled() {
            tracing::debug!($($arg)*);
        }
    };
}

/// Trace event emitted only when [`is_debug_enabled`] is on.
#[macro_export]
macro_rules! weave_trace {
    ($($arg:tt)*) => {
        if $crate::logging::is_debug_enabled() {
            tracing::trace!($($arg)*);
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MapEnvSource;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let settings = LogSettings::from_source(&MapEnvSource::new());
        assert_eq!(settings, LogSettings::default());
        assert!(!settings.is_enabled());
        assert_eq!(settings.effective_level(), Level::WARN);
    }

    #[test]
    fn test_debug_flag() {
        for value in ["true", "1", "YES"] {
            let env = MapEnvSource::new().set("SQLWEAVE_DEBUG", value);
            let settings = LogSettings::from_source(&env);
            assert!(settings.debug, "value: {}", value);
            assert_eq!(settings.effective_level(), Level::DEBUG);
        }

        let env = MapEnvSource::new().set("SQLWEAVE_DEBUG", "off");
        assert!(!LogSettings::from_source(&env).debug);
    }

    #[test]
    fn test_level_and_format() {
        let env = MapEnvSource::new()
            .set("SQLWEAVE_DEBUG", "true")
            .set("SQLWEAVE_LOG_LEVEL", "trace")
            .set("SQLWEAVE_LOG_FORMAT", "Compact");
        let settings = LogSettings::from_source(&env);

        assert!(settings.is_enabled());
        assert_eq!(settings.level, Some(Level::TRACE));
        assert_eq!(settings.format, LogFormat::Compact);
        assert_eq!(settings.filter_directive(), "sqlweave=trace,sqlweave_core=trace");
    }

    #[test]
    fn test_unknown_values_fall_back() {
        let env = MapEnvSource::new()
            .set("SQLWEAVE_LOG_LEVEL", "loud")
            .set("SQLWEAVE_LOG_FORMAT", "xml");
        let settings = LogSettings::from_source(&env);

        assert_eq!(settings.level, None);
        assert_eq!(settings.format, LogFormat::Json);
        assert!(!settings.is_enabled());
    }
}
