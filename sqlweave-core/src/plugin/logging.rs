//! Logging interceptor for executed statements.

use super::interceptor::Interceptor;
use super::invocation::{Invocation, Reply};
use super::kind::{ComponentError, ComponentResult};
use super::signature::Signature;
use crate::scripting::ResolvedQuery;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Log level for statement logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    /// Log nothing.
    Off,
    /// Log only errors.
    Error,
    /// Log errors and warnings (slow statements).
    Warn,
    /// Log all statements.
    #[default]
    Info,
    /// Log statements before execution.
    Debug,
    /// Log everything including bound parameters.
    Trace,
}

/// Configuration for the logging interceptor.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Minimum log level.
    pub level: LogLevel,
    /// Threshold for slow statement warnings (microseconds).
    pub slow_query_threshold_us: u64,
    /// Whether to log parameter descriptors.
    pub log_params: bool,
    /// Maximum length of logged text (0 = unlimited).
    pub max_sql_length: usize,
    /// Prefix for log messages.
    pub prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            slow_query_threshold_us: 1_000_000, // 1 second
            log_params: false,
            max_sql_length: 500,
            prefix: "sqlweave".to_string(),
        }
    }
}

/// Interceptor that logs `Executor::update` and `Executor::query` calls.
///
/// # Example
///
/// ```rust
/// use sqlweave_core::plugin::{InterceptorChain, LogLevel, LoggingInterceptor};
///
/// let logging = LoggingInterceptor::new()
///     .with_level(LogLevel::Debug)
///     .with_params(true)
///     .with_slow_threshold(500_000); // 500ms
///
/// let mut chain = InterceptorChain::new();
/// chain.register(logging);
/// ```
#[derive(Debug)]
pub struct LoggingInterceptor {
    config: LoggingConfig,
    call_count: AtomicU64,
}

impl LoggingInterceptor {
    /// Create a new logging interceptor with default settings.
    pub fn new() -> Self {
        Self::with_config(LoggingConfig::default())
    }

    /// Create with custom configuration.
    pub fn with_config(config: LoggingConfig) -> Self {
        Self {
            config,
            call_count: AtomicU64::new(0),
        }
    }

    /// Set the log level.
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.config.level = level;
        self
    }

    /// Enable parameter logging.
    pub fn with_params(mut self, enabled: bool) -> Self {
        self.config.log_params = enabled;
        self
    }

    /// Set slow statement threshold in microseconds.
    pub fn with_slow_threshold(mut self, threshold_us: u64) -> Self {
        self.config.slow_query_threshold_us = threshold_us;
        self
    }

    /// Set the log prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.prefix = prefix.into();
        self
    }

    /// Get the number of intercepted calls.
    pub fn call_count(&self) -> u64 {
        self.call_count.load(Ordering::Relaxed)
    }

    fn truncate_sql(&self, sql: &str) -> String {
        let max = self.config.max_sql_length;
        if max == 0 || sql.len() <= max {
            return sql.to_string();
        }
        let mut end = max;
        while !sql.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &sql[..end])
    }

    fn log_before(&self, invocation: &Invocation, query: Option<&ResolvedQuery>, call_id: u64) {
        if self.config.level < LogLevel::Debug {
            return;
        }

        let sql = query.map(|q| self.truncate_sql(q.text())).unwrap_or_default();

        if self.config.log_params && self.config.level >= LogLevel::Trace {
            let params: Vec<&str> = query
                .map(|q| q.parameters().iter().map(|p| p.expression.as_str()).collect())
                .unwrap_or_default();
            tracing::debug!(
                target: "sqlweave::statement",
                call_id = call_id,
                operation = %invocation.operation(),
                sql = %sql,
                params = ?params,
                "[{}] Starting statement",
                self.config.prefix
            );
        } else {
            tracing::debug!(
                target: "sqlweave::statement",
                call_id = call_id,
                operation = %invocation.operation(),
                sql = %sql,
                "[{}] Starting statement",
                self.config.prefix
            );
        }
    }

    fn log_after(&self, sql: &str, reply: &Reply, call_id: u64, duration_us: u64) {
        let is_slow = duration_us >= self.config.slow_query_threshold_us;

        if is_slow && self.config.level >= LogLevel::Warn {
            tracing::warn!(
                target: "sqlweave::statement",
                call_id = call_id,
                duration_us = duration_us,
                duration_ms = duration_us / 1000,
                sql = %self.truncate_sql(sql),
                threshold_us = self.config.slow_query_threshold_us,
                "[{}] Slow statement detected",
                self.config.prefix
            );
        } else if self.config.level >= LogLevel::Info {
            let (rows_affected, rows_returned) = match reply {
                Reply::Count(n) => (Some(*n), None),
                Reply::Rows(rows) => (None, Some(rows.len())),
                _ => (None, None),
            };
            tracing::info!(
                target: "sqlweave::statement",
                call_id = call_id,
                duration_us = duration_us,
                rows_affected = ?rows_affected,
                rows_returned = ?rows_returned,
                "[{}] Statement completed",
                self.config.prefix
            );
        }
    }

    fn log_error(&self, sql: &str, error: &ComponentError, call_id: u64) {
        if self.config.level >= LogLevel::Error {
            tracing::error!(
                target: "sqlweave::statement",
                call_id = call_id,
                sql = %self.truncate_sql(sql),
                error = %error,
                "[{}] Statement failed",
                self.config.prefix
            );
        }
    }
}

impl Default for LoggingInterceptor {
    fn default() -> Self {
        Self::new()
    }
}

impl Interceptor for LoggingInterceptor {
    fn signatures(&self) -> Vec<Signature> {
        vec![Signature::executor("update"), Signature::executor("query")]
    }

    fn intercept(&self, invocation: Invocation) -> ComponentResult<Reply> {
        let call_id = self.call_count.fetch_add(1, Ordering::SeqCst);
        let sql = invocation.query().map(|q| q.text().to_string()).unwrap_or_default();

        self.log_before(&invocation, invocation.query(), call_id);

        let start = Instant::now();
        let result = invocation.proceed();
        let duration_us = start.elapsed().as_micros() as u64;

        match &result {
            Ok(reply) => self.log_after(&sql, reply, call_id, duration_us),
            Err(error) => self.log_error(&sql, error, call_id),
        }

        result
    }

    fn name(&self) -> &'static str {
        "LoggingInterceptor"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Off < LogLevel::Error);
        assert!(LogLevel::Error < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Debug);
        assert!(LogLevel::Debug < LogLevel::Trace);
        assert_eq!(LogLevel::default(), LogLevel::Info);
    }

    #[test]
    fn test_logging_interceptor_builder() {
        let interceptor = LoggingInterceptor::new()
            .with_level(LogLevel::Debug)
            .with_params(true)
            .with_slow_threshold(500_000)
            .with_prefix("app");

        assert_eq!(interceptor.config.level, LogLevel::Debug);
        assert!(interceptor.config.log_params);
        assert_eq!(interceptor.config.slow_query_threshold_us, 500_000);
        assert_eq!(interceptor.config.prefix, "app");
    }

    #[test]
    fn test_truncate_sql() {
        let interceptor = LoggingInterceptor::new();

        let short = "SELECT * FROM users";
        assert_eq!(interceptor.truncate_sql(short), short);

        let config = LoggingConfig {
            max_sql_length: 10,
            ..Default::default()
        };
        let interceptor = LoggingInterceptor::with_config(config);
        let long = "SELECT * FROM users WHERE id = ?";
        assert_eq!(interceptor.truncate_sql(long), "SELECT * F...");

        let multibyte = "SELECT 'ééééééé'";
        assert!(interceptor.truncate_sql(multibyte).ends_with("..."));
    }

    #[test]
    fn test_signatures() {
        let signatures = LoggingInterceptor::new().signatures();
        assert_eq!(signatures.len(), 2);
        assert_eq!(LoggingInterceptor::new().call_count(), 0);
    }
}
