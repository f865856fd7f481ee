//! Error types for template resolution and interceptor setup.
//!
//! Every failure raised by this crate is a [`MapperError`] carrying:
//! - An error code for programmatic handling
//! - Actionable suggestions for fixing the problem
//! - Context about the expression, template span or component involved
//!
//! # Error Codes
//!
//! Error codes follow a pattern: W{category}{number}
//! - 1xxx: Configuration errors (interceptor declarations, template config)
//! - 2xxx: Binding errors (unresolvable paths, non-iterable collections)
//! - 3xxx: Template errors (syntax, expressions, placeholder attributes)
//! - 4xxx: Invocation errors (reply/argument shape, missing capability)
//!
//! ```rust
//! use sqlweave_core::{ErrorCode, MapperError};
//!
//! let err = MapperError::binding_resolution("user.email");
//! assert_eq!(err.code, ErrorCode::BindingResolution);
//! assert_eq!(err.code.code(), "W2001");
//! assert!(err.to_string().contains("user.email"));
//! ```
//!
//! Failures raised by intercepted components are *not* converted into
//! `MapperError`: they travel as [`ComponentError`](crate::plugin::ComponentError)
//! and reach the caller unchanged.

use std::fmt;
use thiserror::Error;

/// Result type for mapper operations.
pub type MapperResult<T> = Result<T, MapperError>;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Configuration errors (1xxx)
    /// Interceptor declares no signatures (W1001).
    NoSignatures = 1001,
    /// Signature names an operation the component kind does not have (W1002).
    UnknownOperation = 1002,
    /// Invalid template configuration (W1003).
    InvalidConfiguration = 1003,

    // Binding errors (2xxx)
    /// Binding path cannot be resolved (W2001).
    BindingResolution = 2001,
    /// Iteration collection is not iterable (W2002).
    NotIterable = 2002,

    // Template errors (3xxx)
    /// Malformed template text (W3001).
    TemplateSyntax = 3001,
    /// Malformed expression (W3002).
    InvalidExpression = 3002,
    /// Unknown placeholder attribute (W3003).
    UnknownAttribute = 3003,

    // Invocation errors (4xxx)
    /// Argument or reply does not match the operation (W4001).
    InvocationMismatch = 4001,
    /// Target does not expose the required component kind (W4002).
    MissingCapability = 4002,
}

impl ErrorCode {
    /// Get the error code string (e.g., "W2001").
    pub fn code(&self) -> String {
        format!("W{}", *self as u16)
    }

    /// Get a short description of the error code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::NoSignatures => "Interceptor declares no signatures",
            Self::UnknownOperation => "Unknown intercepted operation",
            Self::InvalidConfiguration => "Invalid configuration",
            Self::BindingResolution => "Binding path could not be resolved",
            Self::NotIterable => "Value is not iterable",
            Self::TemplateSyntax => "Template syntax error",
            Self::InvalidExpression => "Invalid expression",
            Self::UnknownAttribute => "Unknown placeholder attribute",
            Self::InvocationMismatch => "Invocation shape mismatch",
            Self::MissingCapability => "Missing component capability",
        }
    }

    /// Whether this code belongs to the configuration family.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::NoSignatures | Self::UnknownOperation | Self::InvalidConfiguration
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Suggestion for fixing an error.
#[derive(Debug, Clone)]
pub struct Suggestion {
    /// The suggestion text.
    pub text: String,
    /// Optional example.
    pub code: Option<String>,
}

impl Suggestion {
    /// Create a new suggestion.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            code: None,
        }
    }

    /// Add an example.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

/// Additional context for an error.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// Interceptor or operation involved.
    pub operation: Option<String>,
    /// Expression or binding path involved.
    pub expression: Option<String>,
    /// Offending template text.
    pub template: Option<String>,
    /// Byte offset of the offending text.
    pub offset: Option<usize>,
    /// Suggestions for fixing the error.
    pub suggestions: Vec<Suggestion>,
    /// Help text.
    pub help: Option<String>,
}

/// Errors raised while configuring interceptors or resolving templates.
#[derive(Error, Debug)]
pub struct MapperError {
    /// The error code.
    pub code: ErrorCode,
    /// The error message.
    pub message: String,
    /// Additional context.
    pub context: ErrorContext,
    /// The source error (if any).
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for MapperError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.code(), self.message)
    }
}

impl MapperError {
    /// Create a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: ErrorContext::default(),
            source: None,
        }
    }

    /// Set the operation.
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.context.operation = Some(operation.into());
        self
    }

    /// Set the expression.
    pub fn with_expression(mut self, expression: impl Into<String>) -> Self {
        self.context.expression = Some(expression.into());
        self
    }

    /// Set the offending template span.
    pub fn with_span(mut self, offset: usize, template: impl Into<String>) -> Self {
        self.context.offset = Some(offset);
        self.context.template = Some(template.into());
        self
    }

    /// Add a suggestion for fixing the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.context.suggestions.push(Suggestion::new(suggestion));
        self
    }

    /// Add a suggestion with an example.
    pub fn with_code_suggestion(mut self, text: impl Into<String>, code: impl Into<String>) -> Self {
        self.context
            .suggestions
            .push(Suggestion::new(text).with_code(code));
        self
    }

    /// Add help text.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.context.help = Some(help.into());
        self
    }

    /// Set the source error.
    pub fn with_source<E: std::error::Error + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    // ============== Constructor Functions ==============

    /// Create an error for an interceptor without any signature.
    pub fn no_signatures(interceptor: impl Into<String>) -> Self {
        let interceptor = interceptor.into();
        Self::new(
            ErrorCode::NoSignatures,
            format!("No signatures were declared by interceptor {}", interceptor),
        )
        .with_operation(&interceptor)
        .with_code_suggestion(
            "Return at least one signature from Interceptor::signatures()",
            "vec![Signature::new(ComponentKind::Executor, \"query\")]",
        )
    }

    /// Create an error for a signature naming an unknown operation.
    pub fn unknown_operation(kind: impl fmt::Display, method: impl Into<String>) -> Self {
        let method = method.into();
        Self::new(
            ErrorCode::UnknownOperation,
            format!("Could not find operation on {} named {}", kind, method),
        )
        .with_operation(format!("{}.{}", kind, method))
        .with_suggestion("Check the operation name against ComponentKind::operations()")
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidConfiguration, message.into())
    }

    /// Create an error for a binding path that cannot be resolved.
    pub fn binding_resolution(path: impl Into<String>) -> Self {
        let path = path.into();
        Self::new(
            ErrorCode::BindingResolution,
            format!("There is no binding or parameter property named '{}'", path),
        )
        .with_expression(&path)
        .with_suggestion("Check the name against the parameter object and bindings")
        .with_code_suggestion("Supply a default for optional values", format!("{{{{{},default=0}}}}", path))
    }

    /// Create an error for an iteration collection that cannot be iterated.
    pub fn not_iterable(expression: impl Into<String>, found: impl fmt::Display) -> Self {
        let expression = expression.into();
        Self::new(
            ErrorCode::NotIterable,
            format!(
                "The expression '{}' evaluated to {} which is not iterable",
                expression, found
            ),
        )
        .with_expression(&expression)
        .with_help("Iterations accept lists, maps and non-negative integers")
    }

    /// Create a template syntax error at the given offset.
    pub fn template_syntax(message: impl Into<String>, offset: usize, template: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(ErrorCode::TemplateSyntax, format!("Template syntax error: {}", message))
            .with_span(offset, template)
            .with_suggestion("Escape literal delimiters with a backslash")
    }

    /// Create an invalid expression error.
    pub fn invalid_expression(expression: impl Into<String>, message: impl Into<String>) -> Self {
        let expression = expression.into();
        Self::new(
            ErrorCode::InvalidExpression,
            format!("Error parsing expression '{}': {}", expression, message.into()),
        )
        .with_expression(&expression)
    }

    /// Create an error for an unknown placeholder attribute.
    pub fn unknown_attribute(name: impl Into<String>, expression: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(
            ErrorCode::UnknownAttribute,
            format!(
                "An invalid property '{}' was found in placeholder; valid properties are type, sqlType, numericScale, mode, default",
                name
            ),
        )
        .with_expression(expression)
    }

    /// Create an error for an argument or reply of the wrong shape.
    pub fn invocation_mismatch(operation: impl fmt::Display, expected: &str, found: &str) -> Self {
        Self::new(
            ErrorCode::InvocationMismatch,
            format!("{} expected {} but received {}", operation, expected, found),
        )
        .with_operation(operation.to_string())
        .with_help("An interceptor must reply with the shape of the operation it intercepts")
    }

    /// Create an error for a target lacking a component kind.
    pub fn missing_capability(kind: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::MissingCapability,
            format!("Target does not expose the {} capability", kind),
        )
    }

    // ============== Error Checks ==============

    /// Check if this is a configuration error.
    pub fn is_configuration_error(&self) -> bool {
        self.code.is_configuration()
    }

    /// Check if this is a binding error.
    pub fn is_binding_error(&self) -> bool {
        matches!(self.code, ErrorCode::BindingResolution | ErrorCode::NotIterable)
    }

    /// Check if this is a template syntax error.
    pub fn is_syntax_error(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::TemplateSyntax | ErrorCode::InvalidExpression | ErrorCode::UnknownAttribute
        )
    }

    // ============== Display Functions ==============

    /// Display the full error with all context and suggestions.
    pub fn display_full(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("Error [{}]: {}\n", self.code.code(), self.message));

        if let Some(ref op) = self.context.operation {
            output.push_str(&format!("  → Operation: {}\n", op));
        }
        if let Some(ref expr) = self.context.expression {
            output.push_str(&format!("  → Expression: {}\n", expr));
        }
        if let Some(ref template) = self.context.template {
            let shown: String = template.chars().take(80).collect();
            match self.context.offset {
                Some(offset) => output.push_str(&format!("  → At {}: {}\n", offset, shown)),
                None => output.push_str(&format!("  → Template: {}\n", shown)),
            }
        }

        if !self.context.suggestions.is_empty() {
            output.push_str("\nSuggestions:\n");
            for (i, suggestion) in self.context.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion.text));
                if let Some(ref code) = suggestion.code {
                    output.push_str(&format!("     ```\n     {}\n     ```\n", code.replace('\n', "\n     ")));
                }
            }
        }

        if let Some(ref help) = self.context.help {
            output.push_str(&format!("\nHelp: {}\n", help));
        }

        output
    }
}

/// Helper for creating errors with context.
#[macro_export]
macro_rules! mapper_error {
    ($code:expr, $msg:expr) => {
        $crate::error::MapperError::new($code, $msg)
    };
    ($code:expr, $msg:expr, $($key:ident = $value:expr),+ $(,)?) => {{
        let mut err = $crate::error::MapperError::new($code, $msg);
        $(
            err = err.$key($value);
        )+
        err
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_format() {
        assert_eq!(ErrorCode::NoSignatures.code(), "W1001");
        assert_eq!(ErrorCode::BindingResolution.code(), "W2001");
        assert_eq!(ErrorCode::TemplateSyntax.code(), "W3001");
        assert_eq!(ErrorCode::InvocationMismatch.code(), "W4001");
    }

    #[test]
    fn test_configuration_family() {
        assert!(MapperError::no_signatures("Audit").is_configuration_error());
        assert!(MapperError::unknown_operation("Executor", "select").is_configuration_error());
        assert!(MapperError::invalid_config("empty delimiter").is_configuration_error());
        assert!(!MapperError::binding_resolution("a").is_configuration_error());
    }

    #[test]
    fn test_binding_error() {
        let err = MapperError::binding_resolution("b.d");
        assert!(err.is_binding_error());
        assert_eq!(err.context.expression.as_deref(), Some("b.d"));
        assert!(err.context.suggestions.len() >= 2);
    }

    #[test]
    fn test_template_syntax_span() {
        let err = MapperError::template_syntax("unterminated placeholder", 7, "{{name");
        assert!(err.is_syntax_error());
        assert_eq!(err.context.offset, Some(7));
        assert_eq!(err.context.template.as_deref(), Some("{{name"));
    }

    #[test]
    fn test_display_full() {
        let err = MapperError::template_syntax("unterminated placeholder", 3, "{{x");
        let output = err.display_full();
        assert!(output.contains("W3001"));
        assert!(output.contains("At 3"));
        assert!(output.contains("Suggestions"));
    }

    #[test]
    fn test_error_macro() {
        let err = mapper_error!(
            ErrorCode::InvalidExpression,
            "Unexpected token",
            with_expression = "a ==",
            with_help = "Complete the comparison"
        );

        assert_eq!(err.code, ErrorCode::InvalidExpression);
        assert_eq!(err.context.expression.as_deref(), Some("a =="));
        assert!(err.context.help.is_some());
    }
}
