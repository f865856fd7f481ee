//! Stage two: placeholder extraction.

use super::context::{Bindings, resolve_binding_path};
use super::expr::{Expression, Scope};
use super::query::{ParameterDescriptor, ParameterMode, ResolvedQuery};
use super::token::TokenScanner;
use crate::config::TemplateConfig;
use crate::error::{MapperError, MapperResult};
use crate::value::{PathResolvable, Value, ValueType, path_segments};
use smol_str::SmolStr;
use tracing::debug;

/// Replaces placeholders with positional markers.
///
/// Each placeholder becomes one [`ParameterDescriptor`], in the order the
/// placeholders appear in the text. A placeholder holds a binding path or a
/// parenthesized expression, optionally followed by comma-separated
/// attributes:
///
/// ```text
/// {{user.id}}
/// {{price, type=float, numericScale=2}}
/// {{status, default='active'}}
/// {{(count + 1)}}
/// ```
///
/// ```rust
/// use sqlweave_core::scripting::PlaceholderTokenizer;
/// use sqlweave_core::{TemplateConfig, Value};
///
/// let config = TemplateConfig::default();
/// let param: Value = serde_json::json!({"a": 1, "b": {"c": "x"}}).into();
///
/// let query = PlaceholderTokenizer::new(&config)
///     .tokenize("x = {{a}} AND y = {{b.c}}", &param, Default::default())
///     .unwrap();
/// assert_eq!(query.text(), "x = ? AND y = ?");
/// assert_eq!(query.expressions(), vec!["a", "b.c"]);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct PlaceholderTokenizer<'c> {
    config: &'c TemplateConfig,
}

impl<'c> PlaceholderTokenizer<'c> {
    /// Create a tokenizer using the configured delimiters and marker style.
    pub fn new(config: &'c TemplateConfig) -> Self {
        Self { config }
    }

    /// Tokenize `text`, resolving placeholder values from `bindings` and
    /// `parameter`.
    pub fn tokenize(
        &self,
        text: &str,
        parameter: &dyn PathResolvable,
        bindings: Bindings,
    ) -> MapperResult<ResolvedQuery> {
        let scanner = TokenScanner::new(&self.config.placeholder_open, &self.config.placeholder_close);
        let scope = BindingScope {
            bindings: &bindings,
            parameter,
        };
        let mut parameters = Vec::new();

        let output = scanner.replace(text, |content, offset| {
            let span = format!(
                "{}{}{}",
                self.config.placeholder_open, content, self.config.placeholder_close
            );
            let placeholder = Placeholder::parse(content, offset, &span)?;
            let descriptor = placeholder.describe(&scope)?;
            parameters.push(descriptor);
            Ok(self.config.marker_style.marker(parameters.len()))
        })?;

        debug!(
            parameters = parameters.len(),
            bindings = bindings.len(),
            "Tokenized placeholders"
        );

        Ok(ResolvedQuery::new(output, parameters, bindings))
    }
}

struct BindingScope<'a> {
    bindings: &'a Bindings,
    parameter: &'a dyn PathResolvable,
}

impl BindingScope<'_> {
    fn resolve_path(&self, path: &str) -> Option<Value> {
        if let Some(value) = resolve_binding_path(self.bindings, self.parameter, path) {
            return Some(value);
        }
        // A scalar parameter answers any single-segment path.
        if path_segments(path).nth(1).is_none() {
            return self.parameter.scalar();
        }
        None
    }
}

impl Scope for BindingScope<'_> {
    fn lookup(&self, path: &str) -> Option<Value> {
        resolve_binding_path(self.bindings, self.parameter, path)
    }
}

enum Target {
    Path(SmolStr),
    Expr(Expression),
}

struct Placeholder {
    target: Target,
    value_type: Option<ValueType>,
    sql_type: Option<SmolStr>,
    numeric_scale: Option<u32>,
    mode: ParameterMode,
    default: Option<Value>,
}

impl Placeholder {
    fn parse(content: &str, offset: usize, span: &str) -> MapperResult<Self> {
        let syntax = |message: String| MapperError::template_syntax(message, offset, span);

        let mut parts = split_top_level(content).into_iter();
        let head = parts.next().unwrap_or_default().trim();
        if head.is_empty() {
            return Err(syntax("empty placeholder".to_string()));
        }

        let target = match head.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
            Some(inner) => Target::Expr(Expression::parse(inner)?),
            None => Target::Path(SmolStr::new(head)),
        };

        let mut placeholder = Self {
            target,
            value_type: None,
            sql_type: None,
            numeric_scale: None,
            mode: ParameterMode::In,
            default: None,
        };

        for attribute in parts {
            let attribute = attribute.trim();
            let Some((name, value)) = attribute.split_once('=') else {
                return Err(syntax(format!("expected 'name=value', found '{}'", attribute)));
            };
            let (name, value) = (name.trim(), value.trim());

            match name {
                "type" | "javaType" => {
                    placeholder.value_type = Some(value.parse().map_err(syntax)?);
                }
                "sqlType" | "jdbcType" => placeholder.sql_type = Some(SmolStr::new(value)),
                "numericScale" => {
                    let scale = value
                        .parse()
                        .map_err(|_| syntax(format!("invalid numericScale '{}'", value)))?;
                    placeholder.numeric_scale = Some(scale);
                }
                "mode" => placeholder.mode = value.parse().map_err(syntax)?,
                "default" => placeholder.default = Some(parse_literal(value)),
                other => return Err(MapperError::unknown_attribute(other, content.trim())),
            }
        }

        Ok(placeholder)
    }

    fn describe(self, scope: &BindingScope<'_>) -> MapperResult<ParameterDescriptor> {
        let (expression, resolved) = match &self.target {
            Target::Path(path) => (path.clone(), scope.resolve_path(path)),
            Target::Expr(expr) => {
                let value = expr.evaluate(scope)?;
                (SmolStr::new(expr.source()), Some(value))
            }
        };

        let value = match (resolved, self.default) {
            (Some(Value::Null) | None, Some(default)) => default,
            (Some(value), _) => value,
            (None, None) if self.mode.requires_value() => {
                return Err(MapperError::binding_resolution(expression.as_str()));
            }
            (None, None) => Value::Null,
        };

        let value_type = self.value_type.unwrap_or(match value.value_type() {
            ValueType::Null => ValueType::Any,
            inferred => inferred,
        });

        Ok(ParameterDescriptor {
            expression,
            value_type,
            sql_type: self.sql_type,
            numeric_scale: self.numeric_scale,
            mode: self.mode,
            value,
        })
    }
}

/// Split on commas outside quotes and parentheses.
pub(crate) fn split_top_level(content: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote = None;
    let mut start = 0;

    for (i, c) in content.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                parts.push(&content[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&content[start..]);
    parts
}

fn parse_literal(raw: &str) -> Value {
    let quoted = raw
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .or_else(|| raw.strip_prefix('"').and_then(|s| s.strip_suffix('"')));
    if let Some(text) = quoted {
        return Value::String(text.to_string());
    }

    match raw {
        "null" => Value::Null,
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => raw
            .parse::<i64>()
            .map(Value::Int)
            .or_else(|_| raw.parse::<f64>().map(Value::Float))
            .unwrap_or_else(|_| Value::String(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MarkerStyle;
    use crate::error::ErrorCode;
    use pretty_assertions::assert_eq;

    fn tokenize(text: &str, param: serde_json::Value) -> MapperResult<ResolvedQuery> {
        let param: Value = param.into();
        PlaceholderTokenizer::new(&TemplateConfig::default()).tokenize(text, &param, Bindings::new())
    }

    #[test]
    fn test_order_and_values() {
        let query = tokenize(
            "UPDATE t SET a = {{a}}, b = {{b.c}} WHERE id = {{a}}",
            serde_json::json!({"a": 1, "b": {"c": "x"}}),
        )
        .unwrap();

        assert_eq!(query.text(), "UPDATE t SET a = ?, b = ? WHERE id = ?");
        assert_eq!(query.expressions(), vec!["a", "b.c", "a"]);
        assert_eq!(query.values(), vec![Value::Int(1), Value::from("x"), Value::Int(1)]);
        assert_eq!(query.parameters()[1].value_type, ValueType::String);
    }

    #[test]
    fn test_attributes() {
        let query = tokenize(
            "{{price, type=float, numericScale=2, sqlType=DECIMAL}} {{out, mode=OUT, jdbcType=INTEGER}}",
            serde_json::json!({"price": 3}),
        )
        .unwrap();

        let price = &query.parameters()[0];
        assert_eq!(price.value_type, ValueType::Float);
        assert_eq!(price.numeric_scale, Some(2));
        assert_eq!(price.sql_type.as_deref(), Some("DECIMAL"));

        let out = &query.parameters()[1];
        assert_eq!(out.mode, ParameterMode::Out);
        assert_eq!(out.value, Value::Null);
        assert_eq!(out.value_type, ValueType::Any);
    }

    #[test]
    fn test_default_value() {
        let query = tokenize(
            "{{status, default='active, pending'}} {{limit, default=10}} {{n, default=null}}",
            serde_json::json!({"limit": null}),
        )
        .unwrap();
        assert_eq!(
            query.values(),
            vec![Value::from("active, pending"), Value::Int(10), Value::Null]
        );
    }

    #[test]
    fn test_expression_placeholder() {
        let query = tokenize("{{(count + 1)}}", serde_json::json!({"count": 4})).unwrap();
        assert_eq!(query.values(), vec![Value::Int(5)]);
        assert_eq!(query.expressions(), vec!["count + 1"]);
    }

    #[test]
    fn test_bindings_take_precedence() {
        let param: Value = serde_json::json!({"id": 1}).into();
        let mut bindings = Bindings::new();
        bindings.insert("id".to_string(), Value::Int(2));
        bindings.insert("__frch_x_0".to_string(), Value::from("y"));

        let query = PlaceholderTokenizer::new(&TemplateConfig::default())
            .tokenize("{{id}} {{__frch_x_0}}", &param, bindings)
            .unwrap();
        assert_eq!(query.values(), vec![Value::Int(2), Value::from("y")]);
        assert_eq!(query.binding("__frch_x_0"), Some(&Value::from("y")));
    }

    #[test]
    fn test_scalar_parameter() {
        let param = Value::Int(42);
        let query = PlaceholderTokenizer::new(&TemplateConfig::default())
            .tokenize("id = {{id}}", &param, Bindings::new())
            .unwrap();
        assert_eq!(query.values(), vec![Value::Int(42)]);
    }

    #[test]
    fn test_dollar_markers() {
        let config = TemplateConfig::default().with_marker_style(MarkerStyle::Dollar);
        let param: Value = serde_json::json!({"a": 1, "b": 2}).into();
        let query = PlaceholderTokenizer::new(&config)
            .tokenize("{{a}} {{b}}", &param, Bindings::new())
            .unwrap();
        assert_eq!(query.text(), "$1 $2");
    }

    #[test]
    fn test_errors() {
        let err = tokenize("{{missing}}", serde_json::json!({})).unwrap_err();
        assert_eq!(err.code, ErrorCode::BindingResolution);

        let err = tokenize("{{a, color=red}}", serde_json::json!({"a": 1})).unwrap_err();
        assert_eq!(err.code, ErrorCode::UnknownAttribute);

        let err = tokenize("SELECT * FROM t WHERE a = {{a, type}}", serde_json::json!({"a": 1})).unwrap_err();
        assert_eq!(err.code, ErrorCode::TemplateSyntax);
        assert_eq!(err.context.offset, Some(26));
        assert_eq!(err.context.template.as_deref(), Some("{{a, type}}"));

        let err = tokenize("{{ }}", serde_json::json!({})).unwrap_err();
        assert_eq!(err.code, ErrorCode::TemplateSyntax);
    }

    #[test]
    fn test_escaped_placeholder() {
        let query = tokenize(r"'\{{a}}' = {{a}}", serde_json::json!({"a": 1})).unwrap();
        assert_eq!(query.text(), "'{{a}}' = ?");
        assert_eq!(query.parameters().len(), 1);
    }

    #[test]
    fn test_split_top_level() {
        assert_eq!(split_top_level("a, default='x,y'"), vec!["a", " default='x,y'"]);
        assert_eq!(split_top_level("(f(a, b)), type=int"), vec!["(f(a, b))", " type=int"]);
    }
}
