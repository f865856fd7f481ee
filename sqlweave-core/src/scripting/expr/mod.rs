//! Expression language for tests, collections, bindings and inline splices.
//!
//! Supported syntax:
//!
//! | Form | Example |
//! |------|---------|
//! | Paths | `user.name`, `ids[0]`, `tags.size` |
//! | Literals | `null`, `true`, `42`, `1.5`, `'text'`, `"text"` |
//! | Comparison | `==` `!=` `<` `<=` `>` `>=` and `eq` `neq` `lt` `lte` `gt` `gte` |
//! | Boolean | `and` / `&&`, `or` / `||`, `not` / `!` |
//! | Arithmetic | `+` (numbers or string concatenation), `-`, unary `-` |
//!
//! Paths that resolve to nothing evaluate to `null`. Parentheses nest at most
//! [`MAX_NESTING`] levels deep.
//!
//! ```rust
//! use sqlweave_core::scripting::Expression;
//! use sqlweave_core::Value;
//!
//! let expr = Expression::parse("name != null and name != ''").unwrap();
//! let scope: Value = serde_json::json!({"name": "ada"}).into();
//! assert!(expr.evaluate_bool(&scope).unwrap());
//! ```

mod grammar;

use crate::error::{MapperError, MapperResult};
use crate::value::Value;
use grammar::{ExpressionParser, Rule};
use pest::Parser;
use pest::error::LineColLocation;
use pest::iterators::Pair;
use smol_str::SmolStr;
use std::cmp::Ordering;
use std::fmt;

/// Something expression paths can be looked up in.
pub trait Scope {
    /// Resolve a full path such as `user.tags[0]`.
    fn lookup(&self, path: &str) -> Option<Value>;
}

impl Scope for Value {
    fn lookup(&self, path: &str) -> Option<Value> {
        self.path(path)
    }
}

/// Deepest parenthesis nesting an expression may use.
pub const MAX_NESTING: usize = 32;

/// A parsed expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: SmolStr,
    ast: Expr,
}

// Operator chains are flat so evaluation depth only grows with parentheses.
#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Literal(Value),
    Path(SmolStr),
    Not(usize, Box<Expr>),
    Neg(usize, Box<Expr>),
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Compare(CmpOp, Box<Expr>, Box<Expr>),
    Sum(Box<Expr>, Vec<(AddOp, Expr)>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AddOp {
    Add,
    Sub,
}

impl Expression {
    /// Parse an expression.
    pub fn parse(source: &str) -> MapperResult<Self> {
        let tree = parse_tree(source)?;
        let ast = build_or(tree).map_err(|message| MapperError::invalid_expression(source, message))?;
        Ok(Self {
            source: source.trim().into(),
            ast,
        })
    }

    /// The source text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The path if this expression is nothing but a path.
    pub fn as_path(&self) -> Option<&str> {
        match &self.ast {
            Expr::Path(path) => Some(path),
            _ => None,
        }
    }

    /// Evaluate against a scope.
    pub fn evaluate(&self, scope: &dyn Scope) -> MapperResult<Value> {
        eval(&self.ast, scope).map_err(|message| MapperError::invalid_expression(self.source.as_str(), message))
    }

    /// Evaluate and apply truthiness.
    pub fn evaluate_bool(&self, scope: &dyn Scope) -> MapperResult<bool> {
        self.evaluate(scope).map(|v| v.is_truthy())
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Rewrite `source` so every path whose first segment is a renamed name
/// starts with its alias instead.
///
/// Returns `None` when no path matched. Only path roots change; string
/// literals and later segments are left alone.
pub(crate) fn rename_roots(source: &str, renames: &[(&str, &str)]) -> MapperResult<Option<String>> {
    let tree = parse_tree(source)?;
    let mut edits = Vec::new();

    for pair in tree.into_inner().flatten() {
        if pair.as_rule() != Rule::path {
            continue;
        }
        let Some(head) = pair.into_inner().next() else {
            continue;
        };
        if let Some((_, alias)) = renames.iter().find(|(name, _)| *name == head.as_str()) {
            let span = head.as_span();
            edits.push((span.start(), span.end(), *alias));
        }
    }

    if edits.is_empty() {
        return Ok(None);
    }

    let mut output = String::with_capacity(source.len());
    let mut last = 0;
    for (start, end, alias) in edits {
        output.push_str(&source[last..start]);
        output.push_str(alias);
        last = end;
    }
    output.push_str(&source[last..]);
    Ok(Some(output))
}

// ============== Parsing ==============

fn parse_tree(source: &str) -> MapperResult<Pair<'_, Rule>> {
    check_nesting(source)?;

    let mut pairs = ExpressionParser::parse(Rule::expression, source).map_err(|e| {
        let column = match e.line_col {
            LineColLocation::Pos((_, col)) | LineColLocation::Span((_, col), _) => col,
        };
        MapperError::invalid_expression(source, format!("{} at column {}", e.variant.message(), column))
    })?;

    pairs
        .next()
        .and_then(|expression| expression.into_inner().find(|p| p.as_rule() == Rule::or_expr))
        .ok_or_else(|| MapperError::invalid_expression(source, "empty expression"))
}

fn check_nesting(source: &str) -> MapperResult<()> {
    let mut depth = 0usize;
    let mut quote = None;
    let mut escaped = false;

    for c in source.chars() {
        match quote {
            Some(_) if escaped => escaped = false,
            Some(_) if c == '\\' => escaped = true,
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '\'' | '"' => quote = Some(c),
                '(' => {
                    depth += 1;
                    if depth > MAX_NESTING {
                        return Err(MapperError::invalid_expression(
                            source,
                            format!("parentheses nest deeper than {} levels", MAX_NESTING),
                        ));
                    }
                }
                ')' => depth = depth.saturating_sub(1),
                _ => {}
            },
        }
    }
    Ok(())
}

fn malformed(pair: &Pair<'_, Rule>) -> String {
    format!("malformed expression near '{}'", pair.as_str())
}

fn single(mut operands: Vec<Expr>, join: fn(Vec<Expr>) -> Expr) -> Expr {
    match operands.len() {
        1 => operands.swap_remove(0),
        _ => join(operands),
    }
}

fn build_or(pair: Pair<'_, Rule>) -> Result<Expr, String> {
    let operands = pair
        .into_inner()
        .filter(|p| p.as_rule() == Rule::and_expr)
        .map(build_and)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(single(operands, Expr::Or))
}

fn build_and(pair: Pair<'_, Rule>) -> Result<Expr, String> {
    let operands = pair
        .into_inner()
        .filter(|p| p.as_rule() == Rule::not_expr)
        .map(|p| build_prefixed(p, Rule::not_op, build_comparison, Expr::Not))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(single(operands, Expr::And))
}

/// Count the prefix operators in front of an operand.
fn build_prefixed(
    pair: Pair<'_, Rule>,
    op: Rule,
    build: fn(Pair<'_, Rule>) -> Result<Expr, String>,
    wrap: fn(usize, Box<Expr>) -> Expr,
) -> Result<Expr, String> {
    let message = malformed(&pair);
    let mut count = 0;
    for inner in pair.into_inner() {
        if inner.as_rule() == op {
            count += 1;
            continue;
        }
        let operand = build(inner)?;
        return Ok(match count {
            0 => operand,
            n => wrap(n, Box::new(operand)),
        });
    }
    Err(message)
}

fn build_comparison(pair: Pair<'_, Rule>) -> Result<Expr, String> {
    let message = malformed(&pair);
    let mut inner = pair.into_inner();
    let left = build_additive(inner.next().ok_or(message)?)?;

    match (inner.next(), inner.next()) {
        (Some(op), Some(right)) => {
            let op = match op.as_str() {
                "==" | "eq" => CmpOp::Eq,
                "!=" | "neq" => CmpOp::Ne,
                "<" | "lt" => CmpOp::Lt,
                "<=" | "lte" => CmpOp::Le,
                ">" | "gt" => CmpOp::Gt,
                ">=" | "gte" => CmpOp::Ge,
                other => return Err(format!("unknown operator '{}'", other)),
            };
            Ok(Expr::Compare(op, Box::new(left), Box::new(build_additive(right)?)))
        }
        _ => Ok(left),
    }
}

fn build_additive(pair: Pair<'_, Rule>) -> Result<Expr, String> {
    let message = malformed(&pair);
    let mut inner = pair.into_inner();
    let first = build_unary(inner.next().ok_or_else(|| message.clone())?)?;

    let mut rest = Vec::new();
    while let Some(op) = inner.next() {
        let op = match op.as_str() {
            "+" => AddOp::Add,
            _ => AddOp::Sub,
        };
        let operand = inner.next().ok_or_else(|| message.clone())?;
        rest.push((op, build_unary(operand)?));
    }

    if rest.is_empty() {
        Ok(first)
    } else {
        Ok(Expr::Sum(Box::new(first), rest))
    }
}

fn build_unary(pair: Pair<'_, Rule>) -> Result<Expr, String> {
    build_prefixed(pair, Rule::neg_op, build_primary, Expr::Neg)
}

fn build_primary(pair: Pair<'_, Rule>) -> Result<Expr, String> {
    let text = pair.as_str();
    match pair.as_rule() {
        Rule::or_expr => build_or(pair),
        Rule::path => build_path(pair).map(Expr::Path),
        Rule::null_lit => Ok(Expr::Literal(Value::Null)),
        Rule::bool_lit => Ok(Expr::Literal(Value::Bool(text == "true"))),
        Rule::int => text
            .parse()
            .map(|i| Expr::Literal(Value::Int(i)))
            .map_err(|_| format!("invalid number '{}'", text)),
        Rule::float => text
            .parse()
            .map(|f| Expr::Literal(Value::Float(f)))
            .map_err(|_| format!("invalid number '{}'", text)),
        Rule::string => Ok(Expr::Literal(Value::String(unescape(pair)))),
        _ => Err(malformed(&pair)),
    }
}

fn build_path(pair: Pair<'_, Rule>) -> Result<SmolStr, String> {
    let mut path = String::with_capacity(pair.as_str().len());
    for (i, segment) in pair.into_inner().enumerate() {
        match segment.as_rule() {
            Rule::ident if i == 0 => path.push_str(segment.as_str()),
            Rule::ident => {
                path.push('.');
                path.push_str(segment.as_str());
            }
            Rule::index => {
                path.push('[');
                path.push_str(segment.as_str());
                path.push(']');
            }
            Rule::string => {
                path.push('.');
                path.push_str(&unescape(segment));
            }
            _ => return Err(malformed(&segment)),
        }
    }
    Ok(path.into())
}

fn unescape(pair: Pair<'_, Rule>) -> String {
    let raw = pair.into_inner().next().map(|inner| inner.as_str()).unwrap_or_default();
    let mut value = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => value.extend(chars.next()),
            c => value.push(c),
        }
    }
    value
}

// ============== Evaluation ==============

fn eval(expr: &Expr, scope: &dyn Scope) -> Result<Value, String> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Path(path) => Ok(scope.lookup(path).unwrap_or(Value::Null)),
        Expr::Not(count, inner) => {
            let truthy = eval(inner, scope)?.is_truthy();
            Ok(Value::Bool(truthy ^ (count % 2 == 1)))
        }
        Expr::Neg(count, inner) => (0..*count).try_fold(eval(inner, scope)?, |value, _| negate(value)),
        Expr::And(operands) => {
            for operand in operands {
                if !eval(operand, scope)?.is_truthy() {
                    return Ok(Value::Bool(false));
                }
            }
            Ok(Value::Bool(true))
        }
        Expr::Or(operands) => {
            for operand in operands {
                if eval(operand, scope)?.is_truthy() {
                    return Ok(Value::Bool(true));
                }
            }
            Ok(Value::Bool(false))
        }
        Expr::Compare(op, left, right) => {
            let left = eval(left, scope)?;
            let right = eval(right, scope)?;
            Ok(Value::Bool(compare(*op, &left, &right)))
        }
        Expr::Sum(first, rest) => rest.iter().try_fold(eval(first, scope)?, |left, (op, operand)| {
            let right = eval(operand, scope)?;
            match op {
                AddOp::Add => add(left, right),
                AddOp::Sub => subtract(left, right),
            }
        }),
    }
}

fn negate(value: Value) -> Result<Value, String> {
    match value {
        Value::Int(i) => i.checked_neg().map(Value::Int).ok_or_else(|| "integer overflow".to_string()),
        Value::Float(f) => Ok(Value::Float(-f)),
        other => Err(format!("cannot negate {}", other.value_type())),
    }
}

fn subtract(left: Value, right: Value) -> Result<Value, String> {
    match (&left, &right) {
        (Value::Int(a), Value::Int(b)) => {
            a.checked_sub(*b).map(Value::Int).ok_or_else(|| "integer overflow".to_string())
        }
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => Ok(Value::Float(a - b)),
            _ => Err(format!(
                "cannot subtract {} from {}",
                right.value_type(),
                left.value_type()
            )),
        },
    }
}

fn add(left: Value, right: Value) -> Result<Value, String> {
    match (&left, &right) {
        (Value::String(_), _) | (_, Value::String(_)) => {
            Ok(Value::String(format!("{}{}", left.to_text(), right.to_text())))
        }
        (Value::Int(a), Value::Int(b)) => a
            .checked_add(*b)
            .map(Value::Int)
            .ok_or_else(|| "integer overflow".to_string()),
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => Ok(Value::Float(a + b)),
            _ => Err(format!("cannot add {} and {}", left.value_type(), right.value_type())),
        },
    }
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::String(s) => s.trim().parse().ok(),
        other => other.as_f64(),
    }
}

fn ordering(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Null, _) | (_, Value::Null) => None,
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        _ => numeric(left)?.partial_cmp(&numeric(right)?),
    }
}

fn compare(op: CmpOp, left: &Value, right: &Value) -> bool {
    match op {
        CmpOp::Eq => equals(left, right),
        CmpOp::Ne => !equals(left, right),
        CmpOp::Lt => ordering(left, right) == Some(Ordering::Less),
        CmpOp::Le => matches!(ordering(left, right), Some(Ordering::Less | Ordering::Equal)),
        CmpOp::Gt => ordering(left, right) == Some(Ordering::Greater),
        CmpOp::Ge => matches!(ordering(left, right), Some(Ordering::Greater | Ordering::Equal)),
    }
}

fn equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Int(_) | Value::Float(_), _) | (_, Value::Int(_) | Value::Float(_)) => {
            match (numeric(left), numeric(right)) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            }
        }
        _ => left == right,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn scope() -> Value {
        serde_json::json!({
            "name": "ada",
            "age": 36,
            "score": 9.5,
            "active": true,
            "tags": ["x", "y"],
            "empty": "",
            "nested": {"level": 2}
        })
        .into()
    }

    fn eval_str(source: &str) -> Value {
        Expression::parse(source).unwrap().evaluate(&scope()).unwrap()
    }

    #[test]
    fn test_paths() {
        assert_eq!(eval_str("name"), Value::from("ada"));
        assert_eq!(eval_str("nested.level"), Value::Int(2));
        assert_eq!(eval_str("tags[1]"), Value::from("y"));
        assert_eq!(eval_str("tags.size"), Value::Int(2));
        assert_eq!(eval_str("tags.0"), Value::from("x"));
        assert_eq!(eval_str("nested['level']"), Value::Int(2));
        assert_eq!(eval_str("missing.deep"), Value::Null);
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(eval_str("age >= 18"), Value::Bool(true));
        assert_eq!(eval_str("age lt 18"), Value::Bool(false));
        assert_eq!(eval_str("score > 9"), Value::Bool(true));
        assert_eq!(eval_str("name == 'ada'"), Value::Bool(true));
        assert_eq!(eval_str("name neq \"bob\""), Value::Bool(true));
        assert_eq!(eval_str("missing == null"), Value::Bool(true));
        assert_eq!(eval_str("age == '36'"), Value::Bool(true));
        assert_eq!(eval_str("missing < 3"), Value::Bool(false));
    }

    #[test]
    fn test_boolean_logic() {
        assert_eq!(eval_str("name != null and empty != ''"), Value::Bool(false));
        assert_eq!(eval_str("active || missing"), Value::Bool(true));
        assert_eq!(eval_str("not active"), Value::Bool(false));
        assert_eq!(eval_str("!(age > 40) && active"), Value::Bool(true));
        assert_eq!(eval_str("!!name"), Value::Bool(true));
        assert_eq!(eval_str("missing or empty or age"), Value::Bool(true));
        assert_eq!(eval_str("nested.level == 2 && !empty && order == null"), Value::Bool(true));
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval_str("age + 1"), Value::Int(37));
        assert_eq!(eval_str("age - 40"), Value::Int(-4));
        assert_eq!(eval_str("-age"), Value::Int(-36));
        assert_eq!(eval_str("'%' + name + '%'"), Value::from("%ada%"));
        assert_eq!(eval_str("score + 1"), Value::Float(10.5));
        assert_eq!(eval_str("age - 6 - 10 + 1"), Value::Int(21));
        assert_eq!(eval_str("--age"), Value::Int(36));
        assert_eq!(eval_str("'it\\'s'"), Value::from("it's"));
    }

    #[test]
    fn test_as_path() {
        assert_eq!(Expression::parse(" user.ids[0] ").unwrap().as_path(), Some("user.ids[0]"));
        assert_eq!(Expression::parse("a == 1").unwrap().as_path(), None);
    }

    #[test]
    fn test_parse_errors() {
        for source in ["", "a ==", "(a", "a b", "'open", "a # b", "and", "a ltb", "99999999999999999999"] {
            let err = Expression::parse(source).unwrap_err();
            assert_eq!(err.code, ErrorCode::InvalidExpression, "source: {:?}", source);
        }
    }

    #[test]
    fn test_nesting_limit() {
        let source = format!("{}a{}", "(".repeat(MAX_NESTING + 1), ")".repeat(MAX_NESTING + 1));
        let err = Expression::parse(&source).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidExpression);

        let source = format!("{}age{}", "(".repeat(MAX_NESTING), ")".repeat(MAX_NESTING));
        assert_eq!(Expression::parse(&source).unwrap().evaluate(&scope()).unwrap(), Value::Int(36));

        // Parentheses inside string literals do not count.
        let source = format!("name == '{}'", "(".repeat(MAX_NESTING * 2));
        assert!(Expression::parse(&source).is_ok());
    }

    #[test]
    fn test_long_operator_runs() {
        let source = format!("{}active", "!".repeat(200_000));
        assert_eq!(Expression::parse(&source).unwrap().evaluate(&scope()).unwrap(), Value::Bool(true));

        let source = format!("{}age", "-".repeat(100_001));
        assert_eq!(Expression::parse(&source).unwrap().evaluate(&scope()).unwrap(), Value::Int(-36));

        let source = vec!["1"; 50_000].join(" + ");
        assert_eq!(Expression::parse(&source).unwrap().evaluate(&scope()).unwrap(), Value::Int(50_000));
    }

    #[test]
    fn test_rename_roots() {
        let renames = [("id", "__frch_id_3"), ("i", "__frch_i_3")];
        assert_eq!(
            rename_roots("'id-' + id", &renames).unwrap().as_deref(),
            Some("'id-' + __frch_id_3")
        );
        assert_eq!(
            rename_roots("0 + id.value + i - user.id", &renames).unwrap().as_deref(),
            Some("0 + __frch_id_3.value + __frch_i_3 - user.id")
        );
        assert_eq!(rename_roots("ids.size > 0 and idx", &renames).unwrap(), None);
    }

    #[test]
    fn test_evaluation_error() {
        let err = Expression::parse("tags - 1").unwrap().evaluate(&scope()).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidExpression);
        assert_eq!(err.context.expression.as_deref(), Some("tags - 1"));
    }
}
