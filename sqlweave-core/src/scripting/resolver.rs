//! Stage one: node evaluation and inline splicing.

use super::context::{Bindings, DynamicContext};
use super::expr::{Scope, rename_roots};
use super::node::{ChooseNode, ForEachNode, InlinePart, InlineText, SqlNode, TrimNode};
use super::token::{Token, TokenScanner};
use super::tokenizer::split_top_level;
use crate::config::TemplateConfig;
use crate::error::{MapperError, MapperResult};
use crate::value::{PathResolvable, Value};
use tracing::trace;

/// Evaluates a node tree against a context.
///
/// Produces the query text with placeholders still in place plus every
/// binding made along the way.
///
/// ```rust
/// use sqlweave_core::scripting::{IfNode, SqlNode, TemplateResolver};
/// use sqlweave_core::{TemplateConfig, Value};
///
/// let root = SqlNode::mixed(vec![
///     SqlNode::inline("SELECT * FROM ${table}").unwrap(),
///     IfNode::new("id != null", SqlNode::text("WHERE id = {{id}}")).unwrap().into(),
/// ]);
/// let param: Value = serde_json::json!({"table": "users", "id": 7}).into();
///
/// let (text, _) = TemplateResolver::resolve_text(&root, &param, &TemplateConfig::default()).unwrap();
/// assert_eq!(text, "SELECT * FROM users WHERE id = {{id}}");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateResolver;

impl TemplateResolver {
    /// Evaluate `root` into `ctx`.
    pub fn resolve(root: &SqlNode, ctx: &mut DynamicContext<'_>) -> MapperResult<()> {
        apply(root, ctx)
    }

    /// Evaluate `root` in a fresh context and return its text and bindings.
    pub fn resolve_text(
        root: &SqlNode,
        parameter: &dyn PathResolvable,
        config: &TemplateConfig,
    ) -> MapperResult<(String, Bindings)> {
        let mut ctx = DynamicContext::new(parameter, config);
        apply(root, &mut ctx)?;
        Ok(ctx.into_parts())
    }
}

fn apply(node: &SqlNode, ctx: &mut DynamicContext<'_>) -> MapperResult<()> {
    crate::weave_trace!(node = node.kind(), "Applying node");
    match node {
        SqlNode::Text(text) => ctx.append_sql(text),
        SqlNode::Inline(inline) => {
            let text = splice(inline, ctx)?;
            ctx.append_sql(&text);
        }
        SqlNode::If(node) => {
            if node.test.evaluate_bool(&*ctx)? {
                apply(&node.body, ctx)?;
            }
        }
        SqlNode::Choose(node) => apply_choose(node, ctx)?,
        SqlNode::ForEach(node) => apply_foreach(node, ctx)?,
        SqlNode::Trim(node) => apply_trim(node, ctx)?,
        SqlNode::Bind(node) => {
            let value = node.value.evaluate(&*ctx)?;
            trace!(name = %node.name, "Bound expression value");
            ctx.bind_aliased(node.name.as_str(), value);
        }
        SqlNode::Mixed(children) => {
            for child in children {
                apply(child, ctx)?;
            }
        }
    }
    Ok(())
}

fn splice(inline: &InlineText, ctx: &DynamicContext<'_>) -> MapperResult<String> {
    let mut text = String::with_capacity(inline.source().len());
    for part in inline.parts() {
        match part {
            InlinePart::Text(literal) => text.push_str(literal),
            InlinePart::Expr(expr) => text.push_str(&expr.evaluate(ctx)?.to_text()),
        }
    }
    Ok(text)
}

fn apply_choose(node: &ChooseNode, ctx: &mut DynamicContext<'_>) -> MapperResult<()> {
    for when in &node.whens {
        if when.test.evaluate_bool(&*ctx)? {
            return apply(&when.body, ctx);
        }
    }
    match &node.otherwise {
        Some(body) => apply(body, ctx),
        None => Ok(()),
    }
}

fn apply_trim(node: &TrimNode, ctx: &mut DynamicContext<'_>) -> MapperResult<()> {
    let body = ctx.capture(|inner| apply(&node.body, inner))?;
    let trimmed = node.apply_to(&body);
    ctx.append_sql(&trimmed);
    Ok(())
}

fn iteration_entries(node: &ForEachNode, value: Value) -> MapperResult<Vec<(Value, Value)>> {
    match value {
        Value::List(items) => Ok(items
            .into_iter()
            .enumerate()
            .map(|(i, item)| (Value::from(i), item))
            .collect()),
        Value::Map(entries) => Ok(entries
            .into_iter()
            .map(|(key, item)| (Value::String(key), item))
            .collect()),
        Value::Int(n) if n >= 0 => Ok((0..n).map(|i| (Value::Int(i), Value::Int(i))).collect()),
        other => Err(MapperError::not_iterable(node.collection.source(), other.value_type())),
    }
}

fn apply_foreach(node: &ForEachNode, ctx: &mut DynamicContext<'_>) -> MapperResult<()> {
    let source = node.collection.source();
    let value = match node.collection.as_path() {
        Some(path) => ctx.lookup(path),
        None => Some(node.collection.evaluate(&*ctx)?),
    };

    let value = match value {
        Some(Value::Null) | None if node.nullable => return Ok(()),
        Some(Value::Null) | None => {
            return Err(MapperError::binding_resolution(source)
                .with_help("Mark the iteration nullable to skip missing collections"));
        }
        Some(value) => value,
    };

    let entries = iteration_entries(node, value)?;
    if entries.is_empty() {
        return Ok(());
    }

    let mut parts = Vec::with_capacity(entries.len());

    for (index, item) in entries {
        ctx.push_scope();
        if let Some(name) = &node.item {
            ctx.bind_aliased(name, item);
        }
        if let Some(name) = &node.index {
            ctx.bind_aliased(name, index);
        }
        let body = ctx.capture(|inner| apply(&node.body, inner));
        let aliases = ctx.pop_scope();

        let renames: Vec<(&str, &str)> = aliases
            .iter()
            .map(|(name, alias)| (name.as_str(), alias.as_str()))
            .collect();
        let body = rewrite_placeholders(&body?, &renames, ctx.config())?;
        let body = body.trim();
        if !body.is_empty() {
            parts.push(body.to_string());
        }
    }

    trace!(collection = source, iterations = parts.len(), "Evaluated iteration");

    let mut output = String::new();
    output.push_str(&node.open);
    output.push_str(&parts.join(node.separator.as_str()));
    output.push_str(&node.close);
    ctx.append_sql(&output);
    Ok(())
}

/// Point placeholder references to iteration variables at their unique
/// aliases so every iteration binds its own value.
///
/// A path placeholder is renamed when it starts with the variable name,
/// followed by the end of the path or one of `. , : [` or whitespace. In an
/// expression placeholder every path rooted at the variable is renamed.
fn rewrite_placeholders(
    text: &str,
    renames: &[(&str, &str)],
    config: &TemplateConfig,
) -> MapperResult<String> {
    if renames.is_empty() {
        return Ok(text.to_string());
    }

    let scanner = TokenScanner::new(&config.placeholder_open, &config.placeholder_close);
    let escaped_close = format!("\\{}", config.placeholder_close);
    let mut output = String::with_capacity(text.len());

    for token in scanner.tokens(text)? {
        match token {
            Token::Text(s) => output.push_str(s),
            Token::Escaped => {
                output.push('\\');
                output.push_str(scanner.open());
            }
            Token::Expr { content, .. } => {
                let content = rename_placeholder(&content, renames)?.unwrap_or(content);
                output.push_str(scanner.open());
                output.push_str(&content.replace(scanner.close(), &escaped_close));
                output.push_str(scanner.close());
            }
        }
    }

    Ok(output)
}

fn rename_placeholder(content: &str, renames: &[(&str, &str)]) -> MapperResult<Option<String>> {
    let head = split_top_level(content).first().copied().unwrap_or_default();
    let trimmed = head.trim();

    if trimmed.len() >= 2 && trimmed.starts_with('(') && trimmed.ends_with(')') {
        let start = head.len() - head.trim_start().len() + 1;
        let end = start + trimmed.len() - 2;
        let renamed = rename_roots(&content[start..end], renames)?;
        return Ok(renamed.map(|inner| format!("{}{}{}", &content[..start], inner, &content[end..])));
    }

    Ok(renames
        .iter()
        .find_map(|(name, alias)| rename_reference(content, name, alias)))
}

fn rename_reference(content: &str, name: &str, alias: &str) -> Option<String> {
    let leading = content.len() - content.trim_start().len();
    let after = content[leading..].strip_prefix(name)?;
    let boundary = after
        .chars()
        .next()
        .is_none_or(|c| matches!(c, '.' | ',' | ':' | '[') || c.is_whitespace());
    if !boundary {
        return None;
    }

    Some(format!("{}{}{}", &content[..leading], alias, after))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::scripting::node::{BindNode, IfNode};
    use pretty_assertions::assert_eq;

    fn resolve(root: &SqlNode, param: serde_json::Value) -> MapperResult<(String, Bindings)> {
        let param: Value = param.into();
        TemplateResolver::resolve_text(root, &param, &TemplateConfig::default())
    }

    #[test]
    fn test_if_and_trim() {
        let root = SqlNode::mixed(vec![
            SqlNode::text("SELECT * FROM users"),
            TrimNode::where_clause(SqlNode::mixed(vec![
                IfNode::new("name != null", SqlNode::text("AND name = {{name}}")).unwrap().into(),
                IfNode::new("age != null", SqlNode::text("AND age = {{age}}")).unwrap().into(),
            ]))
            .into(),
        ]);

        let (text, _) = resolve(&root, serde_json::json!({"age": 3})).unwrap();
        assert_eq!(text, "SELECT * FROM users WHERE age = {{age}}");

        let (text, _) = resolve(&root, serde_json::json!({})).unwrap();
        assert_eq!(text, "SELECT * FROM users");
    }

    #[test]
    fn test_choose() {
        let root: SqlNode = ChooseNode::new()
            .when("kind == 'a'", SqlNode::text("A"))
            .unwrap()
            .when("kind != null", SqlNode::text("B"))
            .unwrap()
            .otherwise(SqlNode::text("Z"))
            .into();

        assert_eq!(resolve(&root, serde_json::json!({"kind": "a"})).unwrap().0, "A");
        assert_eq!(resolve(&root, serde_json::json!({"kind": "b"})).unwrap().0, "B");
        assert_eq!(resolve(&root, serde_json::json!({})).unwrap().0, "Z");
    }

    #[test]
    fn test_inline_splice() {
        let root = SqlNode::inline("SELECT * FROM ${table} ORDER BY ${sort} -- ${missing}").unwrap();
        let (text, _) = resolve(&root, serde_json::json!({"table": "users", "sort": "name DESC"})).unwrap();
        assert_eq!(text, "SELECT * FROM users ORDER BY name DESC -- ");
    }

    #[test]
    fn test_foreach_rewrites_placeholders() {
        let root: SqlNode = ForEachNode::new("ids", SqlNode::text("{{id}}"))
            .unwrap()
            .item("id")
            .index("i")
            .open("id IN (")
            .close(")")
            .separator(", ")
            .into();

        let (text, bindings) = resolve(&root, serde_json::json!({"ids": [10, 20, 30]})).unwrap();
        assert_eq!(text, "id IN ({{__frch_id_0}}, {{__frch_id_1}}, {{__frch_id_2}})");
        assert_eq!(bindings.get("__frch_id_1"), Some(&Value::Int(20)));
        assert_eq!(bindings.get("__frch_i_2"), Some(&Value::Int(2)));
        assert!(!bindings.contains_key("id"));
    }

    #[test]
    fn test_foreach_reference_boundaries() {
        let root: SqlNode = ForEachNode::new(
            "users",
            SqlNode::text("({{u.name}}, {{ u , type=string}}, {{user}}, \\{{u}})"),
        )
        .unwrap()
        .item("u")
        .separator(",")
        .into();

        let (text, _) = resolve(&root, serde_json::json!({"users": [{"name": "a"}]})).unwrap();
        assert_eq!(text, "({{__frch_u_0.name}}, {{ __frch_u_0 , type=string}}, {{user}}, \\{{u}})");
    }

    #[test]
    fn test_foreach_map_and_range() {
        let root: SqlNode = ForEachNode::new("cols", SqlNode::inline("${k}=${v}").unwrap())
            .unwrap()
            .item("v")
            .index("k")
            .separator(" AND ")
            .into();
        let (text, _) = resolve(&root, serde_json::json!({"cols": {"a": 1, "b": 2}})).unwrap();
        assert_eq!(text, "a=1 AND b=2");

        let root: SqlNode = ForEachNode::new("3", SqlNode::inline("${n}").unwrap())
            .unwrap()
            .item("n")
            .separator(",")
            .into();
        assert_eq!(resolve(&root, serde_json::json!({})).unwrap().0, "0,1,2");
    }

    #[test]
    fn test_foreach_empty_emits_nothing() {
        let root: SqlNode = ForEachNode::new("ids", SqlNode::text("{{id}}"))
            .unwrap()
            .item("id")
            .open("(")
            .close(")")
            .into();
        assert_eq!(resolve(&root, serde_json::json!({"ids": []})).unwrap().0, "");
    }

    #[test]
    fn test_foreach_missing_collection() {
        let node = ForEachNode::new("ids", SqlNode::text("{{id}}")).unwrap().item("id");

        let err = resolve(&node.clone().into(), serde_json::json!({})).unwrap_err();
        assert_eq!(err.code, ErrorCode::BindingResolution);

        let nullable: SqlNode = node.nullable(true).into();
        assert_eq!(resolve(&nullable, serde_json::json!({"ids": null})).unwrap().0, "");
    }

    #[test]
    fn test_foreach_not_iterable() {
        let root: SqlNode = ForEachNode::new("name", SqlNode::text("x")).unwrap().into();
        let err = resolve(&root, serde_json::json!({"name": "ada"})).unwrap_err();
        assert_eq!(err.code, ErrorCode::NotIterable);
    }

    #[test]
    fn test_nested_foreach() {
        let inner: SqlNode = ForEachNode::new("row", SqlNode::text("{{cell}}"))
            .unwrap()
            .item("cell")
            .open("(")
            .close(")")
            .separator(",")
            .into();
        let root: SqlNode = ForEachNode::new("rows", inner).unwrap().item("row").separator(", ").into();

        let (text, bindings) = resolve(&root, serde_json::json!({"rows": [[1, 2], [3]]})).unwrap();
        assert_eq!(text, "({{__frch_cell_1}},{{__frch_cell_2}}), ({{__frch_cell_4}})");
        assert_eq!(bindings.get("__frch_cell_4"), Some(&Value::Int(3)));
    }

    #[test]
    fn test_bind_in_iteration_is_scoped() {
        let body = SqlNode::mixed(vec![
            BindNode::new("label", "'#' + n").unwrap().into(),
            SqlNode::inline("${label}").unwrap(),
        ]);
        let root = SqlNode::mixed(vec![
            ForEachNode::new("2", body).unwrap().item("n").separator(",").into(),
            SqlNode::inline("[${label}]").unwrap(),
        ]);

        let (text, bindings) = resolve(&root, serde_json::json!({})).unwrap();
        assert_eq!(text, "#0,#1 []");
        assert!(!bindings.contains_key("label"));
    }

    #[test]
    fn test_bind_in_iteration_gets_alias() {
        let body = SqlNode::mixed(vec![
            BindNode::new("label", "'#' + n").unwrap().into(),
            SqlNode::text("{{label}}"),
        ]);
        let root: SqlNode = ForEachNode::new("ns", body).unwrap().item("n").separator(",").into();

        let (text, bindings) = resolve(&root, serde_json::json!({"ns": [1, 2]})).unwrap();
        assert_eq!(text, "{{__frch_label_0}},{{__frch_label_1}}");
        assert_eq!(bindings.get("__frch_label_0"), Some(&Value::from("#1")));
        assert_eq!(bindings.get("__frch_label_1"), Some(&Value::from("#2")));
        assert!(!bindings.contains_key("label"));
    }

    #[test]
    fn test_foreach_rewrites_expression_placeholders() {
        let root: SqlNode = ForEachNode::new(
            "ids",
            SqlNode::text("{{('id-' + id)}} {{ (0 + id + i) , type=int}} {{(ids.size)}}"),
        )
        .unwrap()
        .item("id")
        .index("i")
        .separator(";")
        .into();

        let (text, _) = resolve(&root, serde_json::json!({"ids": [5]})).unwrap();
        assert_eq!(
            text,
            "{{('id-' + __frch_id_0)}} {{ (0 + __frch_id_0 + __frch_i_0) , type=int}} {{(ids.size)}}"
        );
    }

    #[test]
    fn test_rename_reference() {
        assert_eq!(rename_reference(" item.id ", "item", "x_0").as_deref(), Some(" x_0.id "));
        assert_eq!(rename_reference("item, type=int", "item", "x_0").as_deref(), Some("x_0, type=int"));
        assert_eq!(rename_reference("items", "item", "x_0"), None);
        assert_eq!(rename_reference("other.item", "item", "x_0"), None);
    }
}
