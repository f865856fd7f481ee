//! Dynamic SQL sources.

use super::context::DynamicContext;
use super::node::SqlNode;
use super::query::ResolvedQuery;
use super::resolver::TemplateResolver;
use super::tokenizer::PlaceholderTokenizer;
use crate::config::TemplateConfig;
use crate::error::MapperResult;
use crate::value::PathResolvable;
use std::sync::Arc;
use tracing::debug;

/// A statement template resolved per execution request.
///
/// The node tree and configuration are shared; every call to
/// [`resolve`](Self::resolve) works on its own context, so one template can
/// serve concurrent callers.
///
/// ```rust
/// use sqlweave_core::scripting::{DynamicTemplate, ForEachNode, SqlNode};
/// use sqlweave_core::Value;
///
/// let root = SqlNode::mixed(vec![
///     SqlNode::text("SELECT * FROM users WHERE id IN"),
///     ForEachNode::new("ids", SqlNode::text("{{id}}"))
///         .unwrap()
///         .item("id")
///         .open("(")
///         .close(")")
///         .separator(", ")
///         .into(),
/// ]);
/// let template = DynamicTemplate::new(root);
///
/// let param: Value = serde_json::json!({"ids": [3, 5]}).into();
/// let query = template.resolve(&param).unwrap();
/// assert_eq!(query.text(), "SELECT * FROM users WHERE id IN (?, ?)");
/// assert_eq!(query.values(), vec![Value::Int(3), Value::Int(5)]);
/// ```
#[derive(Debug, Clone)]
pub struct DynamicTemplate {
    root: Arc<SqlNode>,
    config: Arc<TemplateConfig>,
}

impl DynamicTemplate {
    /// Create a template with the default configuration.
    pub fn new(root: impl Into<Arc<SqlNode>>) -> Self {
        Self {
            root: root.into(),
            config: Arc::new(TemplateConfig::default()),
        }
    }

    /// Create a template with a shared configuration.
    ///
    /// Fails with an invalid configuration error when the delimiters are
    /// empty or overlap.
    pub fn with_config(
        root: impl Into<Arc<SqlNode>>,
        config: impl Into<Arc<TemplateConfig>>,
    ) -> MapperResult<Self> {
        let config = config.into();
        config.validate()?;
        Ok(Self {
            root: root.into(),
            config,
        })
    }

    /// The root node.
    pub fn root(&self) -> &SqlNode {
        &self.root
    }

    /// The configuration.
    pub fn config(&self) -> &TemplateConfig {
        &self.config
    }

    /// Resolve the template for one parameter object.
    ///
    /// Runs node evaluation, then placeholder tokenization. Every binding
    /// made during evaluation ends up in
    /// [`ResolvedQuery::extra_bindings`].
    pub fn resolve(&self, parameter: &dyn PathResolvable) -> MapperResult<ResolvedQuery> {
        let mut ctx = DynamicContext::new(parameter, &self.config);
        TemplateResolver::resolve(&self.root, &mut ctx)?;
        let (text, bindings) = ctx.into_parts();

        let query = PlaceholderTokenizer::new(&self.config).tokenize(&text, parameter, bindings)?;
        debug!(
            node = self.root.kind(),
            parameters = query.parameters().len(),
            "Resolved dynamic template"
        );
        Ok(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MarkerStyle;
    use crate::scripting::node::{ForEachNode, IfNode, TrimNode};
    use crate::value::Value;
    use pretty_assertions::assert_eq;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_template_is_shareable() {
        assert_send_sync::<DynamicTemplate>();
        assert_send_sync::<SqlNode>();
    }

    #[test]
    fn test_resolve_search() {
        let tags: SqlNode = ForEachNode::new("tags", SqlNode::text("{{t}}"))
            .unwrap()
            .item("t")
            .open("AND tag IN (")
            .close(")")
            .separator(",")
            .into();
        let root = SqlNode::mixed(vec![
            SqlNode::inline("SELECT * FROM ${table}").unwrap(),
            TrimNode::where_clause(SqlNode::mixed(vec![
                IfNode::new("name != null", SqlNode::text("AND name = {{name}}")).unwrap().into(),
                IfNode::new("tags.size > 0", tags).unwrap().into(),
            ]))
            .into(),
        ]);
        let config = TemplateConfig::default().with_marker_style(MarkerStyle::Dollar);
        let template = DynamicTemplate::with_config(root, config).unwrap();

        let param: Value = serde_json::json!({"table": "posts", "name": "x", "tags": ["a", "b"]}).into();
        let query = template.resolve(&param).unwrap();

        assert_eq!(query.text(), "SELECT * FROM posts WHERE name = $1 AND tag IN ($2,$3)");
        assert_eq!(query.expressions(), vec!["name", "__frch_t_0", "__frch_t_1"]);
        assert_eq!(query.values(), vec![Value::from("x"), Value::from("a"), Value::from("b")]);
        assert_eq!(query.binding("__frch_t_1"), Some(&Value::from("b")));
    }

    #[test]
    fn test_with_config_validates() {
        let err = DynamicTemplate::with_config(
            SqlNode::text("SELECT 1"),
            TemplateConfig::new().with_placeholder("", ""),
        )
        .unwrap_err();
        assert!(err.is_configuration_error());

        let err = DynamicTemplate::with_config(
            SqlNode::text("SELECT 1"),
            TemplateConfig::new().with_inline("{", "}"),
        )
        .unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let root = ForEachNode::new("ids", SqlNode::text("{{id}}"))
            .unwrap()
            .item("id")
            .separator(",");
        let template = DynamicTemplate::new(SqlNode::from(root));
        let param: Value = serde_json::json!({"ids": [1, 2]}).into();

        assert_eq!(template.resolve(&param).unwrap(), template.resolve(&param).unwrap());
    }
}
