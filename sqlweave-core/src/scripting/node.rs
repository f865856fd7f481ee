//! Template node tree.
//!
//! Trees are built once by a mapping loader and shared read-only across
//! concurrent resolutions.
//!
//! ```rust
//! use sqlweave_core::scripting::{IfNode, SqlNode, TrimNode};
//!
//! let node = SqlNode::mixed(vec![
//!     SqlNode::text("SELECT * FROM users"),
//!     TrimNode::where_clause(SqlNode::mixed(vec![
//!         IfNode::new("name != null", SqlNode::text("AND name = {{name}}")).unwrap().into(),
//!         IfNode::new("age != null", SqlNode::text("AND age >= {{age}}")).unwrap().into(),
//!     ]))
//!     .into(),
//! ]);
//! assert!(node.is_dynamic());
//! ```

use super::expr::Expression;
use super::token::{Token, TokenScanner};
use crate::config::TemplateConfig;
use crate::error::MapperResult;
use smol_str::SmolStr;

/// A node of a dynamic query template.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlNode {
    /// Verbatim text.
    Text(String),
    /// Text with inline `${...}` splices.
    Inline(InlineText),
    /// Conditional body.
    If(IfNode),
    /// First matching branch.
    Choose(ChooseNode),
    /// Iteration over a collection.
    ForEach(ForEachNode),
    /// Prefix/suffix trimming.
    Trim(TrimNode),
    /// Binding of an evaluated expression.
    Bind(BindNode),
    /// Sequence of children.
    Mixed(Vec<SqlNode>),
}

impl SqlNode {
    /// Create a verbatim text node.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Create a text node with inline splices using the default delimiters.
    pub fn inline(text: &str) -> MapperResult<Self> {
        InlineText::parse(text, &TemplateConfig::default()).map(Self::Inline)
    }

    /// Create a text node, choosing between verbatim and inline text.
    ///
    /// Text without any inline splice becomes [`SqlNode::Text`].
    pub fn parse_text(text: &str, config: &TemplateConfig) -> MapperResult<Self> {
        let scanner = TokenScanner::new(&config.inline_open, &config.inline_close);
        if scanner.has_expressions(text) {
            InlineText::parse(text, config).map(Self::Inline)
        } else {
            Ok(Self::Text(text.to_string()))
        }
    }

    /// Create a sequence node.
    pub fn mixed(children: Vec<SqlNode>) -> Self {
        Self::Mixed(children)
    }

    /// Whether the output depends on the parameter.
    pub fn is_dynamic(&self) -> bool {
        match self {
            Self::Text(_) => false,
            Self::Mixed(children) => children.iter().any(SqlNode::is_dynamic),
            _ => true,
        }
    }

    /// Short node name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Inline(_) => "inline",
            Self::If(_) => "if",
            Self::Choose(_) => "choose",
            Self::ForEach(_) => "foreach",
            Self::Trim(_) => "trim",
            Self::Bind(_) => "bind",
            Self::Mixed(_) => "mixed",
        }
    }
}

/// Piece of inline text.
#[derive(Debug, Clone, PartialEq)]
pub enum InlinePart {
    /// Literal text, with escaped delimiters already unescaped.
    Text(String),
    /// Expression whose string form is spliced in.
    Expr(Expression),
}

/// Text with inline `${...}` splices.
///
/// Spliced values are inserted without any escaping and change the shape of
/// the query. Never splice untrusted input; use placeholders for values.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineText {
    source: String,
    parts: Vec<InlinePart>,
}

impl InlineText {
    /// Parse inline text with the configured delimiters.
    pub fn parse(text: &str, config: &TemplateConfig) -> MapperResult<Self> {
        let scanner = TokenScanner::new(&config.inline_open, &config.inline_close);
        let mut parts: Vec<InlinePart> = Vec::new();

        for token in scanner.tokens(text)? {
            let literal = match token {
                Token::Text(s) => s,
                Token::Escaped => scanner.open(),
                Token::Expr { content, offset } => {
                    let expr = Expression::parse(&content)
                        .map_err(|e| e.with_span(offset, text.to_string()))?;
                    parts.push(InlinePart::Expr(expr));
                    continue;
                }
            };
            match parts.last_mut() {
                Some(InlinePart::Text(prev)) => prev.push_str(literal),
                _ => parts.push(InlinePart::Text(literal.to_string())),
            }
        }

        Ok(Self {
            source: text.to_string(),
            parts,
        })
    }

    /// The original text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Parsed parts.
    pub fn parts(&self) -> &[InlinePart] {
        &self.parts
    }
}

/// Body evaluated only when the test is truthy.
#[derive(Debug, Clone, PartialEq)]
pub struct IfNode {
    /// The test expression.
    pub test: Expression,
    /// The body.
    pub body: Box<SqlNode>,
}

impl IfNode {
    /// Create a conditional node.
    pub fn new(test: &str, body: SqlNode) -> MapperResult<Self> {
        Ok(Self {
            test: Expression::parse(test)?,
            body: Box::new(body),
        })
    }
}

/// First-match branch selection with an optional fallback.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChooseNode {
    /// Branches tested in order.
    pub whens: Vec<IfNode>,
    /// Fallback when no branch matches.
    pub otherwise: Option<Box<SqlNode>>,
}

impl ChooseNode {
    /// Create an empty choose node.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a branch.
    pub fn when(mut self, test: &str, body: SqlNode) -> MapperResult<Self> {
        self.whens.push(IfNode::new(test, body)?);
        Ok(self)
    }

    /// Set the fallback.
    pub fn otherwise(mut self, body: SqlNode) -> Self {
        self.otherwise = Some(Box::new(body));
        self
    }
}

/// Repeats its body for each element of a collection.
///
/// Lists bind the element to `item` and its position to `index`; maps bind
/// the value and the key; a non-negative integer `n` iterates `0..n`.
#[derive(Debug, Clone, PartialEq)]
pub struct ForEachNode {
    /// Expression producing the collection.
    pub collection: Expression,
    /// Name bound to the current element.
    pub item: Option<SmolStr>,
    /// Name bound to the current index or key.
    pub index: Option<SmolStr>,
    /// Text emitted before the first element.
    pub open: String,
    /// Text emitted after the last element.
    pub close: String,
    /// Text emitted between elements.
    pub separator: String,
    /// Whether a missing or null collection is allowed.
    pub nullable: bool,
    /// The body.
    pub body: Box<SqlNode>,
}

impl ForEachNode {
    /// Create an iteration over `collection`.
    pub fn new(collection: &str, body: SqlNode) -> MapperResult<Self> {
        Ok(Self {
            collection: Expression::parse(collection)?,
            item: None,
            index: None,
            open: String::new(),
            close: String::new(),
            separator: String::new(),
            nullable: false,
            body: Box::new(body),
        })
    }

    /// Set the element name.
    pub fn item(mut self, name: impl Into<SmolStr>) -> Self {
        self.item = Some(name.into());
        self
    }

    /// Set the index name.
    pub fn index(mut self, name: impl Into<SmolStr>) -> Self {
        self.index = Some(name.into());
        self
    }

    /// Set the opening text.
    pub fn open(mut self, open: impl Into<String>) -> Self {
        self.open = open.into();
        self
    }

    /// Set the closing text.
    pub fn close(mut self, close: impl Into<String>) -> Self {
        self.close = close.into();
        self
    }

    /// Set the separator.
    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Allow a missing or null collection.
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }
}

/// Trims its body and wraps non-empty output in a prefix and suffix.
#[derive(Debug, Clone, PartialEq)]
pub struct TrimNode {
    /// The body.
    pub body: Box<SqlNode>,
    /// Text added before non-empty output.
    pub prefix: Option<String>,
    /// Text added after non-empty output.
    pub suffix: Option<String>,
    /// Leading tokens removed from the output, first match only.
    pub prefix_overrides: Vec<String>,
    /// Trailing tokens removed from the output, first match only.
    pub suffix_overrides: Vec<String>,
}

const WHERE_OVERRIDES: &[&str] = &[
    "AND ", "OR ", "AND\n", "OR\n", "AND\r", "OR\r", "AND\t", "OR\t",
];

impl TrimNode {
    /// Create a trim node without prefix, suffix or overrides.
    pub fn new(body: SqlNode) -> Self {
        Self {
            body: Box::new(body),
            prefix: None,
            suffix: None,
            prefix_overrides: Vec::new(),
            suffix_overrides: Vec::new(),
        }
    }

    /// `WHERE` clause that drops a leading `AND`/`OR`.
    pub fn where_clause(body: SqlNode) -> Self {
        Self::new(body)
            .prefix("WHERE")
            .with_prefix_overrides(WHERE_OVERRIDES.iter().map(|s| s.to_string()).collect())
    }

    /// `SET` clause that drops a dangling comma.
    pub fn set_clause(body: SqlNode) -> Self {
        Self::new(body)
            .prefix("SET")
            .with_prefix_overrides(vec![",".to_string()])
            .with_suffix_overrides(vec![",".to_string()])
    }

    /// Set the prefix.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Set the suffix.
    pub fn suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    /// Set prefix overrides from a `|`-separated list such as `"AND |OR "`.
    pub fn prefix_overrides(self, overrides: &str) -> Self {
        self.with_prefix_overrides(parse_overrides(overrides))
    }

    /// Set suffix overrides from a `|`-separated list.
    pub fn suffix_overrides(self, overrides: &str) -> Self {
        self.with_suffix_overrides(parse_overrides(overrides))
    }

    /// Set prefix overrides.
    pub fn with_prefix_overrides(mut self, overrides: Vec<String>) -> Self {
        self.prefix_overrides = overrides;
        self
    }

    /// Set suffix overrides.
    pub fn with_suffix_overrides(mut self, overrides: Vec<String>) -> Self {
        self.suffix_overrides = overrides;
        self
    }

    /// Apply trimming to an evaluated body.
    ///
    /// Returns an empty string when nothing is left after trimming.
    pub fn apply_to(&self, body: &str) -> String {
        let mut trimmed = body.trim();

        if let Some(found) = self
            .prefix_overrides
            .iter()
            .find(|o| starts_with_ignore_case(trimmed, o))
        {
            trimmed = trimmed[found.len()..].trim_start();
        }
        if let Some(found) = self
            .suffix_overrides
            .iter()
            .find(|o| ends_with_ignore_case(trimmed, o))
        {
            trimmed = trimmed[..trimmed.len() - found.len()].trim_end();
        }

        if trimmed.is_empty() {
            return String::new();
        }

        let mut output = String::with_capacity(trimmed.len() + 16);
        if let Some(prefix) = &self.prefix {
            output.push_str(prefix);
            output.push(' ');
        }
        output.push_str(trimmed);
        if let Some(suffix) = &self.suffix {
            output.push(' ');
            output.push_str(suffix);
        }
        output
    }
}

fn parse_overrides(overrides: &str) -> Vec<String> {
    overrides
        .split('|')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn starts_with_ignore_case(text: &str, pattern: &str) -> bool {
    text.get(..pattern.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(pattern))
}

fn ends_with_ignore_case(text: &str, pattern: &str) -> bool {
    text.len() >= pattern.len()
        && text
            .get(text.len() - pattern.len()..)
            .is_some_and(|tail| tail.eq_ignore_ascii_case(pattern))
}

/// Binds the value of an expression under a name.
#[derive(Debug, Clone, PartialEq)]
pub struct BindNode {
    /// Binding name.
    pub name: SmolStr,
    /// Value expression.
    pub value: Expression,
}

impl BindNode {
    /// Create a binding node.
    pub fn new(name: impl Into<SmolStr>, value: &str) -> MapperResult<Self> {
        Ok(Self {
            name: name.into(),
            value: Expression::parse(value)?,
        })
    }
}

macro_rules! into_node {
    ($($ty:ty => $variant:ident),+ $(,)?) => {
        $(
            impl From<$ty> for SqlNode {
                fn from(node: $ty) -> Self {
                    SqlNode::$variant(node)
                }
            }
        )+
    };
}

into_node! {
    InlineText => Inline,
    IfNode => If,
    ChooseNode => Choose,
    ForEachNode => ForEach,
    TrimNode => Trim,
    BindNode => Bind,
}
