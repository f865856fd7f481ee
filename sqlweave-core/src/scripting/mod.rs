//! Two-stage dynamic SQL templates.
//!
//! A template is a tree of [`SqlNode`]s built by the configuration loader.
//! Resolving it for a parameter object happens in two stages:
//!
//! 1. [`TemplateResolver`] walks the tree against a fresh
//!    [`DynamicContext`]: conditions pick branches, iterations expand with
//!    uniquely aliased bindings, trims clean up clause keywords and inline
//!    `${...}` expressions are spliced into the text as-is.
//! 2. [`PlaceholderTokenizer`] replaces every `{{...}}` placeholder with a
//!    positional marker and records one [`ParameterDescriptor`] per marker,
//!    in text order.
//!
//! Inline splices are raw text and are not protected against SQL injection.
//! Use placeholders for values.
//!
//! ```rust
//! use sqlweave_core::scripting::{DynamicTemplate, IfNode, SqlNode, TrimNode};
//! use sqlweave_core::Value;
//!
//! let root = SqlNode::mixed(vec![
//!     SqlNode::text("SELECT * FROM users"),
//!     TrimNode::where_clause(SqlNode::mixed(vec![
//!         IfNode::new("name != null", SqlNode::text("AND name = {{name}}")).unwrap().into(),
//!         IfNode::new("email != null", SqlNode::text("AND email = {{email}}")).unwrap().into(),
//!     ]))
//!     .into(),
//! ]);
//! let template = DynamicTemplate::new(root);
//!
//! let param: Value = serde_json::json!({"email": "a@b.c"}).into();
//! let query = template.resolve(&param).unwrap();
//! assert_eq!(query.text(), "SELECT * FROM users WHERE email = ?");
//! assert_eq!(query.expressions(), vec!["email"]);
//! ```

pub mod context;
pub mod expr;
pub mod node;
pub mod query;
pub mod resolver;
pub mod template;
pub mod token;
pub mod tokenizer;

pub use context::{
    Bindings, DATABASE_ID_BINDING, DynamicContext, PARAMETER_BINDING, resolve_binding_path,
};
pub use expr::{Expression, Scope};
pub use node::{BindNode, ChooseNode, ForEachNode, IfNode, InlinePart, InlineText, SqlNode, TrimNode};
pub use query::{ParameterDescriptor, ParameterMode, ResolvedQuery};
pub use resolver::TemplateResolver;
pub use template::DynamicTemplate;
pub use token::{Token, TokenScanner};
pub use tokenizer::PlaceholderTokenizer;
