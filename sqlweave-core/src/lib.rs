//! # sqlweave-core
//!
//! Dynamic SQL templates and component interception for data-access layers.
//!
//! This crate provides:
//! - A tree of template nodes (`if`, `choose`, `foreach`, `trim`, `bind`)
//! - Two-stage resolution into query text with positional markers and
//!   ordered parameter descriptors
//! - Declarative interceptors wrapped around executors, statement handlers,
//!   parameter binders and result materializers
//! - Structured errors with codes and suggestions
//!
//! ## Templates
//!
//! Build a template and resolve it for a parameter object:
//!
//! ```rust
//! use sqlweave_core::scripting::{DynamicTemplate, IfNode, SqlNode, TrimNode};
//! use sqlweave_core::{Value, ValueType};
//!
//! let root = SqlNode::mixed(vec![
//!     SqlNode::text("SELECT * FROM users"),
//!     TrimNode::where_clause(SqlNode::mixed(vec![
//!         IfNode::new("a != null", SqlNode::text("AND a = {{a}}")).unwrap().into(),
//!         IfNode::new("b != null", SqlNode::text("AND b = {{b.c}}")).unwrap().into(),
//!     ]))
//!     .into(),
//! ]);
//! let template = DynamicTemplate::new(root);
//!
//! let param: Value = serde_json::json!({"a": 1, "b": {"c": "x"}}).into();
//! let query = template.resolve(&param).unwrap();
//!
//! assert_eq!(query.text(), "SELECT * FROM users WHERE a = ? AND b = ?");
//! assert_eq!(query.expressions(), vec!["a", "b.c"]);
//! assert_eq!(query.parameters()[1].value_type, ValueType::String);
//! ```
//!
//! ## Parameter Objects
//!
//! Any type implementing [`PathResolvable`] can be a parameter object:
//!
//! ```rust
//! use sqlweave_core::{PathResolvable, Value};
//!
//! #[derive(Debug)]
//! struct Search {
//!     name: String,
//! }
//!
//! impl PathResolvable for Search {
//!     fn field(&self, name: &str) -> Option<Value> {
//!         match name {
//!             "name" => Some(Value::from(self.name.as_str())),
//!             _ => None,
//!         }
//!     }
//! }
//!
//! let search = Search { name: "ada".into() };
//! assert_eq!(search.field("name"), Some(Value::from("ada")));
//! ```
//!
//! ## Interceptors
//!
//! Wrap a component with an ordered chain of interceptors:
//!
//! ```rust
//! use std::sync::Arc;
//! use sqlweave_core::plugin::{
//!     Component, ComponentResult, Executor, InterceptorChain, TimingInterceptor,
//! };
//! use sqlweave_core::{ResolvedQuery, Value};
//!
//! struct Db;
//!
//! impl Executor for Db {
//!     fn update(&self, _query: &ResolvedQuery) -> ComponentResult<u64> {
//!         Ok(1)
//!     }
//!     fn query(&self, _query: &ResolvedQuery) -> ComponentResult<Vec<Value>> {
//!         Ok(Vec::new())
//!     }
//!     fn commit(&self, _required: bool) -> ComponentResult<()> {
//!         Ok(())
//!     }
//!     fn rollback(&self, _required: bool) -> ComponentResult<()> {
//!         Ok(())
//!     }
//!     fn close(&self, _force_rollback: bool) -> ComponentResult<()> {
//!         Ok(())
//!     }
//! }
//!
//! impl Component for Db {
//!     fn as_executor(&self) -> Option<&dyn Executor> {
//!         Some(self)
//!     }
//! }
//!
//! let timing = Arc::new(TimingInterceptor::new());
//! let mut chain = InterceptorChain::new();
//! chain.register_shared(timing.clone());
//!
//! let db = chain.apply_all(Arc::new(Db)).unwrap();
//! let executor = db.as_executor().unwrap();
//! assert_eq!(executor.update(&ResolvedQuery::default()).unwrap(), 1);
//! assert_eq!(timing.call_count(), 1);
//! ```
//!
//! ## Configuration
//!
//! ```rust
//! use sqlweave_core::{MapEnvSource, MarkerStyle, TemplateConfig};
//!
//! let env = MapEnvSource::new().set("SQLWEAVE_MARKER_STYLE", "postgres");
//! let config = TemplateConfig::from_source(&env).unwrap();
//! assert_eq!(config.marker_style, MarkerStyle::Dollar);
//! ```
//!
//! ## Error Handling
//!
//! ```rust
//! use sqlweave_core::{ErrorCode, MapperError};
//!
//! let err = MapperError::binding_resolution("user.email");
//! assert_eq!(err.code, ErrorCode::BindingResolution);
//! assert!(err.is_binding_error());
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]

pub mod config;
pub mod error;
#[macro_use]
pub mod logging;
pub mod plugin;
pub mod scripting;
pub mod value;

pub use config::{EnvSource, MapEnvSource, MarkerStyle, StdEnvSource, TemplateConfig};
pub use error::{ErrorCode, ErrorContext, MapperError, MapperResult, Suggestion};
pub use value::{PathResolvable, Value, ValueType};

// Re-export template types
pub use scripting::{
    DynamicContext, DynamicTemplate, Expression, ParameterDescriptor, ParameterMode,
    PlaceholderTokenizer, ResolvedQuery, SqlNode, TemplateResolver,
};

// Re-export interception types
pub use plugin::{
    Component, ComponentError, ComponentKind, ComponentResult, Interceptor, InterceptorChain,
    InterceptorChainBuilder, Invocation, Operation, Plugin, Reply, Signature, SignatureIndex,
    Wrapped,
};

// Re-export logging utilities
pub use logging::{LogFormat, LogSettings, init as init_logging, is_debug_enabled};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::{MarkerStyle, TemplateConfig};
    pub use crate::error::{MapperError, MapperResult};
    pub use crate::plugin::{
        Component, ComponentResult, Executor, Interceptor, InterceptorChain, Invocation,
        ParameterBinder, Reply, ResultMaterializer, Signature, StatementHandler,
    };
    pub use crate::scripting::{
        BindNode, ChooseNode, DynamicTemplate, ForEachNode, IfNode, ResolvedQuery, SqlNode,
        TrimNode,
    };
    pub use crate::value::{PathResolvable, Value};
    pub use crate::mapper_error;
}
