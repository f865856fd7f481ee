//! # sqlweave
//!
//! Dynamic SQL templates and component interception for data-access layers.
//!
//! sqlweave provides:
//! - Conditional, iterating and trimming template nodes resolved per request
//! - Placeholder extraction into positional markers with ordered parameter
//!   descriptors
//! - Declarative interceptors layered around executors, statement handlers,
//!   parameter binders and result materializers
//!
//! ## Quick Start
//!
//! ```rust
//! use sqlweave::prelude::*;
//!
//! let root = SqlNode::mixed(vec![
//!     SqlNode::text("SELECT * FROM users WHERE id IN"),
//!     ForEachNode::new("ids", SqlNode::text("{{id}}"))
//!         .unwrap()
//!         .item("id")
//!         .open("(")
//!         .close(")")
//!         .separator(", ")
//!         .into(),
//! ]);
//! let template = DynamicTemplate::new(root);
//!
//! let param: Value = serde_json::json!({"ids": [1, 2, 3]}).into();
//! let query = template.resolve(&param).unwrap();
//! assert_eq!(query.text(), "SELECT * FROM users WHERE id IN (?, ?, ?)");
//! assert_eq!(query.parameters().len(), 3);
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

/// Template nodes and two-stage resolution.
pub mod scripting {
    pub use sqlweave_core::scripting::*;
}

/// Interceptors, component kinds and wrapping.
pub mod plugin {
    pub use sqlweave_core::plugin::*;
}

/// Logging setup.
pub mod logging {
    pub use sqlweave_core::logging::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use sqlweave_core::prelude::*;
}

// Re-export key types at the crate root
pub use sqlweave_core::{
    Component, ComponentError, ComponentKind, ComponentResult, DynamicTemplate, ErrorCode,
    EnvSource, Interceptor, InterceptorChain, LogFormat, LogSettings, MapEnvSource, MapperError,
    MapperResult, MarkerStyle, ParameterDescriptor, ParameterMode, PathResolvable, ResolvedQuery, Signature,
    SqlNode, StdEnvSource, TemplateConfig, Value, ValueType, init_logging, mapper_error,
};
