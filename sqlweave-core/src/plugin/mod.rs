//! Interceptor system for component operations.
//!
//! Interceptors declare which operations of the four component kinds they
//! care about and are wrapped around components when those are created.
//! Use cases include:
//!
//! - **Logging** - Log executed statements and their durations
//! - **Timing** - Collect execution time totals
//! - **Paging** - Rewrite statements or trim materialized rows
//! - **Auditing** - Record parameter objects before binding
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use sqlweave_core::plugin::{
//!     Component, ComponentResult, Executor, InterceptorChain, LoggingInterceptor,
//!     TimingInterceptor,
//! };
//! use sqlweave_core::{ResolvedQuery, Value};
//!
//! struct NoopExecutor;
//!
//! impl Executor for NoopExecutor {
//!     fn update(&self, _query: &ResolvedQuery) -> ComponentResult<u64> { Ok(0) }
//!     fn query(&self, _query: &ResolvedQuery) -> ComponentResult<Vec<Value>> { Ok(vec![]) }
//!     fn commit(&self, _required: bool) -> ComponentResult<()> { Ok(()) }
//!     fn rollback(&self, _required: bool) -> ComponentResult<()> { Ok(()) }
//!     fn close(&self, _force_rollback: bool) -> ComponentResult<()> { Ok(()) }
//! }
//!
//! impl Component for NoopExecutor {
//!     fn as_executor(&self) -> Option<&dyn Executor> { Some(self) }
//! }
//!
//! let mut chain = InterceptorChain::new();
//! chain.register(LoggingInterceptor::new());
//! chain.register(TimingInterceptor::new());
//!
//! let executor = chain.apply_all(Arc::new(NoopExecutor)).unwrap();
//! let rows = executor.as_executor().unwrap().query(&ResolvedQuery::default()).unwrap();
//! assert!(rows.is_empty());
//! ```

mod chain;
mod interceptor;
mod invocation;
mod kind;
mod logging;
mod signature;
mod timing;
mod wrapper;

pub use chain::{InterceptorChain, InterceptorChainBuilder};
pub use interceptor::{FnInterceptor, Interceptor, IntoSharedInterceptor, SharedInterceptor};
pub use invocation::{Arg, Args, Invocation, Reply};
pub use kind::{
    BinderOp, Component, ComponentError, ComponentKind, ComponentResult, Executor, ExecutorOp,
    KindSet, MaterializerOp, Operation, ParameterBinder, ResultMaterializer, StatementHandler,
    StatementOp,
};
pub use logging::{LogLevel, LoggingConfig, LoggingInterceptor};
pub use signature::{Signature, SignatureIndex};
pub use timing::{TimingInterceptor, TimingResult};
pub use wrapper::{Plugin, Wrapped};
