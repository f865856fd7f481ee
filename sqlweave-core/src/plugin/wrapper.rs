//! Forwarding wrappers built around intercepted components.

use super::interceptor::SharedInterceptor;
use super::invocation::{Arg, Args, Invocation, Reply};
use super::kind::{
    BinderOp, Component, ComponentKind, ComponentResult, Executor, ExecutorOp, KindSet,
    MaterializerOp, Operation, ParameterBinder, ResultMaterializer, StatementHandler, StatementOp,
};
use super::signature::SignatureIndex;
use crate::error::{MapperError, MapperResult};
use crate::scripting::ResolvedQuery;
use crate::value::Value;
use smallvec::{SmallVec, smallvec};
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Outcome of wrapping a target with one interceptor.
#[derive(Clone)]
pub enum Wrapped {
    /// No declared kind matched; this is the original target.
    Unwrapped(Arc<dyn Component>),
    /// A forwarding wrapper exposing the matched kinds.
    Proxied(Arc<Plugin>),
}

impl Wrapped {
    /// Whether a wrapper was built.
    pub fn is_proxied(&self) -> bool {
        matches!(self, Self::Proxied(_))
    }

    /// Kinds exposed to callers.
    pub fn kinds(&self) -> KindSet {
        match self {
            Self::Unwrapped(target) => target.kinds(),
            Self::Proxied(plugin) => plugin.kinds,
        }
    }

    /// Use the outcome as a component.
    pub fn into_component(self) -> Arc<dyn Component> {
        match self {
            Self::Unwrapped(target) => target,
            Self::Proxied(plugin) => plugin as Arc<dyn Component>,
        }
    }
}

impl fmt::Debug for Wrapped {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unwrapped(target) => f.debug_tuple("Unwrapped").field(&target.kinds()).finish(),
            Self::Proxied(plugin) => f.debug_tuple("Proxied").field(plugin).finish(),
        }
    }
}

/// A forwarding wrapper around one target and one interceptor.
///
/// The wrapper exposes exactly the kinds that both the target provides and
/// the interceptor declared. Calls to declared operations are routed through
/// [`Interceptor::intercept`](super::Interceptor::intercept); every other call
/// goes straight to the target, and its result or failure is returned as is.
pub struct Plugin {
    target: Arc<dyn Component>,
    interceptor: SharedInterceptor,
    index: Arc<SignatureIndex>,
    kinds: KindSet,
}

impl Plugin {
    /// Wrap `target` with `interceptor` if any declared kind matches.
    ///
    /// Fails when the interceptor's declaration is empty or names an unknown
    /// operation.
    pub fn wrap(target: Arc<dyn Component>, interceptor: &SharedInterceptor) -> MapperResult<Wrapped> {
        let index = SignatureIndex::from_signatures(interceptor.name(), &interceptor.signatures())?;
        Ok(Self::wrap_with_index(target, interceptor, Arc::new(index)))
    }

    /// Wrap `target` using a prebuilt signature index.
    pub fn wrap_with_index(
        target: Arc<dyn Component>,
        interceptor: &SharedInterceptor,
        index: Arc<SignatureIndex>,
    ) -> Wrapped {
        let kinds = target.kinds().intersection(index.kinds());

        if kinds.is_empty() {
            trace!(interceptor = interceptor.name(), "No matching kinds, target left unwrapped");
            return Wrapped::Unwrapped(target);
        }

        crate::weave_debug!(
            interceptor = interceptor.name(),
            kinds = ?kinds,
            operations = index.len(),
            "Wrapping target"
        );

        Wrapped::Proxied(Arc::new(Self {
            target,
            interceptor: Arc::clone(interceptor),
            index,
            kinds,
        }))
    }

    /// The wrapped target.
    pub fn target(&self) -> &Arc<dyn Component> {
        &self.target
    }

    /// The interceptor.
    pub fn interceptor(&self) -> &SharedInterceptor {
        &self.interceptor
    }

    /// The interceptor's signature index.
    pub fn index(&self) -> &SignatureIndex {
        &self.index
    }

    fn intercept<T>(
        &self,
        operation: Operation,
        args: Args,
        reply: fn(Reply, Operation) -> ComponentResult<T>,
    ) -> ComponentResult<T> {
        trace!(
            interceptor = self.interceptor.name(),
            operation = %operation,
            "Intercepting call"
        );
        let invocation = Invocation::new(Arc::clone(&self.target), operation, args);
        reply(self.interceptor.intercept(invocation)?, operation)
    }

    fn executor(&self) -> ComponentResult<&dyn Executor> {
        self.target
            .as_executor()
            .ok_or_else(|| MapperError::missing_capability(ComponentKind::Executor).into())
    }

    fn statement_handler(&self) -> ComponentResult<&dyn StatementHandler> {
        self.target
            .as_statement_handler()
            .ok_or_else(|| MapperError::missing_capability(ComponentKind::StatementHandler).into())
    }

    fn parameter_binder(&self) -> ComponentResult<&dyn ParameterBinder> {
        self.target
            .as_parameter_binder()
            .ok_or_else(|| MapperError::missing_capability(ComponentKind::ParameterBinder).into())
    }

    fn result_materializer(&self) -> ComponentResult<&dyn ResultMaterializer> {
        self.target
            .as_result_materializer()
            .ok_or_else(|| MapperError::missing_capability(ComponentKind::ResultMaterializer).into())
    }
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin")
            .field("interceptor", &self.interceptor.name())
            .field("kinds", &self.kinds)
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}

impl Component for Plugin {
    fn as_executor(&self) -> Option<&dyn Executor> {
        self.kinds.contains(ComponentKind::Executor).then_some(self as &dyn Executor)
    }

    fn as_statement_handler(&self) -> Option<&dyn StatementHandler> {
        self.kinds
            .contains(ComponentKind::StatementHandler)
            .then_some(self as &dyn StatementHandler)
    }

    fn as_parameter_binder(&self) -> Option<&dyn ParameterBinder> {
        self.kinds
            .contains(ComponentKind::ParameterBinder)
            .then_some(self as &dyn ParameterBinder)
    }

    fn as_result_materializer(&self) -> Option<&dyn ResultMaterializer> {
        self.kinds
            .contains(ComponentKind::ResultMaterializer)
            .then_some(self as &dyn ResultMaterializer)
    }

    fn kinds(&self) -> KindSet {
        self.kinds
    }
}

impl Executor for Plugin {
    fn update(&self, query: &ResolvedQuery) -> ComponentResult<u64> {
        let operation = Operation::Executor(ExecutorOp::Update);
        if self.index.contains(operation) {
            return self.intercept(operation, smallvec![Arg::Query(query.clone())], Reply::into_count);
        }
        self.executor()?.update(query)
    }

    fn query(&self, query: &ResolvedQuery) -> ComponentResult<Vec<Value>> {
        let operation = Operation::Executor(ExecutorOp::Query);
        if self.index.contains(operation) {
            return self.intercept(operation, smallvec![Arg::Query(query.clone())], Reply::into_rows);
        }
        self.executor()?.query(query)
    }

    fn commit(&self, required: bool) -> ComponentResult<()> {
        let operation = Operation::Executor(ExecutorOp::Commit);
        if self.index.contains(operation) {
            return self.intercept(operation, smallvec![Arg::Flag(required)], Reply::into_unit);
        }
        self.executor()?.commit(required)
    }

    fn rollback(&self, required: bool) -> ComponentResult<()> {
        let operation = Operation::Executor(ExecutorOp::Rollback);
        if self.index.contains(operation) {
            return self.intercept(operation, smallvec![Arg::Flag(required)], Reply::into_unit);
        }
        self.executor()?.rollback(required)
    }

    fn close(&self, force_rollback: bool) -> ComponentResult<()> {
        let operation = Operation::Executor(ExecutorOp::Close);
        if self.index.contains(operation) {
            return self.intercept(operation, smallvec![Arg::Flag(force_rollback)], Reply::into_unit);
        }
        self.executor()?.close(force_rollback)
    }
}

impl StatementHandler for Plugin {
    fn prepare(&self, query: &ResolvedQuery) -> ComponentResult<ResolvedQuery> {
        let operation = Operation::StatementHandler(StatementOp::Prepare);
        if self.index.contains(operation) {
            return self.intercept(operation, smallvec![Arg::Query(query.clone())], Reply::into_query);
        }
        self.statement_handler()?.prepare(query)
    }

    fn parameterize(&self, query: &ResolvedQuery) -> ComponentResult<()> {
        let operation = Operation::StatementHandler(StatementOp::Parameterize);
        if self.index.contains(operation) {
            return self.intercept(operation, smallvec![Arg::Query(query.clone())], Reply::into_unit);
        }
        self.statement_handler()?.parameterize(query)
    }

    fn batch(&self, query: &ResolvedQuery) -> ComponentResult<()> {
        let operation = Operation::StatementHandler(StatementOp::Batch);
        if self.index.contains(operation) {
            return self.intercept(operation, smallvec![Arg::Query(query.clone())], Reply::into_unit);
        }
        self.statement_handler()?.batch(query)
    }

    fn update(&self, query: &ResolvedQuery) -> ComponentResult<u64> {
        let operation = Operation::StatementHandler(StatementOp::Update);
        if self.index.contains(operation) {
            return self.intercept(operation, smallvec![Arg::Query(query.clone())], Reply::into_count);
        }
        self.statement_handler()?.update(query)
    }

    fn query(&self, query: &ResolvedQuery) -> ComponentResult<Vec<Value>> {
        let operation = Operation::StatementHandler(StatementOp::Query);
        if self.index.contains(operation) {
            return self.intercept(operation, smallvec![Arg::Query(query.clone())], Reply::into_rows);
        }
        self.statement_handler()?.query(query)
    }
}

impl ParameterBinder for Plugin {
    fn parameter_object(&self) -> ComponentResult<Value> {
        let operation = Operation::ParameterBinder(BinderOp::ParameterObject);
        if self.index.contains(operation) {
            return self.intercept(operation, SmallVec::new(), Reply::into_value);
        }
        self.parameter_binder()?.parameter_object()
    }

    fn set_parameters(&self, query: &ResolvedQuery) -> ComponentResult<Vec<Value>> {
        let operation = Operation::ParameterBinder(BinderOp::SetParameters);
        if self.index.contains(operation) {
            return self.intercept(operation, smallvec![Arg::Query(query.clone())], Reply::into_rows);
        }
        self.parameter_binder()?.set_parameters(query)
    }
}

impl ResultMaterializer for Plugin {
    fn handle_result_sets(&self, rows: Vec<Value>) -> ComponentResult<Vec<Value>> {
        let operation = Operation::ResultMaterializer(MaterializerOp::HandleResultSets);
        if self.index.contains(operation) {
            return self.intercept(operation, smallvec![Arg::Rows(rows)], Reply::into_rows);
        }
        self.result_materializer()?.handle_result_sets(rows)
    }

    fn handle_output_parameters(&self, values: Vec<Value>) -> ComponentResult<()> {
        let operation = Operation::ResultMaterializer(MaterializerOp::HandleOutputParameters);
        if self.index.contains(operation) {
            return self.intercept(operation, smallvec![Arg::Rows(values)], Reply::into_unit);
        }
        self.result_materializer()?.handle_output_parameters(values)
    }
}
