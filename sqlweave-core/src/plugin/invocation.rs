//! Captured calls passed to interceptors.

use super::kind::{
    BinderOp, Component, ComponentKind, ComponentResult, ExecutorOp, MaterializerOp, Operation,
    StatementOp,
};
use crate::error::MapperError;
use crate::scripting::ResolvedQuery;
use crate::value::Value;
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

/// A single invocation argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    /// A resolved query.
    Query(ResolvedQuery),
    /// A single value.
    Value(Value),
    /// A boolean flag (`required`, `force_rollback`).
    Flag(bool),
    /// A list of rows or values.
    Rows(Vec<Value>),
}

impl Arg {
    /// Shape name used in mismatch errors.
    pub fn shape(&self) -> &'static str {
        match self {
            Self::Query(_) => "query",
            Self::Value(_) => "value",
            Self::Flag(_) => "flag",
            Self::Rows(_) => "rows",
        }
    }
}

/// Arguments of an invocation; operations take at most one.
pub type Args = SmallVec<[Arg; 2]>;

/// The value an operation returns.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// No value.
    Unit,
    /// Affected row count.
    Count(u64),
    /// Rows or positional values.
    Rows(Vec<Value>),
    /// A single value.
    Value(Value),
    /// A resolved query.
    Query(ResolvedQuery),
}

impl Reply {
    /// Shape name used in mismatch errors.
    pub fn shape(&self) -> &'static str {
        match self {
            Self::Unit => "unit",
            Self::Count(_) => "count",
            Self::Rows(_) => "rows",
            Self::Value(_) => "value",
            Self::Query(_) => "query",
        }
    }

    fn mismatch(&self, operation: Operation, expected: &str) -> MapperError {
        MapperError::invocation_mismatch(operation, expected, self.shape())
    }

    /// Expect no value.
    pub fn into_unit(self, operation: Operation) -> ComponentResult<()> {
        match self {
            Self::Unit => Ok(()),
            other => Err(other.mismatch(operation, "unit").into()),
        }
    }

    /// Expect a row count.
    pub fn into_count(self, operation: Operation) -> ComponentResult<u64> {
        match self {
            Self::Count(n) => Ok(n),
            other => Err(other.mismatch(operation, "count").into()),
        }
    }

    /// Expect rows.
    pub fn into_rows(self, operation: Operation) -> ComponentResult<Vec<Value>> {
        match self {
            Self::Rows(rows) => Ok(rows),
            other => Err(other.mismatch(operation, "rows").into()),
        }
    }

    /// Expect a single value.
    pub fn into_value(self, operation: Operation) -> ComponentResult<Value> {
        match self {
            Self::Value(value) => Ok(value),
            other => Err(other.mismatch(operation, "value").into()),
        }
    }

    /// Expect a resolved query.
    pub fn into_query(self, operation: Operation) -> ComponentResult<ResolvedQuery> {
        match self {
            Self::Query(query) => Ok(query),
            other => Err(other.mismatch(operation, "query").into()),
        }
    }
}

/// A captured call on a wrapped component.
///
/// Interceptors receive one per intercepted call. Calling [`proceed`](Self::proceed)
/// runs the operation on the underlying target, which may itself be another
/// wrapper further down the chain. An interceptor may also replace the
/// arguments or skip `proceed` entirely and reply on its own.
pub struct Invocation {
    target: Arc<dyn Component>,
    operation: Operation,
    args: Args,
}

impl Invocation {
    /// Create a new invocation.
    pub fn new(target: Arc<dyn Component>, operation: Operation, args: Args) -> Self {
        Self {
            target,
            operation,
            args,
        }
    }

    /// The underlying target.
    pub fn target(&self) -> &Arc<dyn Component> {
        &self.target
    }

    /// The invoked operation.
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// The call arguments.
    pub fn args(&self) -> &[Arg] {
        &self.args
    }

    /// Mutable access to the call arguments.
    pub fn args_mut(&mut self) -> &mut Args {
        &mut self.args
    }

    /// The query argument, if the operation takes one.
    pub fn query(&self) -> Option<&ResolvedQuery> {
        self.args.iter().find_map(|arg| match arg {
            Arg::Query(q) => Some(q),
            _ => None,
        })
    }

    /// Call the original operation on the target.
    pub fn proceed(&self) -> ComponentResult<Reply> {
        dispatch(self.target.as_ref(), self.operation, &self.args)
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("operation", &self.operation)
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}

struct ArgReader<'a> {
    operation: Operation,
    args: &'a [Arg],
}

impl<'a> ArgReader<'a> {
    fn first(&self, expected: &str) -> ComponentResult<&'a Arg> {
        self.args.first().ok_or_else(|| {
            MapperError::invocation_mismatch(self.operation, expected, "no arguments").into()
        })
    }

    fn query(&self) -> ComponentResult<&'a ResolvedQuery> {
        match self.first("query")? {
            Arg::Query(q) => Ok(q),
            other => Err(MapperError::invocation_mismatch(self.operation, "query", other.shape()).into()),
        }
    }

    fn flag(&self) -> ComponentResult<bool> {
        match self.first("flag")? {
            Arg::Flag(b) => Ok(*b),
            other => Err(MapperError::invocation_mismatch(self.operation, "flag", other.shape()).into()),
        }
    }

    fn rows(&self) -> ComponentResult<Vec<Value>> {
        match self.first("rows")? {
            Arg::Rows(rows) => Ok(rows.clone()),
            other => Err(MapperError::invocation_mismatch(self.operation, "rows", other.shape()).into()),
        }
    }
}

fn missing(kind: ComponentKind) -> super::kind::ComponentError {
    MapperError::missing_capability(kind).into()
}

/// Run `operation` on `target` with the given arguments.
pub(crate) fn dispatch(
    target: &dyn Component,
    operation: Operation,
    args: &[Arg],
) -> ComponentResult<Reply> {
    let read = ArgReader { operation, args };

    match operation {
        Operation::Executor(op) => {
            let exec = target
                .as_executor()
                .ok_or_else(|| missing(ComponentKind::Executor))?;
            match op {
                ExecutorOp::Update => exec.update(read.query()?).map(Reply::Count),
                ExecutorOp::Query => exec.query(read.query()?).map(Reply::Rows),
                ExecutorOp::Commit => exec.commit(read.flag()?).map(|_| Reply::Unit),
                ExecutorOp::Rollback => exec.rollback(read.flag()?).map(|_| Reply::Unit),
                ExecutorOp::Close => exec.close(read.flag()?).map(|_| Reply::Unit),
            }
        }
        Operation::StatementHandler(op) => {
            let handler = target
                .as_statement_handler()
                .ok_or_else(|| missing(ComponentKind::StatementHandler))?;
            match op {
                StatementOp::Prepare => handler.prepare(read.query()?).map(Reply::Query),
                StatementOp::Parameterize => handler.parameterize(read.query()?).map(|_| Reply::Unit),
                StatementOp::Batch => handler.batch(read.query()?).map(|_| Reply::Unit),
                StatementOp::Update => handler.update(read.query()?).map(Reply::Count),
                StatementOp::Query => handler.query(read.query()?).map(Reply::Rows),
            }
        }
        Operation::ParameterBinder(op) => {
            let binder = target
                .as_parameter_binder()
                .ok_or_else(|| missing(ComponentKind::ParameterBinder))?;
            match op {
                BinderOp::ParameterObject => binder.parameter_object().map(Reply::Value),
                BinderOp::SetParameters => binder.set_parameters(read.query()?).map(Reply::Rows),
            }
        }
        Operation::ResultMaterializer(op) => {
            let materializer = target
                .as_result_materializer()
                .ok_or_else(|| missing(ComponentKind::ResultMaterializer))?;
            match op {
                MaterializerOp::HandleResultSets => {
                    materializer.handle_result_sets(read.rows()?).map(Reply::Rows)
                }
                MaterializerOp::HandleOutputParameters => materializer
                    .handle_output_parameters(read.rows()?)
                    .map(|_| Reply::Unit),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::plugin::kind::{ComponentResult, ResultMaterializer};
    use smallvec::smallvec;

    struct Doubler;

    impl ResultMaterializer for Doubler {
        fn handle_result_sets(&self, rows: Vec<Value>) -> ComponentResult<Vec<Value>> {
            Ok(rows.clone().into_iter().chain(rows).collect())
        }

        fn handle_output_parameters(&self, _values: Vec<Value>) -> ComponentResult<()> {
            Err("no output parameters".into())
        }
    }

    impl Component for Doubler {
        fn as_result_materializer(&self) -> Option<&dyn ResultMaterializer> {
            Some(self)
        }
    }

    fn handle_result_sets() -> Operation {
        Operation::ResultMaterializer(MaterializerOp::HandleResultSets)
    }

    #[test]
    fn test_proceed_dispatches_to_target() {
        let invocation = Invocation::new(
            Arc::new(Doubler),
            handle_result_sets(),
            smallvec![Arg::Rows(vec![Value::Int(1)])],
        );
        let reply = invocation.proceed().unwrap();
        assert_eq!(reply, Reply::Rows(vec![Value::Int(1), Value::Int(1)]));
    }

    #[test]
    fn test_proceed_with_replaced_args() {
        let mut invocation = Invocation::new(
            Arc::new(Doubler),
            handle_result_sets(),
            smallvec![Arg::Rows(vec![Value::Int(1)])],
        );
        invocation.args_mut()[0] = Arg::Rows(vec![Value::Int(2)]);
        let rows = invocation
            .proceed()
            .and_then(|r| r.into_rows(handle_result_sets()))
            .unwrap();
        assert_eq!(rows, vec![Value::Int(2), Value::Int(2)]);
    }

    #[test]
    fn test_target_failure_is_returned_unchanged() {
        let invocation = Invocation::new(
            Arc::new(Doubler),
            Operation::ResultMaterializer(MaterializerOp::HandleOutputParameters),
            smallvec![Arg::Rows(vec![])],
        );
        let err = invocation.proceed().unwrap_err();
        assert_eq!(err.to_string(), "no output parameters");
        assert!(err.downcast_ref::<MapperError>().is_none());
    }

    #[test]
    fn test_missing_capability() {
        let invocation = Invocation::new(
            Arc::new(Doubler),
            Operation::Executor(ExecutorOp::Commit),
            smallvec![Arg::Flag(true)],
        );
        let err = invocation.proceed().unwrap_err();
        let err = err.downcast_ref::<MapperError>().unwrap();
        assert_eq!(err.code, ErrorCode::MissingCapability);
    }

    #[test]
    fn test_argument_mismatch() {
        let invocation = Invocation::new(Arc::new(Doubler), handle_result_sets(), smallvec![Arg::Flag(true)]);
        let err = invocation.proceed().unwrap_err();
        let err = err.downcast_ref::<MapperError>().unwrap();
        assert_eq!(err.code, ErrorCode::InvocationMismatch);
        assert!(err.message.contains("expected rows but received flag"));
    }

    #[test]
    fn test_reply_conversion_mismatch() {
        let op = Operation::Executor(ExecutorOp::Update);
        assert_eq!(Reply::Count(3).into_count(op).unwrap(), 3);
        let err = Reply::Unit.into_count(op).unwrap_err();
        assert!(err.to_string().contains("Executor.update expected count but received unit"));
    }
}
