//! Component kinds, their operations and capability traits.

use crate::scripting::ResolvedQuery;
use crate::value::Value;
use std::fmt;

/// Failure raised by a component or an interceptor.
///
/// Wrappers pass these through unchanged, so callers can downcast to the
/// concrete error type the target produced.
pub type ComponentError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for component operations.
pub type ComponentResult<T> = Result<T, ComponentError>;

/// The fixed set of component kinds an interceptor can wrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ComponentKind {
    /// Top-level executor.
    Executor,
    /// Low-level statement handler.
    StatementHandler,
    /// Statement-parameter binder.
    ParameterBinder,
    /// Result materializer.
    ResultMaterializer,
}

impl ComponentKind {
    /// All component kinds.
    pub const ALL: [ComponentKind; 4] = [
        Self::Executor,
        Self::StatementHandler,
        Self::ParameterBinder,
        Self::ResultMaterializer,
    ];

    /// Get the kind name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Executor => "Executor",
            Self::StatementHandler => "StatementHandler",
            Self::ParameterBinder => "ParameterBinder",
            Self::ResultMaterializer => "ResultMaterializer",
        }
    }

    /// Every operation declared by this kind.
    pub fn operations(&self) -> Vec<Operation> {
        match self {
            Self::Executor => ExecutorOp::ALL.iter().copied().map(Operation::Executor).collect(),
            Self::StatementHandler => StatementOp::ALL
                .iter()
                .copied()
                .map(Operation::StatementHandler)
                .collect(),
            Self::ParameterBinder => BinderOp::ALL
                .iter()
                .copied()
                .map(Operation::ParameterBinder)
                .collect(),
            Self::ResultMaterializer => MaterializerOp::ALL
                .iter()
                .copied()
                .map(Operation::ResultMaterializer)
                .collect(),
        }
    }

    /// Resolve a method name on this kind.
    pub fn operation(&self, method: &str) -> Option<Operation> {
        match self {
            Self::Executor => ExecutorOp::from_name(method).map(Operation::Executor),
            Self::StatementHandler => StatementOp::from_name(method).map(Operation::StatementHandler),
            Self::ParameterBinder => BinderOp::from_name(method).map(Operation::ParameterBinder),
            Self::ResultMaterializer => {
                MaterializerOp::from_name(method).map(Operation::ResultMaterializer)
            }
        }
    }

    fn bit(&self) -> u8 {
        1 << (*self as u8)
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

macro_rules! operations {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $snake:literal $(| $alias:literal)* ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// All operations of this kind.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Get the operation name.
            pub fn name(&self) -> &'static str {
                match self {
                    $( $name::$variant => $snake ),+
                }
            }

            /// Parse an operation from its snake_case or camelCase name.
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $( $snake $(| $alias)* => Some($name::$variant), )+
                    _ => None,
                }
            }
        }
    };
}

operations! {
    /// Operations of [`Executor`].
    ExecutorOp {
        /// `update(query) -> count`
        Update => "update",
        /// `query(query) -> rows`
        Query => "query",
        /// `commit(required)`
        Commit => "commit",
        /// `rollback(required)`
        Rollback => "rollback",
        /// `close(force_rollback)`
        Close => "close",
    }
}

operations! {
    /// Operations of [`StatementHandler`].
    StatementOp {
        /// `prepare(query) -> query`
        Prepare => "prepare",
        /// `parameterize(query)`
        Parameterize => "parameterize",
        /// `batch(query)`
        Batch => "batch",
        /// `update(query) -> count`
        Update => "update",
        /// `query(query) -> rows`
        Query => "query",
    }
}

operations! {
    /// Operations of [`ParameterBinder`].
    BinderOp {
        /// `parameter_object() -> value`
        ParameterObject => "parameter_object" | "getParameterObject" | "parameterObject",
        /// `set_parameters(query) -> values`
        SetParameters => "set_parameters" | "setParameters",
    }
}

operations! {
    /// Operations of [`ResultMaterializer`].
    MaterializerOp {
        /// `handle_result_sets(rows) -> rows`
        HandleResultSets => "handle_result_sets" | "handleResultSets",
        /// `handle_output_parameters(values)`
        HandleOutputParameters => "handle_output_parameters" | "handleOutputParameters",
    }
}

/// Identity of an operation on a component kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Executor operation.
    Executor(ExecutorOp),
    /// Statement handler operation.
    StatementHandler(StatementOp),
    /// Parameter binder operation.
    ParameterBinder(BinderOp),
    /// Result materializer operation.
    ResultMaterializer(MaterializerOp),
}

impl Operation {
    /// The kind that declares this operation.
    pub fn kind(&self) -> ComponentKind {
        match self {
            Self::Executor(_) => ComponentKind::Executor,
            Self::StatementHandler(_) => ComponentKind::StatementHandler,
            Self::ParameterBinder(_) => ComponentKind::ParameterBinder,
            Self::ResultMaterializer(_) => ComponentKind::ResultMaterializer,
        }
    }

    /// The operation name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Executor(op) => op.name(),
            Self::StatementHandler(op) => op.name(),
            Self::ParameterBinder(op) => op.name(),
            Self::ResultMaterializer(op) => op.name(),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.kind(), self.name())
    }
}

/// A small set of component kinds.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct KindSet(u8);

impl KindSet {
    /// Create an empty set.
    pub const fn new() -> Self {
        Self(0)
    }

    /// Add a kind.
    pub fn insert(&mut self, kind: ComponentKind) {
        self.0 |= kind.bit();
    }

    /// Check whether a kind is present.
    pub fn contains(&self, kind: ComponentKind) -> bool {
        self.0 & kind.bit() != 0
    }

    /// Kinds present in both sets.
    pub fn intersection(&self, other: KindSet) -> KindSet {
        KindSet(self.0 & other.0)
    }

    /// Check if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Number of kinds in the set.
    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Iterate the kinds in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = ComponentKind> + '_ {
        ComponentKind::ALL.into_iter().filter(|k| self.contains(*k))
    }
}

impl FromIterator<ComponentKind> for KindSet {
    fn from_iter<I: IntoIterator<Item = ComponentKind>>(iter: I) -> Self {
        let mut set = KindSet::new();
        for kind in iter {
            set.insert(kind);
        }
        set
    }
}

impl fmt::Debug for KindSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Top-level executor capability.
pub trait Executor: Send + Sync {
    /// Execute a mutation and return the affected row count.
    fn update(&self, query: &ResolvedQuery) -> ComponentResult<u64>;

    /// Execute a query and return its rows.
    fn query(&self, query: &ResolvedQuery) -> ComponentResult<Vec<Value>>;

    /// Commit the current transaction.
    fn commit(&self, required: bool) -> ComponentResult<()>;

    /// Roll back the current transaction.
    fn rollback(&self, required: bool) -> ComponentResult<()>;

    /// Close the executor.
    fn close(&self, force_rollback: bool) -> ComponentResult<()>;
}

/// Low-level statement handler capability.
pub trait StatementHandler: Send + Sync {
    /// Prepare a statement, possibly rewriting it.
    fn prepare(&self, query: &ResolvedQuery) -> ComponentResult<ResolvedQuery>;

    /// Bind the statement parameters.
    fn parameterize(&self, query: &ResolvedQuery) -> ComponentResult<()>;

    /// Add the statement to the current batch.
    fn batch(&self, query: &ResolvedQuery) -> ComponentResult<()>;

    /// Execute a mutation.
    fn update(&self, query: &ResolvedQuery) -> ComponentResult<u64>;

    /// Execute a query.
    fn query(&self, query: &ResolvedQuery) -> ComponentResult<Vec<Value>>;
}

/// Statement-parameter binder capability.
pub trait ParameterBinder: Send + Sync {
    /// The parameter object being bound.
    fn parameter_object(&self) -> ComponentResult<Value>;

    /// Produce the positional values for a resolved query.
    fn set_parameters(&self, query: &ResolvedQuery) -> ComponentResult<Vec<Value>>;
}

/// Result materializer capability.
pub trait ResultMaterializer: Send + Sync {
    /// Turn raw rows into result objects.
    fn handle_result_sets(&self, rows: Vec<Value>) -> ComponentResult<Vec<Value>>;

    /// Handle output parameters of a callable statement.
    fn handle_output_parameters(&self, values: Vec<Value>) -> ComponentResult<()>;
}

/// An object that may expose any of the component kinds.
///
/// Each accessor returns the capability when the object provides it, either
/// directly or through a delegate it owns.
///
/// ```rust
/// use sqlweave_core::plugin::{Component, ComponentKind, ComponentResult, ParameterBinder};
/// use sqlweave_core::{ResolvedQuery, Value};
///
/// struct Binder;
///
/// impl ParameterBinder for Binder {
///     fn parameter_object(&self) -> ComponentResult<Value> {
///         Ok(Value::Null)
///     }
///
///     fn set_parameters(&self, query: &ResolvedQuery) -> ComponentResult<Vec<Value>> {
///         Ok(query.values())
///     }
/// }
///
/// impl Component for Binder {
///     fn as_parameter_binder(&self) -> Option<&dyn ParameterBinder> {
///         Some(self)
///     }
/// }
///
/// assert!(Binder.kinds().contains(ComponentKind::ParameterBinder));
/// assert_eq!(Binder.kinds().len(), 1);
/// ```
pub trait Component: Send + Sync {
    /// Executor capability.
    fn as_executor(&self) -> Option<&dyn Executor> {
        None
    }

    /// Statement handler capability.
    fn as_statement_handler(&self) -> Option<&dyn StatementHandler> {
        None
    }

    /// Parameter binder capability.
    fn as_parameter_binder(&self) -> Option<&dyn ParameterBinder> {
        None
    }

    /// Result materializer capability.
    fn as_result_materializer(&self) -> Option<&dyn ResultMaterializer> {
        None
    }

    /// The kinds this object exposes.
    fn kinds(&self) -> KindSet {
        let mut kinds = KindSet::new();
        if self.as_executor().is_some() {
            kinds.insert(ComponentKind::Executor);
        }
        if self.as_statement_handler().is_some() {
            kinds.insert(ComponentKind::StatementHandler);
        }
        if self.as_parameter_binder().is_some() {
            kinds.insert(ComponentKind::ParameterBinder);
        }
        if self.as_result_materializer().is_some() {
            kinds.insert(ComponentKind::ResultMaterializer);
        }
        kinds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_lookup() {
        assert_eq!(
            ComponentKind::Executor.operation("query"),
            Some(Operation::Executor(ExecutorOp::Query))
        );
        assert_eq!(
            ComponentKind::ResultMaterializer.operation("handleResultSets"),
            Some(Operation::ResultMaterializer(MaterializerOp::HandleResultSets))
        );
        assert_eq!(ComponentKind::Executor.operation("select"), None);
        assert_eq!(ComponentKind::ParameterBinder.operation("query"), None);
    }

    #[test]
    fn test_same_name_distinct_kinds() {
        let exec = ComponentKind::Executor.operation("update").unwrap();
        let stmt = ComponentKind::StatementHandler.operation("update").unwrap();
        assert_ne!(exec, stmt);
        assert_eq!(exec.to_string(), "Executor.update");
        assert_eq!(stmt.to_string(), "StatementHandler.update");
    }

    #[test]
    fn test_kind_operations() {
        assert_eq!(ComponentKind::Executor.operations().len(), 5);
        assert_eq!(ComponentKind::StatementHandler.operations().len(), 5);
        assert_eq!(ComponentKind::ParameterBinder.operations().len(), 2);
        assert_eq!(ComponentKind::ResultMaterializer.operations().len(), 2);
    }

    #[test]
    fn test_kind_set() {
        let mut set = KindSet::new();
        assert!(set.is_empty());
        set.insert(ComponentKind::Executor);
        set.insert(ComponentKind::ResultMaterializer);
        set.insert(ComponentKind::Executor);

        assert_eq!(set.len(), 2);
        assert!(set.contains(ComponentKind::Executor));
        assert!(!set.contains(ComponentKind::StatementHandler));

        let other: KindSet = [ComponentKind::ResultMaterializer, ComponentKind::ParameterBinder]
            .into_iter()
            .collect();
        let common: Vec<_> = set.intersection(other).iter().collect();
        assert_eq!(common, vec![ComponentKind::ResultMaterializer]);
    }
}
