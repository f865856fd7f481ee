//! Interceptor signatures and the per-interceptor signature index.

use super::kind::{ComponentKind, KindSet, Operation};
use crate::error::{MapperError, MapperResult};
use indexmap::{IndexMap, IndexSet};
use smol_str::SmolStr;
use std::fmt;

/// A declared `(kind, method)` pair an interceptor wants to intercept.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    /// The component kind.
    pub kind: ComponentKind,
    /// The method name on that kind.
    pub method: SmolStr,
}

impl Signature {
    /// Create a new signature.
    pub fn new(kind: ComponentKind, method: impl Into<SmolStr>) -> Self {
        Self {
            kind,
            method: method.into(),
        }
    }

    /// Signature on an executor method.
    pub fn executor(method: impl Into<SmolStr>) -> Self {
        Self::new(ComponentKind::Executor, method)
    }

    /// Signature on a statement handler method.
    pub fn statement_handler(method: impl Into<SmolStr>) -> Self {
        Self::new(ComponentKind::StatementHandler, method)
    }

    /// Signature on a parameter binder method.
    pub fn parameter_binder(method: impl Into<SmolStr>) -> Self {
        Self::new(ComponentKind::ParameterBinder, method)
    }

    /// Signature on a result materializer method.
    pub fn result_materializer(method: impl Into<SmolStr>) -> Self {
        Self::new(ComponentKind::ResultMaterializer, method)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.kind, self.method)
    }
}

/// Mapping from component kind to the set of intercepted operations.
///
/// Built once per interceptor from its declared signatures. Every listed
/// operation exists on its kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignatureIndex {
    entries: IndexMap<ComponentKind, IndexSet<Operation>>,
}

impl SignatureIndex {
    /// Build an index from declared signatures.
    ///
    /// Fails with a configuration error when the declaration is empty or a
    /// signature names an operation its kind does not declare.
    pub fn from_signatures<'a, I>(interceptor: &str, signatures: I) -> MapperResult<Self>
    where
        I: IntoIterator<Item = &'a Signature>,
    {
        let mut entries: IndexMap<ComponentKind, IndexSet<Operation>> = IndexMap::new();
        for signature in signatures {
            let operation = signature
                .kind
                .operation(&signature.method)
                .ok_or_else(|| {
                    MapperError::unknown_operation(signature.kind, signature.method.as_str())
                        .with_help(format!("Declared by interceptor {}", interceptor))
                })?;
            entries.entry(signature.kind).or_default().insert(operation);
        }

        if entries.is_empty() {
            return Err(MapperError::no_signatures(interceptor));
        }

        Ok(Self { entries })
    }

    /// Kinds with at least one intercepted operation.
    pub fn kinds(&self) -> KindSet {
        self.entries.keys().copied().collect()
    }

    /// Whether `operation` is intercepted.
    #[inline]
    pub fn contains(&self, operation: Operation) -> bool {
        self.entries
            .get(&operation.kind())
            .is_some_and(|ops| ops.contains(&operation))
    }

    /// Intercepted operations of one kind.
    pub fn operations(&self, kind: ComponentKind) -> Option<&IndexSet<Operation>> {
        self.entries.get(&kind)
    }

    /// Number of intercepted operations across all kinds.
    pub fn len(&self) -> usize {
        self.entries.values().map(IndexSet::len).sum()
    }

    /// Check if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::plugin::kind::{ExecutorOp, StatementOp};

    #[test]
    fn test_index_groups_by_kind() {
        let signatures = vec![
            Signature::executor("query"),
            Signature::executor("update"),
            Signature::statement_handler("prepare"),
            Signature::executor("query"),
        ];
        let index = SignatureIndex::from_signatures("Audit", &signatures).unwrap();

        assert_eq!(index.len(), 3);
        assert_eq!(index.kinds().len(), 2);
        assert!(index.contains(Operation::Executor(ExecutorOp::Query)));
        assert!(index.contains(Operation::StatementHandler(StatementOp::Prepare)));
        assert!(!index.contains(Operation::StatementHandler(StatementOp::Query)));
        assert!(!index.contains(Operation::Executor(ExecutorOp::Commit)));
    }

    #[test]
    fn test_empty_declaration_fails() {
        let err = SignatureIndex::from_signatures("Audit", &[]).unwrap_err();
        assert_eq!(err.code, ErrorCode::NoSignatures);
        assert!(err.message.contains("Audit"));
    }

    #[test]
    fn test_unknown_operation_fails() {
        let signatures = [Signature::executor("select")];
        let err = SignatureIndex::from_signatures("Audit", &signatures).unwrap_err();
        assert_eq!(err.code, ErrorCode::UnknownOperation);
        assert!(err.is_configuration_error());
        assert_eq!(err.context.operation.as_deref(), Some("Executor.select"));
    }

    #[test]
    fn test_camel_case_method_names() {
        let signatures = [Signature::result_materializer("handleResultSets")];
        let index = SignatureIndex::from_signatures("Paging", &signatures).unwrap();
        assert!(index.kinds().contains(ComponentKind::ResultMaterializer));
    }

    #[test]
    fn test_signature_display() {
        assert_eq!(Signature::parameter_binder("set_parameters").to_string(), "ParameterBinder.set_parameters");
    }
}
