//! Interceptor chain and builder.

use super::interceptor::{Interceptor, SharedInterceptor};
use super::kind::Component;
use super::signature::SignatureIndex;
use super::wrapper::Plugin;
use crate::error::MapperResult;
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// An ordered chain of interceptors applied to components.
///
/// The chain is assembled during setup and then only read. The first
/// registered interceptor becomes the outermost wrapper: it sees each call
/// first and, when it proceeds, hands the call to the next interceptor.
///
/// ```rust
/// use sqlweave_core::plugin::{FnInterceptor, InterceptorChain, Signature};
///
/// let mut chain = InterceptorChain::new();
/// chain.register(FnInterceptor::new("audit", vec![Signature::executor("query")], |i| i.proceed()));
/// assert_eq!(chain.len(), 1);
/// assert_eq!(chain.interceptors()[0].name(), "audit");
/// ```
#[derive(Default)]
pub struct InterceptorChain {
    interceptors: Vec<SharedInterceptor>,
    indices: Vec<OnceLock<Arc<SignatureIndex>>>,
}

impl InterceptorChain {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a chain with initial interceptors.
    pub fn with(interceptors: Vec<SharedInterceptor>) -> Self {
        let indices = interceptors.iter().map(|_| OnceLock::new()).collect();
        Self {
            interceptors,
            indices,
        }
    }

    /// Append an interceptor.
    ///
    /// Declarations are validated when the chain is applied.
    pub fn register<I: Interceptor + 'static>(&mut self, interceptor: I) {
        self.register_shared(Arc::new(interceptor));
    }

    /// Append a shared interceptor.
    pub fn register_shared(&mut self, interceptor: SharedInterceptor) {
        self.interceptors.push(interceptor);
        self.indices.push(OnceLock::new());
    }

    /// The registered interceptors in registration order.
    pub fn interceptors(&self) -> &[SharedInterceptor] {
        &self.interceptors
    }

    /// Get the number of interceptors in the chain.
    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    /// Check if the chain is empty.
    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    fn index(&self, position: usize) -> MapperResult<Arc<SignatureIndex>> {
        let slot = &self.indices[position];
        if let Some(index) = slot.get() {
            return Ok(Arc::clone(index));
        }

        let interceptor = &self.interceptors[position];
        let index = Arc::new(SignatureIndex::from_signatures(
            interceptor.name(),
            &interceptor.signatures(),
        )?);
        // A concurrent caller may have filled the slot first; both indices are equal.
        let _ = slot.set(Arc::clone(&index));
        Ok(index)
    }

    /// Wrap `target` with every registered interceptor.
    ///
    /// Wrapping starts from the last registered interceptor so that the
    /// first registered one ends up outermost. Returns the original target
    /// when no interceptor matches it.
    pub fn apply_all(&self, target: Arc<dyn Component>) -> MapperResult<Arc<dyn Component>> {
        let mut current = target;
        let mut wrapped = 0usize;

        for position in (0..self.interceptors.len()).rev() {
            let index = self.index(position)?;
            let outcome = Plugin::wrap_with_index(current, &self.interceptors[position], index);
            if outcome.is_proxied() {
                wrapped += 1;
            }
            current = outcome.into_component();
        }

        debug!(
            interceptors = self.interceptors.len(),
            wrapped = wrapped,
            "Applied interceptor chain"
        );

        Ok(current)
    }
}

impl fmt::Debug for InterceptorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.interceptors.iter().map(|i| i.name()))
            .finish()
    }
}

/// Builder for assembling an interceptor chain during setup.
#[derive(Default)]
pub struct InterceptorChainBuilder {
    interceptors: Vec<SharedInterceptor>,
}

impl InterceptorChainBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an interceptor.
    pub fn with<I: Interceptor + 'static>(mut self, interceptor: I) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    /// Add a shared interceptor.
    pub fn with_shared(mut self, interceptor: SharedInterceptor) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    /// Add an interceptor conditionally.
    pub fn with_if<I: Interceptor + 'static>(self, condition: bool, interceptor: I) -> Self {
        if condition {
            self.with(interceptor)
        } else {
            self
        }
    }

    /// Build the chain.
    pub fn build(self) -> InterceptorChain {
        InterceptorChain::with(self.interceptors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::plugin::interceptor::FnInterceptor;
    use crate::plugin::invocation::Reply;
    use crate::plugin::kind::{ComponentResult, ParameterBinder};
    use crate::plugin::signature::Signature;
    use crate::scripting::ResolvedQuery;
    use crate::value::Value;

    struct Binder;

    impl ParameterBinder for Binder {
        fn parameter_object(&self) -> ComponentResult<Value> {
            Ok(Value::from("target"))
        }

        fn set_parameters(&self, query: &ResolvedQuery) -> ComponentResult<Vec<Value>> {
            Ok(query.values())
        }
    }

    impl Component for Binder {
        fn as_parameter_binder(&self) -> Option<&dyn ParameterBinder> {
            Some(self)
        }
    }

    fn tagging(tag: &'static str) -> FnInterceptor {
        FnInterceptor::new(tag, vec![Signature::parameter_binder("parameter_object")], move |invocation| {
            match invocation.proceed()? {
                Reply::Value(value) => Ok(Reply::Value(Value::from(format!("{}({})", tag, value)))),
                other => Ok(other),
            }
        })
    }

    #[test]
    fn test_chain_empty() {
        let chain = InterceptorChain::new();
        assert!(chain.is_empty());
        assert_eq!(chain.len(), 0);

        let target: Arc<dyn Component> = Arc::new(Binder);
        let applied = chain.apply_all(Arc::clone(&target)).unwrap();
        assert!(Arc::ptr_eq(&applied, &target));
    }

    #[test]
    fn test_first_registered_is_outermost() {
        let chain = InterceptorChainBuilder::new()
            .with(tagging("a"))
            .with(tagging("b"))
            .build();

        let component = chain.apply_all(Arc::new(Binder)).unwrap();
        let value = component.as_parameter_binder().unwrap().parameter_object().unwrap();
        assert_eq!(value, Value::from("a(b(target))"));
    }

    #[test]
    fn test_apply_all_is_repeatable() {
        let mut chain = InterceptorChain::new();
        chain.register(tagging("a"));

        for _ in 0..2 {
            let component = chain.apply_all(Arc::new(Binder)).unwrap();
            let value = component.as_parameter_binder().unwrap().parameter_object().unwrap();
            assert_eq!(value, Value::from("a(target)"));
        }
    }

    #[test]
    fn test_invalid_declaration_fails_on_apply() {
        let mut chain = InterceptorChain::new();
        chain.register(FnInterceptor::new("empty", vec![], |i| i.proceed()));
        assert_eq!(chain.len(), 1);

        let err = chain.apply_all(Arc::new(Binder)).err().unwrap();
        assert_eq!(err.code, ErrorCode::NoSignatures);
    }

    #[test]
    fn test_builder_with_if() {
        let chain = InterceptorChainBuilder::new()
            .with_if(false, tagging("skipped"))
            .with_if(true, tagging("kept"))
            .build();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain.interceptors()[0].name(), "kept");
    }
}
