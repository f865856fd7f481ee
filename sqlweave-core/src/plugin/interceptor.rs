//! The interceptor trait.

use super::invocation::{Invocation, Reply};
use super::kind::{Component, ComponentResult};
use super::signature::Signature;
use super::wrapper::{Plugin, Wrapped};
use crate::error::MapperResult;
use std::fmt;
use std::sync::Arc;

/// Interceptor trait for augmenting component operations.
///
/// An interceptor declares the `(kind, method)` pairs it is interested in and
/// receives an [`Invocation`] for each matching call. From there it can:
/// - Inspect or replace the arguments
/// - Call through with [`Invocation::proceed`] and post-process the reply
/// - Short-circuit and reply on its own
/// - Fail; the error reaches the caller as is
///
/// # Example
///
/// ```rust
/// use sqlweave_core::plugin::{ComponentResult, Interceptor, Invocation, Reply, Signature};
///
/// struct ReadOnly;
///
/// impl Interceptor for ReadOnly {
///     fn signatures(&self) -> Vec<Signature> {
///         vec![Signature::executor("update")]
///     }
///
///     fn intercept(&self, _invocation: Invocation) -> ComponentResult<Reply> {
///         Err("database is read-only".into())
///     }
/// }
/// ```
pub trait Interceptor: Send + Sync {
    /// The operations this interceptor wants to see.
    fn signatures(&self) -> Vec<Signature>;

    /// Handle an intercepted call.
    fn intercept(&self, invocation: Invocation) -> ComponentResult<Reply>;

    /// Name of this interceptor (for debugging/logging).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Wrap `target` with this interceptor.
    fn wrap(self: Arc<Self>, target: Arc<dyn Component>) -> MapperResult<Wrapped>
    where
        Self: Sized + 'static,
    {
        let shared: SharedInterceptor = self;
        Plugin::wrap(target, &shared)
    }
}

/// An interceptor that can be shared across threads.
pub type SharedInterceptor = Arc<dyn Interceptor>;

/// Convenience trait for sharing interceptors.
pub trait IntoSharedInterceptor {
    /// Convert into a shared interceptor.
    fn into_shared(self) -> SharedInterceptor;
}

impl<T: Interceptor + 'static> IntoSharedInterceptor for T {
    fn into_shared(self) -> SharedInterceptor {
        Arc::new(self)
    }
}

type InterceptFn = dyn Fn(Invocation) -> ComponentResult<Reply> + Send + Sync;

/// An interceptor built from a closure.
///
/// ```rust
/// use sqlweave_core::plugin::{FnInterceptor, Interceptor, Signature};
///
/// let audit = FnInterceptor::new("audit", vec![Signature::executor("query")], |invocation| {
///     tracing::info!(operation = %invocation.operation(), "audited");
///     invocation.proceed()
/// });
/// assert_eq!(audit.name(), "audit");
/// ```
pub struct FnInterceptor {
    name: &'static str,
    signatures: Vec<Signature>,
    handler: Box<InterceptFn>,
}

impl FnInterceptor {
    /// Create a new closure interceptor.
    pub fn new<F>(name: &'static str, signatures: Vec<Signature>, handler: F) -> Self
    where
        F: Fn(Invocation) -> ComponentResult<Reply> + Send + Sync + 'static,
    {
        Self {
            name,
            signatures,
            handler: Box::new(handler),
        }
    }
}

impl fmt::Debug for FnInterceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnInterceptor")
            .field("name", &self.name)
            .field("signatures", &self.signatures)
            .finish_non_exhaustive()
    }
}

impl Interceptor for FnInterceptor {
    fn signatures(&self) -> Vec<Signature> {
        self.signatures.clone()
    }

    fn intercept(&self, invocation: Invocation) -> ComponentResult<Reply> {
        (self.handler)(invocation)
    }

    fn name(&self) -> &'static str {
        self.name
    }
}
