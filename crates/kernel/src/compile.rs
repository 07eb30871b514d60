//! Compile contract between hooks and the strategies that run their taps.
//!
//! A hook never runs taps itself. On first invocation of a kind it hands a
//! snapshot of its taps and interceptors to a [`Compile`] implementation and
//! caches the invoker it gets back until the next registry or interceptor
//! change.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

pub use futures_core::future::BoxFuture;

use crate::error::HookError;
use crate::intercept::Interceptor;
use crate::tap::{Tap, TapKind};

/// Continuation receiving the result of a callback-kind invocation.
pub type Done<O> = Box<dyn FnOnce(Result<O, HookError>) + Send>;

/// Invoker for `call`.
pub type SyncInvoker<A, O> = Arc<dyn Fn(A) -> Result<O, HookError> + Send + Sync>;

/// Invoker for `call_async`.
pub type CallbackInvoker<A, O> = Arc<dyn Fn(A, Done<O>) + Send + Sync>;

/// Invoker for `promise`.
pub type DeferredInvoker<A, O> =
    Arc<dyn Fn(A) -> BoxFuture<'static, Result<O, HookError>> + Send + Sync>;

/// A compiled invoker, tagged with the kind it serves.
pub enum CompiledInvoker<A, O> {
    Sync(SyncInvoker<A, O>),
    Callback(CallbackInvoker<A, O>),
    Deferred(DeferredInvoker<A, O>),
}

impl<A, O> CompiledInvoker<A, O> {
    /// The invocation kind this invoker serves.
    pub fn kind(&self) -> TapKind {
        match self {
            CompiledInvoker::Sync(_) => TapKind::Sync,
            CompiledInvoker::Callback(_) => TapKind::Callback,
            CompiledInvoker::Deferred(_) => TapKind::Deferred,
        }
    }
}

impl<A, O> Clone for CompiledInvoker<A, O> {
    fn clone(&self) -> Self {
        match self {
            CompiledInvoker::Sync(f) => CompiledInvoker::Sync(Arc::clone(f)),
            CompiledInvoker::Callback(f) => CompiledInvoker::Callback(Arc::clone(f)),
            CompiledInvoker::Deferred(f) => CompiledInvoker::Deferred(Arc::clone(f)),
        }
    }
}

impl<A, O> fmt::Debug for CompiledInvoker<A, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CompiledInvoker").field(&self.kind()).finish()
    }
}

/// Snapshot handed to [`Compile::compile`].
pub struct CompileOptions<A, R> {
    /// Display name of the hook, if it has one.
    pub hook: Option<String>,
    /// Taps in invocation order.
    pub taps: Vec<Tap<A, R>>,
    /// Interceptors in registration order.
    pub interceptors: Vec<Interceptor<A, R>>,
    /// Declared parameter names.
    pub args: Arc<[String]>,
    /// Kind of invoker requested.
    pub kind: TapKind,
}

impl<A, R> CompileOptions<A, R> {
    /// Hook display name for messages and log fields.
    pub fn hook_label(&self) -> &str {
        crate::error::hook_label(self.hook.as_deref())
    }
}

impl<A, R> fmt::Debug for CompileOptions<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompileOptions")
            .field("hook", &self.hook)
            .field("taps", &self.taps)
            .field("interceptors", &self.interceptors.len())
            .field("args", &self.args)
            .field("kind", &self.kind)
            .finish()
    }
}

/// Turns a hook's ordered taps into an invoker for one invocation kind.
///
/// Implementations decide how taps are driven (in series, stopping early,
/// threading a value) and what the hook returns. The returned invoker must
/// match `options.kind`.
pub trait Compile<A, R>: Send + Sync {
    /// What an invocation of the hook produces.
    type Output;

    fn compile(
        &self,
        options: CompileOptions<A, R>,
    ) -> Result<CompiledInvoker<A, Self::Output>, HookError>;
}

/// Placeholder used by hooks constructed without a strategy. Always fails.
pub struct AbstractCompile<O>(PhantomData<fn() -> O>);

impl<O> Default for AbstractCompile<O> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<A, R, O> Compile<A, R> for AbstractCompile<O> {
    type Output = O;

    fn compile(&self, options: CompileOptions<A, R>) -> Result<CompiledInvoker<A, O>, HookError> {
        Err(HookError::abstract_method(options.hook.as_deref()))
    }
}
