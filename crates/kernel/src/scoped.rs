//! Scoped registration with default options.
//!
//! A plugin that registers many taps with the same stage or metadata can take
//! a scoped view once and register through it.

use std::future::Future;

use crate::error::HookError;
use crate::hook::Hook;
use crate::intercept::Interceptor;
use crate::tap::{IntoTapOptions, TapCallback, TapFn, TapOptions};

/// A hook view that merges default options under every registration.
///
/// Caller-supplied fields win. Scoping a scoped view stacks the defaults.
pub struct ScopedHook<'a, A, R, O> {
    hook: &'a Hook<A, R, O>,
    defaults: TapOptions,
}

impl<'a, A, R, O> ScopedHook<'a, A, R, O>
where
    A: 'static,
    R: 'static,
    O: 'static,
{
    pub(crate) fn new(hook: &'a Hook<A, R, O>, defaults: TapOptions) -> Self {
        Self { hook, defaults }
    }

    /// Display name of the underlying hook.
    pub fn name(&self) -> Option<&str> {
        self.hook.name()
    }

    /// The defaults this view applies.
    pub fn defaults(&self) -> &TapOptions {
        &self.defaults
    }

    fn merge(&self, options: impl IntoTapOptions) -> Result<TapOptions, HookError> {
        Ok(options.into_tap_options()?.merge_defaults(&self.defaults))
    }

    /// Register a sync tap with the defaults applied.
    pub fn tap<F>(&self, options: impl IntoTapOptions, func: F) -> Result<(), HookError>
    where
        F: Fn(A) -> anyhow::Result<R> + Send + Sync + 'static,
    {
        self.hook.register(self.merge(options)?, TapFn::sync(func))
    }

    /// Register a callback tap with the defaults applied.
    pub fn tap_async<F>(&self, options: impl IntoTapOptions, func: F) -> Result<(), HookError>
    where
        F: Fn(A, TapCallback<R>) + Send + Sync + 'static,
    {
        self.hook.register(self.merge(options)?, TapFn::callback(func))
    }

    /// Register an async tap with the defaults applied.
    pub fn tap_promise<F, Fut>(&self, options: impl IntoTapOptions, func: F) -> Result<(), HookError>
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
    {
        self.hook.register(self.merge(options)?, TapFn::deferred(func))
    }

    /// Add an interceptor to the underlying hook.
    pub fn intercept(&self, interceptor: Interceptor<A, R>) {
        self.hook.intercept(interceptor);
    }

    /// Whether the underlying hook has any tap or interceptor.
    pub fn is_used(&self) -> bool {
        self.hook.is_used()
    }

    /// A view with `options` layered over this view's defaults.
    pub fn with_options(&self, options: TapOptions) -> ScopedHook<'a, A, R, O> {
        ScopedHook::new(self.hook, options.merge_defaults(&self.defaults))
    }
}

impl<A, R, O> Clone for ScopedHook<'_, A, R, O> {
    fn clone(&self) -> Self {
        Self {
            hook: self.hook,
            defaults: self.defaults.clone(),
        }
    }
}
