//! Interceptors - transforms and observers attached to a hook.
//!
//! The kernel itself only uses the `register` transform: it runs on every new
//! tap, and when an interceptor is added it is replayed over the taps already
//! registered. The remaining capabilities are observation points that compile
//! strategies invoke while running taps.

use std::fmt;
use std::sync::Arc;

use crate::error::HookError;
use crate::tap::{Tap, TapInfo};

/// Rewrites a tap at registration. `None` keeps the tap as it is.
pub type RegisterFn<A, R> = Arc<dyn Fn(&Tap<A, R>) -> Option<Tap<A, R>> + Send + Sync>;

/// Observes the arguments of each invocation.
pub type CallFn<A> = Arc<dyn Fn(&A) + Send + Sync>;

/// Observes each tap just before it runs.
pub type TapObserverFn = Arc<dyn Fn(&TapInfo) + Send + Sync>;

/// Observes an invocation failing.
pub type ErrorFn = Arc<dyn Fn(&HookError) + Send + Sync>;

/// Observes an invocation completing.
pub type DoneFn = Arc<dyn Fn() + Send + Sync>;

/// A set of optional capabilities attached to a hook with `intercept`.
pub struct Interceptor<A, R> {
    /// Name shown in logs.
    pub name: Option<String>,
    pub register: Option<RegisterFn<A, R>>,
    pub call: Option<CallFn<A>>,
    pub tap: Option<TapObserverFn>,
    pub error: Option<ErrorFn>,
    pub done: Option<DoneFn>,
}

impl<A, R> Interceptor<A, R> {
    /// An interceptor with no capabilities.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the name shown in logs.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Rewrite taps at registration, and retroactively.
    pub fn on_register<F>(mut self, register: F) -> Self
    where
        F: Fn(&Tap<A, R>) -> Option<Tap<A, R>> + Send + Sync + 'static,
    {
        self.register = Some(Arc::new(register));
        self
    }

    /// Observe invocation arguments.
    pub fn on_call<F>(mut self, call: F) -> Self
    where
        F: Fn(&A) + Send + Sync + 'static,
    {
        self.call = Some(Arc::new(call));
        self
    }

    /// Observe each tap before it runs.
    pub fn on_tap<F>(mut self, tap: F) -> Self
    where
        F: Fn(&TapInfo) + Send + Sync + 'static,
    {
        self.tap = Some(Arc::new(tap));
        self
    }

    /// Observe failures.
    pub fn on_error<F>(mut self, error: F) -> Self
    where
        F: Fn(&HookError) + Send + Sync + 'static,
    {
        self.error = Some(Arc::new(error));
        self
    }

    /// Observe successful completion.
    pub fn on_done<F>(mut self, done: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.done = Some(Arc::new(done));
        self
    }
}

impl<A, R> Default for Interceptor<A, R> {
    fn default() -> Self {
        Self {
            name: None,
            register: None,
            call: None,
            tap: None,
            error: None,
            done: None,
        }
    }
}

impl<A, R> Clone for Interceptor<A, R> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            register: self.register.clone(),
            call: self.call.clone(),
            tap: self.tap.clone(),
            error: self.error.clone(),
            done: self.done.clone(),
        }
    }
}

impl<A, R> fmt::Debug for Interceptor<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interceptor")
            .field("name", &self.name)
            .field("register", &self.register.is_some())
            .field("call", &self.call.is_some())
            .field("tap", &self.tap.is_some())
            .field("error", &self.error.is_some())
            .field("done", &self.done.is_some())
            .finish()
    }
}

/// Interceptors of one hook, in the order they were added.
pub struct InterceptorChain<A, R> {
    interceptors: Vec<Interceptor<A, R>>,
}

impl<A, R> Default for InterceptorChain<A, R> {
    fn default() -> Self {
        Self {
            interceptors: Vec::new(),
        }
    }
}

impl<A, R> InterceptorChain<A, R> {
    /// Append an interceptor.
    pub fn push(&mut self, interceptor: Interceptor<A, R>) {
        self.interceptors.push(interceptor);
    }

    /// Run every register transform over a new tap, in chain order.
    pub fn run_register(&self, mut tap: Tap<A, R>) -> Tap<A, R> {
        for interceptor in &self.interceptors {
            if let Some(register) = &interceptor.register {
                if let Some(replacement) = register(&tap) {
                    tap = replacement;
                }
            }
        }
        tap
    }

    /// Interceptors in chain order.
    pub fn as_slice(&self) -> &[Interceptor<A, R>] {
        &self.interceptors
    }

    /// Number of interceptors.
    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    /// Whether the chain is empty.
    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::tap::{TapFn, TapOptions};
    use serde_json::json;

    fn tap(name: &str) -> Tap<(), ()> {
        TapOptions::new(name)
            .into_tap(None, TapFn::sync(|()| Ok(())))
            .unwrap()
    }

    fn tag(key: &'static str) -> Interceptor<(), ()> {
        Interceptor::new().on_register(move |tap: &Tap<(), ()>| {
            let mut tap = tap.clone();
            tap.extra.insert(key.to_string(), json!(tap.extra.len()));
            Some(tap)
        })
    }

    #[test]
    fn transforms_run_in_chain_order() {
        let mut chain = InterceptorChain::default();
        chain.push(tag("first"));
        chain.push(tag("second"));

        let tap = chain.run_register(tap("A"));
        assert_eq!(tap.extra.get("first"), Some(&json!(0)));
        assert_eq!(tap.extra.get("second"), Some(&json!(1)));
    }

    #[test]
    fn none_leaves_tap_unchanged() {
        let mut chain = InterceptorChain::default();
        chain.push(Interceptor::new().on_register(|_: &Tap<(), ()>| None));
        chain.push(Interceptor::new().named("observer").on_done(|| {}));

        let tap = chain.run_register(tap("A"));
        assert_eq!(tap.name, "A");
        assert!(tap.extra.is_empty());
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn debug_lists_capabilities() {
        let interceptor: Interceptor<(), ()> = Interceptor::new().named("trace").on_call(|()| {});
        let rendered = format!("{interceptor:?}");
        assert!(rendered.contains("trace"));
        assert!(rendered.contains("call: true"));
        assert!(rendered.contains("register: false"));
    }
}
