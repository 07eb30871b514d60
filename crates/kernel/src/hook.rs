//! Hooks - typed extension points with lazily compiled dispatch.
//!
//! A hook owns its taps, its interceptors and three cached invokers (one per
//! invocation kind). Registration inserts into the tap registry and clears the
//! cache; invocation compiles the requested kind on first use and reuses it
//! until the next change.
//!
//! # Example
//!
//! ```ignore
//! let hook = uncino_sdk::series_hook::<(u32, u32), ()>(["a", "b"]).named("compile");
//! hook.tap("A", |(a, b)| { println!("A {a} {b}"); Ok(()) })?;
//! hook.tap(TapOptions::new("B").with_stage(-1), |_| Ok(()))?;
//! hook.call((1, 2))?; // runs B, then A
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::compile::{AbstractCompile, Compile, CompileOptions, CompiledInvoker};
use crate::deprecation::CONTEXT_DEPRECATION;
use crate::error::{HookError, hook_label};
use crate::intercept::{Interceptor, InterceptorChain};
use crate::scoped::ScopedHook;
use crate::tap::{DispatchCache, IntoTapOptions, Tap, TapCallback, TapFn, TapKind, TapOptions, TapRegistry};

/// A named extension point with a fixed argument shape `A`.
///
/// Taps return `R`; an invocation returns whatever the hook's compile
/// strategy produces, `O`.
pub struct Hook<A, R, O = ()> {
    name: Option<String>,
    args: Arc<[String]>,
    compiler: Arc<dyn Compile<A, R, Output = O>>,
    inner: Mutex<HookInner<A, R, O>>,
}

struct HookInner<A, R, O> {
    registry: TapRegistry<A, R>,
    interceptors: InterceptorChain<A, R>,
    cache: DispatchCache<A, O>,
}

impl<A, R, O> HookInner<A, R, O> {
    fn invalidate(&mut self, hook: &str) {
        let dropped = self.cache.reset();
        if dropped > 0 {
            debug!(hook = %hook, dropped, "compiled invokers invalidated");
        }
    }
}

impl<A, R, O> Hook<A, R, O>
where
    A: 'static,
    R: 'static,
    O: 'static,
{
    /// Create a hook with no compile strategy.
    ///
    /// Taps can be registered, but every invocation fails with
    /// [`HookError::AbstractMethod`] until a strategy is supplied.
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_compiler(args, AbstractCompile::<O>::default())
    }

    /// Create a hook driven by `compiler`.
    pub fn with_compiler<I, S, C>(args: I, compiler: C) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        C: Compile<A, R, Output = O> + 'static,
    {
        Self {
            name: None,
            args: args.into_iter().map(Into::into).collect(),
            compiler: Arc::new(compiler),
            inner: Mutex::new(HookInner {
                registry: TapRegistry::new(),
                interceptors: InterceptorChain::default(),
                cache: DispatchCache::default(),
            }),
        }
    }

    /// Set the display name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Display name, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Declared parameter names.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    fn label(&self) -> &str {
        hook_label(self.name.as_deref())
    }

    /// Register a sync tap.
    pub fn tap<F>(&self, options: impl IntoTapOptions, func: F) -> Result<(), HookError>
    where
        F: Fn(A) -> anyhow::Result<R> + Send + Sync + 'static,
    {
        self.register(options.into_tap_options()?, TapFn::sync(func))
    }

    /// Register a tap that reports its result through a callback.
    pub fn tap_async<F>(&self, options: impl IntoTapOptions, func: F) -> Result<(), HookError>
    where
        F: Fn(A, TapCallback<R>) + Send + Sync + 'static,
    {
        self.register(options.into_tap_options()?, TapFn::callback(func))
    }

    /// Register an async tap.
    pub fn tap_promise<F, Fut>(&self, options: impl IntoTapOptions, func: F) -> Result<(), HookError>
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
    {
        self.register(options.into_tap_options()?, TapFn::deferred(func))
    }

    /// Shared registration path: validate, intercept, insert, invalidate.
    pub(crate) fn register(&self, options: TapOptions, func: TapFn<A, R>) -> Result<(), HookError> {
        let tap = options.into_tap(self.name.as_deref(), func)?;
        if tap.context {
            CONTEXT_DEPRECATION.warn_once();
        }

        let mut inner = self.inner.lock();
        let tap = inner.interceptors.run_register(tap);
        if tap.name.is_empty() {
            return Err(HookError::missing_name(self.name.as_deref()));
        }
        let (name, kind, stage) = (tap.name.clone(), tap.kind(), tap.stage);
        let position = inner.registry.insert(tap);
        inner.invalidate(self.label());

        debug!(
            hook = %self.label(),
            tap = %name,
            kind = %kind,
            stage,
            position,
            taps = inner.registry.len(),
            "tap registered"
        );
        Ok(())
    }

    /// Add an interceptor.
    ///
    /// Its register transform, if any, is applied immediately to every tap
    /// already registered (in place, without reordering) and to every tap
    /// registered afterwards. Replacements that clear a tap's name are
    /// ignored for existing taps and rejected for new ones.
    pub fn intercept(&self, interceptor: Interceptor<A, R>) {
        let mut inner = self.inner.lock();
        inner.invalidate(self.label());

        let rewritten = match &interceptor.register {
            Some(register) => inner.registry.rewrite(|tap| register(tap)),
            None => 0,
        };

        debug!(
            hook = %self.label(),
            interceptor = interceptor.name.as_deref().unwrap_or("<unnamed>"),
            rewritten,
            "interceptor added"
        );
        inner.interceptors.push(interceptor);
    }

    /// A view that applies `defaults` under every registration's options.
    pub fn with_options(&self, defaults: TapOptions) -> ScopedHook<'_, A, R, O> {
        ScopedHook::new(self, defaults)
    }

    /// Whether any tap or interceptor is registered.
    pub fn is_used(&self) -> bool {
        let inner = self.inner.lock();
        !inner.registry.is_empty() || !inner.interceptors.is_empty()
    }

    /// Snapshot of the taps in invocation order.
    pub fn taps(&self) -> Vec<Tap<A, R>> {
        self.inner.lock().registry.as_slice().to_vec()
    }

    /// Tap names in invocation order.
    pub fn tap_names(&self) -> Vec<String> {
        self.inner.lock().registry.names().map(str::to_string).collect()
    }

    /// Snapshot of the interceptors in the order they were added.
    pub fn interceptors(&self) -> Vec<Interceptor<A, R>> {
        self.inner.lock().interceptors.as_slice().to_vec()
    }

    /// Whether an invoker for `kind` is currently cached.
    pub fn is_compiled(&self, kind: TapKind) -> bool {
        self.inner.lock().cache.is_compiled(kind)
    }

    /// Cached invoker for `kind`, compiling it if needed.
    ///
    /// The lock is held while compiling and released before the invoker runs,
    /// so taps may register further taps on this hook.
    fn invoker(&self, kind: TapKind) -> Result<CompiledInvoker<A, O>, HookError> {
        let mut guard = self.inner.lock();
        let HookInner {
            registry,
            interceptors,
            cache,
        } = &mut *guard;

        cache.get_or_compile(kind, self.name.as_deref(), || {
            debug!(hook = %self.label(), kind = %kind, taps = registry.len(), "compiling invoker");
            self.compiler.compile(CompileOptions {
                hook: self.name.clone(),
                taps: registry.as_slice().to_vec(),
                interceptors: interceptors.as_slice().to_vec(),
                args: Arc::clone(&self.args),
                kind,
            })
        })
    }

    /// Invoke the hook synchronously.
    pub fn call(&self, args: A) -> Result<O, HookError> {
        match self.invoker(TapKind::Sync)? {
            CompiledInvoker::Sync(invoker) => invoker(args),
            other => Err(HookError::kind_mismatch(self.name(), TapKind::Sync, other.kind())),
        }
    }

    /// Invoke the hook, reporting the result to `done`.
    ///
    /// Compile failures are reported to `done` as well.
    pub fn call_async<F>(&self, args: A, done: F)
    where
        F: FnOnce(Result<O, HookError>) + Send + 'static,
    {
        match self.invoker(TapKind::Callback) {
            Ok(CompiledInvoker::Callback(invoker)) => invoker(args, Box::new(done)),
            Ok(other) => done(Err(HookError::kind_mismatch(
                self.name(),
                TapKind::Callback,
                other.kind(),
            ))),
            Err(e) => done(Err(e)),
        }
    }

    /// Invoke the hook and await the result.
    pub async fn promise(&self, args: A) -> Result<O, HookError> {
        let invoker = match self.invoker(TapKind::Deferred)? {
            CompiledInvoker::Deferred(invoker) => invoker,
            other => {
                return Err(HookError::kind_mismatch(
                    self.name(),
                    TapKind::Deferred,
                    other.kind(),
                ));
            }
        };
        invoker(args).await
    }
}

impl<A, R, O> fmt::Debug for Hook<A, R, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Hook")
            .field("name", &self.name)
            .field("args", &self.args)
            .field("taps", &inner.registry.as_slice())
            .field("interceptors", &inner.interceptors.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::compile::BoxFuture;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns the names of the compiled taps without running them.
    struct Names {
        compiles: Arc<AtomicUsize>,
    }

    impl Compile<(u32, u32, u32), ()> for Names {
        type Output = Vec<String>;

        fn compile(
            &self,
            options: CompileOptions<(u32, u32, u32), ()>,
        ) -> Result<CompiledInvoker<(u32, u32, u32), Vec<String>>, HookError> {
            self.compiles.fetch_add(1, Ordering::SeqCst);
            let names: Vec<String> = options.taps.iter().map(|t| t.name.clone()).collect();
            Ok(match options.kind {
                TapKind::Sync => CompiledInvoker::Sync(Arc::new(
                    move |_: (u32, u32, u32)| -> Result<Vec<String>, HookError> { Ok(names.clone()) },
                )),
                TapKind::Callback => CompiledInvoker::Callback(Arc::new(
                    move |_: (u32, u32, u32), done: crate::compile::Done<Vec<String>>| {
                        done(Ok(names.clone()));
                    },
                )),
                TapKind::Deferred => CompiledInvoker::Deferred(Arc::new(
                    move |_: (u32, u32, u32)| -> BoxFuture<'static, Result<Vec<String>, HookError>> {
                        let names = names.clone();
                        Box::pin(async move { Ok(names) })
                    },
                )),
            })
        }
    }

    type TestHook = Hook<(u32, u32, u32), (), Vec<String>>;

    fn test_hook() -> (TestHook, Arc<AtomicUsize>) {
        let compiles = Arc::new(AtomicUsize::new(0));
        let hook = Hook::with_compiler(
            ["a", "b", "c"],
            Names {
                compiles: Arc::clone(&compiles),
            },
        )
        .named("test");
        (hook, compiles)
    }

    #[test]
    fn concrete_scenario_orders_b_c_a() {
        let (hook, _) = test_hook();
        hook.tap("A", |_| Ok(())).unwrap();
        hook.tap(TapOptions::new("B").with_stage(-1), |_| Ok(()))
            .unwrap();
        hook.tap(TapOptions::new("C").with_before("A"), |_| Ok(()))
            .unwrap();

        assert_eq!(hook.tap_names(), vec!["B", "C", "A"]);
        assert_eq!(hook.call((1, 2, 3)).unwrap(), vec!["B", "C", "A"]);
        assert_eq!(hook.args(), ["a", "b", "c"]);
    }

    #[test]
    fn compiles_once_between_mutations() {
        let (hook, compiles) = test_hook();
        hook.tap("A", |_| Ok(())).unwrap();

        hook.call((0, 0, 0)).unwrap();
        hook.call((0, 0, 0)).unwrap();
        assert_eq!(compiles.load(Ordering::SeqCst), 1);

        hook.tap("B", |_| Ok(())).unwrap();
        assert!(!hook.is_compiled(TapKind::Sync));
        assert_eq!(hook.call((0, 0, 0)).unwrap(), vec!["A", "B"]);
        assert_eq!(compiles.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn slots_are_independent() {
        let (hook, compiles) = test_hook();
        hook.tap("A", |_| Ok(())).unwrap();

        hook.call((0, 0, 0)).unwrap();
        assert!(hook.is_compiled(TapKind::Sync));
        assert!(!hook.is_compiled(TapKind::Callback));

        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        hook.call_async((0, 0, 0), move |result| {
            *sink.lock() = Some(result.unwrap());
        });
        assert_eq!(seen.lock().clone(), Some(vec!["A".to_string()]));
        assert_eq!(compiles.load(Ordering::SeqCst), 2);

        hook.intercept(Interceptor::new());
        for kind in TapKind::ALL {
            assert!(!hook.is_compiled(kind));
        }
    }

    #[tokio::test]
    async fn promise_uses_deferred_slot() {
        let (hook, compiles) = test_hook();
        hook.tap_promise("A", |_| async { Ok(()) }).unwrap();

        assert_eq!(hook.promise((0, 0, 0)).await.unwrap(), vec!["A"]);
        assert_eq!(hook.promise((0, 0, 0)).await.unwrap(), vec!["A"]);
        assert_eq!(compiles.load(Ordering::SeqCst), 1);
        assert!(hook.is_compiled(TapKind::Deferred));
    }

    #[test]
    fn missing_name_does_not_mutate() {
        let (hook, _) = test_hook();
        hook.tap("A", |_| Ok(())).unwrap();
        hook.call((0, 0, 0)).unwrap();

        let err = hook.tap("", |_| Ok(())).unwrap_err();
        assert!(matches!(err, HookError::MissingName { .. }));
        let err = hook.tap(json!({ "stage": 1 }), |_| Ok(())).unwrap_err();
        assert!(matches!(err, HookError::MissingName { .. }));
        let err = hook.tap(json!(42), |_| Ok(())).unwrap_err();
        assert!(matches!(err, HookError::InvalidOptions { .. }));

        assert_eq!(hook.tap_names(), vec!["A"]);
        assert!(hook.is_compiled(TapKind::Sync));
    }

    #[test]
    fn abstract_hook_fails_to_call() {
        let hook: Hook<(u32,), ()> = Hook::new(["value"]).named("abstract");
        hook.tap("A", |_| Ok(())).unwrap();

        let err = hook.call((1,)).unwrap_err();
        assert!(matches!(err, HookError::AbstractMethod { ref hook } if hook == "abstract"));
        assert!(!hook.is_compiled(TapKind::Sync));

        let failed = Arc::new(Mutex::new(false));
        let flag = Arc::clone(&failed);
        hook.call_async((1,), move |result| {
            *flag.lock() = matches!(result, Err(HookError::AbstractMethod { .. }));
        });
        assert!(*failed.lock());
    }

    #[test]
    fn is_used_tracks_taps_and_interceptors() {
        let (hook, _) = test_hook();
        assert!(!hook.is_used());
        hook.intercept(Interceptor::new());
        assert!(hook.is_used());

        let (hook, _) = test_hook();
        hook.tap_async("A", |_, done| done(Ok(()))).unwrap();
        assert!(hook.is_used());
    }

    #[test]
    fn interceptor_rewrites_existing_taps_in_place() {
        let (hook, _) = test_hook();
        hook.tap("A", |_| Ok(())).unwrap();
        hook.tap(TapOptions::new("B").with_stage(-1), |_| Ok(()))
            .unwrap();

        hook.intercept(Interceptor::new().named("tracer").on_register(|tap| {
            let mut tap = tap.clone();
            tap.extra.insert("traced".to_string(), json!(true));
            Some(tap)
        }));
        hook.tap("C", |_| Ok(())).unwrap();

        let taps = hook.taps();
        let names: Vec<_> = taps.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["B", "A", "C"]);
        assert!(taps.iter().all(|t| t.extra.get("traced") == Some(&json!(true))));
        assert_eq!(hook.interceptors().len(), 1);
    }

    #[test]
    fn debug_shows_taps() {
        let (hook, _) = test_hook();
        hook.tap("A", |_| Ok(())).unwrap();
        let rendered = format!("{hook:?}");
        assert!(rendered.contains("\"test\""));
        assert!(rendered.contains("\"A\""));
    }
}
