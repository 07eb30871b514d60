//! Uncino test utilities.
//!
//! Helpers for integration testing: compile strategies that count or expose
//! what they were given, a shared call log for observing tap order, and
//! assertion helpers.

use std::sync::Arc;
use std::sync::Once;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use tracing_subscriber::EnvFilter;
use uncino_kernel::{
    BoxFuture, Compile, CompileOptions, CompiledInvoker, Done, HookError, TapKind,
};

/// Install a test subscriber honouring `RUST_LOG` (default `debug` for uncino crates).
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("uncino_kernel=debug,uncino_sdk=debug"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// Shared, cloneable log of events recorded by taps and interceptors.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an event.
    pub fn push(&self, entry: impl Into<String>) {
        self.entries.lock().push(entry.into());
    }

    /// Events recorded so far.
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    /// Forget recorded events.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// A sync tap payload that records `name` and returns `value`.
    pub fn recorder<A, R>(
        &self,
        name: &str,
        value: R,
    ) -> impl Fn(A) -> anyhow::Result<R> + Send + Sync + 'static
    where
        R: Clone + Send + Sync + 'static,
    {
        let log = self.clone();
        let name = name.to_string();
        move |_| {
            log.push(name.clone());
            Ok(value.clone())
        }
    }
}

/// Number and kinds of compiles observed by a [`CountingCompiler`].
#[derive(Debug, Clone, Default)]
pub struct CompileCounter {
    count: Arc<AtomicUsize>,
    kinds: Arc<Mutex<Vec<TapKind>>>,
}

impl CompileCounter {
    /// Total compiles so far.
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Compiles of one kind so far.
    pub fn count_of(&self, kind: TapKind) -> usize {
        self.kinds.lock().iter().filter(|k| **k == kind).count()
    }

    /// Kinds compiled, in order.
    pub fn kinds(&self) -> Vec<TapKind> {
        self.kinds.lock().clone()
    }

    fn record(&self, kind: TapKind) {
        self.count.fetch_add(1, Ordering::SeqCst);
        self.kinds.lock().push(kind);
    }
}

/// Wraps a compile strategy and counts how often it is asked to compile.
pub struct CountingCompiler<C> {
    inner: C,
    counter: CompileCounter,
}

impl<C> CountingCompiler<C> {
    /// Wrap `inner`, returning the wrapper and a handle to its counter.
    pub fn new(inner: C) -> (Self, CompileCounter) {
        let counter = CompileCounter::default();
        (
            Self {
                inner,
                counter: counter.clone(),
            },
            counter,
        )
    }
}

impl<A, R, C> Compile<A, R> for CountingCompiler<C>
where
    C: Compile<A, R>,
{
    type Output = C::Output;

    fn compile(
        &self,
        options: CompileOptions<A, R>,
    ) -> Result<CompiledInvoker<A, Self::Output>, HookError> {
        self.counter.record(options.kind);
        self.inner.compile(options)
    }
}

/// Compile strategy whose invokers return the compiled tap names without
/// running any tap. Shows the order a hook would run its taps in.
#[derive(Debug, Clone, Copy, Default)]
pub struct TapOrderCompiler;

impl<A, R> Compile<A, R> for TapOrderCompiler
where
    A: Send + 'static,
{
    type Output = Vec<String>;

    fn compile(
        &self,
        options: CompileOptions<A, R>,
    ) -> Result<CompiledInvoker<A, Vec<String>>, HookError> {
        let names: Arc<[String]> = options.taps.iter().map(|t| t.name.clone()).collect();

        Ok(match options.kind {
            TapKind::Sync => CompiledInvoker::Sync(Arc::new(
                move |_: A| -> Result<Vec<String>, HookError> { Ok(names.to_vec()) },
            )),
            TapKind::Callback => CompiledInvoker::Callback(Arc::new(
                move |_: A, done: Done<Vec<String>>| done(Ok(names.to_vec())),
            )),
            TapKind::Deferred => CompiledInvoker::Deferred(Arc::new(
                move |_: A| -> BoxFuture<'static, Result<Vec<String>, HookError>> {
                    let names = names.to_vec();
                    Box::pin(async move { Ok(names) })
                },
            )),
        })
    }
}

/// Assertion helpers.
pub mod assert {
    /// Assert that a string contains a substring.
    pub fn contains(haystack: &str, needle: &str) {
        assert!(
            haystack.contains(needle),
            "Expected string to contain '{needle}'\nActual: {haystack}"
        );
    }

    /// Assert that tap names appear in the expected order.
    pub fn order(actual: &[String], expected: &[&str]) {
        let actual: Vec<&str> = actual.iter().map(String::as_str).collect();
        assert_eq!(actual, expected, "tap order mismatch");
    }

    /// Assert that `first` appears before `second`.
    pub fn runs_before(actual: &[String], first: &str, second: &str) {
        let pos = |name: &str| {
            actual
                .iter()
                .position(|n| n == name)
                .unwrap_or_else(|| panic!("tap '{name}' not found in {actual:?}"))
        };
        assert!(
            pos(first) < pos(second),
            "Expected '{first}' before '{second}' in {actual:?}"
        );
    }
}
