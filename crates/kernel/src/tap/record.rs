//! Tap records - one registered callback plus its ordering metadata.

use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_core::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// How a tap's payload expects to be driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TapKind {
    /// Returns its result directly.
    Sync,
    /// Reports its result through a continuation.
    Callback,
    /// Returns a future resolving to its result.
    Deferred,
}

impl TapKind {
    /// Every invocation kind, in cache slot order.
    pub const ALL: [TapKind; 3] = [TapKind::Sync, TapKind::Callback, TapKind::Deferred];

    /// Lowercase name used in messages and log fields.
    pub fn as_str(self) -> &'static str {
        match self {
            TapKind::Sync => "sync",
            TapKind::Callback => "callback",
            TapKind::Deferred => "deferred",
        }
    }
}

impl fmt::Display for TapKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Continuation handed to callback taps. Must be called at most once.
pub type TapCallback<R> = Box<dyn FnOnce(anyhow::Result<R>) + Send>;

/// Payload of a sync tap.
pub type SyncFn<A, R> = Arc<dyn Fn(A) -> anyhow::Result<R> + Send + Sync>;

/// Payload of a callback tap.
pub type CallbackFn<A, R> = Arc<dyn Fn(A, TapCallback<R>) + Send + Sync>;

/// Payload of a deferred tap.
pub type DeferredFn<A, R> = Arc<dyn Fn(A) -> BoxFuture<'static, anyhow::Result<R>> + Send + Sync>;

/// The callable behind a tap, tagged with how it must be driven.
pub enum TapFn<A, R> {
    Sync(SyncFn<A, R>),
    Callback(CallbackFn<A, R>),
    Deferred(DeferredFn<A, R>),
}

impl<A, R> TapFn<A, R> {
    /// Wrap a function returning its result directly.
    pub fn sync<F>(func: F) -> Self
    where
        F: Fn(A) -> anyhow::Result<R> + Send + Sync + 'static,
    {
        Self::Sync(Arc::new(func))
    }

    /// Wrap a function reporting its result through a continuation.
    pub fn callback<F>(func: F) -> Self
    where
        F: Fn(A, TapCallback<R>) + Send + Sync + 'static,
    {
        Self::Callback(Arc::new(func))
    }

    /// Wrap an async function.
    pub fn deferred<F, Fut>(func: F) -> Self
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
    {
        Self::Deferred(Arc::new(move |args: A| -> BoxFuture<'static, anyhow::Result<R>> {
            Box::pin(func(args))
        }))
    }

    /// The invocation kind this payload requires.
    pub fn kind(&self) -> TapKind {
        match self {
            TapFn::Sync(_) => TapKind::Sync,
            TapFn::Callback(_) => TapKind::Callback,
            TapFn::Deferred(_) => TapKind::Deferred,
        }
    }
}

impl<A, R> Clone for TapFn<A, R> {
    fn clone(&self) -> Self {
        match self {
            TapFn::Sync(f) => TapFn::Sync(Arc::clone(f)),
            TapFn::Callback(f) => TapFn::Callback(Arc::clone(f)),
            TapFn::Deferred(f) => TapFn::Deferred(Arc::clone(f)),
        }
    }
}

/// A registered tap.
///
/// Created once at registration. Interceptors may rewrite a record before it
/// is inserted, and rewrite existing records in place when they are added;
/// nothing else mutates it.
pub struct Tap<A, R> {
    /// Tap name (non-empty).
    pub name: String,
    /// Ordering hint, lower runs earlier (default 0).
    pub stage: i32,
    /// Names of taps this one must run ahead of. Never empty when present.
    pub before: Option<BTreeSet<String>>,
    /// Whether the deprecated `context` option was supplied.
    pub context: bool,
    /// Registration option fields the kernel does not interpret.
    pub extra: Map<String, Value>,
    /// The callback itself.
    pub func: TapFn<A, R>,
}

impl<A, R> Tap<A, R> {
    /// The invocation kind of this tap's payload.
    pub fn kind(&self) -> TapKind {
        self.func.kind()
    }

    /// Whether `name` is in this tap's before-set.
    pub fn runs_before(&self, name: &str) -> bool {
        self.before.as_ref().is_some_and(|set| set.contains(name))
    }

    /// Serializable description of this tap, without its payload.
    pub fn info(&self) -> TapInfo {
        TapInfo {
            name: self.name.clone(),
            kind: self.kind(),
            stage: self.stage,
            before: self
                .before
                .as_ref()
                .map(|set| set.iter().cloned().collect())
                .unwrap_or_default(),
            extra: self.extra.clone(),
        }
    }
}

impl<A, R> Clone for Tap<A, R> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            stage: self.stage,
            before: self.before.clone(),
            context: self.context,
            extra: self.extra.clone(),
            func: self.func.clone(),
        }
    }
}

impl<A, R> fmt::Debug for Tap<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tap")
            .field("name", &self.name)
            .field("kind", &self.kind())
            .field("stage", &self.stage)
            .field("before", &self.before)
            .field("extra", &self.extra)
            .finish_non_exhaustive()
    }
}

/// Payload-free view of a tap, as seen by dispatch-time interceptors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TapInfo {
    pub name: String,
    pub kind: TapKind,
    pub stage: i32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub before: Vec<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}
