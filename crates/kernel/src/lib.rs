//! Uncino Kernel Library
//!
//! Hooks are named extension points with a fixed argument shape. Plugins
//! register taps against a hook; the kernel keeps them in a deterministic
//! order (by stage and `before` constraints), runs them through any
//! registered interceptors, and hands the ordered list to a compile strategy
//! when the hook is first invoked. Concrete strategies (series, bail,
//! waterfall) live in the `uncino-sdk` crate.

pub mod compile;
pub mod config;
pub mod deprecation;
pub mod error;
pub mod hook;
pub mod intercept;
pub mod manifest;
pub mod scoped;
pub mod tap;

pub use compile::{
    AbstractCompile, BoxFuture, CallbackInvoker, Compile, CompileOptions, CompiledInvoker,
    DeferredInvoker, Done, SyncInvoker,
};
pub use config::Config;
pub use deprecation::{CONTEXT_DEPRECATION, DeprecationNotice};
pub use error::HookError;
pub use hook::Hook;
pub use intercept::{Interceptor, InterceptorChain};
pub use manifest::{TapManifest, TapOrdering};
pub use scoped::ScopedHook;
pub use tap::{Before, IntoTapOptions, Tap, TapCallback, TapFn, TapInfo, TapKind, TapOptions, TapRegistry};
