//! Tap system for hook extension points.
//!
//! Taps are named callbacks registered against a hook. When a hook is invoked,
//! its taps run in registry order: lower stage first, `before` constraints
//! honoured, registration order breaking ties.

mod dispatcher;
mod options;
mod record;
mod registry;

pub(crate) use dispatcher::DispatchCache;
pub use options::{Before, IntoTapOptions, TapOptions};
pub use record::{CallbackFn, DeferredFn, SyncFn, Tap, TapCallback, TapFn, TapInfo, TapKind};
pub use registry::TapRegistry;
