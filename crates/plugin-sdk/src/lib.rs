//! Uncino SDK
//!
//! Hook variants for plugins and applications. The kernel orders taps and
//! caches invokers; this crate supplies the compile strategies that actually
//! run them: a series driver and the sequential, bail and waterfall policies
//! built on it.

pub mod series;
pub mod variants;

pub use series::{Series, SeriesPolicy};
pub use variants::{
    Bail, BailHook, Sequential, SeriesHook, Waterfall, WaterfallHook, bail_hook, series_hook,
    waterfall_hook,
};

pub mod prelude {
    pub use crate::series::{Series, SeriesPolicy};
    pub use crate::variants::*;
    pub use uncino_kernel::{
        Before, Hook, HookError, Interceptor, ScopedHook, TapCallback, TapInfo, TapKind,
        TapManifest, TapOptions,
    };
}
