//! One-time deprecation notices.
//!
//! Each notice remembers whether it has fired. The flag lives in the notice
//! itself, so tests can build their own instances and the process-wide ones
//! can be re-armed with [`DeprecationNotice::reset`].

use std::backtrace::Backtrace;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::warn;

use crate::config::Config;

/// Notice emitted the first time a tap is registered with `context`.
pub static CONTEXT_DEPRECATION: DeprecationNotice = DeprecationNotice::new(
    "UNCINO_DEP_CONTEXT",
    "tap option 'context' is deprecated and will be removed",
);

/// A deprecation warning that is logged at most once until reset.
#[derive(Debug)]
pub struct DeprecationNotice {
    code: &'static str,
    message: &'static str,
    warned: AtomicBool,
}

impl DeprecationNotice {
    /// Create an armed notice.
    pub const fn new(code: &'static str, message: &'static str) -> Self {
        Self {
            code,
            message,
            warned: AtomicBool::new(false),
        }
    }

    /// Log the notice unless it already fired, honouring the active config.
    ///
    /// Returns whether the notice was logged by this call.
    pub fn warn_once(&self) -> bool {
        self.warn_once_with(Config::active())
    }

    /// Log the notice unless it already fired, honouring `config`.
    ///
    /// When notices are disabled the notice stays armed.
    pub fn warn_once_with(&self, config: &Config) -> bool {
        if !config.deprecation_warnings {
            return false;
        }
        if self.warned.swap(true, Ordering::AcqRel) {
            return false;
        }

        if config.trace_deprecation {
            let backtrace = Backtrace::force_capture();
            warn!(code = self.code, %backtrace, "{}", self.message);
        } else {
            warn!(code = self.code, "{}", self.message);
        }
        true
    }

    /// Whether the notice has fired since it was created or last reset.
    pub fn has_warned(&self) -> bool {
        self.warned.load(Ordering::Acquire)
    }

    /// Re-arm the notice.
    pub fn reset(&self) {
        self.warned.store(false, Ordering::Release);
    }

    /// Stable code identifying the notice.
    pub fn code(&self) -> &'static str {
        self.code
    }
}
