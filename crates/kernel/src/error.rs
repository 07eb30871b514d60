//! Hook error types with clear, actionable messages.
//!
//! Errors carry the hook's display name (or `<anonymous>`) and, where one is
//! involved, the tap name, so a misbehaving plugin can be found from the
//! message alone.

use thiserror::Error;

use crate::tap::TapKind;

/// Display name used for hooks constructed without a name.
pub const ANONYMOUS_HOOK: &str = "<anonymous>";

/// Errors raised while registering taps or invoking a hook.
#[derive(Debug, Error)]
pub enum HookError {
    /// Registration options were neither a tap name nor an options object.
    #[error("invalid tap options: {details}")]
    InvalidOptions { details: String },

    /// Registration options carried no name, or an empty one.
    #[error("hook '{hook}': missing name for tap")]
    MissingName { hook: String },

    /// The hook was invoked but no variant supplied a compile strategy.
    #[error(
        "hook '{hook}': compile is abstract and must be supplied by a hook variant (e.g. uncino_sdk::series_hook)"
    )]
    AbstractMethod { hook: String },

    /// A compile strategy returned an invoker for a different invocation kind.
    #[error("hook '{hook}': compile returned a {actual} invoker for a {expected} call")]
    InvokerKindMismatch {
        hook: String,
        expected: TapKind,
        actual: TapKind,
    },

    /// A tap was registered with a kind the invoked strategy cannot run.
    #[error("hook '{hook}': tap '{tap}' is a {kind} tap and cannot run in a {mode} call")]
    UnsupportedTapKind {
        hook: String,
        tap: String,
        kind: TapKind,
        mode: TapKind,
    },

    /// A tap's payload returned an error.
    #[error("hook '{hook}': tap '{tap}' failed: {source}")]
    TapFailed {
        hook: String,
        tap: String,
        #[source]
        source: anyhow::Error,
    },

    /// A callback tap dropped its continuation without calling it.
    #[error("hook '{hook}': tap '{tap}' dropped its callback without completing")]
    CallbackDropped { hook: String, tap: String },

    /// A tap manifest could not be parsed or failed validation.
    #[error("invalid tap manifest: {details}")]
    Manifest { details: String },
}

impl HookError {
    /// Create an invalid options error.
    pub fn invalid_options(details: impl Into<String>) -> Self {
        Self::InvalidOptions {
            details: details.into(),
        }
    }

    /// Create a missing name error for the given hook.
    pub fn missing_name(hook: Option<&str>) -> Self {
        Self::MissingName {
            hook: hook_label(hook).to_string(),
        }
    }

    /// Create an abstract compile error for the given hook.
    pub fn abstract_method(hook: Option<&str>) -> Self {
        Self::AbstractMethod {
            hook: hook_label(hook).to_string(),
        }
    }

    /// Create an invoker kind mismatch error.
    pub fn kind_mismatch(hook: Option<&str>, expected: TapKind, actual: TapKind) -> Self {
        Self::InvokerKindMismatch {
            hook: hook_label(hook).to_string(),
            expected,
            actual,
        }
    }

    /// Create an unsupported tap kind error.
    pub fn unsupported_tap(
        hook: impl Into<String>,
        tap: impl Into<String>,
        kind: TapKind,
        mode: TapKind,
    ) -> Self {
        Self::UnsupportedTapKind {
            hook: hook.into(),
            tap: tap.into(),
            kind,
            mode,
        }
    }

    /// Wrap a failure returned by a tap's payload.
    pub fn tap_failed(
        hook: impl Into<String>,
        tap: impl Into<String>,
        source: anyhow::Error,
    ) -> Self {
        Self::TapFailed {
            hook: hook.into(),
            tap: tap.into(),
            source,
        }
    }

    /// Create a dropped callback error.
    pub fn callback_dropped(hook: impl Into<String>, tap: impl Into<String>) -> Self {
        Self::CallbackDropped {
            hook: hook.into(),
            tap: tap.into(),
        }
    }

    /// Create a manifest error.
    pub fn manifest(details: impl Into<String>) -> Self {
        Self::Manifest {
            details: details.into(),
        }
    }

    /// Name of the tap involved, if the error concerns a single tap.
    pub fn tap_name(&self) -> Option<&str> {
        match self {
            Self::UnsupportedTapKind { tap, .. }
            | Self::TapFailed { tap, .. }
            | Self::CallbackDropped { tap, .. } => Some(tap),
            _ => None,
        }
    }
}

/// Resolve a hook's optional display name for messages and log fields.
pub fn hook_label(name: Option<&str>) -> &str {
    name.unwrap_or(ANONYMOUS_HOOK)
}
