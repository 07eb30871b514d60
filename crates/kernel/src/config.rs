//! Configuration loaded from environment variables.

use std::env;
use std::sync::OnceLock;

use anyhow::{Result, bail};

/// Process-wide kernel configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Emit deprecation notices (default: true, disabled by `UNCINO_NO_DEPRECATION`).
    pub deprecation_warnings: bool,

    /// Attach a backtrace to deprecation notices (`UNCINO_TRACE_DEPRECATION`, default: false).
    pub trace_deprecation: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            deprecation_warnings: true,
            trace_deprecation: false,
        }
    }
}

static ACTIVE: OnceLock<Config> = OnceLock::new();

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let no_deprecation = parse_flag("UNCINO_NO_DEPRECATION", lookup("UNCINO_NO_DEPRECATION"))?;
        let trace_deprecation =
            parse_flag("UNCINO_TRACE_DEPRECATION", lookup("UNCINO_TRACE_DEPRECATION"))?;

        Ok(Self {
            deprecation_warnings: !no_deprecation,
            trace_deprecation,
        })
    }

    /// Install this configuration for the process.
    ///
    /// Only the first call (or first [`Config::active`] lookup) wins; a later
    /// call hands the rejected configuration back.
    pub fn install(self) -> std::result::Result<(), Config> {
        ACTIVE.set(self)
    }

    /// The installed configuration, loading it from the environment on first
    /// use. Invalid variables fall back to the defaults with a warning.
    pub fn active() -> &'static Config {
        ACTIVE.get_or_init(|| {
            Self::from_env().unwrap_or_else(|e| {
                tracing::warn!(error = %e, "invalid kernel configuration, using defaults");
                Self::default()
            })
        })
    }
}

fn parse_flag(key: &str, value: Option<String>) -> Result<bool> {
    let Some(value) = value else {
        return Ok(false);
    };

    match value.trim().to_lowercase().as_str() {
        "" | "0" | "false" | "no" | "off" => Ok(false),
        "1" | "true" | "yes" | "on" => Ok(true),
        other => bail!("{key} must be a boolean (1/0, true/false, yes/no, on/off), got '{other}'"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_map(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let config = from_map(&[]).unwrap();
        assert_eq!(config, Config::default());
        assert!(config.deprecation_warnings);
        assert!(!config.trace_deprecation);
    }

    #[test]
    fn no_deprecation_disables_notices() {
        let config = from_map(&[("UNCINO_NO_DEPRECATION", "1")]).unwrap();
        assert!(!config.deprecation_warnings);

        let config = from_map(&[("UNCINO_NO_DEPRECATION", "off")]).unwrap();
        assert!(config.deprecation_warnings);
    }

    #[test]
    fn trace_flag_is_case_insensitive() {
        let config = from_map(&[("UNCINO_TRACE_DEPRECATION", " TRUE ")]).unwrap();
        assert!(config.trace_deprecation);
    }

    #[test]
    fn reject_non_boolean_flag() {
        let err = from_map(&[("UNCINO_NO_DEPRECATION", "sometimes")]).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("UNCINO_NO_DEPRECATION"));
        assert!(msg.contains("sometimes"));
    }
}
