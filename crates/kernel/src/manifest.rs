//! Parser for tap manifest files.
//!
//! A manifest lets a plugin declare ordering hints for its taps out of band:
//!
//! ```toml
//! [taps.minify]
//! stage = 10
//! before = ["emit"]
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::HookError;
use crate::tap::{Before, TapOptions};

/// Ordering hints keyed by tap name.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TapManifest {
    #[serde(default)]
    pub taps: BTreeMap<String, TapOrdering>,
}

/// Ordering hints for one tap.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TapOrdering {
    /// Stage (lower runs earlier).
    #[serde(default)]
    pub stage: Option<i32>,

    /// Taps this one must run ahead of.
    #[serde(default)]
    pub before: Option<Before>,
}

impl TapManifest {
    /// Parse a manifest file from the given path.
    pub fn parse(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read tap manifest: {}", path.display()))?;

        Self::parse_str(&content)
            .with_context(|| format!("failed to load tap manifest at {}", path.display()))
    }

    /// Parse a manifest from a TOML string.
    pub fn parse_str(content: &str) -> Result<Self, HookError> {
        let manifest: TapManifest =
            toml::from_str(content).map_err(|e| HookError::manifest(e.to_string()))?;

        manifest.validate()?;
        Ok(manifest)
    }

    fn validate(&self) -> Result<(), HookError> {
        for (name, ordering) in &self.taps {
            if name.is_empty() {
                return Err(HookError::manifest("tap entry has an empty name"));
            }

            if let Some(before) = &ordering.before {
                if before.names().any(str::is_empty) {
                    return Err(HookError::manifest(format!(
                        "tap '{name}' has an empty name in 'before'"
                    )));
                }
            }
        }

        Ok(())
    }

    /// Registration options for `name`: the manifest's hints, or just the
    /// name when the manifest is silent about it.
    pub fn options_for(&self, name: &str) -> TapOptions {
        let mut options = TapOptions::new(name);
        if let Some(ordering) = self.taps.get(name) {
            options.stage = ordering.stage;
            options.before = ordering.before.clone();
        }
        options
    }

    /// Number of taps with hints.
    pub fn len(&self) -> usize {
        self.taps.len()
    }

    /// Whether the manifest declares no hints.
    pub fn is_empty(&self) -> bool {
        self.taps.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_manifest() {
        let toml = r#"
[taps.minify]
stage = 10
before = ["emit", "report"]

[taps.banner]
before = "minify"
"#;

        let manifest = TapManifest::parse_str(toml).unwrap();
        assert_eq!(manifest.len(), 2);

        let minify = manifest.options_for("minify");
        assert_eq!(minify.name.as_deref(), Some("minify"));
        assert_eq!(minify.stage, Some(10));
        assert_eq!(
            minify.before,
            Some(Before::Many(vec!["emit".to_string(), "report".to_string()]))
        );

        let banner = manifest.options_for("banner");
        assert_eq!(banner.stage, None);
        assert_eq!(banner.before, Some(Before::One("minify".to_string())));
    }

    #[test]
    fn silent_manifest_gives_plain_options() {
        let manifest = TapManifest::parse_str("").unwrap();
        assert!(manifest.is_empty());
        assert_eq!(manifest.options_for("emit"), TapOptions::new("emit"));
    }

    #[test]
    fn reject_empty_before_entry() {
        let toml = r#"
[taps.minify]
before = ["emit", ""]
"#;
        let err = TapManifest::parse_str(toml).unwrap_err();
        assert!(err.to_string().contains("empty name in 'before'"));
    }

    #[test]
    fn reject_empty_tap_name() {
        let toml = r#"
[taps.""]
stage = 1
"#;
        let err = TapManifest::parse_str(toml).unwrap_err();
        assert!(err.to_string().contains("empty name"));
    }

    #[test]
    fn reject_mistyped_stage() {
        let toml = r#"
[taps.minify]
stage = "late"
"#;
        let err = TapManifest::parse_str(toml).unwrap_err();
        assert!(matches!(err, HookError::Manifest { .. }));
    }

    #[test]
    fn parse_missing_file() {
        let err = TapManifest::parse(Path::new("/nonexistent/taps.toml")).unwrap_err();
        assert!(err.to_string().contains("failed to read tap manifest"));
    }
}
