//! Registration options and their normalization into tap records.
//!
//! A bare tap name is sugar for `{ name }`. Options may also arrive as
//! dynamic JSON (from a config file or a scripting bridge), in which case
//! anything other than a string or an object is rejected.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::record::{Tap, TapFn};
use crate::error::HookError;

/// Tap names a tap must run ahead of: one name or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Before {
    One(String),
    Many(Vec<String>),
}

impl Before {
    /// Deduplicate into a set; an empty list means no constraint.
    pub fn into_set(self) -> Option<BTreeSet<String>> {
        let set: BTreeSet<String> = match self {
            Before::One(name) => BTreeSet::from([name]),
            Before::Many(names) => names.into_iter().collect(),
        };
        (!set.is_empty()).then_some(set)
    }

    /// Iterate the names as given, duplicates included.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        let names: &[String] = match self {
            Before::One(name) => std::slice::from_ref(name),
            Before::Many(names) => names,
        };
        names.iter().map(String::as_str)
    }
}

impl From<&str> for Before {
    fn from(name: &str) -> Self {
        Before::One(name.to_string())
    }
}

impl From<String> for Before {
    fn from(name: String) -> Self {
        Before::One(name)
    }
}

impl From<Vec<String>> for Before {
    fn from(names: Vec<String>) -> Self {
        Before::Many(names)
    }
}

impl From<&[&str]> for Before {
    fn from(names: &[&str]) -> Self {
        Before::Many(names.iter().map(|n| n.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Before {
    fn from(names: [&str; N]) -> Self {
        Before::Many(names.iter().map(|n| n.to_string()).collect())
    }
}

/// Options accepted when registering a tap.
///
/// Fields the kernel does not recognise are kept in `extra` and end up on the
/// tap record, where interceptors and compile strategies can read them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TapOptions {
    /// Tap name (required by the time the tap is registered).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Ordering hint (lower runs earlier, default 0).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<i32>,

    /// Taps this one must run ahead of.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<Before>,

    /// Deprecated. Accepted and ignored apart from a one-time notice.
    /// An explicit `null` still counts as supplied.
    #[serde(
        default,
        deserialize_with = "supplied",
        skip_serializing_if = "Option::is_none"
    )]
    pub context: Option<Value>,

    /// Any other fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TapOptions {
    /// Options naming a tap and nothing else.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Set the stage.
    pub fn with_stage(mut self, stage: i32) -> Self {
        self.stage = Some(stage);
        self
    }

    /// Set the before constraint.
    pub fn with_before(mut self, before: impl Into<Before>) -> Self {
        self.before = Some(before.into());
        self
    }

    /// Set the deprecated context option.
    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }

    /// Add an extra metadata field.
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Layer these options over `defaults`.
    ///
    /// Shallow: every field set here wins, unset fields fall back to the
    /// default, and `extra` maps merge key by key.
    pub fn merge_defaults(self, defaults: &TapOptions) -> TapOptions {
        let mut extra = defaults.extra.clone();
        extra.extend(self.extra);
        TapOptions {
            name: self.name.or_else(|| defaults.name.clone()),
            stage: self.stage.or(defaults.stage),
            before: self.before.or_else(|| defaults.before.clone()),
            context: self.context.or_else(|| defaults.context.clone()),
            extra,
        }
    }

    /// Validate and turn into a tap record carrying `func`.
    ///
    /// Fails with `MissingName` when the name is absent or empty.
    pub fn into_tap<A, R>(self, hook: Option<&str>, func: TapFn<A, R>) -> Result<Tap<A, R>, HookError> {
        let name = match self.name {
            Some(name) if !name.is_empty() => name,
            _ => return Err(HookError::missing_name(hook)),
        };

        Ok(Tap {
            name,
            stage: self.stage.unwrap_or(0),
            before: self.before.and_then(Before::into_set),
            context: self.context.is_some(),
            extra: self.extra,
            func,
        })
    }
}

/// Deserialize a field that counts as set whenever its key is present.
fn supplied<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Anything that can be normalized into [`TapOptions`].
pub trait IntoTapOptions {
    fn into_tap_options(self) -> Result<TapOptions, HookError>;
}

impl IntoTapOptions for TapOptions {
    fn into_tap_options(self) -> Result<TapOptions, HookError> {
        Ok(self)
    }
}

impl IntoTapOptions for &TapOptions {
    fn into_tap_options(self) -> Result<TapOptions, HookError> {
        Ok(self.clone())
    }
}

impl IntoTapOptions for &str {
    fn into_tap_options(self) -> Result<TapOptions, HookError> {
        Ok(TapOptions::new(self))
    }
}

impl IntoTapOptions for String {
    fn into_tap_options(self) -> Result<TapOptions, HookError> {
        Ok(TapOptions::new(self))
    }
}

impl IntoTapOptions for Value {
    fn into_tap_options(self) -> Result<TapOptions, HookError> {
        match self {
            Value::String(name) => Ok(TapOptions::new(name)),
            Value::Object(map) => serde_json::from_value(Value::Object(map))
                .map_err(|e| HookError::invalid_options(e.to_string())),
            other => Err(HookError::invalid_options(format!(
                "expected a tap name or an options object, got {}",
                json_type(&other)
            ))),
        }
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
