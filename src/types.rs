//! Core types shared across resolution.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Prefix of every canonical handler name.
pub const HANDLER_PREFIX: &str = "include";

/// Characters that start a new word in a handler name.
const WORD_SEPARATORS: &[char] = &['_', ' ', '\t', '\r', '\n', '\x0c', '\x0b'];

/// Separator between segments of a scope identifier.
pub const SCOPE_SEPARATOR: char = '.';

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Canonical handler name for an include.
///
/// Words separated by underscores or ASCII whitespace (vertical tab included)
/// are re-cased into a single identifier: `"post_author"` becomes
/// `"includePostAuthor"`.
pub fn handler_name(include: &str) -> String {
    let mut name = String::from(HANDLER_PREFIX);
    for word in include.split(WORD_SEPARATORS) {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            name.extend(first.to_uppercase());
            name.push_str(chars.as_str());
        }
    }
    name
}

/// Per-include parameters, passed through to handlers unmodified.
///
/// Keys keep insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamBag(Map<String, Value>);

impl ParamBag {
    /// Create an empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter, replacing any previous value under `key`.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.0.get(key).and_then(Value::as_u64)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl From<Map<String, Value>> for ParamBag {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
