// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A best-effort, structural rendering of an error that crossed a worker boundary.
///
/// On the worker side, any value thrown out of a task is converted into one of these by
/// copying its own-enumerable properties. On the host side, a fresh error is reconstructed
/// from this struct, carrying the original `name` as a non-enforced tag rather than the
/// concrete error type, which cannot be reconstructed across the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedError {
    /// The thrown value's type name, e.g. `"RuntimeError"` or the name of a user-defined kind.
    pub name: String,
    /// The human-readable error message.
    pub message: String,
    /// A best-effort stack trace, if one could be captured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    /// Additional own-enumerable fields captured from the thrown value, minus functions.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

/// Maximum nesting depth preserved when walking a thrown value's extra fields.
///
/// `serde_json::Value` cannot itself contain a cycle, but a deeply (or adversarially) nested
/// value could still blow the stack or produce unbounded output, so depth is capped and anything
/// beyond it is replaced with a sentinel string.
const MAX_EXTRA_DEPTH: usize = 16;

impl SerializedError {
    /// Builds a [`SerializedError`] from a plain name and message, with no extra fields.
    #[must_use]
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            stack: None,
            extra: Map::new(),
        }
    }

    /// Builds a [`SerializedError`] from any standard error, using its `Display` for the
    /// message and its type name as a best-effort `name`.
    #[must_use]
    pub fn from_std_error(name: impl Into<String>, err: &(dyn std::error::Error + 'static)) -> Self {
        Self::new(name, err.to_string())
    }

    /// Attaches a stack trace.
    #[must_use]
    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    /// Attaches a JSON object's fields as extra, best-effort context, truncating any nesting
    /// past [`MAX_EXTRA_DEPTH`] with a sentinel value.
    #[must_use]
    pub fn with_extra(mut self, extra: Map<String, Value>) -> Self {
        self.extra = extra
            .into_iter()
            .map(|(k, v)| (k, bound_depth(v, MAX_EXTRA_DEPTH)))
            .collect();
        self
    }
}

impl std::fmt::Display for SerializedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.name, self.message)
    }
}

impl std::error::Error for SerializedError {}

fn bound_depth(value: Value, remaining: usize) -> Value {
    if remaining == 0 {
        return Value::String("[truncated: nesting too deep]".to_owned());
    }
    match value {
        Value::Array(items) => {
            Value::Array(items.into_iter().map(|v| bound_depth(v, remaining - 1)).collect())
        }
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, bound_depth(v, remaining - 1)))
                .collect(),
        ),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn round_trips_through_json() {
        let err = SerializedError::new("TaskError", "boom")
            .with_stack("at line 1")
            .with_extra(json!({"code": 42}).as_object().unwrap().clone());

        let encoded = serde_json::to_string(&err).unwrap();
        let decoded: SerializedError = serde_json::from_str(&encoded).unwrap();

        assert_eq!(decoded, err);
    }

    #[test]
    fn omits_empty_extra_and_stack() {
        let err = SerializedError::new("TaskError", "boom");
        let encoded = serde_json::to_value(&err).unwrap();

        assert!(encoded.get("stack").is_none());
        assert!(encoded.get("extra").is_none());
    }

    #[test]
    fn truncates_deeply_nested_extra() {
        let mut nested = json!("leaf");
        for _ in 0..(MAX_EXTRA_DEPTH + 5) {
            nested = json!([nested]);
        }
        let mut map = Map::new();
        map.insert("deep".to_owned(), nested);

        let err = SerializedError::new("TaskError", "boom").with_extra(map);

        // Should not panic or infinitely recurse, and should contain the truncation sentinel.
        let encoded = serde_json::to_string(&err).unwrap();
        assert!(encoded.contains("truncated"));
    }
}
