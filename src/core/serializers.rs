//! Per-field value serializers
//!
//! A serializer replaces the value of one top-level record field. Failures
//! (returned errors or panics) never escape: the field is replaced with a
//! textual placeholder and logging continues.

use super::args::is_error_like;
use super::error::panic_message;
use super::log_record::{Fields, LogRecord, DEFAULT_ERROR_KEY};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

pub type SerializerFn = Arc<dyn Fn(&Value) -> std::result::Result<Value, String> + Send + Sync>;

/// Map of field name to serializer
#[derive(Clone, Default)]
pub struct Serializers {
    map: BTreeMap<String, SerializerFn>,
}

impl Serializers {
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard set: `err` normalises error-like values
    pub fn std() -> Self {
        Self::new().with(DEFAULT_ERROR_KEY, err_serializer)
    }

    #[must_use]
    pub fn with<F>(mut self, key: impl Into<String>, serializer: F) -> Self
    where
        F: Fn(&Value) -> std::result::Result<Value, String> + Send + Sync + 'static,
    {
        self.map.insert(key.into(), Arc::new(serializer));
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, serializer: SerializerFn) {
        self.map.insert(key.into(), serializer);
    }

    /// Overlay `other` on top of `self`; entries in `other` win
    #[must_use]
    pub fn merged_with(&self, other: &Serializers) -> Serializers {
        let mut map = self.map.clone();
        map.extend(other.map.iter().map(|(k, v)| (k.clone(), Arc::clone(v))));
        Serializers { map }
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.map.keys().map(String::as_str)
    }

    /// Apply every serializer whose key is present and non-null
    ///
    /// Returns the original record (same allocation) when nothing matched.
    pub fn apply(&self, record: &LogRecord) -> LogRecord {
        let mut replacements = Fields::new();
        for (key, serializer) in &self.map {
            let Some(value) = record.get(key) else {
                continue;
            };
            if value.is_null() {
                continue;
            }
            let serialized = match catch_unwind(AssertUnwindSafe(|| serializer(value))) {
                Ok(Ok(serialized)) => serialized,
                Ok(Err(message)) => placeholder(key, &message),
                Err(panic) => placeholder(key, &panic_message(panic.as_ref())),
            };
            replacements.insert(key.clone(), serialized);
        }

        if replacements.is_empty() {
            return record.clone();
        }
        record.with_fields(replacements)
    }
}

fn placeholder(key: &str, message: &str) -> Value {
    Value::String(format!("[serializer '{}' failed: {}]", key, message))
}

impl fmt::Debug for Serializers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.map.keys()).finish()
    }
}

/// Normalise an error value into `{type, message, stack, ..}`
///
/// Strings become a message with an empty stack; other non-object values pass
/// through unchanged.
pub fn err_serializer(value: &Value) -> std::result::Result<Value, String> {
    match value {
        Value::Object(obj) => {
            let mut out = Fields::new();
            let kind = obj
                .get("type")
                .or_else(|| obj.get("name"))
                .and_then(Value::as_str)
                .unwrap_or("Error");
            out.insert("type".to_string(), Value::String(kind.to_string()));
            out.insert(
                "message".to_string(),
                obj.get("message").cloned().unwrap_or(Value::String(String::new())),
            );
            out.insert(
                "stack".to_string(),
                obj.get("stack").cloned().unwrap_or(Value::String(String::new())),
            );
            for (key, value) in obj {
                if matches!(key.as_str(), "type" | "name" | "message" | "stack") {
                    continue;
                }
                let value = if key == "cause" && is_error_like(value) {
                    err_serializer(value)?
                } else {
                    value.clone()
                };
                out.insert(key.clone(), value);
            }
            Ok(Value::Object(out))
        }
        Value::String(message) => {
            let mut out = Fields::new();
            out.insert("type".to_string(), Value::String("Error".to_string()));
            out.insert("message".to_string(), Value::String(message.clone()));
            out.insert("stack".to_string(), Value::String(String::new()));
            Ok(Value::Object(out))
        }
        other => Ok(other.clone()),
    }
}
