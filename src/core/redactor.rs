//! Path-based redaction of sensitive fields
//!
//! Paths are dotted (`user.ssn`, `headers.authorization`). A `*` segment
//! matches every key of an object (or every element of an array) at that
//! depth. Missing intermediate segments are ignored.

use super::error::{LoggerError, Result};
use super::log_record::LogRecord;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

pub const DEFAULT_CENSOR: &str = "[REDACTED]";

const WILDCARD: &str = "*";

/// Computes a replacement from the original value and the matched path
pub type CensorFn = Arc<dyn Fn(&Value, &[String]) -> Value + Send + Sync>;

/// What happens to a matched value
#[derive(Clone)]
pub enum Censor {
    Replace(Value),
    Remove,
    With(CensorFn),
}

impl Default for Censor {
    fn default() -> Self {
        Censor::Replace(Value::String(DEFAULT_CENSOR.to_string()))
    }
}

impl fmt::Debug for Censor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Censor::Replace(v) => f.debug_tuple("Replace").field(v).finish(),
            Censor::Remove => write!(f, "Remove"),
            Censor::With(_) => write!(f, "With(..)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Redactor {
    paths: Vec<Vec<String>>,
    censor: Censor,
}

impl Redactor {
    /// Build a redactor; empty paths or empty segments are rejected
    pub fn new<I, S>(paths: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut parsed = Vec::new();
        for path in paths {
            let path = path.as_ref();
            let segments: Vec<String> = path.split('.').map(str::to_string).collect();
            if path.is_empty() || segments.iter().any(String::is_empty) {
                return Err(LoggerError::config(
                    "Redactor",
                    format!("invalid redaction path '{}'", path),
                ));
            }
            parsed.push(segments);
        }
        Ok(Self {
            paths: parsed,
            censor: Censor::default(),
        })
    }

    #[must_use]
    pub fn with_censor(mut self, censor: Censor) -> Self {
        self.censor = censor;
        self
    }

    /// Delete matched keys instead of replacing them
    #[must_use]
    pub fn remove(self) -> Self {
        self.with_censor(Censor::Remove)
    }

    pub fn censor(&self) -> &Censor {
        &self.censor
    }

    pub fn paths(&self) -> Vec<String> {
        self.paths.iter().map(|p| p.join(".")).collect()
    }

    /// Return a copy of `record` with every matching path censored
    ///
    /// When no path matches, the original record is returned as-is.
    pub fn redact(&self, record: &LogRecord) -> LogRecord {
        let root = record.fields();
        if !self.paths.iter().any(|path| matches_in_object(root, path)) {
            return record.clone();
        }

        record.transform(|fields| {
            for path in &self.paths {
                let mut trail = Vec::with_capacity(path.len());
                redact_object(fields, path, &mut trail, &self.censor);
            }
        })
    }
}

fn matches_in_object(map: &serde_json::Map<String, Value>, path: &[String]) -> bool {
    let Some((head, rest)) = path.split_first() else {
        return false;
    };
    if head == WILDCARD {
        return !map.is_empty()
            && (rest.is_empty() || map.values().any(|child| matches_any(child, rest)));
    }
    match map.get(head) {
        Some(_) if rest.is_empty() => true,
        Some(child) => matches_any(child, rest),
        None => false,
    }
}

fn matches_any(value: &Value, path: &[String]) -> bool {
    let Some((head, rest)) = path.split_first() else {
        return false;
    };
    let children: Vec<&Value> = match value {
        Value::Object(map) if head == WILDCARD => map.values().collect(),
        Value::Object(map) => map.get(head).into_iter().collect(),
        Value::Array(items) if head == WILDCARD => items.iter().collect(),
        _ => Vec::new(),
    };
    if rest.is_empty() {
        return !children.is_empty();
    }
    children.into_iter().any(|child| matches_any(child, rest))
}

fn redact_object(
    map: &mut serde_json::Map<String, Value>,
    path: &[String],
    trail: &mut Vec<String>,
    censor: &Censor,
) {
    let Some((head, rest)) = path.split_first() else {
        return;
    };
    let keys: Vec<String> = if head == WILDCARD {
        map.keys().cloned().collect()
    } else if map.contains_key(head) {
        vec![head.clone()]
    } else {
        return;
    };

    for key in keys {
        trail.push(key.clone());
        if rest.is_empty() {
            match censor {
                Censor::Remove => {
                    map.shift_remove(&key);
                }
                Censor::Replace(replacement) => {
                    map.insert(key.clone(), replacement.clone());
                }
                Censor::With(compute) => {
                    if let Some(original) = map.get(&key) {
                        let replacement = compute(original, trail);
                        map.insert(key.clone(), replacement);
                    }
                }
            }
        } else if let Some(child) = map.get_mut(&key) {
            redact_value(child, rest, trail, censor);
        }
        trail.pop();
    }
}

fn redact_value(value: &mut Value, path: &[String], trail: &mut Vec<String>, censor: &Censor) {
    match value {
        Value::Object(map) => redact_object(map, path, trail, censor),
        Value::Array(items) if path.first().map(String::as_str) == Some(WILDCARD) => {
            let rest = &path[1..];
            if rest.is_empty() {
                if let Censor::Remove = censor {
                    items.clear();
                    return;
                }
            }
            for (index, item) in items.iter_mut().enumerate() {
                trail.push(index.to_string());
                if rest.is_empty() {
                    match censor {
                        Censor::Replace(replacement) => *item = replacement.clone(),
                        Censor::With(compute) => *item = compute(item, trail),
                        Censor::Remove => {}
                    }
                } else {
                    redact_value(item, rest, trail, censor);
                }
                trail.pop();
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::log_level::LogLevel;
    use crate::core::log_record::{BasePolicy, RecordOptions};
    use serde_json::json;

    fn record_with(fields: Value) -> LogRecord {
        LogRecord::create(
            RecordOptions::new(LogLevel::Info, "msg")
                .base(BasePolicy::Omit)
                .timestamp(false)
                .fields(fields.as_object().cloned().unwrap()),
        )
    }

    #[test]
    fn test_censor_replaces_value() {
        let redactor = Redactor::new(["user.ssn"]).unwrap();
        let record = record_with(json!({"user": {"ssn": "123-45-6789", "name": "Bob"}}));

        let out = redactor.redact(&record);
        assert_eq!(out.get("user"), Some(&json!({"ssn": "[REDACTED]", "name": "Bob"})));
        assert_eq!(record.get_path("user.ssn"), Some(&json!("123-45-6789")));
    }

    #[test]
    fn test_remove_mode_deletes_key() {
        let redactor = Redactor::new(["user.ssn"]).unwrap().remove();
        let record = record_with(json!({"user": {"ssn": "123-45-6789", "name": "Bob"}}));

        let out = redactor.redact(&record);
        assert_eq!(out.get("user"), Some(&json!({"name": "Bob"})));
    }

    #[test]
    fn test_missing_path_is_noop() {
        let redactor = Redactor::new(["user.ssn", "card.number"]).unwrap();
        let record = record_with(json!({"user": "not-an-object"}));
        assert!(redactor.redact(&record).ptr_eq(&record));
    }

    #[test]
    fn test_wildcard_segments() {
        let redactor = Redactor::new(["users.*.token", "headers.*"]).unwrap();
        let record = record_with(json!({
            "users": [{"token": "a", "id": 1}, {"token": "b", "id": 2}],
            "headers": {"authorization": "secret", "cookie": "c"}
        }));

        let out = redactor.redact(&record);
        assert_eq!(
            out.get("users"),
            Some(&json!([{"token": "[REDACTED]", "id": 1}, {"token": "[REDACTED]", "id": 2}]))
        );
        assert_eq!(
            out.get("headers"),
            Some(&json!({"authorization": "[REDACTED]", "cookie": "[REDACTED]"}))
        );
    }

    #[test]
    fn test_custom_censor_function() {
        let censor = Censor::With(Arc::new(|value, path| {
            let len = value.as_str().map(str::len).unwrap_or(0);
            json!(format!("{}:{}", path.join("."), "*".repeat(len)))
        }));
        let redactor = Redactor::new(["card"]).unwrap().with_censor(censor);
        let out = redactor.redact(&record_with(json!({"card": "1234"})));
        assert_eq!(out.get("card"), Some(&json!("card:****")));
    }

    #[test]
    fn test_invalid_paths_rejected() {
        assert!(Redactor::new([""]).is_err());
        assert!(Redactor::new(["user..ssn"]).is_err());
    }
}
