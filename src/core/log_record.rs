//! Immutable structured log records
//!
//! A [`LogRecord`] is an ordered JSON object behind an `Arc`. It exposes no
//! mutating API: every transform (`with_field`, `without_field`,
//! `transform`, ...) returns a new record and leaves the original untouched,
//! so a record can be handed to any number of handlers without copying.

use super::log_level::{LevelValue, LogLevel};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Field map used throughout the pipeline
pub type Fields = Map<String, Value>;

/// Prefix reserved for pipeline-internal fields
pub const INTERNAL_PREFIX: &str = "__";
/// Display string produced by terminal formatters
pub const FORMATTED_KEY: &str = "__formatted";
/// Display color attached by the colorizing formatter
pub const COLOR_KEY: &str = "__color";

pub const LEVEL_KEY: &str = "level";
pub const LEVEL_NAME_KEY: &str = "levelName";
pub const NAME_KEY: &str = "name";
pub const TIME_KEY: &str = "time";
pub const DEFAULT_MESSAGE_KEY: &str = "msg";
pub const DEFAULT_ERROR_KEY: &str = "err";

/// Field names a record was built with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordKeys {
    pub message: String,
    pub error: String,
    pub nested: Option<String>,
}

impl Default for RecordKeys {
    fn default() -> Self {
        Self {
            message: DEFAULT_MESSAGE_KEY.to_string(),
            error: DEFAULT_ERROR_KEY.to_string(),
            nested: None,
        }
    }
}

/// Whether a key belongs to the pipeline rather than the user
#[inline]
pub fn is_internal_key(key: &str) -> bool {
    key.starts_with(INTERNAL_PREFIX)
}

/// Base fields stamped on every record
#[derive(Debug, Clone, Default, PartialEq)]
pub enum BasePolicy {
    /// Process id and host name
    #[default]
    Auto,
    /// No base fields
    Omit,
    /// Use these fields verbatim
    Custom(Fields),
}

impl BasePolicy {
    fn fields(&self) -> Option<Fields> {
        match self {
            BasePolicy::Auto => Some(auto_base_fields().clone()),
            BasePolicy::Omit => None,
            BasePolicy::Custom(fields) => Some(fields.clone()),
        }
    }
}

fn auto_base_fields() -> &'static Fields {
    static BASE: OnceLock<Fields> = OnceLock::new();
    BASE.get_or_init(|| {
        let mut base = Fields::new();
        base.insert("pid".to_string(), Value::from(std::process::id()));
        if let Some(host) = hostname() {
            base.insert("hostname".to_string(), Value::String(host));
        }
        base
    })
}

fn hostname() -> Option<String> {
    std::env::var("HOSTNAME")
        .ok()
        .filter(|h| !h.is_empty())
        .or_else(|| {
            std::fs::read_to_string("/etc/hostname")
                .ok()
                .map(|h| h.trim().to_string())
                .filter(|h| !h.is_empty())
        })
}

/// Custom clock used by [`TimestampPolicy::Custom`]
pub type TimestampFn = Arc<dyn Fn() -> Value + Send + Sync>;

/// How the `time` field is produced
#[derive(Clone, Default)]
pub enum TimestampPolicy {
    Disabled,
    /// Milliseconds since the Unix epoch
    #[default]
    Auto,
    Custom(TimestampFn),
}

impl TimestampPolicy {
    fn stamp(&self) -> Option<Value> {
        match self {
            TimestampPolicy::Disabled => None,
            TimestampPolicy::Auto => Some(Value::from(chrono::Utc::now().timestamp_millis())),
            TimestampPolicy::Custom(clock) => Some(clock()),
        }
    }
}

impl fmt::Debug for TimestampPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimestampPolicy::Disabled => write!(f, "Disabled"),
            TimestampPolicy::Auto => write!(f, "Auto"),
            TimestampPolicy::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

impl From<bool> for TimestampPolicy {
    fn from(enabled: bool) -> Self {
        if enabled {
            TimestampPolicy::Auto
        } else {
            TimestampPolicy::Disabled
        }
    }
}

/// Inputs to [`LogRecord::create`]
#[derive(Debug, Clone, Default)]
pub struct RecordOptions {
    pub level: LevelValue,
    pub name: String,
    pub msg: String,
    pub fields: Option<Fields>,
    pub base: BasePolicy,
    pub timestamp: TimestampPolicy,
    pub keys: RecordKeys,
}

impl RecordOptions {
    pub fn new(level: impl Into<LevelValue>, msg: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            msg: msg.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn fields(mut self, fields: Fields) -> Self {
        self.fields = Some(fields);
        self
    }

    #[must_use]
    pub fn base(mut self, base: BasePolicy) -> Self {
        self.base = base;
        self
    }

    #[must_use]
    pub fn timestamp(mut self, timestamp: impl Into<TimestampPolicy>) -> Self {
        self.timestamp = timestamp.into();
        self
    }

    #[must_use]
    pub fn keys(mut self, keys: RecordKeys) -> Self {
        self.keys = keys;
        self
    }
}

/// One structured log event
#[derive(Clone)]
pub struct LogRecord {
    data: Arc<Fields>,
    keys: Arc<RecordKeys>,
}

impl LogRecord {
    /// Build a record from its parts
    ///
    /// The level name comes from the built-in table only; custom levels get
    /// an empty `levelName` that the logger fills in afterwards. Extra fields
    /// cannot override `level`, `levelName` or the message key.
    pub fn create(options: RecordOptions) -> Self {
        let RecordOptions {
            level,
            name,
            msg,
            fields,
            base,
            timestamp,
            keys,
        } = options;

        let mut data = Fields::new();
        data.insert(LEVEL_KEY.to_string(), Value::from(level));
        data.insert(
            LEVEL_NAME_KEY.to_string(),
            Value::String(LogLevel::name_of(level).unwrap_or_default().to_string()),
        );
        if let Some(time) = timestamp.stamp() {
            data.insert(TIME_KEY.to_string(), time);
        }
        if let Some(base) = base.fields() {
            data.extend(base);
        }
        data.insert(NAME_KEY.to_string(), Value::String(name));

        if let Some(fields) = fields.filter(|f| !f.is_empty()) {
            match &keys.nested {
                Some(nested) => {
                    data.insert(nested.clone(), Value::Object(fields));
                }
                None => {
                    for (key, value) in fields {
                        if key == LEVEL_KEY || key == LEVEL_NAME_KEY || key == keys.message {
                            continue;
                        }
                        data.insert(key, value);
                    }
                }
            }
        }
        data.insert(keys.message.clone(), Value::String(msg));

        Self {
            data: Arc::new(data),
            keys: Arc::new(keys),
        }
    }

    /// Wrap an existing field map, e.g. one produced by a deserializer
    pub fn from_fields(fields: Fields) -> Self {
        Self {
            data: Arc::new(fields),
            keys: Arc::new(RecordKeys::default()),
        }
    }

    pub fn level(&self) -> LevelValue {
        self.data
            .get(LEVEL_KEY)
            .and_then(Value::as_u64)
            .and_then(|v| LevelValue::try_from(v).ok())
            .unwrap_or(LogLevel::Info.value())
    }

    pub fn level_name(&self) -> &str {
        self.get_str(LEVEL_NAME_KEY).unwrap_or("")
    }

    pub fn name(&self) -> &str {
        self.get_str(NAME_KEY).unwrap_or("")
    }

    pub fn msg(&self) -> &str {
        self.get_str(&self.keys.message).unwrap_or("")
    }

    pub fn time(&self) -> Option<i64> {
        self.data.get(TIME_KEY).and_then(Value::as_i64)
    }

    /// The error field, looked up under the nested key first when one is set
    pub fn error(&self) -> Option<&Value> {
        let nested = self
            .keys
            .nested
            .as_ref()
            .and_then(|nested| self.data.get(nested))
            .and_then(Value::as_object)
            .and_then(|nested| nested.get(&self.keys.error));
        nested.or_else(|| self.data.get(&self.keys.error))
    }

    /// Display string attached by a terminal formatter
    pub fn formatted(&self) -> Option<&str> {
        self.get_str(FORMATTED_KEY)
    }

    pub fn keys(&self) -> &RecordKeys {
        &self.keys
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    /// Look up a dotted path such as `user.address.city`
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut current = self.data.get(segments.next()?)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// All fields, including core and internal ones
    pub fn fields(&self) -> &Fields {
        &self.data
    }

    /// Whether a key is one of the record's core fields
    pub fn is_core_key(&self, key: &str) -> bool {
        matches!(key, LEVEL_KEY | LEVEL_NAME_KEY | NAME_KEY | TIME_KEY)
            || key == self.keys.message
            || is_internal_key(key)
    }

    /// User-supplied fields: everything except core and internal keys
    pub fn extra_fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.data.iter().filter(|(key, _)| !self.is_core_key(key))
    }

    /// Whether two handles point at the same underlying record
    pub fn ptr_eq(&self, other: &LogRecord) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    /// Copy-on-write transform: clone the fields, edit, wrap as a new record
    pub fn transform(&self, edit: impl FnOnce(&mut Fields)) -> LogRecord {
        let mut data = (*self.data).clone();
        edit(&mut data);
        LogRecord {
            data: Arc::new(data),
            keys: Arc::clone(&self.keys),
        }
    }

    #[must_use]
    pub fn with_field(&self, key: impl Into<String>, value: impl Into<Value>) -> LogRecord {
        let key = key.into();
        let value = value.into();
        self.transform(|data| {
            data.insert(key, value);
        })
    }

    #[must_use]
    pub fn with_fields(&self, fields: impl IntoIterator<Item = (String, Value)>) -> LogRecord {
        self.transform(|data| data.extend(fields))
    }

    #[must_use]
    pub fn without_field(&self, key: &str) -> LogRecord {
        self.transform(|data| {
            data.shift_remove(key);
        })
    }

    #[must_use]
    pub fn with_message(&self, msg: impl Into<String>) -> LogRecord {
        let key = self.keys.message.clone();
        self.with_field(key, Value::String(msg.into()))
    }

    /// JSON object without internal fields
    pub fn to_json_value(&self) -> Value {
        Value::Object(
            self.data
                .iter()
                .filter(|(key, _)| !is_internal_key(key))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string(&self.to_json_value())
    }

    pub fn to_json_pretty(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.to_json_value())
    }
}

impl PartialEq for LogRecord {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl fmt::Debug for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LogRecord").field(&self.data).finish()
    }
}

/// Escape line breaks and tabs so one record always renders as one line
pub fn sanitize_line(message: &str) -> String {
    message
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}
