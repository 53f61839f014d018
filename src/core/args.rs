//! Log call arguments
//!
//! Level methods accept a list of [`LogArg`]s and resolve one of three calling
//! conventions from the shape of the first argument:
//!
//! 1. error-first: an [`ErrorInfo`] or an error-like JSON object
//! 2. object-first: a JSON object whose keys become record fields
//! 3. string-first: a printf-style format string
//!
//! The remaining arguments feed the `%s %d %j %o %O %%` specifiers.

use super::log_record::Fields;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Plain-data view of a Rust error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub stack: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<Box<ErrorInfo>>,
}

impl ErrorInfo {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        let kind = kind.into();
        let message = message.into();
        let stack = format!("{}: {}", kind, message);
        Self {
            kind,
            message,
            stack,
            cause: None,
        }
    }

    /// Capture an error and its `source()` chain
    ///
    /// The stack is the rendered chain, followed by a backtrace when
    /// `RUST_BACKTRACE` enables one.
    pub fn from_error<E: std::error::Error + ?Sized>(error: &E) -> Self {
        let mut info = Self::chain(error);
        let backtrace = std::backtrace::Backtrace::capture();
        if backtrace.status() == std::backtrace::BacktraceStatus::Captured {
            info.stack = format!("{}\n{}", info.stack, backtrace);
        }
        info
    }

    fn chain<E: std::error::Error + ?Sized>(error: &E) -> Self {
        let kind = short_type_name(std::any::type_name::<E>());
        let mut info = Self::new(kind, error.to_string());
        if let Some(source) = error.source() {
            let cause = Self::chain_dyn(source);
            info.stack = format!("{}\nCaused by: {}", info.stack, cause.stack);
            info.cause = Some(Box::new(cause));
        }
        info
    }

    fn chain_dyn(error: &(dyn std::error::Error + 'static)) -> Self {
        let mut info = Self::new("Error", error.to_string());
        if let Some(source) = error.source() {
            let cause = Self::chain_dyn(source);
            info.stack = format!("{}\nCaused by: {}", info.stack, cause.stack);
            info.cause = Some(Box::new(cause));
        }
        info
    }

    #[must_use]
    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = stack.into();
        self
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| {
            let mut map = Fields::new();
            map.insert("message".to_string(), Value::String(self.message.clone()));
            Value::Object(map)
        })
    }
}

fn short_type_name(full: &str) -> String {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_string()
}

/// Structural error check: an object with string `message` and string `stack`
pub fn is_error_like(value: &Value) -> bool {
    value.as_object().is_some_and(|obj| {
        obj.get("message").is_some_and(Value::is_string)
            && obj.get("stack").is_some_and(Value::is_string)
    })
}

/// One argument to a level method
#[derive(Debug, Clone, PartialEq)]
pub enum LogArg {
    Str(String),
    Value(Value),
    Error(ErrorInfo),
}

impl LogArg {
    pub fn error<E: std::error::Error + ?Sized>(error: &E) -> Self {
        LogArg::Error(ErrorInfo::from_error(error))
    }

    fn as_value(&self) -> Value {
        match self {
            LogArg::Str(s) => Value::String(s.clone()),
            LogArg::Value(v) => v.clone(),
            LogArg::Error(e) => e.to_value(),
        }
    }
}

impl From<&str> for LogArg {
    fn from(s: &str) -> Self {
        LogArg::Str(s.to_string())
    }
}

impl From<String> for LogArg {
    fn from(s: String) -> Self {
        LogArg::Str(s)
    }
}

impl From<&String> for LogArg {
    fn from(s: &String) -> Self {
        LogArg::Str(s.clone())
    }
}

impl From<Value> for LogArg {
    fn from(v: Value) -> Self {
        LogArg::Value(v)
    }
}

impl From<Fields> for LogArg {
    fn from(fields: Fields) -> Self {
        LogArg::Value(Value::Object(fields))
    }
}

impl From<ErrorInfo> for LogArg {
    fn from(e: ErrorInfo) -> Self {
        LogArg::Error(e)
    }
}

macro_rules! impl_from_scalar {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for LogArg {
                fn from(v: $ty) -> Self {
                    LogArg::Value(Value::from(v))
                }
            }
        )*
    };
}

impl_from_scalar!(i32, i64, u32, u64, usize, f32, f64, bool);

/// Ordered argument list for one log call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogArgs(pub Vec<LogArg>);

impl LogArgs {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<LogArg>) -> Self {
        self.0.push(arg.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

macro_rules! impl_args_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for LogArgs {
                fn from(arg: $ty) -> Self {
                    LogArgs(vec![LogArg::from(arg)])
                }
            }
        )*
    };
}

impl_args_from!(&str, String, &String, Value, Fields, ErrorInfo);
impl_args_from!(i32, i64, u32, u64, usize, f32, f64, bool);

impl From<LogArg> for LogArgs {
    fn from(arg: LogArg) -> Self {
        LogArgs(vec![arg])
    }
}

impl From<Vec<LogArg>> for LogArgs {
    fn from(args: Vec<LogArg>) -> Self {
        LogArgs(args)
    }
}

impl FromIterator<LogArg> for LogArgs {
    fn from_iter<I: IntoIterator<Item = LogArg>>(iter: I) -> Self {
        LogArgs(iter.into_iter().collect())
    }
}

// `logger.info((fields, "took %dms", 42))`
macro_rules! impl_args_from_tuple {
    ($($name:ident),+) => {
        impl<$($name: Into<LogArg>),+> From<($($name,)+)> for LogArgs {
            #[allow(non_snake_case)]
            fn from(($($name,)+): ($($name,)+)) -> Self {
                LogArgs(vec![$($name.into()),+])
            }
        }
    };
}

impl_args_from_tuple!(A);
impl_args_from_tuple!(A, B);
impl_args_from_tuple!(A, B, C);
impl_args_from_tuple!(A, B, C, D);
impl_args_from_tuple!(A, B, C, D, E);
impl_args_from_tuple!(A, B, C, D, E, F);

/// Result of resolving a calling convention
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedArgs {
    pub msg: String,
    pub fields: Fields,
}

impl LogArgs {
    /// Resolve the calling convention into a message and extra fields
    ///
    /// `error_key` names the field that receives an error-first argument.
    pub fn normalize(self, error_key: &str) -> NormalizedArgs {
        let mut args = self.0.into_iter();
        let Some(first) = args.next() else {
            return NormalizedArgs::default();
        };
        let rest: Vec<LogArg> = args.collect();

        match first {
            LogArg::Error(error) => {
                let fallback = error.message.clone();
                Self::error_first(error.to_value(), fallback, rest, error_key)
            }
            LogArg::Value(value) if is_error_like(&value) => {
                let fallback = value
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                Self::error_first(value, fallback, rest, error_key)
            }
            LogArg::Value(Value::Object(fields)) => {
                let msg = Self::message_from(&rest).unwrap_or_default();
                NormalizedArgs { msg, fields }
            }
            LogArg::Str(format) => NormalizedArgs {
                msg: interpolate(&format, &rest),
                fields: Fields::new(),
            },
            LogArg::Value(other) => NormalizedArgs {
                msg: interpolate(&coerce_string(&other), &rest),
                fields: Fields::new(),
            },
        }
    }

    fn error_first(error: Value, fallback: String, rest: Vec<LogArg>, key: &str) -> NormalizedArgs {
        let mut fields = Fields::new();
        fields.insert(key.to_string(), error);
        let msg = Self::message_from(&rest).unwrap_or(fallback);
        NormalizedArgs { msg, fields }
    }

    /// A following string becomes the message, formatted with what remains
    fn message_from(rest: &[LogArg]) -> Option<String> {
        match rest.split_first() {
            Some((LogArg::Str(format), substitutions)) => Some(interpolate(format, substitutions)),
            _ => None,
        }
    }
}

/// printf-style interpolation
///
/// Supports `%s`, `%d`, `%j`, `%o`, `%O` and `%%`. Surplus arguments are
/// ignored; a specifier with no argument left is kept verbatim.
pub fn interpolate(format: &str, args: &[LogArg]) -> String {
    if !format.contains('%') {
        return format.to_string();
    }

    let mut out = String::with_capacity(format.len() + 16);
    let mut args = args.iter();
    let mut chars = format.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        let Some(&spec) = chars.peek() else {
            out.push('%');
            break;
        };
        match spec {
            '%' => {
                chars.next();
                out.push('%');
            }
            's' | 'd' | 'j' | 'o' | 'O' => {
                chars.next();
                match args.next() {
                    Some(arg) => {
                        let value = arg.as_value();
                        let rendered = match spec {
                            's' => coerce_string(&value),
                            'd' => coerce_number(&value),
                            'O' => safe_json(&value, true),
                            _ => safe_json(&value, false),
                        };
                        out.push_str(&rendered);
                    }
                    None => {
                        out.push('%');
                        out.push(spec);
                    }
                }
            }
            _ => out.push('%'),
        }
    }
    out
}

/// String coercion used by `%s`
pub fn coerce_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => safe_json(other, false),
    }
}

/// Numeric coercion used by `%d`
fn coerce_number(value: &Value) -> String {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Null => Some(0.0),
        Value::String(s) if s.trim().is_empty() => Some(0.0),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match number {
        Some(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", n as i64),
        Some(n) if n.is_finite() => n.to_string(),
        Some(n) if n.is_infinite() && n > 0.0 => "Infinity".to_string(),
        Some(n) if n.is_infinite() => "-Infinity".to_string(),
        _ => "NaN".to_string(),
    }
}

/// JSON rendering that never fails
pub fn safe_json(value: &Value, pretty: bool) -> String {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    rendered.unwrap_or_else(|_| "\"[Unserializable]\"".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(list: Vec<LogArg>) -> Vec<LogArg> {
        list
    }

    #[test]
    fn test_interpolate_basic() {
        let out = interpolate("%s items, %d%%", &args(vec!["foo".into(), 50.into()]));
        assert_eq!(out, "foo items, 50%");
    }

    #[test]
    fn test_interpolate_missing_args_left_verbatim() {
        let out = interpolate("%s and %s and %d", &args(vec!["one".into()]));
        assert_eq!(out, "one and %s and %d");
    }

    #[test]
    fn test_interpolate_extra_args_ignored() {
        let out = interpolate("only %s", &args(vec!["a".into(), "b".into()]));
        assert_eq!(out, "only a");
    }

    #[test]
    fn test_interpolate_json_specifiers() {
        let obj = LogArg::Value(json!({"a": 1}));
        assert_eq!(interpolate("%j", std::slice::from_ref(&obj)), r#"{"a":1}"#);
        assert_eq!(interpolate("%o", std::slice::from_ref(&obj)), r#"{"a":1}"#);
        assert_eq!(interpolate("%O", &[obj]), "{\n  \"a\": 1\n}");
    }

    #[test]
    fn test_interpolate_numeric_coercion() {
        assert_eq!(interpolate("%d", &args(vec!["42".into()])), "42");
        assert_eq!(interpolate("%d", &args(vec!["abc".into()])), "NaN");
        assert_eq!(interpolate("%d", &args(vec![2.5.into()])), "2.5");
        assert_eq!(interpolate("%d", &args(vec![true.into()])), "1");
    }

    #[test]
    fn test_interpolate_unknown_specifier_and_trailing_percent() {
        assert_eq!(interpolate("100%x", &[]), "100%x");
        assert_eq!(interpolate("done 100%", &[]), "done 100%");
    }

    #[test]
    fn test_normalize_string_first() {
        let n = LogArgs::from("hello %s")
            .arg("world")
            .normalize("err");
        assert_eq!(n.msg, "hello world");
        assert!(n.fields.is_empty());
    }

    #[test]
    fn test_normalize_object_first() {
        let n = LogArgs::from(json!({"requestId": "abc"}))
            .arg("request completed in %dms")
            .arg(42)
            .normalize("err");
        assert_eq!(n.msg, "request completed in 42ms");
        assert_eq!(n.fields.get("requestId"), Some(&json!("abc")));
    }

    #[test]
    fn test_normalize_error_first_uses_error_message() {
        let n = LogArgs::from(ErrorInfo::new("IoError", "disk full")).normalize("err");
        assert_eq!(n.msg, "disk full");
        assert_eq!(n.fields["err"]["message"], json!("disk full"));
    }

    #[test]
    fn test_normalize_error_first_with_message() {
        let n = LogArgs::from(ErrorInfo::new("IoError", "disk full"))
            .arg("write failed after %d tries")
            .arg(3)
            .normalize("error");
        assert_eq!(n.msg, "write failed after 3 tries");
        assert!(n.fields.contains_key("error"));
    }

    #[test]
    fn test_normalize_duck_typed_error() {
        let n = LogArgs::from(json!({"message": "boom", "stack": "at x"})).normalize("err");
        assert_eq!(n.msg, "boom");
        assert_eq!(n.fields["err"]["stack"], json!("at x"));
    }

    #[test]
    fn test_is_error_like() {
        assert!(is_error_like(&json!({"message": "m", "stack": "s"})));
        assert!(!is_error_like(&json!({"message": "m"})));
        assert!(!is_error_like(&json!({"message": 1, "stack": "s"})));
        assert!(!is_error_like(&json!("message")));
    }

    #[test]
    fn test_error_info_from_error_chain() {
        #[derive(Debug)]
        struct Outer(std::io::Error);
        impl std::fmt::Display for Outer {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "outer failed")
            }
        }
        impl std::error::Error for Outer {
            fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
                Some(&self.0)
            }
        }

        let err = Outer(std::io::Error::new(std::io::ErrorKind::Other, "inner"));
        let info = ErrorInfo::from_error(&err);
        assert_eq!(info.kind, "Outer");
        assert_eq!(info.message, "outer failed");
        assert_eq!(info.cause.as_ref().unwrap().message, "inner");
        assert!(info.stack.contains("Caused by: Error: inner"));
        assert!(is_error_like(&info.to_value()));
    }

    #[test]
    fn test_empty_args() {
        let n = LogArgs::new().normalize("err");
        assert_eq!(n.msg, "");
        assert!(n.fields.is_empty());
    }
}
