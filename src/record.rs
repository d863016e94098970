use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Label set attached to a log line. Keys are kept sorted, so two sets with
/// the same pairs always compare and serialize identically.
pub type LabelSet = BTreeMap<String, String>;

/// Whether `name` is accepted by Loki as a label name, i.e. matches
/// `[a-zA-Z_:][a-zA-Z0-9_:]*`.
pub fn is_valid_label_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

/// Map a field key onto a valid label name. Every disallowed character
/// becomes `_` and a leading digit gets a `_` prefix, so `http.method`
/// turns into `http_method`. Returns `None` for an empty key.
pub fn sanitize_label_name(name: &str) -> Option<String> {
    if name.is_empty() {
        return None;
    }
    let mut out = String::with_capacity(name.len() + 1);
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        out.push('_');
    }
    out.extend(name.chars().map(|c| {
        if c.is_ascii_alphanumeric() || c == '_' || c == ':' {
            c
        } else {
            '_'
        }
    }));
    Some(out)
}

/// Severity of a [`Log`] record, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl Level {
    /// Whether a record at `level` passes a minimum of `self`.
    pub fn is_enabled(self, level: Level) -> bool {
        level >= self
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Fatal => "fatal",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown log level: {0}")]
pub struct ParseLevelError(pub String);

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Level::Trace),
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "warn" | "warning" => Ok(Level::Warn),
            "error" => Ok(Level::Error),
            "fatal" => Ok(Level::Fatal),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}

impl From<tracing::Level> for Level {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE => Level::Trace,
            tracing::Level::DEBUG => Level::Debug,
            tracing::Level::INFO => Level::Info,
            tracing::Level::WARN => Level::Warn,
            tracing::Level::ERROR => Level::Error,
        }
    }
}

/// Value of a structured field on a [`Log`].
///
/// Primitives can be promoted to stream labels; `Structured` values never
/// are and end up in the JSON tail of the line instead.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Str(String),
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
    Structured(serde_json::Value),
}

impl FieldValue {
    /// Label representation of the value, or `None` if it is not a primitive.
    ///
    /// Floats use fixed-point notation with six decimals (`3.14` becomes
    /// `"3.140000"`).
    pub fn as_label(&self) -> Option<String> {
        match self {
            FieldValue::Str(s) => Some(s.clone()),
            FieldValue::Int(i) => Some(i.to_string()),
            FieldValue::UInt(u) => Some(u.to_string()),
            FieldValue::Float(f) => Some(format!("{:.6}", f)),
            FieldValue::Bool(b) => Some(b.to_string()),
            FieldValue::Structured(_) => None,
        }
    }
}

macro_rules! field_value_from {
    ($variant:ident as $target:ty: $($t:ty),*) => {
        $(
            impl From<$t> for FieldValue {
                fn from(v: $t) -> Self {
                    FieldValue::$variant(v as $target)
                }
            }
        )*
    };
}

field_value_from!(Int as i64: i8, i16, i32, i64, isize);
field_value_from!(UInt as u64: u8, u16, u32, u64, usize);
field_value_from!(Float as f64: f32, f64);

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Str(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Str(v)
    }
}

impl From<serde_json::Value> for FieldValue {
    fn from(v: serde_json::Value) -> Self {
        FieldValue::Structured(v)
    }
}

/// A single record handed to the adapter by the logging facade.
#[derive(Debug, Clone)]
pub struct Log {
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    pub message: String,
    pub fields: BTreeMap<String, FieldValue>,
    /// Optional logger name; shown as a `[name]: ` prefix and a `logger_name` label.
    pub name: Option<String>,
    pub error: Option<String>,
}

impl Log {
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Log {
            timestamp: Utc::now(),
            level,
            message: message.into(),
            fields: BTreeMap::new(),
            name: None,
            error: None,
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_error(mut self, error: impl fmt::Display) -> Self {
        self.error = Some(error.to_string());
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// A formatted, immutable entry waiting in the batch buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub line: String,
    pub level: String,
    pub labels: LabelSet,
}
