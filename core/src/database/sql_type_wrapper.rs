use std::fmt;

use serde_json::{json, Value};

/// A single bound value in a bulk insert row.
#[derive(Debug, Clone, PartialEq)]
pub enum BulkSqlTypeWrapper {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl BulkSqlTypeWrapper {
    /// Maps a decoded record value onto a bindable value.
    ///
    /// Integers that do not fit in an `i64` fall back to `Float`. Arrays and objects in columns
    /// that are not flagged as json are bound as their serialized json text.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => BulkSqlTypeWrapper::Null,
            Value::Bool(b) => BulkSqlTypeWrapper::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    BulkSqlTypeWrapper::Int(i)
                } else {
                    BulkSqlTypeWrapper::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => BulkSqlTypeWrapper::Text(s.clone()),
            Value::Array(_) | Value::Object(_) => BulkSqlTypeWrapper::Text(value.to_string()),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, BulkSqlTypeWrapper::Int(_) | BulkSqlTypeWrapper::Float(_))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            BulkSqlTypeWrapper::Null => "null",
            BulkSqlTypeWrapper::Bool(_) => "bool",
            BulkSqlTypeWrapper::Int(_) => "integer",
            BulkSqlTypeWrapper::Float(_) => "float",
            BulkSqlTypeWrapper::Text(_) => "string",
        }
    }

    /// The segment this value contributes to a composite aggregate key. Null is empty.
    pub fn key_segment(&self) -> String {
        match self {
            BulkSqlTypeWrapper::Null => String::new(),
            BulkSqlTypeWrapper::Text(s) => s.clone(),
            other => other.to_string(),
        }
    }

    /// Renders the value as a MySQL literal for client side binding.
    pub fn to_sql_literal(&self) -> String {
        match self {
            BulkSqlTypeWrapper::Null => "NULL".to_string(),
            BulkSqlTypeWrapper::Bool(true) => "TRUE".to_string(),
            BulkSqlTypeWrapper::Bool(false) => "FALSE".to_string(),
            BulkSqlTypeWrapper::Int(i) => i.to_string(),
            BulkSqlTypeWrapper::Float(f) => f.to_string(),
            BulkSqlTypeWrapper::Text(s) => format!("'{}'", escape_string(s)),
        }
    }

    pub fn to_json_value(&self) -> Value {
        match self {
            BulkSqlTypeWrapper::Null => Value::Null,
            BulkSqlTypeWrapper::Bool(b) => json!(b),
            BulkSqlTypeWrapper::Int(i) => json!(i),
            BulkSqlTypeWrapper::Float(f) => json!(f),
            BulkSqlTypeWrapper::Text(s) => json!(s),
        }
    }
}

impl fmt::Display for BulkSqlTypeWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BulkSqlTypeWrapper::Null => write!(f, "null"),
            BulkSqlTypeWrapper::Bool(b) => write!(f, "{}", b),
            BulkSqlTypeWrapper::Int(i) => write!(f, "{}", i),
            BulkSqlTypeWrapper::Float(v) => write!(f, "{}", v),
            BulkSqlTypeWrapper::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for BulkSqlTypeWrapper {
    fn from(value: &str) -> Self {
        BulkSqlTypeWrapper::Text(value.to_string())
    }
}

impl From<String> for BulkSqlTypeWrapper {
    fn from(value: String) -> Self {
        BulkSqlTypeWrapper::Text(value)
    }
}

impl From<i64> for BulkSqlTypeWrapper {
    fn from(value: i64) -> Self {
        BulkSqlTypeWrapper::Int(value)
    }
}

impl From<f64> for BulkSqlTypeWrapper {
    fn from(value: f64) -> Self {
        BulkSqlTypeWrapper::Float(value)
    }
}

impl From<bool> for BulkSqlTypeWrapper {
    fn from(value: bool) -> Self {
        BulkSqlTypeWrapper::Bool(value)
    }
}

/// Escapes a string the way `mysql_real_escape_string` does.
pub fn escape_string(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\0' => escaped.push_str("\\0"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\\' => escaped.push_str("\\\\"),
            '\'' => escaped.push_str("\\'"),
            '"' => escaped.push_str("\\\""),
            '\x1a' => escaped.push_str("\\Z"),
            c => escaped.push(c),
        }
    }
    escaped
}
