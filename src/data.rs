use std::{collections::BTreeMap, fmt};

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::{ToSql, ToSqlOutput, Value as SqlValue};
use serde::Serialize;

use crate::schema::TypeKind;

/// One decoded unit of input: raw field label to value.
pub type Record = BTreeMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    List(Vec<Value>),
    Object(BTreeMap<String, Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The type a column takes when this is the first non-null value seen in it.
    pub fn inferred_kind(&self) -> TypeKind {
        match self {
            Value::Null => TypeKind::Unset,
            Value::Boolean(_) | Value::Integer(_) => TypeKind::Integer,
            Value::Float(_) => TypeKind::Float,
            Value::Text(_) => TypeKind::Text,
            Value::List(_) => TypeKind::Category,
            Value::Object(_) => TypeKind::Object,
        }
    }

    /// Converts text into the native representation a typed column expects.
    /// Text that does not parse is kept as-is and left to SQLite's column
    /// affinity.
    pub fn coerce(self, kind: TypeKind) -> Value {
        let Value::Text(text) = self else {
            return self;
        };
        let trimmed = text.trim();
        match kind {
            TypeKind::Integer | TypeKind::Id => match trimmed.parse::<i64>() {
                Ok(parsed) => Value::Integer(parsed),
                Err(_) => Value::Text(text),
            },
            TypeKind::Float | TypeKind::Real => match trimmed.parse::<f64>() {
                Ok(parsed) => Value::Float(parsed),
                Err(_) => Value::Text(text),
            },
            TypeKind::Numeric => {
                if let Ok(parsed) = trimmed.parse::<i64>() {
                    Value::Integer(parsed)
                } else if let Ok(parsed) = trimmed.parse::<f64>() {
                    Value::Float(parsed)
                } else {
                    Value::Text(text)
                }
            }
            TypeKind::Time => {
                if let Some(parsed) = parse_naive_datetime(trimmed) {
                    Value::Text(parsed.format("%Y-%m-%d %H:%M:%S").to_string())
                } else if let Some(parsed) = parse_naive_date(trimmed) {
                    Value::Text(parsed.format("%Y-%m-%d").to_string())
                } else {
                    Value::Text(text)
                }
            }
            _ => Value::Text(text),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::Integer(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Value::from(*f),
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Object(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect(),
            ),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let output = match self {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Boolean(b) => ToSqlOutput::Owned(SqlValue::Integer(i64::from(*b))),
            Value::Integer(i) => ToSqlOutput::Owned(SqlValue::Integer(*i)),
            Value::Float(f) => ToSqlOutput::Owned(SqlValue::Real(*f)),
            Value::Text(s) => ToSqlOutput::from(s.as_str()),
            // Lists and objects are stored as their JSON text.
            Value::List(_) | Value::Object(_) => {
                ToSqlOutput::Owned(SqlValue::Text(self.to_json().to_string()))
            }
        };
        Ok(output)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Text(s) => write!(f, "{s:?}"),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

pub fn parse_naive_date(value: &str) -> Option<NaiveDate> {
    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d", "%d-%m-%Y"];
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
}

pub fn parse_naive_datetime(value: &str) -> Option<NaiveDateTime> {
    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%d/%m/%Y %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}
