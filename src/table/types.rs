// src/table/types.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::cast::{format_date, format_timestamp};

/// The logical type of a column. Every column holds exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalType {
    String,
    Int64,
    Float64,
    Boolean,
    /// Microseconds since the Unix epoch, no time zone.
    Timestamp,
    /// Days since 1970-01-01.
    Date,
}

impl LogicalType {
    pub const ALL: [LogicalType; 6] = [
        LogicalType::String,
        LogicalType::Int64,
        LogicalType::Float64,
        LogicalType::Boolean,
        LogicalType::Timestamp,
        LogicalType::Date,
    ];

    /// Token used in schema declarations and in `info` output.
    pub fn name(self) -> &'static str {
        match self {
            LogicalType::String => "string",
            LogicalType::Int64 => "int64",
            LogicalType::Float64 => "float64",
            LogicalType::Boolean => "boolean",
            LogicalType::Timestamp => "timestamp",
            LogicalType::Date => "date",
        }
    }

    /// Footer tag for this type.
    pub(crate) fn tag(self) -> u8 {
        match self {
            LogicalType::String => 0,
            LogicalType::Int64 => 1,
            LogicalType::Float64 => 2,
            LogicalType::Boolean => 3,
            LogicalType::Timestamp => 4,
            LogicalType::Date => 5,
        }
    }

    pub(crate) fn from_tag(tag: u8) -> Option<Self> {
        LogicalType::ALL.into_iter().find(|t| t.tag() == tag)
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LogicalType {
    type Err = String;

    /// Case-insensitive; returns the offending token on failure.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        LogicalType::ALL
            .into_iter()
            .find(|t| t.name() == lower)
            .ok_or_else(|| s.to_string())
    }
}

/// A named, typed column slot in a schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub logical_type: LogicalType,
}

impl Field {
    pub fn new(name: impl Into<String>, logical_type: LogicalType) -> Self {
        Field {
            name: name.into(),
            logical_type,
        }
    }
}

/// Ordered list of fields.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Schema {
    pub fields: Vec<Field>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        Schema { fields }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }
}

/// A single non-null cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Int64(i64),
    Float64(f64),
    Boolean(bool),
    Timestamp(i64),
    Date(i32),
}

impl Value {
    pub fn logical_type(&self) -> LogicalType {
        match self {
            Value::String(_) => LogicalType::String,
            Value::Int64(_) => LogicalType::Int64,
            Value::Float64(_) => LogicalType::Float64,
            Value::Boolean(_) => LogicalType::Boolean,
            Value::Timestamp(_) => LogicalType::Timestamp,
            Value::Date(_) => LogicalType::Date,
        }
    }
}

/// Canonical text form, shared by `cast` to string and every renderer.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => f.write_str(s),
            Value::Int64(v) => write!(f, "{v}"),
            Value::Float64(v) => write!(f, "{v}"),
            Value::Boolean(v) => f.write_str(if *v { "true" } else { "false" }),
            Value::Timestamp(v) => f.write_str(&format_timestamp(*v)),
            Value::Date(v) => f.write_str(&format_date(*v)),
        }
    }
}
