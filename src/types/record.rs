//! Records: immutable rows of named fields with a stable identifier.

use std::collections::HashMap;

use serde::{Serialize, Serializer};

use super::value::FieldValue;

/// Stable record identifier.
///
/// Numeric text ids are read as integers, so an id parses the same from JSON
/// strings, JSON numbers and CSV cells. Positional ids render as `#n`; a source
/// text id of that exact form is not distinguished in serialized output.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordId {
    /// Numeric id from the source data.
    Int(i64),
    /// Text id from the source data.
    Text(String),
    /// Assigned from the record's position when the source carried no usable id.
    Positional(u32),
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{}", n),
            Self::Text(s) => write!(f, "{}", s),
            Self::Positional(p) => write!(f, "#{}", p),
        }
    }
}

impl Serialize for RecordId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Int(n) => serializer.serialize_i64(*n),
            Self::Text(s) => serializer.serialize_str(s),
            Self::Positional(_) => serializer.collect_str(self),
        }
    }
}

impl From<i64> for RecordId {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for RecordId {
    fn from(value: i32) -> Self {
        Self::Int(value as i64)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl RecordId {
    /// Parse an id from trimmed text. Integer literals become [`RecordId::Int`].
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        match trimmed.parse::<i64>() {
            Ok(n) => Self::Int(n),
            Err(_) => Self::Text(trimmed.to_string()),
        }
    }

    /// Derive an id from a field value, or fall back to the record position.
    pub fn from_field(value: Option<&FieldValue>, position: u32) -> Self {
        match value {
            Some(FieldValue::Int(n)) => Self::Int(*n),
            Some(FieldValue::Float(f)) if f.is_finite() && f.fract() == 0.0 => Self::Int(*f as i64),
            Some(FieldValue::Text(s)) if !s.trim().is_empty() => Self::parse(s),
            _ => Self::Positional(position),
        }
    }

    /// Whether the id was synthesized from the record position.
    pub fn is_positional(&self) -> bool {
        matches!(self, Self::Positional(_))
    }
}

/// A single barrier record: an id plus named fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    /// Stable identifier.
    pub id: RecordId,
    /// Field name -> raw value.
    pub fields: HashMap<String, FieldValue>,
}

impl Record {
    /// Create a record with no fields.
    pub fn new(id: impl Into<RecordId>) -> Self {
        Self {
            id: id.into(),
            fields: HashMap::new(),
        }
    }

    /// Set a field (builder style).
    pub fn field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Get a field value. Explicit nulls are reported as absent.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name).filter(|v| !v.is_null())
    }
}
