//! Field values carried by records and the bucket values dimensions are keyed on.

use serde::{Deserialize, Serialize};

/// One legal value of a dimension: a small integer class or a text category.
///
/// Integers order before text, so a dynamic dimension mixing both lists its
/// numeric classes first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BucketValue {
    /// Integer class (height class, stream order, ...).
    Int(i64),
    /// Text category.
    Text(String),
}

impl BucketValue {
    /// Parse a bucket from text. Integer literals become [`BucketValue::Int`].
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        match trimmed.parse::<i64>() {
            Ok(n) => Self::Int(n),
            Err(_) => Self::Text(trimmed.to_string()),
        }
    }

    /// Canonical form, matching how record values are bucketed: numeric text
    /// becomes an integer, other text is trimmed.
    pub fn normalized(&self) -> Self {
        match self {
            Self::Int(n) => Self::Int(*n),
            Self::Text(s) => Self::parse(s),
        }
    }

    /// Integer value, if this is an integer bucket.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            Self::Text(_) => None,
        }
    }
}

impl std::fmt::Display for BucketValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{}", n),
            Self::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for BucketValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for BucketValue {
    fn from(value: i32) -> Self {
        Self::Int(value as i64)
    }
}

impl From<&str> for BucketValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for BucketValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// A raw field value as read from a record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Absent or explicit null.
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// Multi-valued field, used by array dimensions.
    List(Vec<FieldValue>),
}

impl FieldValue {
    /// Whether the value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Normalize a scalar value to a bucket.
    ///
    /// Booleans map to 0/1, integral floats and numeric strings to integers.
    /// Null, blank text and lists have no scalar bucket.
    pub fn to_bucket(&self) -> Option<BucketValue> {
        match self {
            Self::Null | Self::List(_) => None,
            Self::Bool(b) => Some(BucketValue::Int(*b as i64)),
            Self::Int(n) => Some(BucketValue::Int(*n)),
            Self::Float(f) => {
                if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                    Some(BucketValue::Int(*f as i64))
                } else {
                    Some(BucketValue::Text(f.to_string()))
                }
            }
            Self::Text(s) => {
                if s.trim().is_empty() {
                    None
                } else {
                    Some(BucketValue::parse(s))
                }
            }
        }
    }

    /// All buckets of a multi-valued field.
    ///
    /// Lists contribute each element; text is split on commas (the way
    /// multi-valued cells are exported to CSV); scalars contribute themselves.
    pub fn to_buckets(&self) -> Vec<BucketValue> {
        match self {
            Self::List(items) => items.iter().filter_map(|v| v.to_bucket()).collect(),
            Self::Text(s) if s.contains(',') => s
                .split(',')
                .filter(|part| !part.trim().is_empty())
                .map(BucketValue::parse)
                .collect(),
            other => other.to_bucket().into_iter().collect(),
        }
    }

    /// Parse a CSV cell. Empty cells are null, numeric cells are numbers.
    pub fn from_cell(cell: &str) -> Self {
        let trimmed = cell.trim();
        if trimmed.is_empty() {
            return Self::Null;
        }
        if let Ok(n) = trimmed.parse::<i64>() {
            return Self::Int(n);
        }
        if let Ok(f) = trimmed.parse::<f64>() {
            return Self::Float(f);
        }
        Self::Text(cell.to_string())
    }
}

impl From<serde_json::Value> for FieldValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Int(i)
                } else if let Some(f) = n.as_f64() {
                    Self::Float(f)
                } else {
                    Self::Text(n.to_string())
                }
            }
            serde_json::Value::String(s) => Self::Text(s),
            serde_json::Value::Array(items) => {
                Self::List(items.into_iter().map(FieldValue::from).collect())
            }
            other @ serde_json::Value::Object(_) => Self::Text(other.to_string()),
        }
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::Int(value as i64)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<BucketValue> for FieldValue {
    fn from(value: BucketValue) -> Self {
        match value {
            BucketValue::Int(n) => Self::Int(n),
            BucketValue::Text(s) => Self::Text(s),
        }
    }
}

impl<T: Into<FieldValue>> From<Vec<T>> for FieldValue {
    fn from(values: Vec<T>) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Self::Null)
    }
}
