use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Primary identifier of a procurement record; the listing sorts by it by default.
pub const DOCUMENT_ID_FIELD: &str = "document_id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }

    pub fn as_i8(self) -> i8 {
        match self {
            Self::Ascending => 1,
            Self::Descending => -1,
        }
    }
}

impl From<SortDirection> for i8 {
    fn from(value: SortDirection) -> Self {
        value.as_i8()
    }
}

impl TryFrom<i8> for SortDirection {
    type Error = String;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Ascending),
            -1 => Ok(Self::Descending),
            other => Err(format!("sort direction must be 1 or -1, got {other}")),
        }
    }
}

/// A single cell of a procurement row.
///
/// Rows come back from the data source as loose JSON objects; only flat
/// primitive values are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Number(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
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

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// One procurement row as returned by the data source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(pub BTreeMap<String, FieldValue>);

impl Record {
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.0.get(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Record
where
    K: Into<String>,
    V: Into<FieldValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("row is not a JSON object")]
    NotAnObject,
    #[error("field {field:?} holds a nested value")]
    NestedField { field: String },
    #[error("field {field:?} holds a number that does not fit f64")]
    UnsupportedNumber { field: String },
}

/// Converts one loosely typed row, naming the first field that is not a flat primitive.
impl TryFrom<Value> for Record {
    type Error = RecordError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let Value::Object(map) = value else {
            return Err(RecordError::NotAnObject);
        };

        map.into_iter()
            .map(|(field, value)| {
                let value = match value {
                    Value::Null => FieldValue::Null,
                    Value::Bool(v) => FieldValue::Bool(v),
                    Value::Number(n) => match n.as_f64() {
                        Some(v) => FieldValue::Number(v),
                        None => return Err(RecordError::UnsupportedNumber { field }),
                    },
                    Value::String(v) => FieldValue::Text(v),
                    Value::Array(_) | Value::Object(_) => {
                        return Err(RecordError::NestedField { field })
                    }
                };
                Ok((field, value))
            })
            .collect::<Result<BTreeMap<_, _>, _>>()
            .map(Self)
    }
}
