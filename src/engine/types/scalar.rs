use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Number, Value as JsonValue};

/// A single cell as produced by the execution gateway.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Null,
    Boolean(bool),
    Int64(i64),
    Float64(f64),
    /// Epoch seconds, UTC.
    Timestamp(i64),
    Date(NaiveDate),
    Utf8(String),
    /// A `(current, previous)` style tuple column.
    Tuple(Vec<ScalarValue>),
}

impl ScalarValue {
    pub fn to_json(&self) -> JsonValue {
        match self {
            ScalarValue::Null => JsonValue::Null,
            ScalarValue::Boolean(b) => JsonValue::Bool(*b),
            ScalarValue::Int64(i) => JsonValue::Number(Number::from(*i)),
            ScalarValue::Float64(f) => Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            ScalarValue::Timestamp(ts) => JsonValue::Number(Number::from(*ts)),
            ScalarValue::Date(d) => JsonValue::String(d.format("%Y-%m-%d").to_string()),
            ScalarValue::Utf8(s) => JsonValue::String(s.clone()),
            ScalarValue::Tuple(items) => {
                JsonValue::Array(items.iter().map(ScalarValue::to_json).collect())
            }
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ScalarValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScalarValue::Utf8(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ScalarValue::Int64(i) => Some(*i),
            ScalarValue::Timestamp(ts) => Some(*ts),
            ScalarValue::Boolean(b) => Some(*b as i64),
            ScalarValue::Date(d) => Some(d.and_time(NaiveTime::MIN).and_utc().timestamp()),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ScalarValue::Float64(f) => Some(*f),
            ScalarValue::Utf8(s) => s.parse::<f64>().ok(),
            other => other.as_i64().map(|i| i as f64),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ScalarValue::Boolean(b) => Some(*b),
            ScalarValue::Int64(i) => Some(*i != 0),
            ScalarValue::Float64(f) => Some(*f != 0.0),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            ScalarValue::Timestamp(_) | ScalarValue::Date(_) => {
                self.as_i64().and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
            }
            _ => None,
        }
    }

    /// String form used for distinct counting and grouping. `Null` is empty.
    pub fn to_string_repr(&self) -> String {
        match self {
            ScalarValue::Null => String::new(),
            ScalarValue::Boolean(b) => b.to_string(),
            ScalarValue::Int64(i) => i.to_string(),
            ScalarValue::Float64(f) => f.to_string(),
            ScalarValue::Timestamp(ts) => ts.to_string(),
            ScalarValue::Date(d) => d.format("%Y-%m-%d").to_string(),
            ScalarValue::Utf8(s) => s.clone(),
            ScalarValue::Tuple(_) => self.to_json().to_string(),
        }
    }

    /// Total order for sorting. Numbers compare numerically, `Null` sorts last.
    pub fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (ScalarValue::Null, ScalarValue::Null) => return Ordering::Equal,
            (ScalarValue::Null, _) => return Ordering::Greater,
            (_, ScalarValue::Null) => return Ordering::Less,
            (ScalarValue::Utf8(a), ScalarValue::Utf8(b)) => return a.cmp(b),
            (ScalarValue::Tuple(a), ScalarValue::Tuple(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    let ord = x.compare(y);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                return a.len().cmp(&b.len());
            }
            _ => {}
        }
        if let (Some(va), Some(vb)) = (self.as_i64(), other.as_i64()) {
            return va.cmp(&vb);
        }
        if let (Some(va), Some(vb)) = (self.as_f64(), other.as_f64()) {
            return va.partial_cmp(&vb).unwrap_or(Ordering::Equal);
        }
        self.to_string_repr().cmp(&other.to_string_repr())
    }

    /// SQL-style equality: `None` when either side is `Null`.
    pub fn sql_eq(&self, other: &Self) -> Option<bool> {
        if self.is_null() || other.is_null() {
            return None;
        }
        Some(self.compare(other) == Ordering::Equal)
    }
}

impl From<JsonValue> for ScalarValue {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => ScalarValue::Null,
            JsonValue::Bool(b) => ScalarValue::Boolean(b),
            JsonValue::Number(num) => {
                if let Some(i) = num.as_i64() {
                    ScalarValue::Int64(i)
                } else if let Some(f) = num.as_f64() {
                    ScalarValue::Float64(f)
                } else {
                    ScalarValue::Utf8(num.to_string())
                }
            }
            JsonValue::String(s) => ScalarValue::Utf8(s),
            JsonValue::Array(items) => {
                ScalarValue::Tuple(items.into_iter().map(ScalarValue::from).collect())
            }
            JsonValue::Object(_) => ScalarValue::Utf8(value.to_string()),
        }
    }
}

impl From<&ScalarValue> for JsonValue {
    fn from(value: &ScalarValue) -> Self {
        value.to_json()
    }
}

impl From<&str> for ScalarValue {
    fn from(value: &str) -> Self {
        ScalarValue::Utf8(value.to_string())
    }
}

impl From<i64> for ScalarValue {
    fn from(value: i64) -> Self {
        ScalarValue::Int64(value)
    }
}

impl From<f64> for ScalarValue {
    fn from(value: f64) -> Self {
        ScalarValue::Float64(value)
    }
}

impl<T: Into<ScalarValue>> From<Option<T>> for ScalarValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(ScalarValue::Null)
    }
}

impl Serialize for ScalarValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ScalarValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let json = JsonValue::deserialize(deserializer)?;
        Ok(ScalarValue::from(json))
    }
}
