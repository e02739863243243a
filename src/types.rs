use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value as JsonValue;

use crate::error::DbError;

/// Values that can be rendered into SQL text, bound as parameters, or read back from a row.
///
/// Every value handed to a filter or a data payload is one of these variants, so literal
/// rendering never has to guess at a type:
/// ```rust
/// use deebee::prelude::*;
///
/// let values = vec![
///     Value::from(1),
///     Value::from("alice"),
///     Value::from(true),
///     Value::from((18, 65)),
/// ];
/// # let _ = values;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// NULL value
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Calendar date
    Date(NaiveDate),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// Inclusive pair used by `between` filters
    Range(Box<Value>, Box<Value>),
    /// Collection used by `in` / `nin` filters
    List(Vec<Value>),
}

impl Value {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Float(_))
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        if let Value::Int(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(value) => Some(*value),
            #[allow(clippy::cast_precision_loss)]
            Value::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let Value::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(value) => Some(*value),
            Value::Int(1) => Some(true),
            Value::Int(0) => Some(false),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Timestamp(value) => Some(*value),
            Value::Text(s) => NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
                .ok(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(value) => Some(*value),
            Value::Text(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d").ok(),
            _ => None,
        }
    }

    /// Convert into a JSON value. Dates and timestamps become their ISO text form.
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Int(i) => JsonValue::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f).map_or(JsonValue::Null, JsonValue::Number),
            Value::Text(s) => JsonValue::String(s.clone()),
            Value::Date(d) => JsonValue::String(d.format("%Y-%m-%d").to_string()),
            Value::Timestamp(ts) => JsonValue::String(ts.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
            Value::Range(low, high) => JsonValue::Array(vec![low.to_json(), high.to_json()]),
            Value::List(items) => JsonValue::Array(items.iter().map(Value::to_json).collect()),
        }
    }
}

impl TryFrom<JsonValue> for Value {
    type Error = DbError;

    /// JSON objects have no literal form and are rejected here, before they can reach
    /// the renderer.
    fn try_from(json: JsonValue) -> Result<Self, Self::Error> {
        match json {
            JsonValue::Null => Ok(Value::Null),
            JsonValue::Bool(b) => Ok(Value::Bool(b)),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Value::Int(i))
                } else if let Some(f) = n.as_f64() {
                    Ok(Value::Float(f))
                } else {
                    Err(DbError::RenderError(format!("number {n} does not fit a 64-bit literal")))
                }
            }
            JsonValue::String(s) => Ok(Value::Text(s)),
            JsonValue::Array(items) => items
                .into_iter()
                .map(Value::try_from)
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            JsonValue::Object(map) => Err(DbError::RenderError(format!(
                "structured object with keys {:?} has no SQL literal form",
                map.keys().collect::<Vec<_>>()
            ))),
        }
    }
}

macro_rules! value_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::Int(i64::from(v))
            }
        })*
    };
}

value_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Timestamp(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl<A: Into<Value>, B: Into<Value>> From<(A, B)> for Value {
    fn from((low, high): (A, B)) -> Self {
        Value::Range(Box::new(low.into()), Box::new(high.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_objects_are_rejected() {
        let err = Value::try_from(json!({"nested": 1})).unwrap_err();
        assert!(matches!(err, DbError::RenderError(_)));
    }

    #[test]
    fn json_arrays_become_lists() {
        let v = Value::try_from(json!([1, "a", null, 2.5])).unwrap();
        assert_eq!(
            v,
            Value::List(vec![
                Value::Int(1),
                Value::Text("a".into()),
                Value::Null,
                Value::Float(2.5)
            ])
        );
    }

    #[test]
    fn tuples_become_ranges() {
        assert_eq!(
            Value::from((1, 5)),
            Value::Range(Box::new(Value::Int(1)), Box::new(Value::Int(5)))
        );
    }

    #[test]
    fn text_timestamps_parse_in_both_layouts() {
        let iso = Value::from("2024-03-01T10:20:30").as_timestamp();
        let spaced = Value::from("2024-03-01 10:20:30").as_timestamp();
        assert!(iso.is_some());
        assert_eq!(iso, spaced);
    }
}
