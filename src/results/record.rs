use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use crate::error::DbError;
use crate::types::Value;

/// An ordered field-name → value mapping.
///
/// Records are what reads return (one per row) and what writes accept as payloads. Rows of
/// the same result set share one column-name list.
///
/// ```rust
/// use deebee::prelude::*;
///
/// let bob = Record::new().with("name", "Bob").with("age", 30);
/// assert_eq!(bob.columns(), ["name", "age"]);
/// assert_eq!(bob.get("age"), Some(&Value::Int(30)));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    /// The column names for this row (shared across all rows in a result set)
    column_names: Arc<Vec<String>>,
    /// The values for this row
    values: Vec<Value>,
}

impl Record {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record over an existing (possibly shared) column list.
    ///
    /// # Errors
    /// Returns `DbError::ConversionError` when the value count does not match the column count.
    pub fn from_parts(column_names: Arc<Vec<String>>, values: Vec<Value>) -> Result<Self, DbError> {
        if column_names.len() != values.len() {
            return Err(DbError::ConversionError(format!(
                "row has {} values for {} columns",
                values.len(),
                column_names.len()
            )));
        }
        Ok(Self {
            column_names,
            values,
        })
    }

    /// Builder form of [`Record::set`].
    #[must_use]
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(column, value);
        self
    }

    /// Insert or overwrite a field, returning the previous value.
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let column = column.into();
        let value = value.into();
        if let Some(idx) = self.get_column_index(&column) {
            return Some(std::mem::replace(&mut self.values[idx], value));
        }
        Arc::make_mut(&mut self.column_names).push(column);
        self.values.push(value);
        None
    }

    /// Remove a field, keeping the order of the rest.
    pub fn remove(&mut self, column: &str) -> Option<Value> {
        let idx = self.get_column_index(column)?;
        Arc::make_mut(&mut self.column_names).remove(idx);
        Some(self.values.remove(idx))
    }

    #[must_use]
    pub fn get_column_index(&self, column_name: &str) -> Option<usize> {
        self.column_names.iter().position(|col| col == column_name)
    }

    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&Value> {
        self.get_column_index(column_name)
            .and_then(|idx| self.values.get(idx))
    }

    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    #[must_use]
    pub fn contains(&self, column_name: &str) -> bool {
        self.get_column_index(column_name).is_some()
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.column_names
    }

    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.column_names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Render this record as a JSON object.
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        JsonValue::Object(
            self.iter()
                .map(|(k, v)| (k.to_string(), v.to_json()))
                .collect(),
        )
    }

    /// Build a payload from any serializable struct or map. Columns keep the field order.
    ///
    /// # Errors
    /// Returns `DbError::RenderError` when the value does not serialize to a flat object.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self, DbError> {
        let json = serde_json::to_value(value)
            .map_err(|e| DbError::RenderError(format!("payload serialization failed: {e}")))?;
        let JsonValue::Object(map) = json else {
            return Err(DbError::RenderError(format!(
                "payload must serialize to an object, got {json}"
            )));
        };
        let mut record = Record::new();
        for (column, value) in map {
            record.set(column, Value::try_from(value)?);
        }
        Ok(record)
    }

    /// Deserialize this record into a caller type through its JSON form.
    ///
    /// # Errors
    /// Returns `DbError::ConversionError` when the fields do not match `T`.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, DbError> {
        serde_json::from_value(self.to_json())
            .map_err(|e| DbError::ConversionError(format!("record does not match target type: {e}")))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (k, v) in iter {
            record.set(k, v);
        }
        record
    }
}

/// Construct a caller type from the fields of one row.
///
/// Supplied per call to the `_as` family of reads and writes; nothing in the crate requires it.
pub trait FromRecord: Sized {
    /// # Errors
    /// Returns `DbError::ConversionError` when the record lacks or mistypes a field.
    fn from_record(record: Record) -> Result<Self, DbError>;
}

impl FromRecord for Record {
    fn from_record(record: Record) -> Result<Self, DbError> {
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct User {
        name: String,
        age: i64,
    }

    #[test]
    fn set_overwrites_in_place() {
        let mut rec = Record::new().with("a", 1).with("b", 2);
        assert_eq!(rec.set("a", 10), Some(Value::Int(1)));
        assert_eq!(rec.columns(), ["a", "b"]);
        assert_eq!(rec.get("a"), Some(&Value::Int(10)));
    }

    #[test]
    fn remove_keeps_order() {
        let mut rec = Record::new().with("id", 1).with("name", "x").with("age", 3);
        assert_eq!(rec.remove("name"), Some(Value::Text("x".into())));
        assert_eq!(rec.columns(), ["id", "age"]);
        assert_eq!(rec.remove("missing"), None);
    }

    #[test]
    fn shared_columns_are_copied_on_write() {
        let names = Arc::new(vec!["id".to_string()]);
        let first = Record::from_parts(Arc::clone(&names), vec![Value::Int(1)]).unwrap();
        let mut second = Record::from_parts(names, vec![Value::Int(2)]).unwrap();
        second.set("extra", true);
        assert_eq!(first.columns(), ["id"]);
        assert_eq!(second.columns(), ["id", "extra"]);
    }

    #[test]
    fn mismatched_parts_are_rejected() {
        let err = Record::from_parts(Arc::new(vec!["id".into()]), vec![]).unwrap_err();
        assert!(matches!(err, DbError::ConversionError(_)));
    }

    #[test]
    fn serde_round_trip_through_structs() {
        let user = User {
            name: "Ann".into(),
            age: 41,
        };
        let rec = Record::from_serialize(&user).unwrap();
        assert_eq!(rec.columns(), ["name", "age"]);
        assert_eq!(rec.get("name"), Some(&Value::Text("Ann".into())));
        let back: User = rec.deserialize().unwrap();
        assert_eq!(back, user);
    }

    #[test]
    fn non_object_payloads_are_rejected() {
        let err = Record::from_serialize(&vec![1, 2]).unwrap_err();
        assert!(matches!(err, DbError::RenderError(_)));
    }
}
