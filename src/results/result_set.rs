use std::sync::Arc;

use super::record::Record;
use crate::error::DbError;
use crate::types::Value;

/// Rows collected from one cursor, all sharing the cursor's column description.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    /// The rows returned by the command
    pub results: Vec<Record>,
    /// Column names shared by all rows (to avoid duplicating in each row)
    column_names: Arc<Vec<String>>,
}

impl ResultSet {
    #[must_use]
    pub fn with_capacity(column_names: Arc<Vec<String>>, capacity: usize) -> ResultSet {
        ResultSet {
            results: Vec::with_capacity(capacity),
            column_names,
        }
    }

    #[must_use]
    pub fn column_names(&self) -> &Arc<Vec<String>> {
        &self.column_names
    }

    /// Zip one row of raw values with the shared column names.
    ///
    /// # Errors
    /// Returns `DbError::ConversionError` when the row width differs from the description.
    pub fn add_row_values(&mut self, row_values: Vec<Value>) -> Result<(), DbError> {
        let record = Record::from_parts(Arc::clone(&self.column_names), row_values)?;
        self.results.push(record);
        Ok(())
    }

    #[must_use]
    pub fn into_records(self) -> Vec<Record> {
        self.results
    }
}
