use crate::error::DbError;
use crate::results::{FromRecord, Record};
use crate::types::Value;

use super::QueryBuilder;

impl QueryBuilder<'_> {
    /// Every row of the result.
    ///
    /// # Errors
    /// Returns `DbError::ConnectionError` when no session is available, or
    /// `DbError::ExecutionError` when the backend rejects the command.
    pub async fn select(self) -> Result<Vec<Record>, DbError> {
        self.executor
            .rows(&self.sql, &self.params, self.options.timeout)
            .await
    }

    /// # Errors
    /// As [`QueryBuilder::select`], plus whatever `M::from_record` reports.
    pub async fn select_as<M: FromRecord>(self) -> Result<Vec<M>, DbError> {
        self.executor
            .rows_as(&self.sql, &self.params, self.options.timeout)
            .await
    }

    /// First row, or an empty [`Record`] when the result is empty.
    ///
    /// # Errors
    /// See [`QueryBuilder::select`].
    pub async fn row(self) -> Result<Record, DbError> {
        Ok(self
            .executor
            .row(&self.sql, &self.params, false, self.options.timeout)
            .await?
            .unwrap_or_default())
    }

    /// Final row, or an empty [`Record`] when the result is empty.
    ///
    /// # Errors
    /// See [`QueryBuilder::select`].
    pub async fn last_row(self) -> Result<Record, DbError> {
        Ok(self
            .executor
            .row(&self.sql, &self.params, true, self.options.timeout)
            .await?
            .unwrap_or_default())
    }

    /// # Errors
    /// As [`QueryBuilder::select`], plus whatever `M::from_record` reports.
    pub async fn row_as<M: FromRecord>(self) -> Result<Option<M>, DbError> {
        self.executor
            .row_as(&self.sql, &self.params, false, self.options.timeout)
            .await
    }

    /// First column of the first row.
    ///
    /// # Errors
    /// See [`QueryBuilder::select`].
    pub async fn value(self) -> Result<Option<Value>, DbError> {
        self.executor
            .scalar(&self.sql, &self.params, self.options.timeout)
            .await
    }
}
