use crate::error::DbError;

use super::QueryBuilder;

impl QueryBuilder<'_> {
    /// Run the command and discard any rows.
    ///
    /// # Errors
    /// Returns `DbError::ConnectionError` when no session is available, or
    /// `DbError::ExecutionError` when the backend rejects the command.
    pub async fn execute(self) -> Result<(), DbError> {
        self.executor
            .execute(&self.sql, &self.params, self.options.timeout)
            .await
    }
}
