mod dispatch;

use std::time::Duration;

use crate::error::DbError;
use crate::pool::Pool;
use crate::results::{FromRecord, Record};
use crate::types::Value;

/// What to read back after a command runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fetch {
    /// Every row.
    #[default]
    All,
    /// The first row only.
    First,
    /// The final row of the result.
    Last,
    /// First column of the first row.
    Scalar,
    /// Run the command and read nothing.
    Nothing,
}

/// Output of one command, shaped by its [`Fetch`] mode.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched {
    Rows(Vec<Record>),
    Row(Option<Record>),
    Scalar(Option<Value>),
    Done,
}

/// Runs command text against pooled sessions.
///
/// Each call checks out one session, opens one cursor, and closes and releases both before
/// returning, whether the command succeeded or not.
#[derive(Debug, Clone)]
pub struct Executor {
    pool: Pool,
}

impl Executor {
    #[must_use]
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Run one command.
    ///
    /// # Errors
    /// Connection errors from the pool pass through unchanged. Any failure while executing
    /// or fetching comes back as `DbError::ExecutionError` carrying the backend's message.
    pub async fn run(
        &self,
        sql: &str,
        params: &[Value],
        fetch: Fetch,
        timeout: Option<Duration>,
    ) -> Result<Fetched, DbError> {
        tracing::debug!(sql, ?fetch, params = params.len(), "executing command");
        let mut conn = self.pool.acquire().await?;
        let result = dispatch::run_on(&mut conn, sql, params, fetch, timeout).await;
        self.pool.release(conn);
        result
    }

    /// # Errors
    /// See [`Executor::run`].
    pub async fn rows(
        &self,
        sql: &str,
        params: &[Value],
        timeout: Option<Duration>,
    ) -> Result<Vec<Record>, DbError> {
        match self.run(sql, params, Fetch::All, timeout).await? {
            Fetched::Rows(rows) => Ok(rows),
            other => Err(unexpected(&other)),
        }
    }

    /// First (or, with `last`, final) row of the result.
    ///
    /// # Errors
    /// See [`Executor::run`].
    pub async fn row(
        &self,
        sql: &str,
        params: &[Value],
        last: bool,
        timeout: Option<Duration>,
    ) -> Result<Option<Record>, DbError> {
        let fetch = if last { Fetch::Last } else { Fetch::First };
        match self.run(sql, params, fetch, timeout).await? {
            Fetched::Row(row) => Ok(row),
            other => Err(unexpected(&other)),
        }
    }

    /// First column of the first row; `None` for an empty result or SQL NULL.
    ///
    /// # Errors
    /// See [`Executor::run`].
    pub async fn scalar(
        &self,
        sql: &str,
        params: &[Value],
        timeout: Option<Duration>,
    ) -> Result<Option<Value>, DbError> {
        match self.run(sql, params, Fetch::Scalar, timeout).await? {
            Fetched::Scalar(value) => Ok(value),
            other => Err(unexpected(&other)),
        }
    }

    /// # Errors
    /// See [`Executor::run`].
    pub async fn execute(
        &self,
        sql: &str,
        params: &[Value],
        timeout: Option<Duration>,
    ) -> Result<(), DbError> {
        self.run(sql, params, Fetch::Nothing, timeout).await?;
        Ok(())
    }

    /// Every row, each built into `M` through its [`FromRecord`] capability.
    ///
    /// # Errors
    /// See [`Executor::run`]; construction failures are returned as reported by `M`.
    pub async fn rows_as<M: FromRecord>(
        &self,
        sql: &str,
        params: &[Value],
        timeout: Option<Duration>,
    ) -> Result<Vec<M>, DbError> {
        self.rows(sql, params, timeout)
            .await?
            .into_iter()
            .map(M::from_record)
            .collect()
    }

    /// # Errors
    /// See [`Executor::rows_as`].
    pub async fn row_as<M: FromRecord>(
        &self,
        sql: &str,
        params: &[Value],
        last: bool,
        timeout: Option<Duration>,
    ) -> Result<Option<M>, DbError> {
        self.row(sql, params, last, timeout)
            .await?
            .map(M::from_record)
            .transpose()
    }
}

fn unexpected(fetched: &Fetched) -> DbError {
    DbError::ExecutionError(format!("executor returned an unexpected shape: {fetched:?}"))
}
