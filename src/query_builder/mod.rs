use std::borrow::Cow;
use std::time::Duration;

use crate::executor::Executor;
use crate::types::Value;

mod dml;
mod select;

/// Per-command options forwarded to the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// Enforced by the connector's driver; the executor never cancels on its own.
    pub timeout: Option<Duration>,
}

impl QueryOptions {
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Fluent builder for one raw command.
///
/// ```rust,no_run
/// # use deebee::prelude::*;
/// # async fn demo(db: &Db) -> Result<(), DbError> {
/// let params = [Value::from(18)];
/// let adults = db
///     .query("select * from users where age >= $1")
///     .params(&params)
///     .select()
///     .await?;
/// # let _ = adults;
/// # Ok(())
/// # }
/// ```
pub struct QueryBuilder<'q> {
    pub(crate) executor: Executor,
    pub(crate) sql: Cow<'q, str>,
    pub(crate) params: Cow<'q, [Value]>,
    pub(crate) options: QueryOptions,
}

impl<'q> QueryBuilder<'q> {
    pub(crate) fn new(executor: Executor, sql: impl Into<Cow<'q, str>>, options: QueryOptions) -> Self {
        Self {
            executor,
            sql: sql.into(),
            params: Cow::Borrowed(&[]),
            options,
        }
    }

    /// Provide parameters for this statement.
    #[must_use]
    pub fn params(mut self, params: &'q [Value]) -> Self {
        self.params = Cow::Borrowed(params);
        self
    }

    /// Provide owned parameters for this statement.
    #[must_use]
    pub fn params_owned(mut self, params: Vec<Value>) -> Self {
        self.params = Cow::Owned(params);
        self
    }

    #[must_use]
    pub fn options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = Some(timeout);
        self
    }
}
