mod apply;
mod list;
mod write;

use std::borrow::Cow;

pub use list::ListOptions;

use crate::config::DbConfig;
use crate::connectors;
use crate::error::DbError;
use crate::executor::Executor;
use crate::pool::Pool;
use crate::query_builder::{QueryBuilder, QueryOptions};
use crate::results::{FromRecord, Record};
use crate::types::Value;

/// Facade over one pool: raw commands plus the table helpers that assemble them.
///
/// Cloning is cheap; clones share the pool.
///
/// ```rust,no_run
/// use deebee::prelude::*;
///
/// # async fn demo() -> Result<(), DbError> {
/// let db = Db::connect(&DbConfig::sqlite(SqliteOptions::new("app.db")))?;
/// let bob = db
///     .insert("users", Record::new().with("name", "Bob").with("age", 30))
///     .await?;
/// let adults = db
///     .get_list("users", &ListOptions::new().filter(Filter::new().and("age__gte", 18)))
///     .await?;
/// # let _ = (bob, adults);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Db {
    executor: Executor,
    options: QueryOptions,
}

impl Db {
    #[must_use]
    pub fn new(pool: Pool) -> Self {
        Self {
            executor: Executor::new(pool),
            options: QueryOptions::default(),
        }
    }

    /// Build the connector named by `config` and wrap it in a fresh pool.
    ///
    /// No session is opened until the first command runs.
    ///
    /// # Errors
    /// Returns `DbError::ConfigError` when the backend options are incomplete.
    pub fn connect(config: &DbConfig) -> Result<Self, DbError> {
        let connector = connectors::connector_for(config)?;
        tracing::debug!(backend = ?config.backend, "building pool");
        Ok(Self::new(Pool::with_options(connector, config.pool)))
    }

    /// Options applied to every command issued through this facade.
    #[must_use]
    pub fn with_options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn pool(&self) -> &Pool {
        self.executor.pool()
    }

    #[must_use]
    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// Start a fluent raw command.
    pub fn query<'q>(&self, sql: impl Into<Cow<'q, str>>) -> QueryBuilder<'q> {
        QueryBuilder::new(self.executor.clone(), sql, self.options)
    }

    /// Close idle sessions and refuse new checkouts.
    ///
    /// # Errors
    /// Returns the first close error reported by the backend.
    pub async fn shutdown(&self) -> Result<(), DbError> {
        self.pool().shutdown().await
    }

    /// Every row of a raw command; an empty `Vec` when nothing matched.
    ///
    /// # Errors
    /// Returns `DbError::ConnectionError` when no session is available, or
    /// `DbError::ExecutionError` when the backend rejects the command.
    pub async fn select(&self, sql: &str, params: &[Value]) -> Result<Vec<Record>, DbError> {
        self.executor.rows(sql, params, self.options.timeout).await
    }

    /// # Errors
    /// As [`Db::select`], plus whatever `M::from_record` reports.
    pub async fn select_as<M: FromRecord>(
        &self,
        sql: &str,
        params: &[Value],
    ) -> Result<Vec<M>, DbError> {
        self.executor.rows_as(sql, params, self.options.timeout).await
    }

    /// First row of a raw command; an empty [`Record`] when nothing matched.
    ///
    /// # Errors
    /// See [`Db::select`].
    pub async fn row(&self, sql: &str, params: &[Value]) -> Result<Record, DbError> {
        Ok(self
            .executor
            .row(sql, params, false, self.options.timeout)
            .await?
            .unwrap_or_default())
    }

    /// # Errors
    /// As [`Db::select`], plus whatever `M::from_record` reports.
    pub async fn row_as<M: FromRecord>(
        &self,
        sql: &str,
        params: &[Value],
    ) -> Result<Option<M>, DbError> {
        self.executor
            .row_as(sql, params, false, self.options.timeout)
            .await
    }

    /// First column of the first row; `None` when nothing matched or the value is NULL.
    ///
    /// # Errors
    /// See [`Db::select`].
    pub async fn value(&self, sql: &str, params: &[Value]) -> Result<Option<Value>, DbError> {
        self.executor.scalar(sql, params, self.options.timeout).await
    }

    /// # Errors
    /// See [`Db::select`].
    pub async fn execute(&self, sql: &str, params: &[Value]) -> Result<(), DbError> {
        self.executor.execute(sql, params, self.options.timeout).await
    }

    async fn first_row(&self, sql: &str) -> Result<Option<Record>, DbError> {
        self.executor
            .row(sql, &[], false, self.options.timeout)
            .await
    }
}

fn key_columns(key: &str, op: &str) -> Result<Vec<String>, DbError> {
    let keys = crate::builder::split_columns(key);
    if keys.is_empty() {
        return Err(DbError::ConstraintError(format!(
            "{op} requires at least one key column"
        )));
    }
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Filter;
    use crate::test_utils::ScriptedConnector;

    pub(super) fn scripted() -> (ScriptedConnector, Db) {
        let connector = ScriptedConnector::new();
        let db = Db::new(Pool::new(connector.clone().shared()));
        (connector, db)
    }

    #[tokio::test]
    async fn empty_results_have_empty_shapes() {
        let (_, db) = scripted();
        assert!(db.select("select * from t", &[]).await.unwrap().is_empty());
        assert!(db.row("select * from t", &[]).await.unwrap().is_empty());
        assert_eq!(db.value("select max(id) from t", &[]).await.unwrap(), None);
        let none: Option<Record> = db.row_as("select * from t", &[]).await.unwrap();
        assert!(none.is_none());
    }

    #[tokio::test]
    async fn fluent_query_forwards_params_and_timeout() {
        let (connector, db) = scripted();
        connector.respond("select name", &["name"], vec![vec![Value::from("ann")]]);
        let params = [Value::Int(1)];
        let row = db
            .query("select name from users where id = $1")
            .params(&params)
            .timeout(std::time::Duration::from_millis(250))
            .row()
            .await
            .unwrap();
        assert_eq!(row.get("name"), Some(&Value::from("ann")));
        assert_eq!(connector.params(), vec![vec![Value::Int(1)]]);
        assert_eq!(
            connector.timeouts(),
            vec![Some(std::time::Duration::from_millis(250))]
        );
    }

    #[tokio::test]
    async fn facade_options_apply_to_helpers() {
        let connector = ScriptedConnector::new();
        let timeout = std::time::Duration::from_secs(2);
        let db = Db::new(Pool::new(connector.clone().shared()))
            .with_options(QueryOptions::default().with_timeout(timeout));
        db.count("users", &Filter::new()).await.unwrap();
        assert_eq!(connector.timeouts(), vec![Some(timeout)]);
    }

    #[tokio::test]
    async fn last_row_reads_the_final_row() {
        let (connector, db) = scripted();
        connector.respond(
            "select id",
            &["id"],
            vec![vec![Value::Int(1)], vec![Value::Int(2)], vec![Value::Int(3)]],
        );
        let row = db.query("select id from t").last_row().await.unwrap();
        assert_eq!(row.get("id"), Some(&Value::Int(3)));
    }

    #[test]
    fn blank_key_lists_are_rejected() {
        assert!(matches!(
            key_columns(" , ", "apply"),
            Err(DbError::ConstraintError(_))
        ));
        assert_eq!(key_columns("a, b", "apply").unwrap(), ["a", "b"]);
    }
}
