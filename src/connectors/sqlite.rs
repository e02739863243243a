use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rusqlite::types::{Value as SqliteValue, ValueRef};
use tokio::sync::Mutex;

use crate::config::SqliteOptions;
use crate::error::DbError;
use crate::pool::{ColumnDescriptor, Connection, Connector, Cursor};
use crate::types::Value;

/// Busy timeout rusqlite applies to a freshly opened connection.
const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

type SharedSqliteConnection = Arc<Mutex<rusqlite::Connection>>;

/// Opens one `rusqlite` connection per pooled session.
///
/// With the default `:memory:` path every session gets its own private database, so
/// in-memory use is only meaningful with a single session at a time.
#[derive(Debug, Clone)]
pub struct SqliteConnector {
    options: SqliteOptions,
}

impl SqliteConnector {
    #[must_use]
    pub fn new(options: SqliteOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl Connector for SqliteConnector {
    async fn connect(&self) -> Result<Box<dyn Connection>, DbError> {
        let path = self.options.path.clone();
        let busy_timeout = self.options.busy_timeout.unwrap_or(DEFAULT_BUSY_TIMEOUT);
        let conn = tokio::task::spawn_blocking(move || {
            let conn = rusqlite::Connection::open(&path)?;
            conn.busy_timeout(busy_timeout)?;
            Ok::<_, rusqlite::Error>(conn)
        })
        .await
        .map_err(|e| DbError::ConnectionError(format!("sqlite spawn_blocking join error: {e}")))?
        .map_err(|e| {
            DbError::ConnectionError(format!("failed to open {}: {e}", self.options.path))
        })?;

        tracing::trace!(path = %self.options.path, "opened sqlite connection");
        Ok(Box::new(SqliteConnection {
            conn: Arc::new(Mutex::new(conn)),
            busy_timeout,
        }))
    }
}

struct SqliteConnection {
    conn: SharedSqliteConnection,
    busy_timeout: Duration,
}

impl fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteConnection")
            .field("busy_timeout", &self.busy_timeout)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Connection for SqliteConnection {
    async fn cursor(&mut self) -> Result<Box<dyn Cursor>, DbError> {
        Ok(Box::new(SqliteCursor {
            conn: Arc::clone(&self.conn),
            busy_timeout: self.busy_timeout,
            description: Vec::new(),
            rows: VecDeque::new(),
        }))
    }

    async fn close(&mut self) -> Result<(), DbError> {
        // Dropping the last handle closes the file; nothing else to flush.
        Ok(())
    }
}

/// Runs statements on the blocking pool and buffers the full result at `execute`.
struct SqliteCursor {
    conn: SharedSqliteConnection,
    busy_timeout: Duration,
    description: Vec<ColumnDescriptor>,
    rows: VecDeque<Vec<Value>>,
}

#[async_trait]
impl Cursor for SqliteCursor {
    async fn execute(
        &mut self,
        sql: &str,
        params: &[Value],
        timeout: Option<Duration>,
    ) -> Result<(), DbError> {
        let params = params
            .iter()
            .map(to_sqlite_value)
            .collect::<Result<Vec<_>, _>>()?;
        let sql = sql.to_string();
        let default_timeout = self.busy_timeout;

        let (columns, rows) = run_blocking(Arc::clone(&self.conn), move |conn| {
            if let Some(timeout) = timeout {
                conn.busy_timeout(timeout)?;
            }
            let result = query_all(conn, &sql, params);
            if timeout.is_some() {
                conn.busy_timeout(default_timeout)?;
            }
            result
        })
        .await?;

        self.description = columns.into_iter().map(ColumnDescriptor::new).collect();
        self.rows = rows.into();
        Ok(())
    }

    async fn fetch_one(&mut self) -> Result<Option<Vec<Value>>, DbError> {
        Ok(self.rows.pop_front())
    }

    async fn fetch_all(&mut self) -> Result<Vec<Vec<Value>>, DbError> {
        Ok(self.rows.drain(..).collect())
    }

    fn description(&self) -> &[ColumnDescriptor] {
        &self.description
    }

    async fn close(&mut self) -> Result<(), DbError> {
        self.rows.clear();
        Ok(())
    }
}

async fn run_blocking<F, R>(conn: SharedSqliteConnection, func: F) -> Result<R, DbError>
where
    F: FnOnce(&mut rusqlite::Connection) -> Result<R, DbError> + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut guard = conn.blocking_lock();
        func(&mut guard)
    })
    .await
    .map_err(|e| DbError::ExecutionError(format!("sqlite spawn_blocking join error: {e}")))?
}

fn query_all(
    conn: &rusqlite::Connection,
    sql: &str,
    params: Vec<SqliteValue>,
) -> Result<(Vec<String>, Vec<Vec<Value>>), DbError> {
    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(str::to_string).collect();
    let width = columns.len();

    let mut rows = stmt.query(rusqlite::params_from_iter(params))?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(width);
        for idx in 0..width {
            values.push(from_sqlite_value(row.get_ref(idx)?, &columns[idx])?);
        }
        out.push(values);
    }
    Ok((columns, out))
}

fn to_sqlite_value(value: &Value) -> Result<SqliteValue, DbError> {
    Ok(match value {
        Value::Null => SqliteValue::Null,
        Value::Bool(b) => SqliteValue::Integer(i64::from(*b)),
        Value::Int(i) => SqliteValue::Integer(*i),
        Value::Float(f) => SqliteValue::Real(*f),
        Value::Text(s) => SqliteValue::Text(s.clone()),
        Value::Date(d) => SqliteValue::Text(d.format("%F").to_string()),
        Value::Timestamp(ts) => SqliteValue::Text(ts.format("%F %T%.f").to_string()),
        Value::Range(..) | Value::List(_) => {
            return Err(DbError::ConversionError(format!(
                "{value:?} cannot be bound as a sqlite parameter"
            )));
        }
    })
}

fn from_sqlite_value(value: ValueRef<'_>, column: &str) -> Result<Value, DbError> {
    match value {
        ValueRef::Null => Ok(Value::Null),
        ValueRef::Integer(i) => Ok(Value::Int(i)),
        ValueRef::Real(f) => Ok(Value::Float(f)),
        ValueRef::Text(bytes) => std::str::from_utf8(bytes)
            .map(|s| Value::Text(s.to_string()))
            .map_err(|e| DbError::ConversionError(format!("column '{column}' is not utf-8: {e}"))),
        ValueRef::Blob(_) => Err(DbError::ConversionError(format!(
            "column '{column}' holds a blob, which has no Value form"
        ))),
    }
}
