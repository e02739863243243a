use std::collections::VecDeque;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};
use tokio_postgres::{Client, NoTls, Row};
use tokio_util::bytes;

use crate::config::PostgresOptions;
use crate::error::DbError;
use crate::pool::{ColumnDescriptor, Connection, Connector, Cursor};
use crate::types::Value;

/// Opens one `tokio-postgres` client per pooled session.
#[derive(Debug, Clone)]
pub struct PostgresConnector {
    options: PostgresOptions,
}

impl PostgresConnector {
    #[must_use]
    pub fn new(options: PostgresOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl Connector for PostgresConnector {
    async fn connect(&self) -> Result<Box<dyn Connection>, DbError> {
        self.options.validate()?;
        let (client, connection) = tokio_postgres::connect(&self.options.dsn(), NoTls)
            .await
            .map_err(|e| DbError::ConnectionError(format!("postgres connect failed: {e}")))?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::warn!(error = %e, "postgres connection task ended with error");
            }
        });

        tracing::trace!(host = ?self.options.host, "opened postgres connection");
        Ok(Box::new(PostgresConnection {
            client: Arc::new(client),
        }))
    }
}

struct PostgresConnection {
    client: Arc<Client>,
}

#[async_trait]
impl Connection for PostgresConnection {
    async fn cursor(&mut self) -> Result<Box<dyn Cursor>, DbError> {
        Ok(Box::new(PostgresCursor {
            client: Arc::clone(&self.client),
            description: Vec::new(),
            rows: VecDeque::new(),
        }))
    }

    async fn close(&mut self) -> Result<(), DbError> {
        // The connection task exits once the last client handle is dropped.
        Ok(())
    }

    fn has_broken(&self) -> bool {
        self.client.is_closed()
    }
}

struct PostgresCursor {
    client: Arc<Client>,
    description: Vec<ColumnDescriptor>,
    rows: VecDeque<Vec<Value>>,
}

#[async_trait]
impl Cursor for PostgresCursor {
    async fn execute(
        &mut self,
        sql: &str,
        params: &[Value],
        timeout: Option<Duration>,
    ) -> Result<(), DbError> {
        let refs: Vec<&(dyn ToSql + Sync)> =
            params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();

        let client = Arc::clone(&self.client);
        let run = async {
            let stmt = client.prepare(sql).await?;
            let rows = client.query(&stmt, &refs).await?;
            let columns: Vec<ColumnDescriptor> = stmt
                .columns()
                .iter()
                .map(|col| ColumnDescriptor::new(col.name()))
                .collect();
            let decoded = rows
                .iter()
                .map(|row| {
                    (0..columns.len())
                        .map(|idx| postgres_extract_value(row, idx))
                        .collect::<Result<Vec<_>, _>>()
                })
                .collect::<Result<VecDeque<_>, _>>()?;
            Ok::<_, DbError>((columns, decoded))
        };

        let (columns, rows) = match timeout {
            Some(limit) => tokio::time::timeout(limit, run).await.map_err(|_| {
                DbError::ExecutionError(format!("statement timed out after {limit:?}"))
            })??,
            None => run.await?,
        };
        self.description = columns;
        self.rows = rows;
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

/// Extracts a [`Value`] from a `tokio_postgres` row at the given index.
///
/// # Errors
/// Returns `DbError::ConversionError` for `bytea` columns, and the driver's error when a
/// column cannot be read as its declared type.
pub fn postgres_extract_value(row: &Row, idx: usize) -> Result<Value, DbError> {
    let type_info = row.columns()[idx].type_();
    match type_info.name() {
        "int2" => {
            let val: Option<i16> = row.try_get(idx)?;
            Ok(val.map_or(Value::Null, |v| Value::Int(i64::from(v))))
        }
        "int4" => {
            let val: Option<i32> = row.try_get(idx)?;
            Ok(val.map_or(Value::Null, |v| Value::Int(i64::from(v))))
        }
        "int8" => {
            let val: Option<i64> = row.try_get(idx)?;
            Ok(val.map_or(Value::Null, Value::Int))
        }
        "float4" => {
            let val: Option<f32> = row.try_get(idx)?;
            Ok(val.map_or(Value::Null, |v| Value::Float(f64::from(v))))
        }
        "float8" => {
            let val: Option<f64> = row.try_get(idx)?;
            Ok(val.map_or(Value::Null, Value::Float))
        }
        "bool" => {
            let val: Option<bool> = row.try_get(idx)?;
            Ok(val.map_or(Value::Null, Value::Bool))
        }
        "date" => {
            let val: Option<NaiveDate> = row.try_get(idx)?;
            Ok(val.map_or(Value::Null, Value::Date))
        }
        "timestamp" => {
            let val: Option<NaiveDateTime> = row.try_get(idx)?;
            Ok(val.map_or(Value::Null, Value::Timestamp))
        }
        "timestamptz" => {
            let val: Option<DateTime<Utc>> = row.try_get(idx)?;
            Ok(val.map_or(Value::Null, |v| Value::Timestamp(v.naive_utc())))
        }
        "json" | "jsonb" => {
            let val: Option<serde_json::Value> = row.try_get(idx)?;
            Ok(val.map_or(Value::Null, |v| Value::Text(v.to_string())))
        }
        "bytea" => Err(DbError::ConversionError(format!(
            "column '{}' holds bytea, which has no Value form",
            row.columns()[idx].name()
        ))),
        _ => {
            // text, varchar, bpchar, name, and anything else that reads as a string
            let val: Option<String> = row.try_get(idx)?;
            Ok(val.map_or(Value::Null, Value::Text))
        }
    }
}

impl ToSql for Value {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut bytes::BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(b) => b.to_sql(ty, out),
            Value::Int(i) => match *ty {
                Type::INT2 => i16::try_from(*i)?.to_sql(ty, out),
                Type::INT4 => i32::try_from(*i)?.to_sql(ty, out),
                #[allow(clippy::cast_precision_loss)]
                Type::FLOAT4 => (*i as f32).to_sql(ty, out),
                #[allow(clippy::cast_precision_loss)]
                Type::FLOAT8 => (*i as f64).to_sql(ty, out),
                _ => i.to_sql(ty, out),
            },
            Value::Float(f) => match *ty {
                #[allow(clippy::cast_possible_truncation)]
                Type::FLOAT4 => (*f as f32).to_sql(ty, out),
                _ => f.to_sql(ty, out),
            },
            Value::Text(s) => match *ty {
                Type::JSON | Type::JSONB => {
                    serde_json::from_str::<serde_json::Value>(s)?.to_sql(ty, out)
                }
                _ => s.to_sql(ty, out),
            },
            Value::Date(d) => d.to_sql(ty, out),
            Value::Timestamp(ts) => match *ty {
                Type::TIMESTAMPTZ => ts.and_utc().to_sql(ty, out),
                _ => ts.to_sql(ty, out),
            },
            Value::Range(..) | Value::List(_) => {
                Err(format!("{self:?} cannot be bound as a postgres parameter").into())
            }
        }
    }

    fn accepts(ty: &Type) -> bool {
        matches!(
            *ty,
            Type::INT2
                | Type::INT4
                | Type::INT8
                | Type::FLOAT4
                | Type::FLOAT8
                | Type::TEXT
                | Type::VARCHAR
                | Type::BPCHAR
                | Type::NAME
                | Type::BOOL
                | Type::DATE
                | Type::TIMESTAMP
                | Type::TIMESTAMPTZ
                | Type::JSON
                | Type::JSONB
        )
    }

    to_sql_checked!();
}
