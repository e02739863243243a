use std::sync::Arc;
use std::time::Duration;

use super::{Fetch, Fetched};
use crate::error::DbError;
use crate::pool::{Cursor, PooledConnection};
use crate::results::{Record, ResultSet};
use crate::types::Value;

/// Open a cursor on `conn`, run the command, and always close the cursor.
///
/// A close failure is reported only when the command itself succeeded; otherwise it is
/// logged and the command's error wins.
pub(super) async fn run_on(
    conn: &mut PooledConnection,
    sql: &str,
    params: &[Value],
    fetch: Fetch,
    timeout: Option<Duration>,
) -> Result<Fetched, DbError> {
    let mut cursor = conn.cursor().await.map_err(DbError::into_execution)?;
    let outcome = drive(cursor.as_mut(), sql, params, fetch, timeout)
        .await
        .map_err(DbError::into_execution);
    let closed = cursor.close().await;

    match (outcome, closed) {
        (Ok(fetched), Ok(())) => Ok(fetched),
        (Ok(_), Err(close_err)) => Err(close_err.into_execution()),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(close_err)) => {
            tracing::warn!(error = %close_err, "cursor close failed after command error");
            Err(err)
        }
    }
}

async fn drive(
    cursor: &mut dyn Cursor,
    sql: &str,
    params: &[Value],
    fetch: Fetch,
    timeout: Option<Duration>,
) -> Result<Fetched, DbError> {
    cursor.execute(sql, params, timeout).await?;

    match fetch {
        Fetch::Nothing => Ok(Fetched::Done),
        Fetch::Scalar => {
            let value = cursor
                .fetch_one()
                .await?
                .and_then(|row| row.into_iter().next())
                .filter(|v| !v.is_null());
            Ok(Fetched::Scalar(value))
        }
        Fetch::First => {
            let names = column_names(cursor);
            match cursor.fetch_one().await? {
                Some(values) => Ok(Fetched::Row(Some(Record::from_parts(names, values)?))),
                None => Ok(Fetched::Row(None)),
            }
        }
        Fetch::Last => {
            let names = column_names(cursor);
            match cursor.fetch_all().await?.pop() {
                Some(values) => Ok(Fetched::Row(Some(Record::from_parts(names, values)?))),
                None => Ok(Fetched::Row(None)),
            }
        }
        Fetch::All => {
            let names = column_names(cursor);
            let rows = cursor.fetch_all().await?;
            let mut result_set = ResultSet::with_capacity(names, rows.len());
            for values in rows {
                result_set.add_row_values(values)?;
            }
            Ok(Fetched::Rows(result_set.into_records()))
        }
    }
}

fn column_names(cursor: &dyn Cursor) -> Arc<Vec<String>> {
    Arc::new(
        cursor
            .description()
            .iter()
            .map(|col| col.name.clone())
            .collect(),
    )
}
