use super::{Db, ListOptions, key_columns};
use crate::error::DbError;
use crate::filter::Filter;
use crate::results::{FromRecord, Record};
use crate::types::Value;

impl Db {
    /// Upsert one row: update it when a row with the same `key` columns exists, insert it
    /// otherwise.
    ///
    /// This reads before it writes and holds no lock in between. A concurrent writer can
    /// insert the same key after the existence check, in which case the insert fails on a
    /// unique constraint (or duplicates the row when there is none).
    ///
    /// A record holding nothing but its key columns has nothing to update; when its row
    /// exists, that row is returned unchanged.
    ///
    /// # Errors
    /// Returns `DbError::ConstraintError` for an empty key list or a key column missing
    /// from `record`. Otherwise as [`Db::update`] and [`Db::insert`].
    pub async fn apply(&self, table: &str, key: &str, record: Record) -> Result<Record, DbError> {
        let (keys, filter) = key_filter(key, &record)?;
        if !self.exists(table, &filter).await? {
            return self.insert(table, record).await;
        }
        if only_keys(&record, &keys) {
            return self.get_item(table, &filter, "").await;
        }
        self.update(table, key, None, record).await
    }

    /// # Errors
    /// As [`Db::apply`], plus whatever `M::from_record` reports.
    pub async fn apply_as<M: FromRecord>(
        &self,
        table: &str,
        key: &str,
        record: Record,
    ) -> Result<Option<M>, DbError> {
        let (keys, filter) = key_filter(key, &record)?;
        if !self.exists(table, &filter).await? {
            return self.insert_as(table, record).await;
        }
        if only_keys(&record, &keys) {
            return self.get_item_as(table, &filter, "").await;
        }
        self.update_as(table, key, None, record).await
    }

    /// Upsert a batch.
    ///
    /// Existing rows are found with one lookup on the `sort` columns (the key columns when
    /// `sort` is blank) and the batch is split on the first sort column. The update half,
    /// keyed on the key and sort columns together, and the insert half run concurrently.
    /// Both run to completion before this returns. When the sort columns differ from the key
    /// columns, the key columns' values in the first row narrow the lookup, so a batch should
    /// share them.
    ///
    /// Returns the updated rows followed by the inserted rows. The race described on
    /// [`Db::apply`] applies to every row.
    ///
    /// # Errors
    /// Returns `DbError::ConstraintError` for an empty key list or a row missing a key or
    /// sort column. Otherwise as [`Db::update_many`] and [`Db::insert_many`], with the
    /// message prefixed by the half that failed. When both fail, the update half's error is
    /// returned and the insert half's is logged. When only one fails, the number of rows the
    /// other half wrote is logged with the error.
    pub async fn apply_many(
        &self,
        table: &str,
        key: &str,
        sort: &str,
        rows: Vec<Record>,
    ) -> Result<Vec<Record>, DbError> {
        let keys = key_columns(key, "apply")?;
        let Some(first) = rows.first() else {
            return Ok(Vec::new());
        };
        let mut sorts = crate::builder::split_columns(sort);
        if sorts.is_empty() {
            sorts.clone_from(&keys);
        }

        let mut filter = Filter::new();
        for column in keys.iter().filter(|k| !sorts.contains(k)) {
            filter.push(column.as_str(), required(first, column)?.clone());
        }
        for column in &sorts {
            let members = rows
                .iter()
                .map(|row| required(row, column).cloned())
                .collect::<Result<Vec<_>, _>>()?;
            filter.push(format!("{column}__in"), Value::List(members));
        }

        let split_on = &sorts[0];
        let existing = self
            .array(table, split_on, &ListOptions::new().filter(filter).unpaged())
            .await?;

        let (to_update, to_insert): (Vec<Record>, Vec<Record>) = rows
            .into_iter()
            .partition(|row| row.get(split_on).is_some_and(|v| existing.contains(v)));
        tracing::debug!(
            table,
            update = to_update.len(),
            insert = to_insert.len(),
            "applying batch"
        );

        let mut update_key = keys.clone();
        update_key.extend(sorts.iter().filter(|s| !keys.contains(s)).cloned());
        let update_key = update_key.join(",");

        let (updated, inserted) = tokio::join!(
            self.update_many(table, &update_key, &to_update),
            self.insert_many(table, &to_insert)
        );
        match (updated, inserted) {
            (Ok(mut updated), Ok(inserted)) => {
                updated.extend(inserted);
                Ok(updated)
            }
            (Err(err), Ok(inserted)) => {
                tracing::warn!(
                    table,
                    inserted = inserted.len(),
                    error = %err,
                    "apply_many update half failed after the insert half completed"
                );
                Err(err.context("apply_many update half"))
            }
            (Ok(updated), Err(err)) => {
                tracing::warn!(
                    table,
                    updated = updated.len(),
                    error = %err,
                    "apply_many insert half failed after the update half completed"
                );
                Err(err.context("apply_many insert half"))
            }
            (Err(err), Err(insert_err)) => {
                tracing::warn!(table, error = %insert_err, "apply_many insert half failed too");
                Err(err.context("apply_many update half"))
            }
        }
    }

    async fn exists(&self, table: &str, filter: &Filter) -> Result<bool, DbError> {
        let found = self.count(table, filter).await? > 0;
        tracing::debug!(table, found, "apply existence check");
        Ok(found)
    }
}

fn key_filter(key: &str, record: &Record) -> Result<(Vec<String>, Filter), DbError> {
    let keys = key_columns(key, "apply")?;
    let mut filter = Filter::new();
    for column in &keys {
        filter.push(column.as_str(), required(record, column)?.clone());
    }
    Ok((keys, filter))
}

fn only_keys(record: &Record, keys: &[String]) -> bool {
    record.columns().iter().all(|c| keys.contains(c))
}

fn required<'r>(record: &'r Record, column: &str) -> Result<&'r Value, DbError> {
    record
        .get(column)
        .ok_or_else(|| DbError::ConstraintError(format!("row is missing column '{column}'")))
}
