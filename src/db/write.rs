use super::{Db, key_columns};
use crate::builder::{bulk_update_command, delete_command, insert_command, update_command};
use crate::error::DbError;
use crate::filter::Filter;
use crate::results::{FromRecord, Record};
use crate::types::Value;

impl Db {
    /// Insert one row and return it as stored.
    ///
    /// # Errors
    /// Returns `DbError::RenderError` for an empty record or an unrenderable value, plus
    /// any error from [`Db::select`].
    pub async fn insert(&self, table: &str, record: Record) -> Result<Record, DbError> {
        let sql = insert_command(table, std::slice::from_ref(&record))?;
        Ok(self.first_row(&sql).await?.unwrap_or_default())
    }

    /// # Errors
    /// As [`Db::insert`], plus whatever `M::from_record` reports.
    pub async fn insert_as<M: FromRecord>(
        &self,
        table: &str,
        record: Record,
    ) -> Result<Option<M>, DbError> {
        let sql = insert_command(table, std::slice::from_ref(&record))?;
        self.first_row(&sql).await?.map(M::from_record).transpose()
    }

    /// Insert every row in one command and return them as stored. An empty batch returns
    /// immediately.
    ///
    /// # Errors
    /// See [`Db::insert`].
    pub async fn insert_many(&self, table: &str, rows: &[Record]) -> Result<Vec<Record>, DbError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let sql = insert_command(table, rows)?;
        self.select(&sql, &[]).await
    }

    /// Update the row identified by the `key` columns of `record`.
    ///
    /// `key` is a comma-separated column list. The key columns are taken out of the payload
    /// and become the where section; everything else is set. With a single key column, a
    /// supplied `pk` must equal the payload's key value.
    ///
    /// # Errors
    /// Returns `DbError::ConstraintError` when `pk` disagrees with the payload, a key column
    /// is missing from it, or nothing is left to set. Otherwise as [`Db::select`].
    pub async fn update(
        &self,
        table: &str,
        key: &str,
        pk: Option<Value>,
        record: Record,
    ) -> Result<Record, DbError> {
        let sql = keyed_update(table, key, pk, record)?;
        Ok(self.first_row(&sql).await?.unwrap_or_default())
    }

    /// # Errors
    /// As [`Db::update`], plus whatever `M::from_record` reports.
    pub async fn update_as<M: FromRecord>(
        &self,
        table: &str,
        key: &str,
        pk: Option<Value>,
        record: Record,
    ) -> Result<Option<M>, DbError> {
        let sql = keyed_update(table, key, pk, record)?;
        self.first_row(&sql).await?.map(M::from_record).transpose()
    }

    /// Update many rows in one command, matching them to table rows on the `key` columns.
    ///
    /// Every row must carry the same columns as the first. An empty batch returns
    /// immediately.
    ///
    /// # Errors
    /// Returns `DbError::ConstraintError` for an empty key list or a key column absent from
    /// the rows. Otherwise as [`Db::select`].
    pub async fn update_many(
        &self,
        table: &str,
        key: &str,
        rows: &[Record],
    ) -> Result<Vec<Record>, DbError> {
        let Some(first) = rows.first() else {
            return Ok(Vec::new());
        };
        let keys = key_columns(key, "update")?;
        if let Some(missing) = keys.iter().find(|k| !first.contains(k)) {
            return Err(DbError::ConstraintError(format!(
                "key column '{missing}' missing from update rows"
            )));
        }
        let sql = bulk_update_command(table, rows, &keys)?;
        self.select(&sql, &[]).await
    }

    /// Set `record`'s columns on every row matching `filter`; returns the affected rows.
    ///
    /// # Errors
    /// Returns `DbError::RenderError` for an empty record. Otherwise as [`Db::select`].
    pub async fn change(
        &self,
        table: &str,
        record: &Record,
        filter: &Filter,
    ) -> Result<Vec<Record>, DbError> {
        let sql = update_command(table, record, filter)?;
        self.select(&sql, &[]).await
    }

    /// Delete the row whose `key` equals `pk`, returning it as it was before the delete.
    ///
    /// The snapshot is read first and is an empty [`Record`] when nothing matched.
    ///
    /// # Errors
    /// See [`Db::select`].
    pub async fn delete(
        &self,
        table: &str,
        key: &str,
        pk: impl Into<Value>,
    ) -> Result<Record, DbError> {
        let filter = Filter::eq(key, pk);
        let snapshot = self.get_item(table, &filter, "").await?;
        let sql = delete_command(table, &filter)?;
        self.execute(&sql, &[]).await?;
        Ok(snapshot)
    }
}

fn keyed_update(
    table: &str,
    key: &str,
    pk: Option<Value>,
    mut record: Record,
) -> Result<String, DbError> {
    let keys = key_columns(key, "update")?;
    if let ([single], Some(pk)) = (keys.as_slice(), pk.as_ref()) {
        if record.get(single) != Some(pk) {
            return Err(DbError::ConstraintError(format!(
                "pk {pk:?} does not match the payload's '{single}' value"
            )));
        }
    }

    let mut filter = Filter::new();
    for column in &keys {
        let value = record.remove(column).ok_or_else(|| {
            DbError::ConstraintError(format!("key column '{column}' missing from update payload"))
        })?;
        filter.push(column.as_str(), value);
    }
    if record.is_empty() {
        return Err(DbError::ConstraintError(
            "update payload has no columns besides the key".into(),
        ));
    }
    update_command(table, &record, &filter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::scripted;

    fn bob() -> Record {
        Record::new().with("name", "Bob").with("age", 30)
    }

    #[tokio::test]
    async fn insert_returns_the_stored_row() {
        let (connector, db) = scripted();
        connector.respond(
            "insert into users",
            &["id", "name", "age"],
            vec![vec![Value::Int(1), Value::from("Bob"), Value::Int(30)]],
        );
        let stored = db.insert("users", bob()).await.unwrap();
        assert_eq!(stored.get("id"), Some(&Value::Int(1)));
        assert_eq!(
            connector.executed(),
            ["insert into users(name, age) values ('Bob',30) returning *"]
        );
    }

    #[tokio::test]
    async fn insert_many_returns_every_row_and_skips_empty_batches() {
        let (connector, db) = scripted();
        connector.respond(
            "insert into users",
            &["name"],
            vec![vec![Value::from("a")], vec![Value::from("b")]],
        );
        let rows = vec![
            Record::new().with("name", "a"),
            Record::new().with("name", "b"),
        ];
        assert_eq!(db.insert_many("users", &rows).await.unwrap().len(), 2);
        assert!(db.insert_many("users", &[]).await.unwrap().is_empty());
        assert_eq!(
            connector.executed(),
            ["insert into users(name) values ('a'), ('b') returning *"]
        );
    }

    #[tokio::test]
    async fn update_moves_key_columns_into_the_where_section() {
        let (connector, db) = scripted();
        let record = Record::new().with("id", 7).with("name", "Gus");
        db.update("users", "id", Some(Value::Int(7)), record)
            .await
            .unwrap();
        assert_eq!(
            connector.executed(),
            ["update users as u set name = 'Gus' where id = 7 returning *"]
        );
    }

    #[tokio::test]
    async fn update_with_composite_key() {
        let (connector, db) = scripted();
        let record = Record::new()
            .with("org", 1)
            .with("code", "x")
            .with("label", "X");
        db.update("items", "org, code", None, record).await.unwrap();
        assert_eq!(
            connector.executed(),
            ["update items as u set label = 'X' where org = 1 and code = 'x' returning *"]
        );
    }

    #[tokio::test]
    async fn update_constraint_violations_never_reach_the_backend() {
        let (connector, db) = scripted();
        let mismatch = db
            .update("users", "id", Some(Value::Int(8)), bob().with("id", 7))
            .await;
        let missing = db.update("users", "id", None, bob()).await;
        let nothing_to_set = db
            .update("users", "id", None, Record::new().with("id", 7))
            .await;
        for result in [mismatch, missing, nothing_to_set] {
            assert!(matches!(result, Err(DbError::ConstraintError(_))));
        }
        assert!(connector.executed().is_empty());
    }

    #[tokio::test]
    async fn update_many_joins_on_an_inline_values_table() {
        let (connector, db) = scripted();
        let rows = vec![
            Record::new().with("id", 1).with("name", "a"),
            Record::new().with("id", 2).with("name", "b"),
        ];
        db.update_many("users", "id", &rows).await.unwrap();
        assert_eq!(
            connector.executed(),
            ["with u2(id, name) as (values (1,'a'), (2,'b')) \
              update users as u set id = u2.id, name = u2.name from u2 \
              where u2.id = u.id returning *"]
        );
        let missing = db.update_many("users", "uuid", &rows).await;
        assert!(matches!(missing, Err(DbError::ConstraintError(_))));
    }

    #[tokio::test]
    async fn change_returns_every_affected_row() {
        let (connector, db) = scripted();
        connector.respond(
            "update tickets",
            &["id"],
            vec![vec![Value::Int(1)], vec![Value::Int(2)]],
        );
        let rows = db
            .change(
                "tickets",
                &Record::new().with("status", "closed"),
                &Filter::new().and("status__neq", "closed"),
            )
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            connector.executed(),
            ["update tickets as u set status = 'closed' where status <> 'closed' returning *"]
        );
    }

    #[tokio::test]
    async fn delete_returns_the_snapshot_read_before_deleting() {
        let (connector, db) = scripted();
        connector.respond(
            "select * from users where id = 3",
            &["id", "name"],
            vec![vec![Value::Int(3), Value::from("cy")]],
        );
        let gone = db.delete("users", "id", 3).await.unwrap();
        assert_eq!(gone.get("name"), Some(&Value::from("cy")));
        assert_eq!(
            connector.executed(),
            ["select * from users where id = 3", "delete from users where id = 3"]
        );

        let nothing = db.delete("users", "id", 4).await.unwrap();
        assert!(nothing.is_empty());
    }
}
