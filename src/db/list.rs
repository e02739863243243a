use super::Db;
use crate::builder::{Page, count_command, select_command, split_columns};
use crate::error::DbError;
use crate::filter::Filter;
use crate::results::{FromRecord, Record};
use crate::types::Value;

const DEFAULT_PAGE_SIZE: u32 = 20;

/// Shape of a table listing: columns, filter, order, and page.
///
/// Listings are paginated by default (page 1, 20 rows); call [`ListOptions::unpaged`] to
/// read everything.
#[derive(Debug, Clone, PartialEq)]
pub struct ListOptions {
    pub columns: Vec<String>,
    pub filter: Filter,
    pub order: Vec<String>,
    pub page: Option<u32>,
    pub size: u32,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            columns: Vec::new(),
            filter: Filter::new(),
            order: Vec::new(),
            page: Some(1),
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ListOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Comma-separated column list; `col:alias` renames a column.
    #[must_use]
    pub fn columns(mut self, columns: &str) -> Self {
        self.columns = split_columns(columns);
        self
    }

    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    /// Comma-separated order terms, e.g. `"name, id desc"`.
    #[must_use]
    pub fn order(mut self, order: &str) -> Self {
        self.order = split_columns(order);
        self
    }

    #[must_use]
    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    #[must_use]
    pub fn size(mut self, size: u32) -> Self {
        self.size = size;
        self
    }

    #[must_use]
    pub fn unpaged(mut self) -> Self {
        self.page = None;
        self
    }

    fn page_section(&self) -> Option<Page> {
        self.page.map(|number| Page::new(number, self.size))
    }

    fn command(&self, table: &str) -> Result<String, DbError> {
        select_command(
            table,
            &self.columns,
            &self.filter,
            &self.order,
            self.page_section(),
        )
    }
}

impl Db {
    /// Rows of `table` shaped by `options`.
    ///
    /// # Errors
    /// Returns `DbError::RenderError` when a filter value cannot be rendered, plus any
    /// error from [`Db::select`].
    pub async fn get_list(
        &self,
        table: &str,
        options: &ListOptions,
    ) -> Result<Vec<Record>, DbError> {
        let sql = options.command(table)?;
        self.select(&sql, &[]).await
    }

    /// # Errors
    /// As [`Db::get_list`], plus whatever `M::from_record` reports.
    pub async fn get_list_as<M: FromRecord>(
        &self,
        table: &str,
        options: &ListOptions,
    ) -> Result<Vec<M>, DbError> {
        let sql = options.command(table)?;
        self.select_as(&sql, &[]).await
    }

    /// Values of one column, in listing order. Any columns already on `options` are replaced.
    ///
    /// # Errors
    /// See [`Db::get_list`].
    pub async fn array(
        &self,
        table: &str,
        column: &str,
        options: &ListOptions,
    ) -> Result<Vec<Value>, DbError> {
        let mut options = options.clone();
        options.columns = vec![column.to_string()];
        let rows = self.get_list(table, &options).await?;
        Ok(rows
            .into_iter()
            .map(|row| row.get_by_index(0).cloned().unwrap_or(Value::Null))
            .collect())
    }

    /// First row of `table` matching `filter`; an empty [`Record`] when nothing matched.
    ///
    /// # Errors
    /// See [`Db::get_list`].
    pub async fn get_item(
        &self,
        table: &str,
        filter: &Filter,
        order: &str,
    ) -> Result<Record, DbError> {
        let sql = select_command(table, &[], filter, &split_columns(order), None)?;
        Ok(self.first_row(&sql).await?.unwrap_or_default())
    }

    /// # Errors
    /// As [`Db::get_item`], plus whatever `M::from_record` reports.
    pub async fn get_item_as<M: FromRecord>(
        &self,
        table: &str,
        filter: &Filter,
        order: &str,
    ) -> Result<Option<M>, DbError> {
        let sql = select_command(table, &[], filter, &split_columns(order), None)?;
        self.first_row(&sql).await?.map(M::from_record).transpose()
    }

    /// Row of `table` whose `key` column equals `pk`.
    ///
    /// # Errors
    /// See [`Db::get_list`].
    pub async fn get_item_by_key(
        &self,
        table: &str,
        key: &str,
        pk: impl Into<Value>,
    ) -> Result<Record, DbError> {
        self.get_item(table, &Filter::eq(key, pk), "").await
    }

    /// Number of rows in `table` matching `filter`; 0 when the backend returns nothing.
    ///
    /// # Errors
    /// Returns `DbError::ConversionError` when the aggregate is not a number, plus any error
    /// from [`Db::value`].
    pub async fn count(&self, table: &str, filter: &Filter) -> Result<i64, DbError> {
        let sql = count_command(table, filter)?;
        match self.value(&sql, &[]).await? {
            None => Ok(0),
            Some(Value::Int(n)) => Ok(n),
            #[allow(clippy::cast_possible_truncation)]
            Some(Value::Float(f)) => Ok(f as i64),
            Some(Value::Text(s)) => s.trim().parse::<i64>().map_err(|e| {
                DbError::ConversionError(format!("count returned non-numeric text '{s}': {e}"))
            }),
            Some(other) => Err(DbError::ConversionError(format!(
                "count returned a non-numeric value: {other:?}"
            ))),
        }
    }
}
