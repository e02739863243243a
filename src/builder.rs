//! Command assembly: pure functions from a table name and its inputs to SQL text.
//!
//! Nothing here touches a connection. Literals are rendered through
//! [`crate::render::render_literal`]; identifiers (tables, columns, order terms) are inlined
//! as given.

use crate::error::DbError;
use crate::filter::{Filter, FilterKey};
use crate::render::render_literal;
use crate::results::Record;

/// Alias given to the target table in update commands.
pub const TARGET_ALIAS: &str = "u";
/// Alias given to the inline `values` table in bulk updates.
pub const VALUES_ALIAS: &str = "u2";

/// A one-based page of `size` rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: u32,
    pub size: u32,
}

impl Page {
    #[must_use]
    pub fn new(number: u32, size: u32) -> Self {
        Self { number, size }
    }

    /// Rows skipped before this page. Page 0 is treated as page 1.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.number.saturating_sub(1)) * u64::from(self.size)
    }

    #[must_use]
    pub fn section(&self) -> String {
        format!("limit {} offset {}", self.size, self.offset())
    }
}

/// `col` or `col:alias` → `col` / `col as "alias"`.
#[must_use]
pub fn column_alias(column: &str) -> String {
    match column.split_once(':') {
        Some((name, alias)) => format!("{name} as \"{alias}\""),
        None => column.to_string(),
    }
}

#[must_use]
pub fn columns_section(columns: &[String]) -> String {
    if columns.is_empty() {
        return "*".to_string();
    }
    columns
        .iter()
        .map(|c| column_alias(c))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `where a = 1 and b like 'x%'`, or an empty string for an empty filter.
///
/// # Errors
/// Propagates `DbError::RenderError` from literal rendering.
pub fn where_section(filter: &Filter) -> Result<String, DbError> {
    if filter.is_empty() {
        return Ok(String::new());
    }
    let pairs = filter
        .iter()
        .map(|(key, value)| {
            let key = FilterKey::parse(key);
            let literal = render_literal(value, &key.code)?;
            Ok(format!("{} {} {}", key.field, key.operator, literal))
        })
        .collect::<Result<Vec<_>, DbError>>()?;
    Ok(format!("where {}", pairs.join(" and ")))
}

/// Join condition between the target table and the inline values table.
#[must_use]
pub fn bulk_where_section(keys: &[String]) -> String {
    if keys.is_empty() {
        return String::new();
    }
    let pairs = keys
        .iter()
        .map(|key| {
            let key = FilterKey::parse(key);
            format!(
                "{VALUES_ALIAS}.{field} {op} {TARGET_ALIAS}.{field}",
                field = key.field,
                op = key.operator
            )
        })
        .collect::<Vec<_>>();
    format!("where {}", pairs.join(" and "))
}

#[must_use]
pub fn order_section(order: &[String]) -> String {
    let terms: Vec<&str> = order
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect();
    if terms.is_empty() {
        return String::new();
    }
    format!("order by {}", terms.join(", "))
}

/// `a = 1, b = 'x'`.
///
/// # Errors
/// Propagates `DbError::RenderError` from literal rendering.
pub fn set_section(data: &Record) -> Result<String, DbError> {
    let pairs = data
        .iter()
        .map(|(column, value)| Ok(format!("{column} = {}", render_literal(value, "")?)))
        .collect::<Result<Vec<_>, DbError>>()?;
    Ok(pairs.join(", "))
}

/// `with u2(a, b) as (values (1,'x'), (2,'y'))`.
///
/// Columns come from the first row. SQLite has no column-list alias on a `from (values ...)`
/// subquery, so the table is named up front.
///
/// # Errors
/// Returns `DbError::RenderError` for an empty batch or an unrenderable value.
pub fn values_table(rows: &[Record]) -> Result<String, DbError> {
    let first = rows
        .first()
        .ok_or_else(|| DbError::RenderError("bulk update requires at least one row".into()))?;
    Ok(format!(
        "with {VALUES_ALIAS}({}) as (values {})",
        first.columns().join(", "),
        values_rows(rows)?
    ))
}

/// `a = u2.a, b = u2.b from u2`.
#[must_use]
pub fn bulk_set_section(columns: &[String]) -> String {
    let assignments = columns
        .iter()
        .map(|c| format!("{c} = {VALUES_ALIAS}.{c}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{assignments} from {VALUES_ALIAS}")
}

/// `(1,'x'), (2,'y')`.
///
/// # Errors
/// Propagates `DbError::RenderError` from literal rendering.
pub fn values_rows(rows: &[Record]) -> Result<String, DbError> {
    let rendered = rows
        .iter()
        .map(|row| {
            let values = row
                .values()
                .iter()
                .map(|v| render_literal(v, ""))
                .collect::<Result<Vec<_>, DbError>>()?;
            Ok(format!("({})", values.join(",")))
        })
        .collect::<Result<Vec<_>, DbError>>()?;
    Ok(rendered.join(", "))
}

/// `select <columns> from <table> [where] [order by] [limit/offset]`.
///
/// ```rust
/// use deebee::prelude::*;
/// use deebee::builder::select_command;
///
/// let filter = Filter::new().and("age__gte", 18).and("name__starts", "A");
/// let sql = select_command("users", &[], &filter, &[], None).unwrap();
/// assert_eq!(sql, "select * from users where age >= 18 and name like 'A%'");
/// ```
///
/// # Errors
/// Propagates `DbError::RenderError` from literal rendering.
pub fn select_command(
    table: &str,
    columns: &[String],
    filter: &Filter,
    order: &[String],
    page: Option<Page>,
) -> Result<String, DbError> {
    Ok(join_sections([
        format!("select {} from {table}", columns_section(columns)),
        where_section(filter)?,
        order_section(order),
        page.map(|p| p.section()).unwrap_or_default(),
    ]))
}

/// `select count(*) as count from <table> [where]`.
///
/// # Errors
/// Propagates `DbError::RenderError` from literal rendering.
pub fn count_command(table: &str, filter: &Filter) -> Result<String, DbError> {
    Ok(join_sections([
        format!("select count(*) as count from {table}"),
        where_section(filter)?,
    ]))
}

/// `insert into <table>(<columns>) values (...), (...) returning *`.
///
/// Column names come from the first row; later rows are assumed to carry the same columns
/// in the same order.
///
/// # Errors
/// Returns `DbError::RenderError` for an empty batch or an unrenderable value.
pub fn insert_command(table: &str, rows: &[Record]) -> Result<String, DbError> {
    let first = rows
        .first()
        .ok_or_else(|| DbError::RenderError("insert requires at least one row".into()))?;
    Ok(format!(
        "insert into {table}({}) values {} returning *",
        first.columns().join(", "),
        values_rows(rows)?
    ))
}

/// `update <table> as u set ... [where] returning *`.
///
/// # Errors
/// Returns `DbError::RenderError` when there is nothing to set or a value cannot be rendered.
pub fn update_command(table: &str, data: &Record, filter: &Filter) -> Result<String, DbError> {
    if data.is_empty() {
        return Err(DbError::RenderError("update requires at least one column to set".into()));
    }
    Ok(join_sections([
        format!("update {table} as {TARGET_ALIAS} set {}", set_section(data)?),
        where_section(filter)?,
        "returning *".to_string(),
    ]))
}

/// Update many rows in one command by joining against an inline values table on `keys`.
///
/// ```rust
/// use deebee::prelude::*;
/// use deebee::builder::bulk_update_command;
///
/// let rows = [Record::new().with("id", 1).with("name", "a")];
/// let sql = bulk_update_command("users", &rows, &["id".to_string()]).unwrap();
/// assert_eq!(
///     sql,
///     "with u2(id, name) as (values (1,'a')) \
///      update users as u set id = u2.id, name = u2.name from u2 \
///      where u2.id = u.id returning *"
/// );
/// ```
///
/// # Errors
/// Returns `DbError::RenderError` for an empty batch or an unrenderable value.
pub fn bulk_update_command(table: &str, rows: &[Record], keys: &[String]) -> Result<String, DbError> {
    let with = values_table(rows)?;
    let columns = rows.first().map(Record::columns).unwrap_or_default();
    Ok(join_sections([
        with,
        format!(
            "update {table} as {TARGET_ALIAS} set {}",
            bulk_set_section(columns)
        ),
        bulk_where_section(keys),
        "returning *".to_string(),
    ]))
}

/// `delete from <table> [where]`.
///
/// # Errors
/// Propagates `DbError::RenderError` from literal rendering.
pub fn delete_command(table: &str, filter: &Filter) -> Result<String, DbError> {
    Ok(join_sections([
        format!("delete from {table}"),
        where_section(filter)?,
    ]))
}

fn join_sections<const N: usize>(sections: [String; N]) -> String {
    sections
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split a comma-separated column list, dropping blanks.
#[must_use]
pub fn split_columns(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}
