use std::time::Duration;

use async_trait::async_trait;

use crate::error::DbError;
use crate::types::Value;

/// Name of one result column, as reported by a cursor after `execute`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub name: String,
}

impl ColumnDescriptor {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Opens sessions against one backend. The pool calls this whenever its free list is empty.
#[async_trait]
pub trait Connector: Send + Sync {
    /// # Errors
    /// Returns `DbError::ConnectionError` when a session cannot be established.
    async fn connect(&self) -> Result<Box<dyn Connection>, DbError>;
}

/// One open backend session.
#[async_trait]
pub trait Connection: Send {
    /// # Errors
    /// Returns an error when the session cannot open a cursor.
    async fn cursor(&mut self) -> Result<Box<dyn Cursor>, DbError>;

    /// # Errors
    /// Returns an error when the backend rejects the close.
    async fn close(&mut self) -> Result<(), DbError>;

    /// A broken session is closed on release instead of going back to the free list.
    fn has_broken(&self) -> bool {
        false
    }
}

/// Executes one command and hands back its rows.
#[async_trait]
pub trait Cursor: Send {
    /// Run `sql`. The timeout, when given, is enforced by the backend driver.
    ///
    /// # Errors
    /// Returns the backend's error when the command is rejected or fails.
    async fn execute(
        &mut self,
        sql: &str,
        params: &[Value],
        timeout: Option<Duration>,
    ) -> Result<(), DbError>;

    /// # Errors
    /// Returns an error when a row cannot be read or decoded.
    async fn fetch_one(&mut self) -> Result<Option<Vec<Value>>, DbError>;

    /// # Errors
    /// Returns an error when a row cannot be read or decoded.
    async fn fetch_all(&mut self) -> Result<Vec<Vec<Value>>, DbError>;

    /// Columns of the last executed command; empty for commands that return no rows.
    fn description(&self) -> &[ColumnDescriptor];

    /// # Errors
    /// Returns an error when the backend fails to release cursor resources.
    async fn close(&mut self) -> Result<(), DbError>;
}
