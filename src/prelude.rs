//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types
//! to make it easier to get started with the library.

pub use crate::config::{BackendKind, DbConfig, PoolOptions, PostgresOptions, SqliteOptions};
pub use crate::db::{Db, ListOptions};
pub use crate::error::DbError;
pub use crate::executor::{Executor, Fetch};
pub use crate::filter::Filter;
pub use crate::pool::{Connection, Connector, Cursor, Pool, PoolStatus};
pub use crate::query_builder::QueryOptions;
pub use crate::results::{FromRecord, Record};
pub use crate::types::Value;

#[cfg(feature = "postgres")]
pub use crate::connectors::postgres::PostgresConnector;
#[cfg(feature = "sqlite")]
pub use crate::connectors::sqlite::SqliteConnector;
