//! Dynamic SQL command generation over a lightweight async connection pool.
//!
//! Table helpers on [`Db`] turn a table name, a [`Filter`] of `field__op` keys, and
//! [`Record`] payloads into SQL text with inline literals, then run it on a pooled session
//! through the bundled `SQLite` or `PostgreSQL` connector (or any [`pool::Connector`]).
//!
//! ```rust,no_run
//! use deebee::prelude::*;
//!
//! # async fn demo() -> Result<(), DbError> {
//! let db = Db::connect(&DbConfig::from_env()?)?;
//! let found = db
//!     .get_list(
//!         "users",
//!         &ListOptions::new()
//!             .filter(Filter::new().and("age__gte", 18).and("name__starts", "A"))
//!             .order("name"),
//!     )
//!     .await?;
//! # let _ = found;
//! # Ok(())
//! # }
//! ```

pub mod prelude;

pub mod builder;
pub mod config;
pub mod connectors;
pub mod db;
pub mod error;
pub mod executor;
pub mod filter;
pub mod pool;
pub mod query_builder;
pub mod render;
pub mod results;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::{BackendKind, DbConfig, PoolOptions, PostgresOptions, SqliteOptions};
pub use db::{Db, ListOptions};
pub use error::DbError;
pub use executor::{Executor, Fetch, Fetched};
pub use filter::{Filter, FilterKey, Operator};
pub use pool::{Pool, PoolStatus, PooledConnection};
pub use query_builder::{QueryBuilder, QueryOptions};
pub use results::{FromRecord, Record, ResultSet};
pub use types::Value;
