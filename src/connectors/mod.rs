//! Reference connectors for the bundled backends.

#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

use std::sync::Arc;

use crate::config::{BackendKind, DbConfig};
use crate::error::DbError;
use crate::pool::Connector;

/// Build the connector for the backend `config` selects.
///
/// # Errors
/// Returns `DbError::ConfigError` when the selected backend's options are incomplete.
pub fn connector_for(config: &DbConfig) -> Result<Arc<dyn Connector>, DbError> {
    match config.backend {
        #[cfg(feature = "sqlite")]
        BackendKind::Sqlite => Ok(Arc::new(sqlite::SqliteConnector::new(
            config.sqlite.clone(),
        ))),
        #[cfg(feature = "postgres")]
        BackendKind::Postgres => {
            config.postgres.validate()?;
            Ok(Arc::new(postgres::PostgresConnector::new(
                config.postgres.clone(),
            )))
        }
    }
}
