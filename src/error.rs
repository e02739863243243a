use thiserror::Error;

#[cfg(feature = "sqlite")]
use rusqlite;
#[cfg(feature = "postgres")]
use tokio_postgres;

#[derive(Debug, Error)]
pub enum DbError {
    #[cfg(feature = "postgres")]
    #[error(transparent)]
    PostgresError(#[from] tokio_postgres::Error),

    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Literal rendering error: {0}")]
    RenderError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    #[error("Constraint error: {0}")]
    ConstraintError(String),

    #[error("Value conversion error: {0}")]
    ConversionError(String),
}

impl DbError {
    /// Prefix the message with `what`, keeping the variant where it carries text.
    #[must_use]
    pub fn context(self, what: &str) -> Self {
        match self {
            DbError::ConfigError(msg) => DbError::ConfigError(format!("{what}: {msg}")),
            DbError::ConnectionError(msg) => DbError::ConnectionError(format!("{what}: {msg}")),
            DbError::RenderError(msg) => DbError::RenderError(format!("{what}: {msg}")),
            DbError::ExecutionError(msg) => DbError::ExecutionError(format!("{what}: {msg}")),
            DbError::ConstraintError(msg) => DbError::ConstraintError(format!("{what}: {msg}")),
            DbError::ConversionError(msg) => DbError::ConversionError(format!("{what}: {msg}")),
            #[allow(unreachable_patterns)]
            other => DbError::ExecutionError(format!("{what}: {other}")),
        }
    }

    /// Wrap any failure raised while a command was running.
    ///
    /// Rendering, connection, and already-wrapped execution errors pass through unchanged;
    /// everything else becomes an [`DbError::ExecutionError`] carrying the backend's text.
    #[must_use]
    pub fn into_execution(self) -> Self {
        match self {
            DbError::ExecutionError(_) | DbError::RenderError(_) | DbError::ConnectionError(_) => {
                self
            }
            other => DbError::ExecutionError(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execution_wrapping_keeps_backend_text() {
        let err = DbError::ConversionError("column 2 is a blob".into()).into_execution();
        match err {
            DbError::ExecutionError(msg) => assert!(msg.contains("column 2 is a blob")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn connection_errors_are_not_rewrapped() {
        let err = DbError::ConnectionError("refused".into()).into_execution();
        assert!(matches!(err, DbError::ConnectionError(_)));
    }

    #[test]
    fn context_prefixes_without_changing_the_variant() {
        let err = DbError::ExecutionError("deadlock detected".into()).context("update half");
        match err {
            DbError::ExecutionError(msg) => assert_eq!(msg, "update half: deadlock detected"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
