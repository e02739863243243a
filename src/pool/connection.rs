use std::sync::Arc;

use super::PoolInner;
use super::types::{Connection, Cursor};
use crate::error::DbError;

/// A handle checked out of a [`super::Pool`].
///
/// The handle is busy for as long as this guard lives. Dropping it, on any path, puts the
/// session back on the pool's free list.
pub struct PooledConnection {
    pub(super) id: u64,
    pub(super) conn: Option<Box<dyn Connection>>,
    pub(super) pool: Arc<PoolInner>,
}

impl PooledConnection {
    /// Identifier of the underlying session, stable across checkouts.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Open a cursor on the underlying session.
    ///
    /// # Errors
    /// Returns `DbError::ConnectionError` if the session was already handed back, or the
    /// backend's error when it cannot open a cursor.
    pub async fn cursor(&mut self) -> Result<Box<dyn Cursor>, DbError> {
        match self.conn.as_mut() {
            Some(conn) => conn.cursor().await,
            None => Err(DbError::ConnectionError(
                "connection already returned to the pool".into(),
            )),
        }
    }
}

impl std::fmt::Debug for PooledConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledConnection")
            .field("id", &self.id)
            .field("attached", &self.conn.is_some())
            .finish()
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.put_back(self.id, conn);
        }
    }
}
