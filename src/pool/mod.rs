pub mod connection;
pub mod types;

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub use connection::PooledConnection;
pub use types::{ColumnDescriptor, Connection, Connector, Cursor};

use crate::config::PoolOptions;
use crate::error::DbError;

/// Lazily-filled pool of backend sessions.
///
/// Sessions are created through the [`Connector`] only when the free list is empty, and a
/// released session goes back on the free list for the next `acquire`. Cloning the pool is
/// cheap and shares the same lists.
#[derive(Clone)]
pub struct Pool {
    inner: Arc<PoolInner>,
}

pub(crate) struct PoolInner {
    connector: Arc<dyn Connector>,
    options: PoolOptions,
    next_id: AtomicU64,
    state: Mutex<PoolState>,
}

struct IdleConnection {
    id: u64,
    conn: Box<dyn Connection>,
}

#[derive(Default)]
struct PoolState {
    free: Vec<IdleConnection>,
    busy: HashSet<u64>,
    created: u64,
    closed: bool,
}

/// Snapshot of the pool's lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    pub free: usize,
    pub busy: usize,
    pub created: u64,
    pub closed: bool,
}

// Manual Debug implementation because connectors are trait objects
impl std::fmt::Debug for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("options", &self.inner.options)
            .field("status", &self.status())
            .finish()
    }
}

impl Pool {
    #[must_use]
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self::with_options(connector, PoolOptions::default())
    }

    #[must_use]
    pub fn with_options(connector: Arc<dyn Connector>, options: PoolOptions) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                connector,
                options,
                next_id: AtomicU64::new(1),
                state: Mutex::new(PoolState::default()),
            }),
        }
    }

    /// Check out a session, reusing the most recently released one when available.
    ///
    /// # Errors
    /// Returns `DbError::ConnectionError` after [`Pool::shutdown`], or whatever the connector
    /// reports when a new session cannot be established.
    pub async fn acquire(&self) -> Result<PooledConnection, DbError> {
        {
            let mut state = self.inner.lock();
            if state.closed {
                return Err(shut_down());
            }
            if let Some(IdleConnection { id, conn }) = state.free.pop() {
                state.busy.insert(id);
                tracing::trace!(id, "reusing pooled connection");
                return Ok(self.guard(id, conn));
            }
        }

        let mut conn = self.inner.connector.connect().await?;
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);

        let closed = {
            let mut state = self.inner.lock();
            if !state.closed {
                state.busy.insert(id);
                state.created += 1;
            }
            state.closed
        };
        if closed {
            if let Err(e) = conn.close().await {
                tracing::warn!(id, error = %e, "closing connection opened during shutdown failed");
            }
            return Err(shut_down());
        }

        tracing::trace!(id, "opened new connection");
        Ok(self.guard(id, conn))
    }

    /// Hand a session back. Equivalent to dropping the guard.
    pub fn release(&self, conn: PooledConnection) {
        drop(conn);
    }

    #[must_use]
    pub fn status(&self) -> PoolStatus {
        let state = self.inner.lock();
        PoolStatus {
            free: state.free.len(),
            busy: state.busy.len(),
            created: state.created,
            closed: state.closed,
        }
    }

    /// Close every idle session and refuse further checkouts. Busy sessions are closed when
    /// their guards drop. Calling this again is a no-op.
    ///
    /// # Errors
    /// Returns the first close error after every idle session has been closed.
    pub async fn shutdown(&self) -> Result<(), DbError> {
        let idle = {
            let mut state = self.inner.lock();
            if state.closed {
                return Ok(());
            }
            state.closed = true;
            std::mem::take(&mut state.free)
        };

        tracing::info!(idle = idle.len(), "shutting down pool");
        let mut first_err = None;
        for IdleConnection { id, mut conn } in idle {
            if let Err(e) = conn.close().await {
                tracing::warn!(id, error = %e, "failed to close pooled connection");
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    fn guard(&self, id: u64, conn: Box<dyn Connection>) -> PooledConnection {
        PooledConnection {
            id,
            conn: Some(conn),
            pool: Arc::clone(&self.inner),
        }
    }
}

impl PoolInner {
    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn put_back(&self, id: u64, conn: Box<dyn Connection>) {
        let reason = {
            let mut state = self.lock();
            state.busy.remove(&id);
            if state.closed {
                "pool closed"
            } else if conn.has_broken() {
                "connection broken"
            } else if self
                .options
                .max_idle
                .is_some_and(|max| state.free.len() >= max)
            {
                "idle limit reached"
            } else {
                tracing::trace!(id, "connection returned to pool");
                state.free.push(IdleConnection { id, conn });
                return;
            }
        };
        tracing::trace!(id, reason, "closing released connection");
        close_detached(id, conn);
    }
}

/// Close a discarded session on the current runtime. Without a runtime the session is
/// dropped, which still releases the driver's resources.
fn close_detached(id: u64, mut conn: Box<dyn Connection>) {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(async move {
                if let Err(e) = conn.close().await {
                    tracing::warn!(id, error = %e, "failed to close discarded connection");
                }
            });
        }
        Err(_) => tracing::debug!(id, "no runtime to close discarded connection; dropping it"),
    }
}

fn shut_down() -> DbError {
    DbError::ConnectionError("pool is shut down".into())
}
