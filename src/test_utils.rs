//! In-process connector for tests: scripted replies, recorded commands, lifecycle counters.
//!
//! ```rust
//! use deebee::prelude::*;
//! use deebee::test_utils::ScriptedConnector;
//!
//! # async fn demo() -> Result<(), DbError> {
//! let connector = ScriptedConnector::new();
//! connector.respond("select count", &["count"], vec![vec![Value::Int(3)]]);
//! let db = Db::new(Pool::new(connector.clone().shared()));
//! assert_eq!(db.count("users", &Filter::new()).await?, 3);
//! assert_eq!(connector.executed(), ["select count(*) as count from users"]);
//! # Ok(()) }
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::DbError;
use crate::pool::{ColumnDescriptor, Connection, Connector, Cursor};
use crate::types::Value;

struct Reply {
    prefix: String,
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

#[derive(Default)]
struct Script {
    replies: Vec<Reply>,
    failures: Vec<(String, String)>,
    connect_failure: Option<String>,
    break_after_use: bool,
    latency: Option<Duration>,
    executed: Vec<String>,
    params: Vec<Vec<Value>>,
    timeouts: Vec<Option<Duration>>,
    connections_opened: u64,
    connections_closed: u64,
    cursors_opened: u64,
    cursors_closed: u64,
}

/// A [`Connector`] whose sessions answer from a script instead of a database.
///
/// Replies and failures are matched by command prefix; the first registered match wins.
/// Commands with no matching reply succeed with no columns and no rows.
#[derive(Clone, Default)]
pub struct ScriptedConnector {
    script: Arc<Mutex<Script>>,
}

impl ScriptedConnector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// This connector as the trait object a [`crate::Pool`] expects.
    #[must_use]
    pub fn shared(self) -> Arc<dyn Connector> {
        Arc::new(self)
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Answer commands starting with `prefix` with these columns and rows.
    pub fn respond(&self, prefix: &str, columns: &[&str], rows: Vec<Vec<Value>>) {
        self.lock().replies.push(Reply {
            prefix: prefix.to_string(),
            columns: columns.iter().map(|c| (*c).to_string()).collect(),
            rows,
        });
    }

    /// Fail commands starting with `prefix` with `message`.
    pub fn fail_when(&self, prefix: &str, message: &str) {
        self.lock()
            .failures
            .push((prefix.to_string(), message.to_string()));
    }

    /// Make every subsequent `connect` fail with `message`.
    pub fn fail_connects(&self, message: &str) {
        self.lock().connect_failure = Some(message.to_string());
    }

    /// Sessions report themselves broken once they have executed a command.
    pub fn break_connections_after_use(&self) {
        self.lock().break_after_use = true;
    }

    /// Delay every execute, so concurrent commands overlap.
    pub fn with_latency(&self, latency: Duration) {
        self.lock().latency = Some(latency);
    }

    #[must_use]
    pub fn executed(&self) -> Vec<String> {
        self.lock().executed.clone()
    }

    #[must_use]
    pub fn params(&self) -> Vec<Vec<Value>> {
        self.lock().params.clone()
    }

    #[must_use]
    pub fn timeouts(&self) -> Vec<Option<Duration>> {
        self.lock().timeouts.clone()
    }

    #[must_use]
    pub fn connections_opened(&self) -> u64 {
        self.lock().connections_opened
    }

    #[must_use]
    pub fn connections_closed(&self) -> u64 {
        self.lock().connections_closed
    }

    #[must_use]
    pub fn cursors_opened(&self) -> u64 {
        self.lock().cursors_opened
    }

    #[must_use]
    pub fn cursors_closed(&self) -> u64 {
        self.lock().cursors_closed
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(&self) -> Result<Box<dyn Connection>, DbError> {
        let mut script = self.lock();
        if let Some(msg) = &script.connect_failure {
            return Err(DbError::ConnectionError(msg.clone()));
        }
        script.connections_opened += 1;
        Ok(Box::new(ScriptedConnection {
            connector: self.clone(),
            broken: Arc::new(AtomicBool::new(false)),
        }))
    }
}

struct ScriptedConnection {
    connector: ScriptedConnector,
    broken: Arc<AtomicBool>,
}

#[async_trait]
impl Connection for ScriptedConnection {
    async fn cursor(&mut self) -> Result<Box<dyn Cursor>, DbError> {
        self.connector.lock().cursors_opened += 1;
        Ok(Box::new(ScriptedCursor {
            connector: self.connector.clone(),
            broken: Arc::clone(&self.broken),
            description: Vec::new(),
            rows: VecDeque::new(),
        }))
    }

    async fn close(&mut self) -> Result<(), DbError> {
        self.connector.lock().connections_closed += 1;
        Ok(())
    }

    fn has_broken(&self) -> bool {
        self.broken.load(Ordering::SeqCst)
    }
}

struct ScriptedCursor {
    connector: ScriptedConnector,
    broken: Arc<AtomicBool>,
    description: Vec<ColumnDescriptor>,
    rows: VecDeque<Vec<Value>>,
}

#[async_trait]
impl Cursor for ScriptedCursor {
    async fn execute(
        &mut self,
        sql: &str,
        params: &[Value],
        timeout: Option<Duration>,
    ) -> Result<(), DbError> {
        let latency = {
            let mut script = self.connector.lock();
            script.executed.push(sql.to_string());
            script.params.push(params.to_vec());
            script.timeouts.push(timeout);
            if script.break_after_use {
                self.broken.store(true, Ordering::SeqCst);
            }
            script.latency
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let script = self.connector.lock();
        if let Some((_, msg)) = script.failures.iter().find(|(p, _)| sql.starts_with(p.as_str())) {
            return Err(DbError::ExecutionError(msg.clone()));
        }
        if let Some(reply) = script.replies.iter().find(|r| sql.starts_with(r.prefix.as_str())) {
            self.description = reply.columns.iter().map(ColumnDescriptor::new).collect();
            self.rows = reply.rows.iter().cloned().collect();
        } else {
            self.description.clear();
            self.rows.clear();
        }
        Ok(())
    }

    async fn fetch_one(&mut self) -> Result<Option<Vec<Value>>, DbError> {
        Ok(self.rows.pop_front())
    }

    async fn fetch_all(&mut self) -> Result<Vec<Vec<Value>>, DbError> {
        Ok(self.rows.drain(..).collect())
    }

    fn description(&self) -> &[ColumnDescriptor] {
        &self.description
    }

    async fn close(&mut self) -> Result<(), DbError> {
        self.connector.lock().cursors_closed += 1;
        Ok(())
    }
}
