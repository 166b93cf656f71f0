//! Testing utilities for code built on the adapter.
//!
//! [`FakeConnector`] is an in-memory stand-in for a database server. It records
//! every session it opens, every statement issued and every close, so tests can
//! assert on exactly what the adapter did. It also simulates a single ledger
//! table (inserts honour the primary key, deletes are idempotent, selects
//! return rows in insertion order) and can be told to fail specific opens or
//! statements.
//!
//! # Example
//!
//! ```ignore
//! use migratio_adapter::testing::FakeConnector;
//! use migratio_adapter::{Adapter, AdapterConfig};
//!
//! let connector = FakeConnector::new();
//! let config = AdapterConfig::new("mysql://u:p@host/db");
//! let mut adapter = Adapter::with_connector(config, connector.clone())?;
//! adapter.connect().await?;
//! adapter.mark_executed("1_init").await?;
//! assert_eq!(connector.rows(), vec!["1_init"]);
//! ```

use crate::connection::{Connector, Session};
use crate::error::{ConnectionError, StatementError, StatementErrorKind};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Something the fake server observed, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum FakeEvent {
    Open { url: String },
    Statement { sql: String, params: Vec<String> },
    Close { url: String },
}

#[derive(Debug)]
struct FailureRule {
    target: String,
    message: String,
}

#[derive(Debug, Default)]
struct FakeServer {
    events: Vec<FakeEvent>,
    rows: Vec<String>,
    fail_open: Vec<FailureRule>,
    fail_statement: Vec<FailureRule>,
    open_sessions: usize,
}

/// A [`Connector`] backed by shared in-memory state. Clones share the same server.
#[derive(Debug, Clone, Default)]
pub struct FakeConnector {
    server: Arc<Mutex<FakeServer>>,
}

impl FakeConnector {
    pub fn new() -> Self {
        Self::default()
    }

    fn server(&self) -> MutexGuard<'_, FakeServer> {
        self.server.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every attempt to open `url` fail with `message`.
    pub fn fail_open(&self, url: impl Into<String>, message: impl Into<String>) {
        self.server().fail_open.push(FailureRule {
            target: url.into(),
            message: message.into(),
        });
    }

    /// Make every statement starting with `sql_prefix` fail with `message`.
    pub fn fail_statement(&self, sql_prefix: impl Into<String>, message: impl Into<String>) {
        self.server().fail_statement.push(FailureRule {
            target: sql_prefix.into(),
            message: message.into(),
        });
    }

    pub fn clear_failures(&self) {
        let mut server = self.server();
        server.fail_open.clear();
        server.fail_statement.clear();
    }

    /// Pre-populate the simulated ledger table.
    pub fn seed_rows<I, S>(&self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.server().rows.extend(names.into_iter().map(Into::into));
    }

    pub fn rows(&self) -> Vec<String> {
        self.server().rows.clone()
    }

    pub fn events(&self) -> Vec<FakeEvent> {
        self.server().events.clone()
    }

    /// URLs of every open attempt, successful or not.
    pub fn opened_urls(&self) -> Vec<String> {
        self.server()
            .events
            .iter()
            .filter_map(|event| match event {
                FakeEvent::Open { url } => Some(url.clone()),
                _ => None,
            })
            .collect()
    }

    /// SQL of every statement issued, successful or not.
    pub fn statements(&self) -> Vec<String> {
        self.server()
            .events
            .iter()
            .filter_map(|event| match event {
                FakeEvent::Statement { sql, .. } => Some(sql.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn close_count(&self) -> usize {
        self.server()
            .events
            .iter()
            .filter(|event| matches!(event, FakeEvent::Close { .. }))
            .count()
    }

    /// Sessions opened successfully and not yet closed.
    pub fn open_sessions(&self) -> usize {
        self.server().open_sessions
    }
}

#[async_trait]
impl Connector for FakeConnector {
    type Session = FakeSession;

    async fn open(&self, url: &str) -> Result<FakeSession, ConnectionError> {
        let mut server = self.server();
        server.events.push(FakeEvent::Open {
            url: url.to_string(),
        });
        if let Some(rule) = server.fail_open.iter().find(|rule| rule.target == url) {
            return Err(ConnectionError::new(url, rule.message.clone()));
        }
        server.open_sessions += 1;
        Ok(FakeSession {
            server: Arc::clone(&self.server),
            url: url.to_string(),
        })
    }
}

/// A session handed out by [`FakeConnector`].
#[derive(Debug)]
pub struct FakeSession {
    server: Arc<Mutex<FakeServer>>,
    url: String,
}

impl FakeSession {
    pub fn url(&self) -> &str {
        &self.url
    }

    fn run(&self, sql: &str, params: &[&str]) -> Result<Vec<String>, StatementError> {
        let mut server = self.server.lock().unwrap_or_else(PoisonError::into_inner);
        server.events.push(FakeEvent::Statement {
            sql: sql.to_string(),
            params: params.iter().map(|param| param.to_string()).collect(),
        });

        if let Some(rule) = server
            .fail_statement
            .iter()
            .find(|rule| sql.starts_with(rule.target.as_str()))
        {
            return Err(StatementError::other(rule.message.clone()));
        }

        let name = params.first().map(|param| param.to_string());
        if sql.starts_with("INSERT") {
            if let Some(name) = name {
                if server.rows.contains(&name) {
                    return Err(StatementError::new(
                        StatementErrorKind::DuplicateKey,
                        format!("Duplicate entry '{name}' for key 'PRIMARY'"),
                    ));
                }
                server.rows.push(name);
            }
        } else if sql.starts_with("DELETE") {
            if let Some(name) = name {
                server.rows.retain(|row| *row != name);
            }
        } else if sql.starts_with("SELECT") {
            return Ok(server.rows.clone());
        }
        Ok(Vec::new())
    }
}

#[async_trait]
impl Session for FakeSession {
    async fn query_drop(&mut self, sql: &str) -> Result<(), StatementError> {
        self.run(sql, &[]).map(|_| ())
    }

    async fn exec_drop(&mut self, sql: &str, params: &[&str]) -> Result<(), StatementError> {
        self.run(sql, params).map(|_| ())
    }

    async fn query_column(&mut self, sql: &str) -> Result<Vec<String>, StatementError> {
        self.run(sql, &[])
    }

    async fn close(self) {
        let mut server = self.server.lock().unwrap_or_else(PoisonError::into_inner);
        server.open_sessions = server.open_sessions.saturating_sub(1);
        server.events.push(FakeEvent::Close { url: self.url });
    }
}
