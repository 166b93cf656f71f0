//!
//! # MySQL backend
//!
//! [`MysqlConnector`] opens plain, unpooled [`mysql_async::Conn`]s. Every
//! adapter holds exactly one of them, so a pool would only add idle
//! connections.
//!
//! ## DDL behavior
//!
//! MySQL DDL statements (`CREATE DATABASE`, `CREATE TABLE`) commit implicitly
//! and cannot be rolled back. A database created during provisioning stays
//! created even if the rest of `connect` fails.
//!

use crate::connection::{redact_url, Connector, Session};
use crate::error::{ConnectionError, StatementError, StatementErrorKind};
use async_trait::async_trait;
use mysql_async::prelude::Queryable;
use mysql_async::{Conn, Opts, Params, Value};

/// Server error code for a duplicate unique / primary key (`ER_DUP_ENTRY`).
pub const ER_DUP_ENTRY: u16 = 1062;

/// Opens MySQL sessions from `mysql://` URLs.
#[derive(Debug, Clone, Copy, Default)]
pub struct MysqlConnector;

impl MysqlConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for MysqlConnector {
    type Session = MysqlSession;

    async fn open(&self, url: &str) -> Result<MysqlSession, ConnectionError> {
        let opts = Opts::from_url(url).map_err(|err| ConnectionError::new(url, err.to_string()))?;
        let conn = Conn::new(opts)
            .await
            .map_err(|err| ConnectionError::new(url, err.to_string()))?;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            url = %redact_url(url),
            connection_id = conn.id(),
            "Opened MySQL connection"
        );

        Ok(MysqlSession {
            conn,
            url: redact_url(url),
        })
    }
}

/// A single MySQL connection.
#[derive(Debug)]
pub struct MysqlSession {
    conn: Conn,
    url: String,
}

impl MysqlSession {
    /// The underlying driver connection, for running migration scripts.
    pub fn conn(&mut self) -> &mut Conn {
        &mut self.conn
    }

    /// The URL this session was opened with, password redacted.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Session for MysqlSession {
    async fn query_drop(&mut self, sql: &str) -> Result<(), StatementError> {
        self.conn.query_drop(sql).await.map_err(statement_error)
    }

    async fn exec_drop(&mut self, sql: &str, params: &[&str]) -> Result<(), StatementError> {
        let params = Params::Positional(
            params
                .iter()
                .map(|param| Value::Bytes(param.as_bytes().to_vec()))
                .collect(),
        );
        self.conn.exec_drop(sql, params).await.map_err(statement_error)
    }

    async fn query_column(&mut self, sql: &str) -> Result<Vec<String>, StatementError> {
        self.conn.query::<String, _>(sql).await.map_err(statement_error)
    }

    async fn close(self) {
        #[cfg(feature = "tracing")]
        let url = self.url;

        if let Err(_err) = self.conn.disconnect().await {
            #[cfg(feature = "tracing")]
            tracing::warn!(url = %url, error = %_err, "Error while closing MySQL connection");
        }
    }
}

fn statement_error(err: mysql_async::Error) -> StatementError {
    let kind = match &err {
        mysql_async::Error::Server(server) if server.code == ER_DUP_ENTRY => {
            StatementErrorKind::DuplicateKey
        }
        _ => StatementErrorKind::Other,
    };
    StatementError::new(kind, err.to_string())
}
