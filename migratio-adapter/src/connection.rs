//!
//! # Connection management
//!
//! The adapter never talks to a driver directly. It goes through a [`Connector`],
//! which opens [`Session`]s, and each session is released with [`Session::close`].
//! The MySQL backend lives in [`crate::mysql`]; tests use [`crate::testing`].
//!

use crate::error::{ConnectionError, StatementError};
use async_trait::async_trait;

const REDACTED_PASSWORD: &str = "***";

/// Opens sessions against a database server.
#[async_trait]
pub trait Connector: Send + Sync {
    type Session: Session;

    /// Open and authenticate a session for `url`.
    /// On failure no handle exists and nothing needs to be released.
    async fn open(&self, url: &str) -> Result<Self::Session, ConnectionError>;
}

/// A single open database session.
#[async_trait]
pub trait Session: Send {
    /// Run a statement that returns no rows.
    async fn query_drop(&mut self, sql: &str) -> Result<(), StatementError>;

    /// Prepare and run a statement with positional `?` parameters, discarding any rows.
    async fn exec_drop(&mut self, sql: &str, params: &[&str]) -> Result<(), StatementError>;

    /// Run a query and collect the first column of every row as a string,
    /// in the order the server returned them.
    async fn query_column(&mut self, sql: &str) -> Result<Vec<String>, StatementError>;

    /// Release the session. Never fails from the caller's point of view;
    /// driver errors during disconnect are logged and dropped.
    async fn close(self);
}

/// Replace the password in a connection URL so it can be logged or put in an error.
/// Strings that don't parse as URLs are not echoed back at all.
pub fn redact_url(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(mut parsed) => {
            if parsed.password().is_some() {
                let _ = parsed.set_password(Some(REDACTED_PASSWORD));
            }
            parsed.to_string()
        }
        Err(_) => "<invalid url>".to_string(),
    }
}
