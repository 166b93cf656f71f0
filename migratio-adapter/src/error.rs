/// Error type for the migratio-adapter crate.
///
/// Each variant corresponds to the stage that produced it, so a failed
/// [`connect`](crate::Adapter::connect) tells the caller exactly which step of
/// the provision → connect → bootstrap sequence aborted it.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    /// Construction-time validation failure. No I/O has happened.
    #[error("invalid adapter configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    #[error(transparent)]
    Provision(#[from] ProvisionError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("adapter is not connected; call connect() first")]
    NotConnected,
    #[error("adapter is already connected; call disconnect() first")]
    AlreadyConnected,
}

/// Opening (or authenticating) a session failed.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("failed to connect to {url}: {message}")]
pub struct ConnectionError {
    /// The target URL with any password redacted.
    pub url: String,
    pub message: String,
}

impl ConnectionError {
    pub fn new(url: &str, message: impl Into<String>) -> Self {
        Self {
            url: crate::connection::redact_url(url),
            message: message.into(),
        }
    }
}

/// The optional create-database step failed.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ProvisionError {
    #[error("cannot derive a database name from connection url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("failed to open provisioning connection: {0}")]
    Connect(ConnectionError),
    #[error("failed to create database `{database}`: {message}")]
    Statement { database: String, message: String },
}

/// A statement against the ledger table failed.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("migration '{name}' is already recorded in `{table}`")]
    DuplicateKey { table: String, name: String },
    #[error("migration name '{name}' exceeds {max} characters")]
    NameTooLong { name: String, max: usize },
    #[error("ledger statement `{sql}` failed: {message}")]
    Statement { sql: String, message: String },
}

/// Coarse classification of a failed statement, as reported by a [`Session`](crate::Session).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementErrorKind {
    /// A unique / primary key constraint rejected the row.
    DuplicateKey,
    Other,
}

/// A statement issued over an open session failed.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct StatementError {
    pub kind: StatementErrorKind,
    pub message: String,
}

impl StatementError {
    pub fn new(kind: StatementErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(StatementErrorKind::Other, message)
    }

    pub fn is_duplicate_key(&self) -> bool {
        self.kind == StatementErrorKind::DuplicateKey
    }
}
