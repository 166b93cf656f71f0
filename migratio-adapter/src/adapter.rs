use crate::config::{AdapterConfig, AdapterParams};
use crate::connection::{Connector, Session};
use crate::error::Error;
use crate::ledger::MigrationLedger;
use crate::provision;
use crate::template;
use std::fmt;
use std::path::PathBuf;

/// Where an [`Adapter`] is in its connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    /// Creating the target database over a throwaway connection.
    Provisioning,
    /// Opening the main connection.
    Connecting,
    /// Creating the ledger table over the main connection.
    BootstrappingLedger,
    Connected,
}

/// The entrypoint for tracking migration state in a database.
///
/// An adapter owns at most one open session. [`connect`](Adapter::connect)
/// optionally provisions the database, opens the session and bootstraps the
/// ledger table, in that order. The ledger operations are only available
/// while connected.
///
/// Operations take `&mut self`; the adapter does no locking of its own.
pub struct Adapter<C: Connector> {
    config: AdapterConfig,
    connector: C,
    ledger: MigrationLedger,
    state: ConnectionState,
    session: Option<C::Session>,
}

impl<C: Connector> fmt::Debug for Adapter<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Adapter")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("has_session", &self.session.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(feature = "mysql")]
impl Adapter<crate::mysql::MysqlConnector> {
    /// Create a MySQL adapter from raw parameters.
    /// Fails with [`Error::Config`] before any I/O if `url` is missing.
    pub fn new(params: AdapterParams) -> Result<Self, Error> {
        Self::with_connector(
            AdapterConfig::from_params(params)?,
            crate::mysql::MysqlConnector::new(),
        )
    }
}

impl<C: Connector> Adapter<C> {
    /// Create an adapter that opens its sessions through `connector`.
    pub fn with_connector(config: AdapterConfig, connector: C) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self {
            ledger: MigrationLedger::new(config.migration_table()),
            config,
            connector,
            state: ConnectionState::Disconnected,
            session: None,
        })
    }

    /// Like [`with_connector`](Adapter::with_connector), from raw parameters.
    pub fn from_params(params: AdapterParams, connector: C) -> Result<Self, Error> {
        Self::with_connector(AdapterConfig::from_params(params)?, connector)
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    pub fn ledger(&self) -> &MigrationLedger {
        &self.ledger
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// The open session, if connected.
    pub fn connection(&mut self) -> Option<&mut C::Session> {
        self.session.as_mut()
    }

    /// Provision (if configured), connect and bootstrap the ledger table.
    ///
    /// The first failing step aborts the rest and its error is returned:
    /// [`Error::Provision`], [`Error::Connection`] or [`Error::Ledger`]. If the
    /// ledger cannot be bootstrapped the freshly opened session is closed first.
    /// After any failure the adapter is [`ConnectionState::Disconnected`].
    ///
    /// Calling this while already connected returns [`Error::AlreadyConnected`]
    /// and leaves the existing session alone.
    pub async fn connect(&mut self) -> Result<&mut C::Session, Error> {
        if self.session.is_some() {
            return Err(Error::AlreadyConnected);
        }

        #[cfg(feature = "tracing")]
        let outcome = {
            use tracing::Instrument;
            let span = tracing::info_span!(
                "connect",
                url = %crate::connection::redact_url(self.config.url()),
                create_db_on_connect = self.config.create_db_on_connect(),
                migration_table = %self.config.migration_table(),
            );
            self.establish().instrument(span).await
        };
        #[cfg(not(feature = "tracing"))]
        let outcome = self.establish().await;

        match outcome {
            Ok(session) => {
                self.state = ConnectionState::Connected;
                #[cfg(feature = "tracing")]
                tracing::info!("Connected");
                Ok(self.session.insert(session))
            }
            Err(err) => {
                self.state = ConnectionState::Disconnected;
                #[cfg(feature = "tracing")]
                tracing::error!(error = %err, "Connect failed");
                Err(err)
            }
        }
    }

    async fn establish(&mut self) -> Result<C::Session, Error> {
        if self.config.create_db_on_connect() {
            self.state = ConnectionState::Provisioning;
            provision::ensure_database(&self.connector, self.config.url()).await?;
        }

        self.state = ConnectionState::Connecting;
        let mut session = self.connector.open(self.config.url()).await?;

        self.state = ConnectionState::BootstrappingLedger;
        if let Err(err) = self.ledger.bootstrap(&mut session).await {
            session.close().await;
            return Err(err.into());
        }

        Ok(session)
    }

    /// Close the held session. Disconnecting an adapter that isn't connected does nothing.
    pub async fn disconnect(&mut self) {
        match self.session.take() {
            Some(session) => {
                session.close().await;
                #[cfg(feature = "tracing")]
                tracing::info!("Disconnected");
            }
            None => {
                #[cfg(feature = "tracing")]
                tracing::debug!("disconnect() called while not connected; ignoring");
            }
        }
        self.state = ConnectionState::Disconnected;
    }

    /// Names of all migrations recorded as executed, in the order the server returns them.
    /// Callers that need a particular order must sort.
    pub async fn executed_migration_names(&mut self) -> Result<Vec<String>, Error> {
        let session = self.session.as_mut().ok_or(Error::NotConnected)?;
        Ok(self.ledger.list_executed(session).await?)
    }

    /// Record that the migration `name` has executed.
    pub async fn mark_executed(&mut self, name: &str) -> Result<(), Error> {
        let session = self.session.as_mut().ok_or(Error::NotConnected)?;
        Ok(self.ledger.mark_executed(session, name).await?)
    }

    /// Remove the migration `name` from the executed set. Succeeds if it wasn't recorded.
    pub async fn unmark_executed(&mut self, name: &str) -> Result<(), Error> {
        let session = self.session.as_mut().ok_or(Error::NotConnected)?;
        Ok(self.ledger.unmark_executed(session, name).await?)
    }

    /// Absolute path of the configured migration template.
    pub fn template_path(&self) -> PathBuf {
        template::template_path(&self.config)
    }
}
