//! MySQL test infrastructure module.
//!
//! Starts one MySQL container for the whole test run and hands out connection
//! URLs and fresh databases on it. Tests isolate themselves by database name.
//! Tests using this need a running docker daemon.

use std::sync::{Mutex, PoisonError};

use mysql_async::prelude::Queryable;
use mysql_async::{Conn, Opts};
use testcontainers::runners::AsyncRunner;
use testcontainers::ContainerAsync;
use testcontainers_modules::mysql::Mysql;
use uuid::Uuid;

/// The module image runs as `root` with an empty password.
const MYSQL_USER: &str = "root";
const MYSQL_PORT: u16 = 3306;

struct SharedMysql {
    _container: ContainerAsync<Mysql>,
    port: u16,
}

/// Global MySQL container shared across all tests.
static MYSQL_INNER: Mutex<Option<SharedMysql>> = Mutex::new(None);

pub(crate) struct MysqlServer {
    port: u16,
}

impl MysqlServer {
    /// Connect to the shared MySQL container, starting it on first use.
    pub(crate) async fn start() -> Self {
        let mut shared = MYSQL_INNER.lock().unwrap_or_else(PoisonError::into_inner);
        if shared.is_none() {
            let container = Mysql::default()
                .start()
                .await
                .expect("failed to start mysql container");
            let port = container
                .get_host_port_ipv4(MYSQL_PORT)
                .await
                .expect("failed to get mysql port");
            *shared = Some(SharedMysql {
                _container: container,
                port,
            });
        }
        let port = shared.as_ref().map(|mysql| mysql.port).expect("container was just started");
        Self { port }
    }

    /// Server URL without a database selected.
    pub(crate) fn base_url(&self) -> String {
        format!("mysql://{MYSQL_USER}@127.0.0.1:{}/", self.port)
    }

    pub(crate) fn url_with_db(&self, db: &str) -> String {
        format!("{}{db}", self.base_url())
    }

    /// A database name no test has used yet. The database is not created.
    pub(crate) fn unique_database_name(&self) -> String {
        format!("test_{}", Uuid::new_v4().simple())
    }

    /// Create a fresh, empty database and return its name.
    pub(crate) async fn fresh_database(&self) -> String {
        let db_name = self.unique_database_name();
        let mut admin = self.admin().await;
        admin
            .query_drop(format!("CREATE DATABASE `{db_name}` CHARACTER SET utf8mb4").as_str())
            .await
            .expect("failed to create test database");
        admin.disconnect().await.expect("failed to close admin connection");
        db_name
    }

    pub(crate) async fn database_exists(&self, db: &str) -> bool {
        let mut admin = self.admin().await;
        let found: Option<String> = admin
            .exec_first(
                "SELECT SCHEMA_NAME FROM information_schema.SCHEMATA WHERE SCHEMA_NAME = ?",
                (db,),
            )
            .await
            .expect("failed to look up database");
        admin.disconnect().await.expect("failed to close admin connection");
        found.is_some()
    }

    async fn admin(&self) -> Conn {
        let opts = Opts::from_url(&self.base_url()).expect("parse admin url");
        Conn::new(opts).await.expect("failed to open admin connection")
    }
}
