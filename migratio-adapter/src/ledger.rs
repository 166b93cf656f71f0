//!
//! # Migration ledger
//!
//! The ledger is a single table with one column, `name`, which is also its
//! primary key. A row means "this migration has executed". Uniqueness is left
//! to the primary key rather than a check-then-insert, so two runners racing on
//! the same name cannot both succeed.
//!

use crate::connection::Session;
use crate::error::{LedgerError, StatementError};

/// Width of the `name` column.
pub const MAX_MIGRATION_NAME_LEN: usize = 50;

/// Statements against a ledger table with a configurable name.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationLedger {
    table: String,
}

impl MigrationLedger {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    pub fn create_table_sql(&self) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {} (`name` VARCHAR({}) NOT NULL, PRIMARY KEY (`name`))",
            quote_identifier(&self.table),
            MAX_MIGRATION_NAME_LEN
        )
    }

    pub fn select_names_sql(&self) -> String {
        format!("SELECT name FROM {}", quote_identifier(&self.table))
    }

    pub fn insert_sql(&self) -> String {
        format!("INSERT INTO {} (name) VALUES (?)", quote_identifier(&self.table))
    }

    pub fn delete_sql(&self) -> String {
        format!("DELETE FROM {} WHERE name = ?", quote_identifier(&self.table))
    }

    /// Create the ledger table if it does not exist yet.
    pub async fn bootstrap<S: Session>(&self, session: &mut S) -> Result<(), LedgerError> {
        let sql = self.create_table_sql();
        session
            .query_drop(&sql)
            .await
            .map_err(|source| statement_error(&sql, source))?;

        #[cfg(feature = "tracing")]
        tracing::debug!(table = %self.table, "Ledger table ready");
        Ok(())
    }

    /// Names of all executed migrations, in the order the server returns them.
    pub async fn list_executed<S: Session>(
        &self,
        session: &mut S,
    ) -> Result<Vec<String>, LedgerError> {
        let sql = self.select_names_sql();
        let names = session
            .query_column(&sql)
            .await
            .map_err(|source| statement_error(&sql, source))?;

        #[cfg(feature = "tracing")]
        tracing::debug!(table = %self.table, count = names.len(), "Read executed migrations");
        Ok(names)
    }

    /// Record `name` as executed. Fails with [`LedgerError::DuplicateKey`] if it
    /// is already recorded.
    pub async fn mark_executed<S: Session>(
        &self,
        session: &mut S,
        name: &str,
    ) -> Result<(), LedgerError> {
        check_name(name)?;
        let sql = self.insert_sql();
        session.exec_drop(&sql, &[name]).await.map_err(|source| {
            if source.is_duplicate_key() {
                LedgerError::DuplicateKey {
                    table: self.table.clone(),
                    name: name.to_string(),
                }
            } else {
                statement_error(&sql, source)
            }
        })?;

        #[cfg(feature = "tracing")]
        tracing::info!(
            table = %self.table,
            migration_name = %name,
            "Marked migration as executed"
        );
        Ok(())
    }

    /// Remove `name` from the ledger. Removing a name that isn't recorded is not an error.
    pub async fn unmark_executed<S: Session>(
        &self,
        session: &mut S,
        name: &str,
    ) -> Result<(), LedgerError> {
        let sql = self.delete_sql();
        session
            .exec_drop(&sql, &[name])
            .await
            .map_err(|source| statement_error(&sql, source))?;

        #[cfg(feature = "tracing")]
        tracing::info!(table = %self.table, migration_name = %name, "Unmarked migration");
        Ok(())
    }
}

/// Quote a MySQL identifier with backticks, doubling any embedded backtick.
pub(crate) fn quote_identifier(identifier: &str) -> String {
    format!("`{}`", identifier.replace('`', "``"))
}

fn check_name(name: &str) -> Result<(), LedgerError> {
    if name.chars().count() > MAX_MIGRATION_NAME_LEN {
        return Err(LedgerError::NameTooLong {
            name: name.to_string(),
            max: MAX_MIGRATION_NAME_LEN,
        });
    }
    Ok(())
}

fn statement_error(sql: &str, source: StatementError) -> LedgerError {
    LedgerError::Statement {
        sql: sql.to_string(),
        message: source.message,
    }
}
