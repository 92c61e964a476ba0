//! Database Module
//!
//! An ordered, bounded collection of tables owned by the caller.
//!
//! There is no process-wide registry: a `Database` is a plain value, and
//! everything it owns is released when it is dropped.

use std::fs;
use std::sync::Arc;

use crate::config::Config;
use crate::error::{Result, TabulaError};
use crate::table::Table;

/// Maximum number of tables in one database
pub const MAX_TABLES: usize = 100;

/// A named collection of tables, in creation order.
///
/// Tables are handed out as `Arc<Table>` so callers can share them across
/// threads; each table carries its own lock.
#[derive(Debug)]
pub struct Database {
    name: String,
    config: Config,
    tables: Vec<Arc<Table>>,
}

impl Database {
    /// Create a database, preparing its on-disk directory layout.
    pub fn create(name: &str, config: Config) -> Result<Self> {
        if name.trim().is_empty() {
            return Err(TabulaError::InvalidArgument(
                "database name must not be empty".to_string(),
            ));
        }
        fs::create_dir_all(config.tables_dir())?;
        tracing::debug!("Database '{}' created under {}", name, config.data_dir.display());

        Ok(Self {
            name: name.to_string(),
            config,
            tables: Vec::new(),
        })
    }

    /// Create a table with the given columns (primary-key column first).
    ///
    /// Fails before any I/O on a duplicate name or when the table limit is
    /// reached. Opening a name whose data file already exists rebuilds that
    /// table's index from the file.
    pub fn create_table<S: AsRef<str>>(&mut self, name: &str, columns: &[S]) -> Result<Arc<Table>> {
        if self.tables.len() >= MAX_TABLES {
            return Err(TabulaError::TableLimit(MAX_TABLES));
        }
        if self.tables.iter().any(|t| t.name() == name) {
            return Err(TabulaError::TableExists(name.to_string()));
        }

        let table = Arc::new(Table::create(
            &self.config.tables_dir(),
            name,
            columns,
            self.config.sync_on_commit,
        )?);
        self.tables.push(Arc::clone(&table));
        tracing::debug!("Table '{}' registered in database '{}'", name, self.name);
        Ok(table)
    }

    /// Look up a table by name
    pub fn table(&self, name: &str) -> Option<Arc<Table>> {
        self.tables
            .iter()
            .find(|t| t.name() == name)
            .map(Arc::clone)
    }

    /// Table names in creation order
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name()).collect()
    }

    /// Number of tables
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    /// Database name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The configuration this database was created with
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        tracing::debug!("Closing database '{}' ({} tables)", self.name, self.tables.len());
    }
}
