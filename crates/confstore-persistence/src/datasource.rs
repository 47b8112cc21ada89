//! Injected data source handle
//!
//! Holds the current connection pool and the dialect chosen at startup. The
//! pool can be re-pointed at runtime with [`DataSource::reload`]; a
//! transaction already begun keeps its own handle on the previous pool and
//! finishes against it.

use std::sync::Arc;

use parking_lot::RwLock;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};

use confstore_common::{ConfStoreError, Result};

use crate::dialect::{Dialect, dialect_for_backend};

struct Current {
    conn: Arc<DatabaseConnection>,
    url: String,
}

/// Hot-swappable database handle
pub struct DataSource {
    current: RwLock<Current>,
    dialect: Arc<dyn Dialect>,
}

impl DataSource {
    /// Wrap an established connection; the dialect follows its backend.
    pub fn new(conn: DatabaseConnection, url: impl Into<String>) -> Self {
        let dialect = dialect_for_backend(conn.get_database_backend());
        Self::with_dialect(conn, url, dialect)
    }

    pub fn with_dialect(
        conn: DatabaseConnection,
        url: impl Into<String>,
        dialect: Arc<dyn Dialect>,
    ) -> Self {
        Self {
            current: RwLock::new(Current {
                conn: Arc::new(conn),
                url: url.into(),
            }),
            dialect,
        }
    }

    /// Connect with the given options.
    pub async fn connect(options: ConnectOptions) -> Result<Self> {
        let url = options.get_url().to_string();
        let conn = open(options).await?;
        Ok(Self::new(conn, url))
    }

    /// The pool in use right now.
    pub fn current(&self) -> Arc<DatabaseConnection> {
        self.current.read().conn.clone()
    }

    pub fn current_url(&self) -> String {
        self.current.read().url.clone()
    }

    pub fn dialect(&self) -> &Arc<dyn Dialect> {
        &self.dialect
    }

    /// Re-point the handle at a new pool of the same backend.
    pub async fn reload(&self, options: ConnectOptions) -> Result<()> {
        let url = options.get_url().to_string();
        let conn = open(options).await?;

        if conn.get_database_backend() != self.dialect.backend() {
            return Err(ConfStoreError::IllegalArgument(format!(
                "cannot reload {} datasource with a {:?} connection",
                self.dialect.platform(),
                conn.get_database_backend()
            )));
        }

        let mut guard = self.current.write();
        guard.conn = Arc::new(conn);
        guard.url = url;
        tracing::info!(platform = %self.dialect.platform(), "datasource reloaded");
        Ok(())
    }

    /// Run `select 1` against the current pool.
    pub async fn health_check(&self) -> Result<()> {
        let conn = self.current();
        conn.execute(Statement::from_string(
            conn.get_database_backend(),
            "select 1".to_owned(),
        ))
        .await?;
        Ok(())
    }
}

async fn open(options: ConnectOptions) -> Result<DatabaseConnection> {
    Database::connect(options).await.map_err(|e| {
        tracing::error!(error = %e, "[db-error] failed to connect");
        ConfStoreError::from(e)
    })
}

impl std::fmt::Debug for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataSource")
            .field("dialect", &self.dialect)
            .finish()
    }
}
