//! Persistence traits consumed by the config services
//!
//! The services only see these traits, so they can be exercised against
//! any backend that implements them.

pub mod config;
pub mod history;

pub use config::{ConfigPersistence, UpsertOutcome};
pub use history::HistoryPersistence;

use async_trait::async_trait;

use confstore_common::Result;

/// Everything the maintenance tasks and the importer need
#[async_trait]
pub trait PersistenceService: ConfigPersistence + HistoryPersistence + Send + Sync {
    /// Health check for the storage backend
    async fn health_check(&self) -> Result<()>;

    /// Whether `table_name` exists in the backing database
    async fn is_exist_table(&self, table_name: &str) -> bool;
}
