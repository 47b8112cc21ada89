//! confstore Persistence - Relational storage for configuration records
//!
//! This crate provides:
//! - SeaORM entity definitions
//! - SQL dialect strategy and the hot-swappable data source
//! - Pagination engine and fuzzy/key filter translation
//! - Row projections decoded by one generic decoder
//! - Table repositories and the transactional `ExternalConfigStore`

pub mod datasource;
pub mod dialect;
pub mod entity;
pub mod filter;
pub mod model;
pub mod pagination;
pub mod projection;
pub mod query;
pub mod repository;
pub mod schema;
pub mod sql;
pub mod traits;

// Re-export sea-orm for convenience
pub use sea_orm;

pub use datasource::DataSource;
pub use dialect::{Dialect, MySqlDialect, Platform, PostgresDialect, SqliteDialect, dialect_for};
pub use model::{ConfigAdvance, ConfigRecord, ConfigSearch, OpKind, Page};
pub use pagination::PaginationHelper;
pub use sql::ExternalConfigStore;
pub use traits::{ConfigPersistence, HistoryPersistence, PersistenceService, UpsertOutcome};
