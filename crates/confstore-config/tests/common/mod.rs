//! Shared fixtures for service integration tests

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{NaiveDateTime, Timelike, Utc};
use confstore_persistence::sea_orm::ConnectOptions;
use confstore_persistence::{DataSource, ExternalConfigStore, schema};

pub const SRC_IP: &str = "10.0.0.8";
pub const SRC_USER: Option<&str> = Some("importer");

pub async fn setup_store() -> Arc<ExternalConfigStore> {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);

    let ds = DataSource::connect(options)
        .await
        .expect("Failed to open sqlite");
    schema::install_sqlite_schema(&*ds.current())
        .await
        .expect("Failed to install schema");

    Arc::new(ExternalConfigStore::new(Arc::new(ds)))
}

/// Current time without sub-second precision
pub fn now() -> NaiveDateTime {
    Utc::now()
        .naive_utc()
        .with_nanosecond(0)
        .expect("zero nanoseconds is valid")
}
