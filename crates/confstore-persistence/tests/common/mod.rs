//! Shared fixtures for persistence integration tests
//!
//! Every test gets its own in-memory SQLite database with the embedded schema.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{NaiveDateTime, Timelike, Utc};
use confstore_persistence::sea_orm::ConnectOptions;
use confstore_persistence::{
    ConfigAdvance, ConfigPersistence, ConfigRecord, DataSource, ExternalConfigStore, schema,
};

pub const DEFAULT_GROUP: &str = "DEFAULT_GROUP";
pub const SRC_IP: &str = "127.0.0.1";
pub const SRC_USER: Option<&str> = Some("tester");

pub async fn setup_store() -> ExternalConfigStore {
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

    ExternalConfigStore::new(Arc::new(ds))
}

/// Current time without sub-second precision
pub fn now() -> NaiveDateTime {
    Utc::now()
        .naive_utc()
        .with_nanosecond(0)
        .expect("zero nanoseconds is valid")
}

pub async fn add(store: &ExternalConfigStore, data_id: &str, group: &str, tenant: &str, content: &str) -> i64 {
    store
        .add_config_info(
            SRC_IP,
            SRC_USER,
            &ConfigRecord::new(data_id, group, tenant, content),
            &ConfigAdvance::default(),
            now(),
        )
        .await
        .expect("add_config_info failed")
}

pub async fn add_with(
    store: &ExternalConfigStore,
    record: ConfigRecord,
    advance: ConfigAdvance,
) -> i64 {
    store
        .add_config_info(SRC_IP, SRC_USER, &record, &advance, now())
        .await
        .expect("add_config_info failed")
}
