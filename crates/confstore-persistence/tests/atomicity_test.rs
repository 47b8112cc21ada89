//! Transaction boundaries of the write path and the data source swap
//!
//! Failures are injected with SQLite triggers that abort a statement in the
//! middle of a multi-table unit.

mod common;

use std::collections::BTreeMap;
use std::sync::Arc;

use common::{DEFAULT_GROUP, SRC_IP, SRC_USER, add_with, now, setup_store};
use confstore_common::ConfStoreError;
use confstore_persistence::dialect::dialect_for;
use confstore_persistence::sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DbBackend, Statement, TransactionTrait,
};
use confstore_persistence::{
    ConfigAdvance, ConfigPersistence, ConfigRecord, DataSource, ExternalConfigStore, Platform,
    schema,
};

async fn row_count(store: &ExternalConfigStore, table: &str) -> i64 {
    let conn = store.data_source().current();
    let row = conn
        .query_one(Statement::from_string(
            DbBackend::Sqlite,
            format!("SELECT COUNT(*) AS c FROM {}", table),
        ))
        .await
        .unwrap()
        .unwrap();
    row.try_get::<i64>("", "c").unwrap()
}

async fn fail_inserts_into(store: &ExternalConfigStore, table: &str) {
    let sql = format!(
        "CREATE TRIGGER fail_{table} BEFORE INSERT ON {table} BEGIN SELECT RAISE(ABORT, '{table} unavailable'); END"
    );
    store
        .data_source()
        .current()
        .execute_unprepared(&sql)
        .await
        .unwrap();
}

fn record(content: &str) -> ConfigRecord {
    ConfigRecord::new("atomic.yaml", DEFAULT_GROUP, "", content)
}

#[tokio::test]
async fn test_add_rolls_back_record_and_tags() {
    let store = setup_store().await;
    fail_inserts_into(&store, "his_config_info").await;

    let result = store
        .add_config_info(
            SRC_IP,
            SRC_USER,
            &record("v1"),
            &ConfigAdvance::default().with_tags("a,b"),
            now(),
        )
        .await;
    assert!(result.is_err());
    assert!(!result.unwrap_err().is_constraint_violation());

    assert!(
        store
            .find_config_info("atomic.yaml", DEFAULT_GROUP, "")
            .await
            .unwrap()
            .is_none()
    );
    assert_eq!(row_count(&store, "config_info").await, 0);
    assert_eq!(row_count(&store, "config_tags_relation").await, 0);
    assert_eq!(row_count(&store, "his_config_info").await, 0);
}

#[tokio::test]
async fn test_update_rolls_back_content_and_tags() {
    let store = setup_store().await;
    let id = add_with(&store, record("v1"), ConfigAdvance::default().with_tags("a")).await;
    fail_inserts_into(&store, "his_config_info").await;

    let result = store
        .update_config_info(
            SRC_IP,
            SRC_USER,
            &record("v2"),
            &ConfigAdvance::default().with_tags("b,c"),
            now(),
        )
        .await;
    assert!(result.is_err());

    let info = store
        .find_config_info("atomic.yaml", DEFAULT_GROUP, "")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(info.content, "v1");
    assert_eq!(
        store
            .tags()
            .select_tag_by_config("atomic.yaml", DEFAULT_GROUP, "")
            .await
            .unwrap(),
        vec!["a"]
    );
    assert_eq!(store.tags().count_by_config_id(id).await.unwrap(), 1);
    assert_eq!(row_count(&store, "his_config_info").await, 1);
}

#[tokio::test]
async fn test_remove_rolls_back_delete() {
    let store = setup_store().await;
    let id = add_with(&store, record("v1"), ConfigAdvance::default().with_tags("a,b")).await;
    fail_inserts_into(&store, "his_config_info").await;

    let result = store
        .remove_config_info("atomic.yaml", DEFAULT_GROUP, "", SRC_IP, SRC_USER)
        .await;
    assert!(result.is_err());

    assert!(
        store
            .find_config_info("atomic.yaml", DEFAULT_GROUP, "")
            .await
            .unwrap()
            .is_some()
    );
    assert_eq!(store.tags().count_by_config_id(id).await.unwrap(), 2);
    assert_eq!(row_count(&store, "his_config_info").await, 1);

    let result = store.remove_config_info_by_ids(&[id], SRC_IP, SRC_USER).await;
    assert!(result.is_err());
    assert_eq!(row_count(&store, "config_info").await, 1);
}

fn datums(ids: &[&str]) -> BTreeMap<String, String> {
    ids.iter()
        .map(|d| (d.to_string(), format!("content of {}", d)))
        .collect()
}

async fn fail_aggr_datum(store: &ExternalConfigStore, datum_id: &str) {
    let sql = format!(
        "CREATE TRIGGER fail_datum BEFORE INSERT ON config_info_aggr WHEN NEW.datum_id = '{}' BEGIN SELECT RAISE(ABORT, 'datum rejected'); END",
        datum_id
    );
    store
        .data_source()
        .current()
        .execute_unprepared(&sql)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_batch_publish_rolls_back_whole_batch() {
    let store = setup_store().await;
    fail_aggr_datum(&store, "d2").await;

    let err = store
        .aggr()
        .batch_publish_aggr(
            "aggr.yaml",
            DEFAULT_GROUP,
            "",
            &datums(&["d1", "d2", "d3"]),
            None,
            now(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ConfStoreError::Transaction(_)));

    assert_eq!(
        store
            .aggr()
            .aggr_config_info_count("aggr.yaml", DEFAULT_GROUP, "")
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn test_replace_keeps_previous_datums_on_failure() {
    let store = setup_store().await;
    store
        .aggr()
        .batch_publish_aggr("aggr.yaml", DEFAULT_GROUP, "", &datums(&["d0"]), None, now())
        .await
        .unwrap();
    fail_aggr_datum(&store, "d2").await;

    let err = store
        .aggr()
        .replace_aggr(
            "aggr.yaml",
            DEFAULT_GROUP,
            "",
            &datums(&["d1", "d2"]),
            None,
            now(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ConfStoreError::Transaction(_)));

    let rows = store
        .aggr()
        .find_config_info_aggr("aggr.yaml", DEFAULT_GROUP, "")
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].datum_id, "d0");
}

fn sqlite_file_options(path: &std::path::Path) -> ConnectOptions {
    let mut options = ConnectOptions::new(format!("sqlite://{}?mode=rwc", path.display()));
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    options
}

#[tokio::test]
async fn test_reload_rejects_other_backend() {
    let conn = Database::connect("sqlite::memory:").await.unwrap();
    let ds = DataSource::with_dialect(conn, "sqlite::memory:", dialect_for(Platform::MySql));

    let err = ds
        .reload(ConnectOptions::new("sqlite::memory:"))
        .await
        .unwrap_err();
    assert!(matches!(err, ConfStoreError::IllegalArgument(_)));
    assert_eq!(ds.current_url(), "sqlite::memory:");
}

#[tokio::test]
async fn test_transaction_survives_reload() {
    let dir = tempfile::tempdir().unwrap();
    let old_path = dir.path().join("old.db");
    let new_path = dir.path().join("new.db");

    let ds = DataSource::connect(sqlite_file_options(&old_path))
        .await
        .unwrap();
    schema::install_sqlite_schema(&*ds.current()).await.unwrap();
    let ds = Arc::new(ds);
    let store = ExternalConfigStore::new(ds.clone());

    let old_conn = ds.current();
    let tx = old_conn.begin().await.unwrap();
    tx.execute_unprepared(
        "INSERT INTO config_info (data_id, group_id, tenant_id, content, md5, gmt_create, gmt_modified) \
         VALUES ('inflight.yaml', 'DEFAULT_GROUP', '', 'x', '', '2026-01-01 00:00:00', '2026-01-01 00:00:00')",
    )
    .await
    .unwrap();

    ds.reload(sqlite_file_options(&new_path)).await.unwrap();
    schema::install_sqlite_schema(&*ds.current()).await.unwrap();
    assert!(ds.current_url().contains("new.db"));

    tx.commit().await.unwrap();

    // The commit landed on the previous pool; the new one starts empty
    let row = old_conn
        .query_one(Statement::from_string(
            DbBackend::Sqlite,
            "SELECT COUNT(*) AS c FROM config_info".to_owned(),
        ))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.try_get::<i64>("", "c").unwrap(), 1);
    assert_eq!(store.config_info_count().await.unwrap(), 0);
}
