//! Fingerprint repair and history retention tests

mod common;

use std::sync::Arc;

use chrono::Duration;
use common::{SRC_IP, SRC_USER, now, setup_store};
use confstore_common::md5_hex;
use confstore_config::service::{
    HistoryCleaner, repair_fingerprints, repair_fingerprints_paged, sweep_history,
    sweep_history_before,
};
use confstore_persistence::sea_orm::ConnectionTrait;
use confstore_persistence::{
    ConfigAdvance, ConfigPersistence, ConfigRecord, ExternalConfigStore, HistoryPersistence,
    OpKind,
};

const GROUP: &str = "MAINT";

async fn seed(store: &ExternalConfigStore, n: usize) {
    for i in 0..n {
        store
            .add_config_info(
                SRC_IP,
                SRC_USER,
                &ConfigRecord::new(&format!("cfg-{}", i), GROUP, "", &format!("body {}", i)),
                &ConfigAdvance::default(),
                now(),
            )
            .await
            .unwrap();
    }
}

async fn corrupt(store: &ExternalConfigStore, sql: &str) {
    store
        .data_source()
        .current()
        .execute_unprepared(sql)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_repair_heals_missing_and_stale_fingerprints() {
    let store = setup_store().await;
    seed(&store, 7).await;
    corrupt(&store, "UPDATE config_info SET md5 = NULL WHERE data_id IN ('cfg-1', 'cfg-4')").await;
    corrupt(&store, "UPDATE config_info SET md5 = 'stale' WHERE data_id = 'cfg-6'").await;

    let report = repair_fingerprints_paged(&*store, 3).await.unwrap();
    assert_eq!(report.scanned, 7);
    assert_eq!(report.updated, 3);
    assert_eq!(report.failed, 0);

    for i in 0..7 {
        let row = store
            .find_config_info(&format!("cfg-{}", i), GROUP, "")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.md5, md5_hex(&row.content));
    }

    // Nothing left to do on a second pass
    let again = repair_fingerprints(&*store).await.unwrap();
    assert_eq!(again.scanned, 7);
    assert_eq!(again.updated, 0);
}

#[tokio::test]
async fn test_repair_skips_rows_modified_during_the_pass() {
    let store = setup_store().await;
    seed(&store, 1).await;
    corrupt(&store, "UPDATE config_info SET md5 = NULL").await;

    let row = store
        .config_info()
        .find_all_config_info_for_dump_all(1, 10)
        .await
        .unwrap()
        .unwrap()
        .page_items
        .remove(0);

    // A stale modification time matches nothing
    let written = store
        .update_md5(
            &row.data_id,
            &row.group,
            &row.tenant,
            &md5_hex(&row.content),
            row.gmt_modified - Duration::seconds(5),
        )
        .await
        .unwrap();
    assert_eq!(written, 0);

    let written = store
        .update_md5(&row.data_id, &row.group, &row.tenant, &md5_hex(&row.content), row.gmt_modified)
        .await
        .unwrap();
    assert_eq!(written, 1);
}

#[tokio::test]
async fn test_repair_on_empty_table() {
    let store = setup_store().await;
    let report = repair_fingerprints(&*store).await.unwrap();
    assert_eq!(report.scanned, 0);
    assert_eq!(report.updated, 0);
}

async fn seed_old_history(store: &ExternalConfigStore, n: usize, age_days: i64) {
    let conn = store.data_source().current();
    for i in 0..n {
        store
            .history()
            .insert_config_history_atomic(
                &*conn,
                i as i64 + 1,
                &ConfigRecord::new(&format!("old-{}", i), GROUP, "", "x"),
                SRC_IP,
                None,
                now() - Duration::days(age_days),
                OpKind::Update,
            )
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_sweep_loops_until_short_round() {
    let store = setup_store().await;
    seed_old_history(&store, 10, 60).await;
    seed(&store, 2).await;

    let removed = sweep_history_before(&*store, now() - Duration::days(30), 4)
        .await
        .unwrap();
    assert_eq!(removed, 10);

    let remaining = store
        .find_config_history_count_by_time(now() + Duration::days(1))
        .await
        .unwrap();
    assert_eq!(remaining, 2);
}

#[tokio::test]
async fn test_sweep_respects_retention_days() {
    let store = setup_store().await;
    seed_old_history(&store, 3, 45).await;
    seed_old_history(&store, 2, 10).await;

    assert_eq!(sweep_history(&*store, 30, 100).await.unwrap(), 3);
    assert_eq!(sweep_history(&*store, 30, 100).await.unwrap(), 0);
    assert_eq!(sweep_history(&*store, 30, 0).await.unwrap(), 0);
}

#[tokio::test]
async fn test_history_cleaner_run_once() {
    let store = setup_store().await;
    seed_old_history(&store, 4, 90).await;

    let cleaner = HistoryCleaner::new(store.clone() as Arc<dyn HistoryPersistence>, 30, 2, 3600);
    assert_eq!(cleaner.run_once().await, 4);
    assert_eq!(cleaner.run_once().await, 0);
}
