//! History ledger tests

mod common;

use chrono::Duration;
use common::{DEFAULT_GROUP, SRC_IP, SRC_USER, add, now, setup_store};
use confstore_persistence::{
    ConfigAdvance, ConfigPersistence, ConfigRecord, HistoryPersistence, OpKind,
};

#[tokio::test]
async fn test_history_lists_newest_first() {
    let store = setup_store().await;
    add(&store, "h.yaml", DEFAULT_GROUP, "", "v1").await;
    for v in ["v2", "v3"] {
        store
            .update_config_info(
                SRC_IP,
                SRC_USER,
                &ConfigRecord::new("h.yaml", DEFAULT_GROUP, "", v),
                &ConfigAdvance::default(),
                now(),
            )
            .await
            .unwrap();
    }

    let page = store
        .history()
        .find_config_history("h.yaml", DEFAULT_GROUP, "", 1, 2)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(page.total_count, 3);
    assert_eq!(page.pages_available, 2);
    assert_eq!(page.page_items.len(), 2);
    assert!(page.page_items[0].nid > page.page_items[1].nid);
    assert_eq!(page.page_items[0].op_type, OpKind::Update.as_str());

    let last = store
        .history()
        .find_config_history("h.yaml", DEFAULT_GROUP, "", 2, 2)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(last.page_items.len(), 1);
    assert_eq!(last.page_items[0].op_type, OpKind::Insert.as_str());

    let insert = store
        .history()
        .detail_config_history(last.page_items[0].nid)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(insert.content, "v1");
    assert_eq!(insert.src_user, "tester");
}

#[tokio::test]
async fn test_history_survives_record_removal() {
    let store = setup_store().await;
    let id = add(&store, "keep.yaml", DEFAULT_GROUP, "", "v1").await;
    store
        .remove_config_info("keep.yaml", DEFAULT_GROUP, "", SRC_IP, SRC_USER)
        .await
        .unwrap();

    let previous = store
        .history()
        .detail_previous_config_history(id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(previous.op_type, "D");
    assert_eq!(previous.content, "v1");

    let deleted = store
        .config_info()
        .find_deleted_config(now() - Duration::hours(1), now() + Duration::hours(1))
        .await
        .unwrap();
    assert_eq!(deleted.len(), 1);
    assert_eq!(deleted[0].data_id, "keep.yaml");
}

#[tokio::test]
async fn test_history_sweep_is_bounded() {
    let store = setup_store().await;
    let history = store.history();
    let old = now() - Duration::days(40);

    let conn = store.data_source().current();
    for i in 0..7 {
        history
            .insert_config_history_atomic(
                &*conn,
                1,
                &ConfigRecord::new(&format!("old-{}", i), DEFAULT_GROUP, "", "x"),
                SRC_IP,
                None,
                old,
                OpKind::Update,
            )
            .await
            .unwrap();
    }
    add(&store, "fresh", DEFAULT_GROUP, "", "y").await;

    let cutoff = now() - Duration::days(30);
    assert_eq!(store.find_config_history_count_by_time(cutoff).await.unwrap(), 7);

    assert_eq!(store.remove_config_history(cutoff, 3).await.unwrap(), 3);
    assert_eq!(store.remove_config_history(cutoff, 3).await.unwrap(), 3);
    assert_eq!(store.remove_config_history(cutoff, 3).await.unwrap(), 1);
    assert_eq!(store.remove_config_history(cutoff, 3).await.unwrap(), 0);

    // Recent entries are untouched
    assert_eq!(
        store
            .history()
            .find_config_history("fresh", DEFAULT_GROUP, "", 1, 10)
            .await
            .unwrap()
            .unwrap()
            .total_count,
        1
    );
}
