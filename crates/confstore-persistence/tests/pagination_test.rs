//! Pagination and search tests
//!
//! Offset pages, fragment scans, wildcard search and key filters against a
//! real SQLite database.

mod common;

use std::collections::HashSet;

use common::{DEFAULT_GROUP, add, add_with, setup_store};
use confstore_common::ConfStoreError;
use confstore_persistence::projection::ConfigKey;
use confstore_persistence::{ConfigAdvance, ConfigRecord, ConfigSearch};

async fn seed(store: &confstore_persistence::ExternalConfigStore, n: usize) -> Vec<i64> {
    let mut ids = Vec::with_capacity(n);
    for i in 0..n {
        ids.push(add(store, &format!("item-{:02}.yaml", i), DEFAULT_GROUP, "", &format!("n: {}", i)).await);
    }
    ids
}

#[tokio::test]
async fn test_subquery_pages_concatenate_to_total() {
    let store = setup_store().await;
    let ids = seed(&store, 23).await;
    let repo = store.config_info();

    for page_size in [1u64, 5, 7, 23, 50] {
        let mut seen = Vec::new();
        let mut page_no = 1;
        while let Some(page) = repo.find_all_config_info(page_no, page_size, "").await.unwrap() {
            assert_eq!(page.total_count, 23);
            assert!(page.page_items.len() as u64 <= page_size);
            seen.extend(page.page_items.into_iter().map(|i| i.id));
            page_no += 1;
        }
        assert_eq!(seen, ids, "page size {}", page_size);
    }
}

#[tokio::test]
async fn test_direct_limit_pages_concatenate_to_total() {
    let store = setup_store().await;
    seed(&store, 12).await;
    let repo = store.config_info();

    let mut seen = HashSet::new();
    let mut page_no = 1;
    while let Some(page) = repo
        .find_config_info_like(page_no, 5, Some("item-*"), None, "", None, None)
        .await
        .unwrap()
    {
        for item in page.page_items {
            assert!(seen.insert(item.id), "duplicate id {}", item.id);
        }
        page_no += 1;
    }
    assert_eq!(seen.len(), 12);
    assert_eq!(page_no, 4);
}

#[tokio::test]
async fn test_page_beyond_range_is_none() {
    let store = setup_store().await;
    let repo = store.config_info();

    assert!(repo.find_all_config_info(1, 10, "").await.unwrap().is_none());

    seed(&store, 3).await;
    assert!(repo.find_all_config_info(1, 10, "").await.unwrap().is_some());
    assert!(repo.find_all_config_info(2, 10, "").await.unwrap().is_none());
    assert!(repo.find_all_config_info_base(2, 3).await.unwrap().is_none());
}

#[tokio::test]
async fn test_zero_page_is_rejected() {
    let store = setup_store().await;
    let err = store
        .config_info()
        .find_all_config_info(0, 10, "")
        .await
        .unwrap_err();
    assert!(matches!(err, ConfStoreError::IllegalArgument(_)));
}

#[tokio::test]
async fn test_fragment_scan_never_revisits() {
    let store = setup_store().await;
    let ids = seed(&store, 11).await;
    let repo = store.config_info();

    let mut seen = Vec::new();
    let mut last_max_id = 0;
    loop {
        let page = repo.find_all_config_info_fragment(last_max_id, 4).await.unwrap();
        let fetched = page.page_items.len();
        for item in page.page_items {
            assert!(item.id > last_max_id);
            last_max_id = item.id;
            seen.push(item.id);
        }
        if fetched < 4 {
            break;
        }
    }
    assert_eq!(seen, ids);
}

#[tokio::test]
async fn test_wildcard_and_exact_search() {
    let store = setup_store().await;
    add(&store, "app.yaml", DEFAULT_GROUP, "", "a").await;
    add(&store, "app.json", DEFAULT_GROUP, "", "b").await;
    add(&store, "db.yaml", "DB_GROUP", "", "c").await;
    let repo = store.config_info();

    let page = repo
        .find_config_info_like_4_page(1, 10, Some("app*"), None, "", &ConfigSearch::default())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(page.total_count, 2);

    // Without a wildcard the value is compared exactly
    let page = repo
        .find_config_info_like_4_page(1, 10, Some("app"), None, "", &ConfigSearch::default())
        .await
        .unwrap();
    assert!(page.is_none());

    let page = repo
        .find_config_info_like_4_page(1, 10, Some("*.yaml"), Some("DB_*"), "", &ConfigSearch::default())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(page.page_items.len(), 1);
    assert_eq!(page.page_items[0].data_id, "db.yaml");
}

#[tokio::test]
async fn test_tag_search_joins_relation() {
    let store = setup_store().await;
    add_with(
        &store,
        ConfigRecord::new("blue.yaml", DEFAULT_GROUP, "", "a"),
        ConfigAdvance::default().with_tags("blue"),
    )
    .await;
    add_with(
        &store,
        ConfigRecord::new("red.yaml", DEFAULT_GROUP, "", "b"),
        ConfigAdvance::default().with_tags("red"),
    )
    .await;

    let search = ConfigSearch {
        config_tags: Some("blue".to_string()),
        ..Default::default()
    };
    let page = store
        .config_info()
        .find_config_info_4_page(1, 10, None, None, "", &search)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(page.total_count, 1);
    assert_eq!(page.page_items[0].data_id, "blue.yaml");
}

#[tokio::test]
async fn test_blacklist_and_whitelist() {
    let store = setup_store().await;
    add_with(&store, ConfigRecord::new("a.yaml", "G1", "", "1").with_app_name("svc"), ConfigAdvance::default()).await;
    add(&store, "b.yaml", "G1", "", "2").await;
    add(&store, "c.yaml", "G2", "", "3").await;
    let repo = store.config_info();

    // Empty blacklist matches everything
    let page = repo.find_config_info_like_by_keys(1, 10, &[], true).await.unwrap().unwrap();
    assert_eq!(page.total_count, 3);

    // Empty whitelist matches nothing
    let page = repo.find_config_info_like_by_keys(1, 10, &[], false).await.unwrap().unwrap();
    assert_eq!(page.total_count, 0);
    assert!(page.page_items.is_empty());

    let keys = vec![ConfigKey::new("", "G1", "")];
    let page = repo.find_config_info_like_by_keys(1, 10, &keys, true).await.unwrap().unwrap();
    assert_eq!(page.total_count, 1);
    assert_eq!(page.page_items[0].data_id, "c.yaml");

    let keys = vec![ConfigKey::new("a*", "", "svc"), ConfigKey::new("c.yaml", "", "")];
    let page = repo.find_config_info_like_by_keys(1, 10, &keys, false).await.unwrap().unwrap();
    let mut found: Vec<String> = page.page_items.into_iter().map(|i| i.data_id).collect();
    found.sort();
    assert_eq!(found, vec!["a.yaml", "c.yaml"]);

    // A blacklisted app name keeps rows with an empty app name
    let keys = vec![ConfigKey::new("", "", "svc")];
    let page = repo.find_config_info_like_by_keys(1, 10, &keys, true).await.unwrap().unwrap();
    assert_eq!(page.total_count, 2);

    // Key fields always go through like, so `_` matches any single character
    let keys = vec![ConfigKey::new("b_yaml", "", "")];
    let page = repo.find_config_info_like_by_keys(1, 10, &keys, false).await.unwrap().unwrap();
    assert_eq!(page.total_count, 1);
    assert_eq!(page.page_items[0].data_id, "b.yaml");

    let page = repo.find_config_info_like_by_keys(1, 10, &keys, true).await.unwrap().unwrap();
    assert_eq!(page.total_count, 2);
}

#[tokio::test]
async fn test_tenant_and_group_listing() {
    let store = setup_store().await;
    add(&store, "x", "G1", "", "1").await;
    add(&store, "y", "G2", "", "1").await;
    add(&store, "x", "G1", "dev", "1").await;
    add(&store, "x", "G1", "prod", "1").await;
    let repo = store.config_info();

    assert_eq!(repo.get_tenant_id_list(1, 10).await.unwrap(), vec!["dev", "prod"]);
    assert_eq!(repo.get_tenant_id_list(2, 1).await.unwrap(), vec!["prod"]);
    assert_eq!(repo.get_group_id_list(1, 10).await.unwrap(), vec!["G1", "G2"]);

    assert_eq!(repo.config_info_count_by_tenant("").await.unwrap(), 2);
    assert_eq!(repo.config_info_count_by_tenant("*").await.unwrap(), 4);
    assert_eq!(repo.find_config_max_id().await.unwrap(), 4);
}

#[tokio::test]
async fn test_batch_lookup_is_chunked() {
    let store = setup_store().await;
    seed(&store, 30).await;

    let data_ids: Vec<String> = (0..30).map(|i| format!("item-{:02}.yaml", i)).collect();
    let found = store
        .config_info()
        .find_config_info_by_batch(&data_ids, DEFAULT_GROUP, "", 7)
        .await
        .unwrap();
    assert_eq!(found.len(), 30);
}

#[tokio::test]
async fn test_group_key_md5_listing() {
    let store = setup_store().await;
    seed(&store, 5).await;

    let all = store.config_info().list_all_group_key_md5().await.unwrap();
    assert_eq!(all.len(), 5);
    assert!(all.iter().all(|s| s.md5.len() == 32));

    let keys = store.config_info().find_all_data_id_and_group().await.unwrap();
    assert_eq!(keys.len(), 5);
}

#[tokio::test]
async fn test_out_of_range_page_is_rejected() {
    let store = setup_store().await;
    seed(&store, 3).await;
    let repo = store.config_info();

    assert!(matches!(
        repo.get_tenant_id_list(u64::MAX, 10).await,
        Err(ConfStoreError::IllegalArgument(_))
    ));
    assert!(matches!(
        repo.get_group_id_list(2, u64::MAX).await,
        Err(ConfStoreError::IllegalArgument(_))
    ));
    assert!(matches!(
        repo.find_all_config_info_fragment(0, u64::MAX).await,
        Err(ConfStoreError::IllegalArgument(_))
    ));
}

#[tokio::test]
async fn test_change_page_continues_after_cursor() {
    let store = setup_store().await;
    let ids = seed(&store, 5).await;
    add(&store, "other.yaml", DEFAULT_GROUP, "dev", "x").await;
    let repo = store.config_info();

    let page = repo
        .find_change_config_page(None, None, None, None, None, None, 1, 2, 0)
        .await
        .unwrap();
    assert_eq!(page.total_count, 6);
    let first: Vec<i64> = page.page_items.iter().map(|i| i.id).collect();
    assert_eq!(first, ids[..2].to_vec());

    let page = repo
        .find_change_config_page(None, None, None, None, None, None, 2, 2, ids[1])
        .await
        .unwrap();
    let second: Vec<i64> = page.page_items.iter().map(|i| i.id).collect();
    assert_eq!(second, ids[2..4].to_vec());

    // Filters and the time window narrow the count as well as the rows
    let page = repo
        .find_change_config_page(Some("item-0*"), Some(DEFAULT_GROUP), None, None, None, None, 1, 10, 0)
        .await
        .unwrap();
    assert_eq!(page.total_count, 5);

    let page = repo
        .find_change_config_page(None, None, Some("dev"), None, None, None, 1, 10, 0)
        .await
        .unwrap();
    assert_eq!(page.total_count, 1);
    assert_eq!(page.page_items[0].data_id, "other.yaml");

    let later = common::now() + chrono::Duration::hours(1);
    let page = repo
        .find_change_config_page(None, None, None, None, Some(later), None, 1, 10, 0)
        .await
        .unwrap();
    assert_eq!(page.total_count, 0);
    assert!(page.page_items.is_empty());
}
