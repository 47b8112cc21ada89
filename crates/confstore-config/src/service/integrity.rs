//! Content fingerprint repair
//!
//! Walks the whole record table page by page and rewrites fingerprints that
//! are missing or no longer match the content.

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use confstore_common::{MAINTENANCE_PAGE_SIZE, Result, is_blank, md5_hex};
use confstore_persistence::ConfigPersistence;
use confstore_persistence::model::page_count;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairReport {
    pub scanned: u64,
    pub updated: u64,
    pub failed: u64,
}

/// Repair fingerprints using the default maintenance page size.
pub async fn repair_fingerprints(store: &dyn ConfigPersistence) -> Result<RepairReport> {
    repair_fingerprints_paged(store, MAINTENANCE_PAGE_SIZE).await
}

/// Repair fingerprints reading `page_size` rows at a time.
///
/// A write is guarded by the row's modification time, so a row changed
/// during the pass is left alone. Row failures are counted and logged.
pub async fn repair_fingerprints_paged(
    store: &dyn ConfigPersistence,
    page_size: u64,
) -> Result<RepairReport> {
    info!("[repair-md5] start");

    let row_count = store.config_info_count().await?;
    let pages = page_count(row_count, page_size);
    let mut report = RepairReport::default();

    for page_no in 1..=pages {
        let Some(page) = store
            .find_all_config_info_for_dump_all(page_no, page_size)
            .await?
        else {
            continue;
        };

        for row in &page.page_items {
            let md5 = md5_hex(&row.content);
            if !is_blank(&row.md5) && row.md5 == md5 {
                continue;
            }

            match store
                .update_md5(&row.data_id, &row.group, &row.tenant, &md5, row.gmt_modified)
                .await
            {
                Ok(n) => report.updated += n,
                Err(e) => {
                    report.failed += 1;
                    error!(
                        data_id = %row.data_id,
                        group = %row.group,
                        last_modified = %row.gmt_modified,
                        "[repair-md5] update failed: {}",
                        e
                    );
                }
            }
        }

        report.scanned += page.page_items.len() as u64;
        info!("[repair-md5] {} / {}", report.scanned, row_count);
    }

    info!(
        scanned = report.scanned,
        updated = report.updated,
        failed = report.failed,
        "[repair-md5] done"
    );
    Ok(report)
}
