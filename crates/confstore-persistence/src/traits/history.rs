//! History ledger retention trait

use async_trait::async_trait;
use chrono::NaiveDateTime;

use confstore_common::Result;

#[async_trait]
pub trait HistoryPersistence: Send + Sync {
    /// Number of ledger entries last modified before `cutoff`
    async fn find_config_history_count_by_time(&self, cutoff: NaiveDateTime) -> Result<u64>;

    /// Delete at most `max_rows` entries older than `cutoff`
    async fn remove_config_history(&self, cutoff: NaiveDateTime, max_rows: u64) -> Result<u64>;
}
