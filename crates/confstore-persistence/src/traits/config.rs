//! Config persistence trait
//!
//! Defines the record write path and the read operations used by the
//! importer and the integrity repair pass.

use async_trait::async_trait;
use chrono::NaiveDateTime;

use confstore_common::Result;

use crate::model::{ConfigAdvance, ConfigRecord, Page};
use crate::projection::{ConfigAllInfo, ConfigInfo, ConfigInfoWrapper};

/// Which branch an insert-or-update took
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted(i64),
    Updated,
}

/// Configuration persistence operations
#[async_trait]
pub trait ConfigPersistence: Send + Sync {
    /// Insert a record with its tags and an insert history entry.
    ///
    /// An existing key fails with `ConstraintViolation`.
    async fn add_config_info(
        &self,
        src_ip: &str,
        src_user: Option<&str>,
        record: &ConfigRecord,
        advance: &ConfigAdvance,
        time: NaiveDateTime,
    ) -> Result<i64>;

    /// Replace an existing record; `Ok(false)` when there is none.
    async fn update_config_info(
        &self,
        src_ip: &str,
        src_user: Option<&str>,
        record: &ConfigRecord,
        advance: &ConfigAdvance,
        time: NaiveDateTime,
    ) -> Result<bool>;

    /// Insert, falling back to update when the key already exists.
    ///
    /// The two steps run in separate transactions.
    async fn insert_or_update(
        &self,
        src_ip: &str,
        src_user: Option<&str>,
        record: &ConfigRecord,
        advance: &ConfigAdvance,
        time: NaiveDateTime,
    ) -> Result<UpsertOutcome>;

    /// Delete a record, returning the removed snapshot.
    async fn remove_config_info(
        &self,
        data_id: &str,
        group: &str,
        tenant: &str,
        src_ip: &str,
        src_user: Option<&str>,
    ) -> Result<Option<ConfigInfo>>;

    /// Delete records by id, returning those actually removed.
    async fn remove_config_info_by_ids(
        &self,
        ids: &[i64],
        src_ip: &str,
        src_user: Option<&str>,
    ) -> Result<Vec<ConfigInfo>>;

    async fn find_config_info(
        &self,
        data_id: &str,
        group: &str,
        tenant: &str,
    ) -> Result<Option<ConfigInfo>>;

    async fn config_info_count(&self) -> Result<u64>;

    /// Subquery-limit page over every record
    async fn find_all_config_info_for_dump_all(
        &self,
        page_no: u64,
        page_size: u64,
    ) -> Result<Option<Page<ConfigInfoWrapper>>>;

    /// Write a fingerprint unless the row changed after `last_time`.
    async fn update_md5(
        &self,
        data_id: &str,
        group: &str,
        tenant: &str,
        md5: &str,
        last_time: NaiveDateTime,
    ) -> Result<u64>;

    /// Rows for export, selected by id or by filters
    async fn find_all_config_info_4_export(
        &self,
        data_id: Option<&str>,
        group: Option<&str>,
        tenant: &str,
        app_name: Option<&str>,
        ids: &[i64],
    ) -> Result<Vec<ConfigAllInfo>>;
}
