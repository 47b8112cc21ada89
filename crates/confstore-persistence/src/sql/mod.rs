//! SQL-backed config store (MySQL/PostgreSQL/SQLite via SeaORM)
//!
//! Composes the table repositories and owns the multi-table transactions:
//! a record write, its tag index rows and its history entry commit or roll
//! back together.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sea_orm::TransactionTrait;

use confstore_common::Result;

use crate::datasource::DataSource;
use crate::model::{ConfigAdvance, ConfigRecord, OpKind, Page};
use crate::projection::{
    ConfigAdvanceInfo, ConfigAllInfo, ConfigInfo, ConfigInfoBetaWrapper, ConfigInfoTagWrapper,
    ConfigInfoWrapper,
};
use crate::query::db_error;
use crate::repository::{
    AggrRepository, AuthRepository, ConfigInfoBetaRepository, ConfigInfoRepository,
    ConfigInfoTagRepository, HistoryRepository, TagsRelationRepository, TenantInfoRepository,
};
use crate::traits::{ConfigPersistence, HistoryPersistence, PersistenceService, UpsertOutcome};

/// External database config store
pub struct ExternalConfigStore {
    ds: Arc<DataSource>,
    config_info: ConfigInfoRepository,
    beta: ConfigInfoBetaRepository,
    tag: ConfigInfoTagRepository,
    tags: TagsRelationRepository,
    history: HistoryRepository,
    aggr: AggrRepository,
    tenant: TenantInfoRepository,
    auth: AuthRepository,
}

impl ExternalConfigStore {
    pub fn new(ds: Arc<DataSource>) -> Self {
        Self {
            config_info: ConfigInfoRepository::new(ds.clone()),
            beta: ConfigInfoBetaRepository::new(ds.clone()),
            tag: ConfigInfoTagRepository::new(ds.clone()),
            tags: TagsRelationRepository::new(ds.clone()),
            history: HistoryRepository::new(ds.clone()),
            aggr: AggrRepository::new(ds.clone()),
            tenant: TenantInfoRepository::new(ds.clone()),
            auth: AuthRepository::new(ds.clone()),
            ds,
        }
    }

    pub fn data_source(&self) -> &Arc<DataSource> {
        &self.ds
    }

    pub fn config_info(&self) -> &ConfigInfoRepository {
        &self.config_info
    }

    pub fn beta(&self) -> &ConfigInfoBetaRepository {
        &self.beta
    }

    pub fn tag(&self) -> &ConfigInfoTagRepository {
        &self.tag
    }

    pub fn tags(&self) -> &TagsRelationRepository {
        &self.tags
    }

    pub fn history(&self) -> &HistoryRepository {
        &self.history
    }

    pub fn aggr(&self) -> &AggrRepository {
        &self.aggr
    }

    pub fn tenant(&self) -> &TenantInfoRepository {
        &self.tenant
    }

    pub fn auth(&self) -> &AuthRepository {
        &self.auth
    }

    // ========================================================================
    // Record reads that carry tags
    // ========================================================================

    pub async fn find_config_advance_info(
        &self,
        data_id: &str,
        group: &str,
        tenant: &str,
    ) -> Result<Option<ConfigAdvanceInfo>> {
        let Some(mut info) = self
            .config_info
            .find_config_advance_info(data_id, group, tenant)
            .await?
        else {
            return Ok(None);
        };

        let tags = self.tags.select_tag_by_config(data_id, group, tenant).await?;
        info.config_tags = tags.join(",");
        Ok(Some(info))
    }

    pub async fn find_config_all_info(
        &self,
        data_id: &str,
        group: &str,
        tenant: &str,
    ) -> Result<Option<ConfigAllInfo>> {
        let Some(mut info) = self
            .config_info
            .find_config_all_info(data_id, group, tenant)
            .await?
        else {
            return Ok(None);
        };

        let tags = self.tags.select_tag_by_config(data_id, group, tenant).await?;
        info.config_tags = tags.join(",");
        Ok(Some(info))
    }

    // ========================================================================
    // Beta variant
    // ========================================================================

    pub async fn add_config_info_4_beta(
        &self,
        record: &ConfigRecord,
        beta_ips: &str,
        src_ip: &str,
        src_user: Option<&str>,
        time: NaiveDateTime,
    ) -> Result<i64> {
        self.beta
            .add_config_info_4_beta(record, beta_ips, src_ip, src_user, time)
            .await
    }

    pub async fn update_config_info_4_beta(
        &self,
        record: &ConfigRecord,
        src_ip: &str,
        src_user: Option<&str>,
        time: NaiveDateTime,
    ) -> Result<u64> {
        self.beta
            .update_config_info_4_beta(record, src_ip, src_user, time)
            .await
    }

    pub async fn insert_or_update_beta(
        &self,
        record: &ConfigRecord,
        beta_ips: &str,
        src_ip: &str,
        time: NaiveDateTime,
    ) -> Result<UpsertOutcome> {
        match self
            .beta
            .add_config_info_4_beta(record, beta_ips, src_ip, None, time)
            .await
        {
            Ok(id) => Ok(UpsertOutcome::Inserted(id)),
            Err(e) if e.is_constraint_violation() => {
                self.beta
                    .update_config_info_4_beta(record, src_ip, None, time)
                    .await?;
                Ok(UpsertOutcome::Updated)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn find_config_info_4_beta(
        &self,
        data_id: &str,
        group: &str,
        tenant: &str,
    ) -> Result<Option<ConfigInfoBetaWrapper>> {
        self.beta
            .find_config_info_4_beta(data_id, group, tenant)
            .await
    }

    pub async fn remove_config_info_4_beta(
        &self,
        data_id: &str,
        group: &str,
        tenant: &str,
    ) -> Result<bool> {
        self.beta
            .remove_config_info_4_beta(data_id, group, tenant)
            .await
    }

    // ========================================================================
    // Tag variant
    // ========================================================================

    pub async fn add_config_info_4_tag(
        &self,
        record: &ConfigRecord,
        tag: &str,
        src_ip: &str,
        src_user: Option<&str>,
        time: NaiveDateTime,
    ) -> Result<i64> {
        self.tag
            .add_config_info_4_tag(record, tag, src_ip, src_user, time)
            .await
    }

    pub async fn update_config_info_4_tag(
        &self,
        record: &ConfigRecord,
        tag: &str,
        src_ip: &str,
        src_user: Option<&str>,
        time: NaiveDateTime,
    ) -> Result<u64> {
        self.tag
            .update_config_info_4_tag(record, tag, src_ip, src_user, time)
            .await
    }

    pub async fn insert_or_update_tag(
        &self,
        record: &ConfigRecord,
        tag: &str,
        src_ip: &str,
        time: NaiveDateTime,
    ) -> Result<UpsertOutcome> {
        match self
            .tag
            .add_config_info_4_tag(record, tag, src_ip, None, time)
            .await
        {
            Ok(id) => Ok(UpsertOutcome::Inserted(id)),
            Err(e) if e.is_constraint_violation() => {
                self.tag
                    .update_config_info_4_tag(record, tag, src_ip, None, time)
                    .await?;
                Ok(UpsertOutcome::Updated)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn find_config_info_4_tag(
        &self,
        data_id: &str,
        group: &str,
        tenant: &str,
        tag: &str,
    ) -> Result<Option<ConfigInfoTagWrapper>> {
        self.tag
            .find_config_info_4_tag(data_id, group, tenant, tag)
            .await
    }

    pub async fn remove_config_info_tag(
        &self,
        data_id: &str,
        group: &str,
        tenant: &str,
        tag: &str,
    ) -> Result<u64> {
        self.tag
            .remove_config_info_tag(data_id, group, tenant, tag)
            .await
    }
}

// ============================================================================
// ConfigPersistence implementation
// ============================================================================

#[async_trait]
impl ConfigPersistence for ExternalConfigStore {
    async fn add_config_info(
        &self,
        src_ip: &str,
        src_user: Option<&str>,
        record: &ConfigRecord,
        advance: &ConfigAdvance,
        time: NaiveDateTime,
    ) -> Result<i64> {
        let conn = self.ds.current();
        let tx = conn.begin().await.map_err(db_error)?;

        let id = self
            .config_info
            .add_config_info_atomic(&tx, src_ip, src_user, record, time, advance)
            .await?;
        self.tags
            .add_config_tags_relation(&tx, id, advance.config_tags.as_deref(), record)
            .await?;
        self.history
            .insert_config_history_atomic(&tx, id, record, src_ip, src_user, time, OpKind::Insert)
            .await?;

        tx.commit().await.map_err(db_error)?;

        tracing::info!(
            data_id = %record.data_id,
            group = %record.group,
            tenant = %record.tenant,
            id,
            "config added"
        );
        Ok(id)
    }

    async fn update_config_info(
        &self,
        src_ip: &str,
        src_user: Option<&str>,
        record: &ConfigRecord,
        advance: &ConfigAdvance,
        time: NaiveDateTime,
    ) -> Result<bool> {
        let conn = self.ds.current();
        let tx = conn.begin().await.map_err(db_error)?;

        let Some(old) = self
            .config_info
            .find_config_info_on(&tx, &record.data_id, &record.group, &record.tenant)
            .await?
        else {
            return Ok(false);
        };

        let mut record = record.clone();
        if record.app_name.is_none() {
            record.app_name = Some(old.app_name.clone());
        }

        self.config_info
            .update_config_info_atomic(&tx, &record, src_ip, src_user, time, advance)
            .await?;

        if let Some(config_tags) = advance.config_tags.as_deref() {
            self.tags.remove_tag_by_id_atomic(&tx, old.id).await?;
            self.tags
                .add_config_tags_relation(&tx, old.id, Some(config_tags), &record)
                .await?;
        }

        self.history
            .insert_config_history_atomic(
                &tx,
                old.id,
                &old.to_record(),
                src_ip,
                src_user,
                time,
                OpKind::Update,
            )
            .await?;

        tx.commit().await.map_err(db_error)?;

        tracing::info!(
            data_id = %record.data_id,
            group = %record.group,
            tenant = %record.tenant,
            id = old.id,
            "config updated"
        );
        Ok(true)
    }

    async fn insert_or_update(
        &self,
        src_ip: &str,
        src_user: Option<&str>,
        record: &ConfigRecord,
        advance: &ConfigAdvance,
        time: NaiveDateTime,
    ) -> Result<UpsertOutcome> {
        match self
            .add_config_info(src_ip, src_user, record, advance, time)
            .await
        {
            Ok(id) => Ok(UpsertOutcome::Inserted(id)),
            Err(e) if e.is_constraint_violation() => {
                if self
                    .update_config_info(src_ip, src_user, record, advance, time)
                    .await?
                {
                    Ok(UpsertOutcome::Updated)
                } else {
                    // Removed between the failed insert and the update.
                    Err(e)
                }
            }
            Err(e) => Err(e),
        }
    }

    async fn remove_config_info(
        &self,
        data_id: &str,
        group: &str,
        tenant: &str,
        src_ip: &str,
        src_user: Option<&str>,
    ) -> Result<Option<ConfigInfo>> {
        let conn = self.ds.current();
        let tx = conn.begin().await.map_err(db_error)?;

        let Some(old) = self
            .config_info
            .find_config_info_on(&tx, data_id, group, tenant)
            .await?
        else {
            return Ok(None);
        };

        self.config_info
            .remove_config_info_atomic(&tx, data_id, group, tenant)
            .await?;
        self.tags.remove_tag_by_id_atomic(&tx, old.id).await?;
        self.history
            .insert_config_history_atomic(
                &tx,
                old.id,
                &old.to_record(),
                src_ip,
                src_user,
                chrono::Utc::now().naive_utc(),
                OpKind::Delete,
            )
            .await?;

        tx.commit().await.map_err(db_error)?;

        tracing::info!(data_id, group, tenant, id = old.id, "config removed");
        Ok(Some(old))
    }

    async fn remove_config_info_by_ids(
        &self,
        ids: &[i64],
        src_ip: &str,
        src_user: Option<&str>,
    ) -> Result<Vec<ConfigInfo>> {
        let ids: Vec<i64> = ids
            .iter()
            .copied()
            .filter(|id| *id > 0)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.ds.current();
        let tx = conn.begin().await.map_err(db_error)?;

        let removed = self
            .config_info
            .find_config_infos_by_ids_on(&tx, &ids)
            .await?;
        if removed.is_empty() {
            return Ok(removed);
        }

        self.config_info
            .remove_config_info_by_ids_atomic(&tx, &ids)
            .await?;

        let time = chrono::Utc::now().naive_utc();
        for info in &removed {
            self.tags.remove_tag_by_id_atomic(&tx, info.id).await?;
            self.history
                .insert_config_history_atomic(
                    &tx,
                    info.id,
                    &info.to_record(),
                    src_ip,
                    src_user,
                    time,
                    OpKind::Delete,
                )
                .await?;
        }

        tx.commit().await.map_err(db_error)?;

        tracing::info!(count = removed.len(), "configs removed by id");
        Ok(removed)
    }

    async fn find_config_info(
        &self,
        data_id: &str,
        group: &str,
        tenant: &str,
    ) -> Result<Option<ConfigInfo>> {
        self.config_info
            .find_config_info(data_id, group, tenant)
            .await
    }

    async fn config_info_count(&self) -> Result<u64> {
        self.config_info.config_info_count().await
    }

    async fn find_all_config_info_for_dump_all(
        &self,
        page_no: u64,
        page_size: u64,
    ) -> Result<Option<Page<ConfigInfoWrapper>>> {
        self.config_info
            .find_all_config_info_for_dump_all(page_no, page_size)
            .await
    }

    async fn update_md5(
        &self,
        data_id: &str,
        group: &str,
        tenant: &str,
        md5: &str,
        last_time: NaiveDateTime,
    ) -> Result<u64> {
        self.config_info
            .update_md5(data_id, group, tenant, md5, last_time)
            .await
    }

    async fn find_all_config_info_4_export(
        &self,
        data_id: Option<&str>,
        group: Option<&str>,
        tenant: &str,
        app_name: Option<&str>,
        ids: &[i64],
    ) -> Result<Vec<ConfigAllInfo>> {
        let mut rows = self
            .config_info
            .find_all_config_info_4_export(data_id, group, tenant, app_name, ids)
            .await?;
        for row in rows.iter_mut() {
            let tags = self
                .tags
                .select_tag_by_config(&row.data_id, &row.group, &row.tenant)
                .await?;
            row.config_tags = tags.join(",");
        }
        Ok(rows)
    }
}

// ============================================================================
// HistoryPersistence implementation
// ============================================================================

#[async_trait]
impl HistoryPersistence for ExternalConfigStore {
    async fn find_config_history_count_by_time(&self, cutoff: NaiveDateTime) -> Result<u64> {
        self.history.find_config_history_count_by_time(cutoff).await
    }

    async fn remove_config_history(&self, cutoff: NaiveDateTime, max_rows: u64) -> Result<u64> {
        self.history.remove_config_history(cutoff, max_rows).await
    }
}

#[async_trait]
impl PersistenceService for ExternalConfigStore {
    async fn health_check(&self) -> Result<()> {
        self.ds.health_check().await
    }

    async fn is_exist_table(&self, table_name: &str) -> bool {
        self.config_info.is_exist_table(table_name).await
    }
}
