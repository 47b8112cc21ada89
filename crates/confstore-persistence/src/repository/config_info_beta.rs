//! `config_info_beta` repository
//!
//! Gray-release overlays targeted at a set of client IPs. Beta rows never
//! write history or tags.

use std::sync::Arc;

use chrono::NaiveDateTime;
use sea_orm::{ActiveValue::Set, ConnectionTrait, EntityTrait, TransactionTrait};

use confstore_common::{Result, blank_to_empty, md5_hex};

use crate::datasource::DataSource;
use crate::dialect::Dialect;
use crate::entity::config_info_beta;
use crate::model::{ConfigRecord, Page};
use crate::pagination::PaginationHelper;
use crate::projection::{ConfigInfoBetaWrapper, Projection};
use crate::query::{self, db_error};

pub struct ConfigInfoBetaRepository {
    ds: Arc<DataSource>,
}

impl ConfigInfoBetaRepository {
    pub fn new(ds: Arc<DataSource>) -> Self {
        Self { ds }
    }

    fn dialect(&self) -> &dyn Dialect {
        self.ds.dialect().as_ref()
    }

    pub async fn add_config_info_4_beta(
        &self,
        record: &ConfigRecord,
        beta_ips: &str,
        src_ip: &str,
        src_user: Option<&str>,
        time: NaiveDateTime,
    ) -> Result<i64> {
        let entity = config_info_beta::ActiveModel {
            data_id: Set(record.data_id.clone()),
            group_id: Set(record.group.clone()),
            tenant_id: Set(record.tenant_or_default()),
            app_name: Set(Some(record.app_name_or_default())),
            content: Set(record.content.clone()),
            md5: Set(Some(md5_hex(&record.content))),
            beta_ips: Set(Some(beta_ips.to_string())),
            src_ip: Set(Some(src_ip.to_string())),
            src_user: Set(src_user.map(str::to_string)),
            gmt_create: Set(time),
            gmt_modified: Set(time),
            ..Default::default()
        };

        let result = config_info_beta::Entity::insert(entity)
            .exec(&*self.ds.current())
            .await
            .map_err(db_error)?;

        Ok(result.last_insert_id)
    }

    /// Replace the beta content; the IP set is left as stored.
    pub async fn update_config_info_4_beta(
        &self,
        record: &ConfigRecord,
        src_ip: &str,
        src_user: Option<&str>,
        time: NaiveDateTime,
    ) -> Result<u64> {
        let sql = "UPDATE config_info_beta SET content = ?, md5 = ?, src_ip = ?, src_user = ?, gmt_modified = ?, app_name = ? \
                   WHERE data_id = ? AND group_id = ? AND tenant_id = ?";
        query::execute(
            &*self.ds.current(),
            self.dialect(),
            sql,
            vec![
                record.content.clone().into(),
                md5_hex(&record.content).into(),
                src_ip.into(),
                src_user.map(str::to_string).into(),
                time.into(),
                record.app_name_or_default().into(),
                record.data_id.clone().into(),
                record.group.clone().into(),
                record.tenant_or_default().into(),
            ],
        )
        .await
    }

    async fn find_on<C: ConnectionTrait>(
        &self,
        conn: &C,
        data_id: &str,
        group: &str,
        tenant: &str,
    ) -> Result<Option<ConfigInfoBetaWrapper>> {
        let sql = format!(
            "SELECT {} FROM config_info_beta WHERE data_id = ? AND group_id = ? AND tenant_id = ?",
            ConfigInfoBetaWrapper::select_list()
        );
        query::fetch_one(
            conn,
            self.dialect(),
            &sql,
            vec![
                data_id.into(),
                group.into(),
                blank_to_empty(Some(tenant)).into(),
            ],
        )
        .await
    }

    pub async fn find_config_info_4_beta(
        &self,
        data_id: &str,
        group: &str,
        tenant: &str,
    ) -> Result<Option<ConfigInfoBetaWrapper>> {
        self.find_on(&*self.ds.current(), data_id, group, tenant).await
    }

    /// Delete the beta row if present, returning whether one was removed.
    pub async fn remove_config_info_4_beta(
        &self,
        data_id: &str,
        group: &str,
        tenant: &str,
    ) -> Result<bool> {
        let conn = self.ds.current();
        let tx = conn.begin().await.map_err(db_error)?;

        if self.find_on(&tx, data_id, group, tenant).await?.is_none() {
            return Ok(false);
        }

        let removed = query::execute(
            &tx,
            self.dialect(),
            "DELETE FROM config_info_beta WHERE data_id = ? AND group_id = ? AND tenant_id = ?",
            vec![
                data_id.into(),
                group.into(),
                blank_to_empty(Some(tenant)).into(),
            ],
        )
        .await?;

        tx.commit().await.map_err(db_error)?;
        Ok(removed > 0)
    }

    pub async fn config_info_beta_count(&self) -> Result<u64> {
        query::fetch_count(
            &*self.ds.current(),
            self.dialect(),
            "SELECT COUNT(*) FROM config_info_beta",
            vec![],
        )
        .await
    }

    pub async fn find_all_config_info_beta_for_dump_all(
        &self,
        page_no: u64,
        page_size: u64,
    ) -> Result<Option<Page<ConfigInfoBetaWrapper>>> {
        let fetch_sql = format!(
            "SELECT {} FROM ( SELECT id FROM config_info_beta ORDER BY id LIMIT ?,? ) g, config_info_beta t WHERE g.id = t.id ORDER BY t.id",
            ConfigInfoBetaWrapper::qualified("t")
        );

        let conn = self.ds.current();
        PaginationHelper::new(&*conn, self.dialect())
            .fetch_page_limit(
                "SELECT COUNT(*) FROM config_info_beta",
                vec![],
                &fetch_sql,
                vec![],
                page_no,
                page_size,
            )
            .await
    }
}
