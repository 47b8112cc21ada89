//! `config_tags_relation` repository

use std::sync::Arc;

use sea_orm::{ActiveValue::Set, ConnectionTrait, EntityTrait};

use confstore_common::{Result, split_tags};

use crate::datasource::DataSource;
use crate::dialect::Dialect;
use crate::entity::config_tags_relation;
use crate::model::ConfigRecord;
use crate::projection::SingleString;
use crate::query::{self, db_error};

/// Tag index rows, one per (record id, tag)
pub struct TagsRelationRepository {
    ds: Arc<DataSource>,
}

impl TagsRelationRepository {
    pub fn new(ds: Arc<DataSource>) -> Self {
        Self { ds }
    }

    fn dialect(&self) -> &dyn Dialect {
        self.ds.dialect().as_ref()
    }

    /// Index each tag of the comma separated list under `config_id`.
    pub async fn add_config_tags_relation<C: ConnectionTrait>(
        &self,
        conn: &C,
        config_id: i64,
        config_tags: Option<&str>,
        record: &ConfigRecord,
    ) -> Result<()> {
        let Some(config_tags) = config_tags else {
            return Ok(());
        };

        for tag in split_tags(config_tags) {
            let entity = config_tags_relation::ActiveModel {
                id: Set(config_id),
                tag_name: Set(tag.to_string()),
                tag_type: Set(Some(String::new())),
                data_id: Set(record.data_id.clone()),
                group_id: Set(record.group.clone()),
                tenant_id: Set(record.tenant_or_default()),
                ..Default::default()
            };
            config_tags_relation::Entity::insert(entity)
                .exec(conn)
                .await
                .map_err(db_error)?;
        }

        Ok(())
    }

    pub async fn remove_tag_by_id_atomic<C: ConnectionTrait>(
        &self,
        conn: &C,
        config_id: i64,
    ) -> Result<u64> {
        query::execute(
            conn,
            self.dialect(),
            "DELETE FROM config_tags_relation WHERE id = ?",
            vec![config_id.into()],
        )
        .await
    }

    /// Tag names of one record, in insertion order.
    pub async fn select_tag_by_config_on<C: ConnectionTrait>(
        &self,
        conn: &C,
        data_id: &str,
        group: &str,
        tenant: &str,
    ) -> Result<Vec<String>> {
        let rows: Vec<SingleString> = query::fetch_all(
            conn,
            self.dialect(),
            "SELECT tag_name FROM config_tags_relation WHERE data_id = ? AND group_id = ? AND tenant_id = ? ORDER BY nid",
            vec![data_id.into(), group.into(), tenant.trim().into()],
        )
        .await?;
        Ok(rows.into_iter().map(|s| s.0).collect())
    }

    pub async fn select_tag_by_config(
        &self,
        data_id: &str,
        group: &str,
        tenant: &str,
    ) -> Result<Vec<String>> {
        self.select_tag_by_config_on(&*self.ds.current(), data_id, group, tenant)
            .await
    }

    /// Distinct tag names used within a tenant.
    pub async fn get_config_tags_by_tenant(&self, tenant: &str) -> Result<Vec<String>> {
        let rows: Vec<SingleString> = query::fetch_all(
            &*self.ds.current(),
            self.dialect(),
            "SELECT DISTINCT tag_name FROM config_tags_relation WHERE tenant_id = ? ORDER BY tag_name",
            vec![tenant.trim().into()],
        )
        .await?;
        Ok(rows.into_iter().map(|s| s.0).collect())
    }

    /// Number of index rows pointing at `config_id`.
    pub async fn count_by_config_id(&self, config_id: i64) -> Result<u64> {
        query::fetch_count(
            &*self.ds.current(),
            self.dialect(),
            "SELECT COUNT(*) FROM config_tags_relation WHERE id = ?",
            vec![config_id.into()],
        )
        .await
    }
}
