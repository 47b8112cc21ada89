//! `config_info_tag` repository
//!
//! Overlays addressed by a tag discriminator. Like beta rows they are stored
//! independently of the base record and carry no history.

use std::sync::Arc;

use chrono::NaiveDateTime;
use sea_orm::{ActiveValue::Set, EntityTrait};

use confstore_common::{Result, blank_to_empty, md5_hex};

use crate::datasource::DataSource;
use crate::dialect::Dialect;
use crate::entity::config_info_tag;
use crate::model::{ConfigRecord, Page};
use crate::pagination::PaginationHelper;
use crate::projection::{ConfigInfoTagWrapper, Projection};
use crate::query::{self, db_error};

/// Tag discriminator with surrounding whitespace removed
#[inline]
fn tag_of(tag: &str) -> String {
    tag.trim().to_string()
}

pub struct ConfigInfoTagRepository {
    ds: Arc<DataSource>,
}

impl ConfigInfoTagRepository {
    pub fn new(ds: Arc<DataSource>) -> Self {
        Self { ds }
    }

    fn dialect(&self) -> &dyn Dialect {
        self.ds.dialect().as_ref()
    }

    pub async fn add_config_info_4_tag(
        &self,
        record: &ConfigRecord,
        tag: &str,
        src_ip: &str,
        src_user: Option<&str>,
        time: NaiveDateTime,
    ) -> Result<i64> {
        let entity = config_info_tag::ActiveModel {
            data_id: Set(record.data_id.clone()),
            group_id: Set(record.group.clone()),
            tenant_id: Set(record.tenant_or_default()),
            tag_id: Set(tag_of(tag)),
            app_name: Set(Some(record.app_name_or_default())),
            content: Set(record.content.clone()),
            md5: Set(Some(md5_hex(&record.content))),
            src_ip: Set(Some(src_ip.to_string())),
            src_user: Set(src_user.map(str::to_string)),
            gmt_create: Set(time),
            gmt_modified: Set(time),
            ..Default::default()
        };

        let result = config_info_tag::Entity::insert(entity)
            .exec(&*self.ds.current())
            .await
            .map_err(db_error)?;

        Ok(result.last_insert_id)
    }

    pub async fn update_config_info_4_tag(
        &self,
        record: &ConfigRecord,
        tag: &str,
        src_ip: &str,
        src_user: Option<&str>,
        time: NaiveDateTime,
    ) -> Result<u64> {
        let sql = "UPDATE config_info_tag SET content = ?, md5 = ?, src_ip = ?, src_user = ?, gmt_modified = ?, app_name = ? \
                   WHERE data_id = ? AND group_id = ? AND tenant_id = ? AND tag_id = ?";
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
                tag_of(tag).into(),
            ],
        )
        .await
    }

    pub async fn find_config_info_4_tag(
        &self,
        data_id: &str,
        group: &str,
        tenant: &str,
        tag: &str,
    ) -> Result<Option<ConfigInfoTagWrapper>> {
        let sql = format!(
            "SELECT {} FROM config_info_tag WHERE data_id = ? AND group_id = ? AND tenant_id = ? AND tag_id = ?",
            ConfigInfoTagWrapper::select_list()
        );
        query::fetch_one(
            &*self.ds.current(),
            self.dialect(),
            &sql,
            vec![
                data_id.into(),
                group.into(),
                blank_to_empty(Some(tenant)).into(),
                tag_of(tag).into(),
            ],
        )
        .await
    }

    pub async fn remove_config_info_tag(
        &self,
        data_id: &str,
        group: &str,
        tenant: &str,
        tag: &str,
    ) -> Result<u64> {
        query::execute(
            &*self.ds.current(),
            self.dialect(),
            "DELETE FROM config_info_tag WHERE data_id = ? AND group_id = ? AND tenant_id = ? AND tag_id = ?",
            vec![
                data_id.into(),
                group.into(),
                blank_to_empty(Some(tenant)).into(),
                tag_of(tag).into(),
            ],
        )
        .await
    }

    pub async fn config_info_tag_count(&self) -> Result<u64> {
        query::fetch_count(
            &*self.ds.current(),
            self.dialect(),
            "SELECT COUNT(*) FROM config_info_tag",
            vec![],
        )
        .await
    }

    pub async fn find_all_config_info_tag_for_dump_all(
        &self,
        page_no: u64,
        page_size: u64,
    ) -> Result<Option<Page<ConfigInfoTagWrapper>>> {
        let fetch_sql = format!(
            "SELECT {} FROM ( SELECT id FROM config_info_tag ORDER BY id LIMIT ?,? ) g, config_info_tag t WHERE g.id = t.id ORDER BY t.id",
            ConfigInfoTagWrapper::qualified("t")
        );

        let conn = self.ds.current();
        PaginationHelper::new(&*conn, self.dialect())
            .fetch_page_limit(
                "SELECT COUNT(*) FROM config_info_tag",
                vec![],
                &fetch_sql,
                vec![],
                page_no,
                page_size,
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_of_trims() {
        assert_eq!(tag_of("  gray "), "gray");
        assert_eq!(tag_of("   "), "");
    }
}
