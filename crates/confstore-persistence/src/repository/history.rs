//! `his_config_info` repository
//!
//! Append-only ledger of record writes. Rows are only removed by the bounded
//! retention delete.

use std::sync::Arc;

use chrono::NaiveDateTime;
use sea_orm::{ActiveValue::Set, ConnectionTrait, EntityTrait};

use confstore_common::{Result, blank_to_empty, md5_hex};

use crate::datasource::DataSource;
use crate::dialect::Dialect;
use crate::entity::his_config_info;
use crate::model::{ConfigRecord, OpKind, Page};
use crate::pagination::PaginationHelper;
use crate::projection::{ConfigHistoryBrief, ConfigHistoryInfo, Projection};
use crate::query::{self, db_error};

pub struct HistoryRepository {
    ds: Arc<DataSource>,
}

impl HistoryRepository {
    pub fn new(ds: Arc<DataSource>) -> Self {
        Self { ds }
    }

    fn dialect(&self) -> &dyn Dialect {
        self.ds.dialect().as_ref()
    }

    /// Append one ledger entry and return its sequence id.
    ///
    /// `id` is the record id the entry belongs to.
    #[allow(clippy::too_many_arguments)]
    pub async fn insert_config_history_atomic<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: i64,
        snapshot: &ConfigRecord,
        src_ip: &str,
        src_user: Option<&str>,
        time: NaiveDateTime,
        op: OpKind,
    ) -> Result<i64> {
        let entity = his_config_info::ActiveModel {
            id: Set(id),
            data_id: Set(snapshot.data_id.clone()),
            group_id: Set(snapshot.group.clone()),
            tenant_id: Set(snapshot.tenant_or_default()),
            app_name: Set(Some(blank_to_empty(snapshot.app_name.as_deref()))),
            content: Set(snapshot.content.clone()),
            md5: Set(Some(md5_hex(&snapshot.content))),
            src_ip: Set(Some(src_ip.to_string())),
            src_user: Set(src_user.map(str::to_string)),
            gmt_create: Set(time),
            gmt_modified: Set(time),
            op_type: Set(Some(op.as_str().to_string())),
            ..Default::default()
        };

        let result = his_config_info::Entity::insert(entity)
            .exec(conn)
            .await
            .map_err(db_error)?;

        tracing::debug!(
            data_id = %snapshot.data_id,
            group = %snapshot.group,
            op = %op,
            nid = result.last_insert_id,
            "history entry appended"
        );

        Ok(result.last_insert_id)
    }

    pub async fn detail_config_history(&self, nid: i64) -> Result<Option<ConfigHistoryInfo>> {
        let sql = format!(
            "SELECT {} FROM his_config_info WHERE nid = ?",
            ConfigHistoryInfo::select_list()
        );
        query::fetch_one(&*self.ds.current(), self.dialect(), &sql, vec![nid.into()]).await
    }

    /// Latest entry recorded for record `id`.
    pub async fn detail_previous_config_history(
        &self,
        id: i64,
    ) -> Result<Option<ConfigHistoryInfo>> {
        let sql = format!(
            "SELECT {} FROM his_config_info WHERE nid = (SELECT max(nid) FROM his_config_info WHERE id = ?)",
            ConfigHistoryInfo::select_list()
        );
        query::fetch_one(&*self.ds.current(), self.dialect(), &sql, vec![id.into()]).await
    }

    /// Entries of one key, newest first.
    pub async fn find_config_history(
        &self,
        data_id: &str,
        group: &str,
        tenant: &str,
        page_no: u64,
        page_size: u64,
    ) -> Result<Option<Page<ConfigHistoryBrief>>> {
        let filter = " WHERE data_id = ? AND group_id = ? AND tenant_id = ?";
        let count_sql = format!("SELECT COUNT(*) FROM his_config_info{}", filter);
        let fetch_sql = format!(
            "SELECT {} FROM his_config_info{} ORDER BY nid DESC",
            ConfigHistoryBrief::select_list(),
            filter
        );
        let args = vec![
            data_id.into(),
            group.into(),
            blank_to_empty(Some(tenant)).into(),
        ];

        let conn = self.ds.current();
        PaginationHelper::new(&*conn, self.dialect())
            .fetch_page(&count_sql, &fetch_sql, args, page_no, page_size)
            .await
    }

    /// Entries last modified before `cutoff`.
    pub async fn find_config_history_count_by_time(&self, cutoff: NaiveDateTime) -> Result<u64> {
        query::fetch_count(
            &*self.ds.current(),
            self.dialect(),
            "SELECT COUNT(*) FROM his_config_info WHERE gmt_modified < ?",
            vec![cutoff.into()],
        )
        .await
    }

    /// Delete at most `max_rows` entries older than `cutoff`, oldest first.
    pub async fn remove_config_history(
        &self,
        cutoff: NaiveDateTime,
        max_rows: u64,
    ) -> Result<u64> {
        let sql = Self::bounded_delete_sql(self.dialect(), max_rows);
        let conn = self.ds.current();
        PaginationHelper::new(&*conn, self.dialect())
            .update_limit(&sql, vec![cutoff.into()])
            .await
    }

    fn bounded_delete_sql(dialect: &dyn Dialect, max_rows: u64) -> String {
        let inner = dialect.build_limit_sql(
            "SELECT nid FROM his_config_info WHERE gmt_modified < ? ORDER BY nid",
            1,
            max_rows.max(1),
        );
        format!(
            "DELETE FROM his_config_info WHERE nid IN (SELECT nid FROM ({}) t)",
            inner
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{MySqlDialect, PostgresDialect};

    #[test]
    fn test_bounded_delete_sql_mysql() {
        assert_eq!(
            HistoryRepository::bounded_delete_sql(&MySqlDialect, 500),
            "DELETE FROM his_config_info WHERE nid IN (SELECT nid FROM (SELECT nid FROM his_config_info WHERE gmt_modified < ? ORDER BY nid limit 0 , 500) t)"
        );
    }

    #[test]
    fn test_bounded_delete_sql_postgres() {
        let sql = HistoryRepository::bounded_delete_sql(&PostgresDialect, 0);
        assert!(sql.ends_with("ORDER BY nid limit 1 offset 0) t)"));
    }
}
