//! `config_info_aggr` repository
//!
//! Aggregate items are sub-documents (`datum_id`) published under one record
//! key. Batch publish and replace run in a single transaction each.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDateTime;
use sea_orm::{ActiveValue::Set, ConnectionTrait, EntityTrait, TransactionTrait, Value};

use confstore_common::{QUERY_LIMIT_SIZE, Result, blank_to_empty};

use crate::datasource::DataSource;
use crate::dialect::Dialect;
use crate::entity::config_info_aggr;
use crate::filter::{KeyFilter, WhereClause, build_key_filter, placeholders};
use crate::model::Page;
use crate::pagination::{PaginationHelper, check_page};
use crate::projection::{ConfigInfoAggr, ConfigInfoChanged, ConfigKey, Projection, SingleString};
use crate::query::{self, chunked, db_error};

const KEY_FILTER: &str = "data_id = ? AND group_id = ? AND tenant_id = ?";

fn key_values(data_id: &str, group: &str, tenant: &str) -> Vec<Value> {
    vec![
        data_id.into(),
        group.into(),
        blank_to_empty(Some(tenant)).into(),
    ]
}

pub struct AggrRepository {
    ds: Arc<DataSource>,
}

impl AggrRepository {
    pub fn new(ds: Arc<DataSource>) -> Self {
        Self { ds }
    }

    fn dialect(&self) -> &dyn Dialect {
        self.ds.dialect().as_ref()
    }

    /// Publish one datum.
    ///
    /// Unchanged content is left alone and reported as success.
    #[allow(clippy::too_many_arguments)]
    pub async fn add_aggr_config_info_on<C: ConnectionTrait>(
        &self,
        conn: &C,
        data_id: &str,
        group: &str,
        tenant: &str,
        datum_id: &str,
        app_name: Option<&str>,
        content: &str,
        time: NaiveDateTime,
    ) -> Result<bool> {
        let select = format!(
            "SELECT content FROM config_info_aggr WHERE {} AND datum_id = ?",
            KEY_FILTER
        );
        let mut values = key_values(data_id, group, tenant);
        values.push(datum_id.into());
        let existing: Option<SingleString> =
            query::fetch_one(conn, self.dialect(), &select, values.clone()).await?;

        match existing {
            Some(SingleString(db_content)) if db_content == content => Ok(true),
            Some(_) => {
                let update = format!(
                    "UPDATE config_info_aggr SET content = ?, gmt_modified = ? WHERE {} AND datum_id = ?",
                    KEY_FILTER
                );
                let mut args: Vec<Value> = vec![content.into(), time.into()];
                args.extend(values);
                let rows = query::execute(conn, self.dialect(), &update, args).await?;
                Ok(rows > 0)
            }
            None => {
                let entity = config_info_aggr::ActiveModel {
                    data_id: Set(data_id.to_string()),
                    group_id: Set(group.to_string()),
                    tenant_id: Set(blank_to_empty(Some(tenant))),
                    datum_id: Set(datum_id.to_string()),
                    app_name: Set(Some(blank_to_empty(app_name))),
                    content: Set(content.to_string()),
                    gmt_modified: Set(time),
                    ..Default::default()
                };
                config_info_aggr::Entity::insert(entity)
                    .exec(conn)
                    .await
                    .map_err(db_error)?;
                Ok(true)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn add_aggr_config_info(
        &self,
        data_id: &str,
        group: &str,
        tenant: &str,
        datum_id: &str,
        app_name: Option<&str>,
        content: &str,
        time: NaiveDateTime,
    ) -> Result<bool> {
        self.add_aggr_config_info_on(
            &*self.ds.current(),
            data_id,
            group,
            tenant,
            datum_id,
            app_name,
            content,
            time,
        )
        .await
    }

    /// Publish every datum in one transaction; any failure rolls back the batch.
    pub async fn batch_publish_aggr(
        &self,
        data_id: &str,
        group: &str,
        tenant: &str,
        datums: &BTreeMap<String, String>,
        app_name: Option<&str>,
        time: NaiveDateTime,
    ) -> Result<bool> {
        let conn = self.ds.current();
        let tx = conn
            .begin()
            .await
            .map_err(|e| db_error(e).into_transaction())?;

        for (datum_id, content) in datums {
            let published = self
                .add_aggr_config_info_on(
                    &tx, data_id, group, tenant, datum_id, app_name, content, time,
                )
                .await
                .map_err(|e| e.into_transaction())?;
            if !published {
                return Err(confstore_common::ConfStoreError::Transaction(format!(
                    "failed to publish datum {}",
                    datum_id
                )));
            }
        }

        tx.commit()
            .await
            .map_err(|e| db_error(e).into_transaction())?;
        Ok(true)
    }

    /// Replace all datums of a key in one transaction.
    pub async fn replace_aggr(
        &self,
        data_id: &str,
        group: &str,
        tenant: &str,
        datums: &BTreeMap<String, String>,
        app_name: Option<&str>,
        time: NaiveDateTime,
    ) -> Result<bool> {
        let conn = self.ds.current();
        let tx = conn
            .begin()
            .await
            .map_err(|e| db_error(e).into_transaction())?;

        let delete = format!("DELETE FROM config_info_aggr WHERE {}", KEY_FILTER);
        query::execute(&tx, self.dialect(), &delete, key_values(data_id, group, tenant))
            .await
            .map_err(|e| e.into_transaction())?;

        for (datum_id, content) in datums {
            let entity = config_info_aggr::ActiveModel {
                data_id: Set(data_id.to_string()),
                group_id: Set(group.to_string()),
                tenant_id: Set(blank_to_empty(Some(tenant))),
                datum_id: Set(datum_id.clone()),
                app_name: Set(Some(blank_to_empty(app_name))),
                content: Set(content.clone()),
                gmt_modified: Set(time),
                ..Default::default()
            };
            config_info_aggr::Entity::insert(entity)
                .exec(&tx)
                .await
                .map_err(|e| db_error(e).into_transaction())?;
        }

        tx.commit()
            .await
            .map_err(|e| db_error(e).into_transaction())?;
        Ok(true)
    }

    pub async fn remove_single_aggr_config_info(
        &self,
        data_id: &str,
        group: &str,
        tenant: &str,
        datum_id: &str,
    ) -> Result<u64> {
        let sql = format!("DELETE FROM config_info_aggr WHERE {} AND datum_id = ?", KEY_FILTER);
        let mut values = key_values(data_id, group, tenant);
        values.push(datum_id.into());
        query::execute(&*self.ds.current(), self.dialect(), &sql, values).await
    }

    pub async fn remove_aggr_config_info(
        &self,
        data_id: &str,
        group: &str,
        tenant: &str,
    ) -> Result<u64> {
        let sql = format!("DELETE FROM config_info_aggr WHERE {}", KEY_FILTER);
        query::execute(
            &*self.ds.current(),
            self.dialect(),
            &sql,
            key_values(data_id, group, tenant),
        )
        .await
    }

    pub async fn batch_remove_aggr(
        &self,
        data_id: &str,
        group: &str,
        tenant: &str,
        datum_ids: &[String],
    ) -> Result<u64> {
        let conn = self.ds.current();
        let mut removed = 0;
        for chunk in chunked(datum_ids, QUERY_LIMIT_SIZE) {
            let sql = format!(
                "DELETE FROM config_info_aggr WHERE {} AND datum_id IN ({})",
                KEY_FILTER,
                placeholders(chunk.len())
            );
            let mut values = key_values(data_id, group, tenant);
            values.extend(chunk);
            removed += query::execute(&*conn, self.dialect(), &sql, values).await?;
        }
        Ok(removed)
    }

    pub async fn aggr_config_info_count(
        &self,
        data_id: &str,
        group: &str,
        tenant: &str,
    ) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM config_info_aggr WHERE {}", KEY_FILTER);
        query::fetch_count(
            &*self.ds.current(),
            self.dialect(),
            &sql,
            key_values(data_id, group, tenant),
        )
        .await
    }

    /// Count datums of a key inside (`is_in`) or outside the given id list.
    ///
    /// An empty list counts nothing.
    pub async fn aggr_config_info_count_in(
        &self,
        data_id: &str,
        group: &str,
        tenant: &str,
        datum_ids: &[String],
        is_in: bool,
    ) -> Result<u64> {
        if datum_ids.is_empty() {
            return Ok(0);
        }

        let op = if is_in { "IN" } else { "NOT IN" };
        let sql = format!(
            "SELECT COUNT(*) FROM config_info_aggr WHERE {} AND datum_id {} ({})",
            KEY_FILTER,
            op,
            placeholders(datum_ids.len())
        );
        let mut values = key_values(data_id, group, tenant);
        values.extend(datum_ids.iter().map(|d| Value::from(d.as_str())));
        query::fetch_count(&*self.ds.current(), self.dialect(), &sql, values).await
    }

    pub async fn find_single_config_info_aggr(
        &self,
        data_id: &str,
        group: &str,
        tenant: &str,
        datum_id: &str,
    ) -> Result<Option<ConfigInfoAggr>> {
        let sql = format!(
            "SELECT {} FROM config_info_aggr WHERE {} AND datum_id = ?",
            ConfigInfoAggr::select_list(),
            KEY_FILTER
        );
        let mut values = key_values(data_id, group, tenant);
        values.push(datum_id.into());
        query::fetch_one(&*self.ds.current(), self.dialect(), &sql, values).await
    }

    pub async fn find_config_info_aggr(
        &self,
        data_id: &str,
        group: &str,
        tenant: &str,
    ) -> Result<Vec<ConfigInfoAggr>> {
        let sql = format!(
            "SELECT {} FROM config_info_aggr WHERE {} ORDER BY datum_id",
            ConfigInfoAggr::select_list(),
            KEY_FILTER
        );
        query::fetch_all(
            &*self.ds.current(),
            self.dialect(),
            &sql,
            key_values(data_id, group, tenant),
        )
        .await
    }

    pub async fn find_config_info_aggr_by_page(
        &self,
        data_id: &str,
        group: &str,
        tenant: &str,
        page_no: u64,
        page_size: u64,
    ) -> Result<Option<Page<ConfigInfoAggr>>> {
        let count_sql = format!("SELECT COUNT(*) FROM config_info_aggr WHERE {}", KEY_FILTER);
        let fetch_sql = format!(
            "SELECT {} FROM config_info_aggr WHERE {} ORDER BY datum_id LIMIT ?,?",
            ConfigInfoAggr::select_list(),
            KEY_FILTER
        );
        let args = key_values(data_id, group, tenant);

        let conn = self.ds.current();
        PaginationHelper::new(&*conn, self.dialect())
            .fetch_page_limit(&count_sql, args.clone(), &fetch_sql, args, page_no, page_size)
            .await
    }

    /// Whitelist or blacklist search over aggregate rows.
    pub async fn find_config_info_aggr_like(
        &self,
        page_no: u64,
        page_size: u64,
        keys: &[ConfigKey],
        blacklist: bool,
    ) -> Result<Option<Page<ConfigInfoAggr>>> {
        check_page(page_no, page_size)?;

        let mut w = WhereClause::new();
        match build_key_filter(keys, blacklist) {
            KeyFilter::MatchNone => return Ok(Some(Page::new(0, page_no, page_size, vec![]))),
            KeyFilter::MatchAll => {}
            KeyFilter::Predicate { sql, values } => {
                w.and(sql, values);
            }
        }

        let count_sql = format!("SELECT COUNT(*) FROM config_info_aggr{}", w.to_sql());
        let fetch_sql = format!(
            "SELECT {} FROM config_info_aggr{} ORDER BY id",
            ConfigInfoAggr::select_list(),
            w.to_sql()
        );

        let conn = self.ds.current();
        PaginationHelper::new(&*conn, self.dialect())
            .fetch_page(&count_sql, &fetch_sql, w.values(), page_no, page_size)
            .await
    }

    /// Distinct record keys that own aggregate items.
    pub async fn find_all_aggr_group(&self) -> Result<Vec<ConfigInfoChanged>> {
        let sql = format!(
            "SELECT DISTINCT {} FROM config_info_aggr",
            ConfigInfoChanged::select_list()
        );
        query::fetch_all(&*self.ds.current(), self.dialect(), &sql, vec![]).await
    }

    pub async fn find_datum_id_by_content(
        &self,
        data_id: &str,
        group: &str,
        content: &str,
    ) -> Result<Vec<String>> {
        let rows: Vec<SingleString> = query::fetch_all(
            &*self.ds.current(),
            self.dialect(),
            "SELECT datum_id FROM config_info_aggr WHERE data_id = ? AND group_id = ? AND content = ?",
            vec![data_id.into(), group.into(), content.into()],
        )
        .await?;
        Ok(rows.into_iter().map(|s| s.0).collect())
    }
}
