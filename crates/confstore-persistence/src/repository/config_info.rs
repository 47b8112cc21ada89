//! `config_info` table repository
//!
//! Single-table statements over the live record table. Write helpers take an
//! explicit connection so that the store facade can run them inside one
//! transaction together with the tag index and history ledger.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::NaiveDateTime;
use sea_orm::{ActiveValue::Set, ConnectionTrait, EntityTrait, Value};

use confstore_common::{QUERY_LIMIT_SIZE, Result, is_blank, md5_hex, split_tags};

use crate::datasource::DataSource;
use crate::dialect::Dialect;
use crate::entity::config_info;
use crate::filter::{KeyFilter, WhereClause, build_key_filter, placeholders};
use crate::model::{ConfigAdvance, ConfigRecord, ConfigSearch, Page, page_count};
use crate::pagination::{PaginationHelper, check_page};
use crate::projection::{
    ConfigAdvanceInfo, ConfigAllInfo, ConfigInfo, ConfigInfoBase, ConfigInfoChanged,
    ConfigInfoState, ConfigInfoWrapper, ConfigKey, Projection, SingleString,
};
use crate::query::{self, chunked, db_error};

const TAG_JOIN: &str = "config_info a left join config_tags_relation b on a.id = b.id";

/// Page size used when listing every key fingerprint
const GROUP_KEY_PAGE_SIZE: u64 = 10_000;

/// Tenant with blank collapsed to the default namespace
#[inline]
fn tenant_of(tenant: &str) -> String {
    if is_blank(tenant) {
        String::new()
    } else {
        tenant.to_string()
    }
}

/// Source table, alias and tag list for a search that may filter by tags
struct SearchSource<'a> {
    alias: Option<&'static str>,
    tags: Vec<&'a str>,
}

impl<'a> SearchSource<'a> {
    fn new(config_tags: Option<&'a str>) -> Self {
        let tags = config_tags.map(split_tags).unwrap_or_default();
        let alias = if tags.is_empty() { None } else { Some("a") };
        Self { alias, tags }
    }

    fn table(&self) -> &'static str {
        if self.alias.is_some() {
            TAG_JOIN
        } else {
            "config_info"
        }
    }

    fn select<P: Projection>(&self) -> String {
        match self.alias {
            Some(a) => P::qualified(a),
            None => P::select_list(),
        }
    }

    fn order_by(&self) -> &'static str {
        if self.alias.is_some() {
            " order by a.id"
        } else {
            " order by id"
        }
    }

    /// Append the tag predicate last, after the caller's filters.
    fn finish(&self, where_clause: &mut WhereClause) {
        if !self.tags.is_empty() {
            let tags = self.tags.iter().map(|t| Value::from(*t)).collect();
            where_clause.and_in(Some("b"), "tag_name", tags);
        }
    }
}

/// Live configuration records
pub struct ConfigInfoRepository {
    ds: Arc<DataSource>,
}

impl ConfigInfoRepository {
    pub fn new(ds: Arc<DataSource>) -> Self {
        Self { ds }
    }

    fn dialect(&self) -> &dyn Dialect {
        self.ds.dialect().as_ref()
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Insert a record and return its assigned id.
    pub async fn add_config_info_atomic<C: ConnectionTrait>(
        &self,
        conn: &C,
        src_ip: &str,
        src_user: Option<&str>,
        record: &ConfigRecord,
        time: NaiveDateTime,
        advance: &ConfigAdvance,
    ) -> Result<i64> {
        let entity = config_info::ActiveModel {
            data_id: Set(record.data_id.clone()),
            group_id: Set(record.group.clone()),
            tenant_id: Set(record.tenant_or_default()),
            app_name: Set(Some(record.app_name_or_default())),
            content: Set(record.content.clone()),
            md5: Set(Some(md5_hex(&record.content))),
            gmt_create: Set(time),
            gmt_modified: Set(time),
            src_user: Set(src_user.map(str::to_string)),
            src_ip: Set(Some(src_ip.to_string())),
            c_desc: Set(advance.desc.clone()),
            c_use: Set(advance.r#use.clone()),
            effect: Set(advance.effect.clone()),
            r#type: Set(advance.r#type.clone()),
            c_schema: Set(advance.schema.clone()),
            ..Default::default()
        };

        let result = config_info::Entity::insert(entity)
            .exec(conn)
            .await
            .map_err(db_error)?;

        Ok(result.last_insert_id)
    }

    /// Replace content and metadata of the record identified by the key.
    pub async fn update_config_info_atomic<C: ConnectionTrait>(
        &self,
        conn: &C,
        record: &ConfigRecord,
        src_ip: &str,
        src_user: Option<&str>,
        time: NaiveDateTime,
        advance: &ConfigAdvance,
    ) -> Result<u64> {
        let sql = "UPDATE config_info SET content = ?, md5 = ?, src_ip = ?, src_user = ?, gmt_modified = ?, \
                   app_name = ?, c_desc = ?, c_use = ?, effect = ?, type = ?, c_schema = ? \
                   WHERE data_id = ? AND group_id = ? AND tenant_id = ?";
        let values: Vec<Value> = vec![
            record.content.clone().into(),
            md5_hex(&record.content).into(),
            src_ip.into(),
            src_user.map(str::to_string).into(),
            time.into(),
            record.app_name_or_default().into(),
            advance.desc.clone().into(),
            advance.r#use.clone().into(),
            advance.effect.clone().into(),
            advance.r#type.clone().into(),
            advance.schema.clone().into(),
            record.data_id.clone().into(),
            record.group.clone().into(),
            record.tenant_or_default().into(),
        ];

        query::execute(conn, self.dialect(), sql, values).await
    }

    /// Write a fingerprint only if the row was not modified since `last_time`.
    pub async fn update_md5(
        &self,
        data_id: &str,
        group: &str,
        tenant: &str,
        md5: &str,
        last_time: NaiveDateTime,
    ) -> Result<u64> {
        let sql = "UPDATE config_info SET md5 = ? WHERE data_id = ? AND group_id = ? AND tenant_id = ? AND gmt_modified = ?";
        let values: Vec<Value> = vec![
            md5.into(),
            data_id.into(),
            group.into(),
            tenant_of(tenant).into(),
            last_time.into(),
        ];

        query::execute(&*self.ds.current(), self.dialect(), sql, values).await
    }

    pub async fn remove_config_info_atomic<C: ConnectionTrait>(
        &self,
        conn: &C,
        data_id: &str,
        group: &str,
        tenant: &str,
    ) -> Result<u64> {
        let sql = "DELETE FROM config_info WHERE data_id = ? AND group_id = ? AND tenant_id = ?";
        query::execute(
            conn,
            self.dialect(),
            sql,
            vec![data_id.into(), group.into(), tenant_of(tenant).into()],
        )
        .await
    }

    pub async fn remove_config_info_by_ids_atomic<C: ConnectionTrait>(
        &self,
        conn: &C,
        ids: &[i64],
    ) -> Result<u64> {
        let mut removed = 0;
        for chunk in chunked(ids, QUERY_LIMIT_SIZE) {
            let sql = format!(
                "DELETE FROM config_info WHERE id in ({})",
                placeholders(chunk.len())
            );
            removed += query::execute(conn, self.dialect(), &sql, chunk).await?;
        }
        Ok(removed)
    }

    // ========================================================================
    // Single-record lookups
    // ========================================================================

    pub async fn find_config_info_on<C: ConnectionTrait>(
        &self,
        conn: &C,
        data_id: &str,
        group: &str,
        tenant: &str,
    ) -> Result<Option<ConfigInfo>> {
        let sql = format!(
            "SELECT {} FROM config_info WHERE data_id = ? AND group_id = ? AND tenant_id = ?",
            ConfigInfo::select_list()
        );
        query::fetch_one(
            conn,
            self.dialect(),
            &sql,
            vec![data_id.into(), group.into(), tenant_of(tenant).into()],
        )
        .await
    }

    pub async fn find_config_info(
        &self,
        data_id: &str,
        group: &str,
        tenant: &str,
    ) -> Result<Option<ConfigInfo>> {
        self.find_config_info_on(&*self.ds.current(), data_id, group, tenant)
            .await
    }

    pub async fn find_config_info_by_id(&self, id: i64) -> Result<Option<ConfigInfo>> {
        let sql = format!("SELECT {} FROM config_info WHERE id = ?", ConfigInfo::select_list());
        query::fetch_one(&*self.ds.current(), self.dialect(), &sql, vec![id.into()]).await
    }

    pub async fn find_config_info_app(
        &self,
        data_id: &str,
        group: &str,
        tenant: &str,
        app_name: &str,
    ) -> Result<Option<ConfigInfo>> {
        let sql = format!(
            "SELECT {} FROM config_info WHERE data_id = ? AND group_id = ? AND tenant_id = ? AND app_name = ?",
            ConfigInfo::select_list()
        );
        query::fetch_one(
            &*self.ds.current(),
            self.dialect(),
            &sql,
            vec![
                data_id.into(),
                group.into(),
                tenant_of(tenant).into(),
                app_name.into(),
            ],
        )
        .await
    }

    /// Lookup by key, optionally narrowed by app name and tags.
    pub async fn find_config_info_advance_info(
        &self,
        data_id: &str,
        group: &str,
        tenant: &str,
        search: &ConfigSearch,
    ) -> Result<Option<ConfigInfo>> {
        let source = SearchSource::new(search.config_tags.as_deref());
        let mut w = WhereClause::new();
        w.and_eq(source.alias, "data_id", data_id)
            .and_eq(source.alias, "group_id", group)
            .and_eq(source.alias, "tenant_id", tenant_of(tenant))
            .and_eq_opt(source.alias, "app_name", search.app_name.as_deref());
        source.finish(&mut w);

        let sql = format!(
            "SELECT {} FROM {}{}",
            source.select::<ConfigInfo>(),
            source.table(),
            w.to_sql()
        );
        query::fetch_one(&*self.ds.current(), self.dialect(), &sql, w.values()).await
    }

    /// Default-namespace lookup by data id and group.
    pub async fn find_config_info_base(
        &self,
        data_id: &str,
        group: &str,
    ) -> Result<Option<ConfigInfoBase>> {
        let sql = format!(
            "SELECT {} FROM config_info WHERE data_id = ? AND group_id = ? AND tenant_id = ?",
            ConfigInfoBase::select_list()
        );
        query::fetch_one(
            &*self.ds.current(),
            self.dialect(),
            &sql,
            vec![data_id.into(), group.into(), "".into()],
        )
        .await
    }

    pub async fn find_config_advance_info(
        &self,
        data_id: &str,
        group: &str,
        tenant: &str,
    ) -> Result<Option<ConfigAdvanceInfo>> {
        let sql = format!(
            "SELECT {} FROM config_info WHERE data_id = ? AND group_id = ? AND tenant_id = ?",
            ConfigAdvanceInfo::select_list()
        );
        query::fetch_one(
            &*self.ds.current(),
            self.dialect(),
            &sql,
            vec![data_id.into(), group.into(), tenant_of(tenant).into()],
        )
        .await
    }

    pub async fn find_config_all_info(
        &self,
        data_id: &str,
        group: &str,
        tenant: &str,
    ) -> Result<Option<ConfigAllInfo>> {
        let sql = format!(
            "SELECT {} FROM config_info WHERE data_id = ? AND group_id = ? AND tenant_id = ?",
            ConfigAllInfo::select_list()
        );
        query::fetch_one(
            &*self.ds.current(),
            self.dialect(),
            &sql,
            vec![data_id.into(), group.into(), tenant_of(tenant).into()],
        )
        .await
    }

    pub async fn query_config_info(
        &self,
        data_id: &str,
        group: &str,
        tenant: &str,
    ) -> Result<Option<ConfigInfoWrapper>> {
        let sql = format!(
            "SELECT {} FROM config_info WHERE data_id = ? AND group_id = ? AND tenant_id = ?",
            ConfigInfoWrapper::select_list()
        );
        query::fetch_one(
            &*self.ds.current(),
            self.dialect(),
            &sql,
            vec![data_id.into(), group.into(), tenant_of(tenant).into()],
        )
        .await
    }

    pub async fn find_config_infos_by_ids_on<C: ConnectionTrait>(
        &self,
        conn: &C,
        ids: &[i64],
    ) -> Result<Vec<ConfigInfo>> {
        let mut result = Vec::with_capacity(ids.len());
        for chunk in chunked(ids, QUERY_LIMIT_SIZE) {
            let sql = format!(
                "SELECT {} FROM config_info WHERE id in ({})",
                ConfigInfo::select_list(),
                placeholders(chunk.len())
            );
            let rows: Vec<ConfigInfo> = query::fetch_all(conn, self.dialect(), &sql, chunk).await?;
            result.extend(rows);
        }
        Ok(result)
    }

    pub async fn find_config_infos_by_ids(&self, ids: &[i64]) -> Result<Vec<ConfigInfo>> {
        self.find_config_infos_by_ids_on(&*self.ds.current(), ids).await
    }

    /// Records of one group and tenant whose data id is in `data_ids`.
    ///
    /// The `IN` list is split into chunks of at most `sub_query_limit`, capped at 50.
    pub async fn find_config_info_by_batch(
        &self,
        data_ids: &[String],
        group: &str,
        tenant: &str,
        sub_query_limit: usize,
    ) -> Result<Vec<ConfigInfo>> {
        if data_ids.is_empty() {
            return Ok(Vec::new());
        }

        let limit = sub_query_limit.clamp(1, QUERY_LIMIT_SIZE);
        let conn = self.ds.current();
        let mut result = Vec::with_capacity(data_ids.len());

        for chunk in chunked(data_ids, limit) {
            let sql = format!(
                "SELECT {} FROM config_info WHERE group_id = ? AND tenant_id = ? AND data_id in ({})",
                ConfigInfo::select_list(),
                placeholders(chunk.len())
            );
            let mut values: Vec<Value> = vec![group.into(), tenant_of(tenant).into()];
            values.extend(chunk);
            let rows: Vec<ConfigInfo> =
                query::fetch_all(&*conn, self.dialect(), &sql, values).await?;
            result.extend(rows);
        }

        Ok(result)
    }

    // ========================================================================
    // Counts
    // ========================================================================

    pub async fn config_info_count(&self) -> Result<u64> {
        query::fetch_count(
            &*self.ds.current(),
            self.dialect(),
            "SELECT COUNT(id) FROM config_info",
            vec![],
        )
        .await
    }

    /// Count of records whose tenant matches the (possibly wildcard) pattern.
    pub async fn config_info_count_by_tenant(&self, tenant: &str) -> Result<u64> {
        let mut w = WhereClause::new();
        w.and_match(None, "tenant_id", &tenant_of(tenant));
        let sql = format!("SELECT COUNT(id) FROM config_info{}", w.to_sql());
        query::fetch_count(&*self.ds.current(), self.dialect(), &sql, w.values()).await
    }

    /// Highest assigned id, zero for an empty table.
    pub async fn find_config_max_id(&self) -> Result<i64> {
        let max = query::fetch_max(
            &*self.ds.current(),
            self.dialect(),
            "SELECT max(id) FROM config_info",
            vec![],
        )
        .await?;
        Ok(max.unwrap_or(0))
    }

    pub async fn get_tenant_id_list(&self, page: u64, page_size: u64) -> Result<Vec<String>> {
        self.distinct_column_page(
            "SELECT tenant_id FROM config_info WHERE tenant_id != '' GROUP BY tenant_id ORDER BY tenant_id LIMIT ?,?",
            page,
            page_size,
        )
        .await
    }

    pub async fn get_group_id_list(&self, page: u64, page_size: u64) -> Result<Vec<String>> {
        self.distinct_column_page(
            "SELECT group_id FROM config_info WHERE tenant_id = '' GROUP BY group_id ORDER BY group_id LIMIT ?,?",
            page,
            page_size,
        )
        .await
    }

    async fn distinct_column_page(
        &self,
        sql: &str,
        page: u64,
        page_size: u64,
    ) -> Result<Vec<String>> {
        let conn = self.ds.current();
        let helper = PaginationHelper::new(&*conn, self.dialect());
        let page: Page<SingleString> = helper
            .fetch_page_without_count(sql, vec![], page, page_size)
            .await?;
        Ok(page.page_items.into_iter().map(|s| s.0).collect())
    }

    // ========================================================================
    // Filtered pages (direct-limit form)
    // ========================================================================

    /// Exact-match page by tenant and optional data id, group, app name, tags.
    pub async fn find_config_info_4_page(
        &self,
        page_no: u64,
        page_size: u64,
        data_id: Option<&str>,
        group: Option<&str>,
        tenant: &str,
        search: &ConfigSearch,
    ) -> Result<Option<Page<ConfigInfo>>> {
        let source = SearchSource::new(search.config_tags.as_deref());
        let mut w = WhereClause::new();
        w.and_eq(source.alias, "tenant_id", tenant_of(tenant))
            .and_eq_opt(source.alias, "data_id", data_id)
            .and_eq_opt(source.alias, "group_id", group)
            .and_eq_opt(source.alias, "app_name", search.app_name.as_deref());
        source.finish(&mut w);

        self.fetch_filtered(&source, &w, page_no, page_size).await
    }

    /// Wildcard page by tenant and optional data id, group, app name, content, tags.
    pub async fn find_config_info_like_4_page(
        &self,
        page_no: u64,
        page_size: u64,
        data_id: Option<&str>,
        group: Option<&str>,
        tenant: &str,
        search: &ConfigSearch,
    ) -> Result<Option<Page<ConfigInfo>>> {
        let source = SearchSource::new(search.config_tags.as_deref());
        let mut w = WhereClause::new();
        w.and_match(source.alias, "tenant_id", &tenant_of(tenant))
            .and_fuzzy(source.alias, "data_id", data_id)
            .and_fuzzy(source.alias, "group_id", group)
            .and_eq_opt(source.alias, "app_name", search.app_name.as_deref())
            .and_fuzzy(source.alias, "content", search.content.as_deref());
        source.finish(&mut w);

        self.fetch_filtered(&source, &w, page_no, page_size).await
    }

    async fn fetch_filtered(
        &self,
        source: &SearchSource<'_>,
        w: &WhereClause,
        page_no: u64,
        page_size: u64,
    ) -> Result<Option<Page<ConfigInfo>>> {
        let count_sql = format!("SELECT COUNT(*) FROM {}{}", source.table(), w.to_sql());
        let fetch_sql = format!(
            "SELECT {} FROM {}{}{}",
            source.select::<ConfigInfo>(),
            source.table(),
            w.to_sql(),
            source.order_by()
        );

        let conn = self.ds.current();
        PaginationHelper::new(&*conn, self.dialect())
            .fetch_page(&count_sql, &fetch_sql, w.values(), page_no, page_size)
            .await
    }

    /// Default-namespace page by data id and/or group.
    pub async fn find_config_info_base_4_page(
        &self,
        page_no: u64,
        page_size: u64,
        data_id: Option<&str>,
        group: Option<&str>,
    ) -> Result<Option<Page<ConfigInfoBase>>> {
        let mut w = WhereClause::new();
        w.and_eq(None, "tenant_id", "")
            .and_eq_opt(None, "data_id", data_id)
            .and_eq_opt(None, "group_id", group);

        self.fetch_base(&w, page_no, page_size).await
    }

    /// Default-namespace wildcard page; data id and group may not both be blank.
    pub async fn find_config_info_base_like(
        &self,
        page_no: u64,
        page_size: u64,
        data_id: Option<&str>,
        group: Option<&str>,
        content: Option<&str>,
    ) -> Result<Option<Page<ConfigInfoBase>>> {
        if data_id.is_none_or(is_blank) && group.is_none_or(is_blank) {
            return Err(confstore_common::ConfStoreError::IllegalArgument(
                "invalid param: dataId and group are both blank".to_string(),
            ));
        }

        let mut w = WhereClause::new();
        w.and_eq(None, "tenant_id", "")
            .and_fuzzy(None, "data_id", data_id)
            .and_fuzzy(None, "group_id", group)
            .and_fuzzy(None, "content", content);

        self.fetch_base(&w, page_no, page_size).await
    }

    async fn fetch_base(
        &self,
        w: &WhereClause,
        page_no: u64,
        page_size: u64,
    ) -> Result<Option<Page<ConfigInfoBase>>> {
        let count_sql = format!("SELECT COUNT(*) FROM config_info{}", w.to_sql());
        let fetch_sql = format!(
            "SELECT {} FROM config_info{} order by id",
            ConfigInfoBase::select_list(),
            w.to_sql()
        );

        let conn = self.ds.current();
        PaginationHelper::new(&*conn, self.dialect())
            .fetch_page(&count_sql, &fetch_sql, w.values(), page_no, page_size)
            .await
    }

    /// Wildcard search by key fields.
    ///
    /// With both data id and group blank this is a tenant listing, narrowed
    /// by app name when one is given.
    #[allow(clippy::too_many_arguments)]
    pub async fn find_config_info_like(
        &self,
        page_no: u64,
        page_size: u64,
        data_id: Option<&str>,
        group: Option<&str>,
        tenant: &str,
        app_name: Option<&str>,
        content: Option<&str>,
    ) -> Result<Option<Page<ConfigInfo>>> {
        let keyless = data_id.is_none_or(is_blank) && group.is_none_or(is_blank);
        if keyless {
            return match app_name {
                Some(app) if !is_blank(app) => {
                    self.find_config_info_by_app(page_no, page_size, tenant, app)
                        .await
                }
                _ => self.find_all_config_info(page_no, page_size, tenant).await,
            };
        }

        let mut w = WhereClause::new();
        w.and_fuzzy(None, "data_id", data_id)
            .and_fuzzy(None, "group_id", group)
            .and_match(None, "tenant_id", &tenant_of(tenant))
            .and_eq_opt(None, "app_name", app_name)
            .and_fuzzy(None, "content", content);

        self.fetch_filtered(&SearchSource::new(None), &w, page_no, page_size)
            .await
    }

    /// Page of a tenant's records owned by `app_name`.
    pub async fn find_config_info_by_app(
        &self,
        page_no: u64,
        page_size: u64,
        tenant: &str,
        app_name: &str,
    ) -> Result<Option<Page<ConfigInfo>>> {
        let mut w = WhereClause::new();
        w.and_match(None, "tenant_id", &tenant_of(tenant))
            .and_eq(None, "app_name", app_name);

        self.fetch_filtered(&SearchSource::new(None), &w, page_no, page_size)
            .await
    }

    /// Whitelist or blacklist search over key triples.
    pub async fn find_config_info_like_by_keys(
        &self,
        page_no: u64,
        page_size: u64,
        keys: &[ConfigKey],
        blacklist: bool,
    ) -> Result<Option<Page<ConfigInfo>>> {
        check_page(page_no, page_size)?;

        let mut w = WhereClause::new();
        match build_key_filter(keys, blacklist) {
            KeyFilter::MatchNone => return Ok(Some(Page::new(0, page_no, page_size, vec![]))),
            KeyFilter::MatchAll => {}
            KeyFilter::Predicate { sql, values } => {
                w.and(sql, values);
            }
        }

        self.fetch_filtered(&SearchSource::new(None), &w, page_no, page_size)
            .await
    }

    /// Records modified in `[start, end]`.
    pub async fn find_change_config(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<ConfigInfoWrapper>> {
        let sql = format!(
            "SELECT {} FROM config_info WHERE gmt_modified >= ? AND gmt_modified <= ?",
            ConfigInfoWrapper::select_list()
        );
        query::fetch_all(
            &*self.ds.current(),
            self.dialect(),
            &sql,
            vec![start.into(), end.into()],
        )
        .await
    }

    /// Filtered change scan continuing after `last_max_id`.
    #[allow(clippy::too_many_arguments)]
    pub async fn find_change_config_page(
        &self,
        data_id: Option<&str>,
        group: Option<&str>,
        tenant: Option<&str>,
        app_name: Option<&str>,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
        page_no: u64,
        page_size: u64,
        last_max_id: i64,
    ) -> Result<Page<ConfigInfoWrapper>> {
        let mut w = WhereClause::new();
        w.and("1 = 1", vec![])
            .and_fuzzy(None, "data_id", data_id)
            .and_fuzzy(None, "group_id", group)
            .and_eq_opt(None, "tenant_id", tenant)
            .and_eq_opt(None, "app_name", app_name);
        if let Some(start) = start {
            w.and("gmt_modified >= ?", vec![start.into()]);
        }
        if let Some(end) = end {
            w.and("gmt_modified <= ?", vec![end.into()]);
        }

        let count_sql = format!("SELECT COUNT(*) FROM config_info{}", w.to_sql());
        let fetch_sql = format!(
            "SELECT {} FROM config_info{}",
            ConfigInfoWrapper::select_list(),
            w.to_sql()
        );

        let conn = self.ds.current();
        PaginationHelper::new(&*conn, self.dialect())
            .fetch_page_after(
                &count_sql,
                w.values(),
                &fetch_sql,
                w.values(),
                page_no,
                page_size,
                last_max_id,
            )
            .await
    }

    /// Distinct keys with a delete entry in the history window.
    pub async fn find_deleted_config(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<ConfigInfoChanged>> {
        let sql = format!(
            "SELECT DISTINCT {} FROM his_config_info WHERE op_type = 'D' AND gmt_modified >= ? AND gmt_modified <= ?",
            ConfigInfoChanged::select_list()
        );
        query::fetch_all(
            &*self.ds.current(),
            self.dialect(),
            &sql,
            vec![start.into(), end.into()],
        )
        .await
    }

    // ========================================================================
    // Full-table scans (subquery-limit and fragment forms)
    // ========================================================================

    fn subquery_sql<P: Projection>(filter: &str) -> String {
        format!(
            "SELECT {} FROM ( SELECT id FROM config_info{} ORDER BY id LIMIT ?,? ) g, config_info t WHERE g.id = t.id ORDER BY t.id",
            P::qualified("t"),
            filter
        )
    }

    /// Page of a tenant's records (tenant may carry wildcards).
    pub async fn find_all_config_info(
        &self,
        page_no: u64,
        page_size: u64,
        tenant: &str,
    ) -> Result<Option<Page<ConfigInfo>>> {
        let mut w = WhereClause::new();
        w.and_match(None, "tenant_id", &tenant_of(tenant));

        let count_sql = format!("SELECT COUNT(*) FROM config_info{}", w.to_sql());
        let fetch_sql = Self::subquery_sql::<ConfigInfo>(&w.to_sql());

        let conn = self.ds.current();
        PaginationHelper::new(&*conn, self.dialect())
            .fetch_page_limit(&count_sql, w.values(), &fetch_sql, w.values(), page_no, page_size)
            .await
    }

    /// Key triples of a tenant's records.
    pub async fn find_all_config_key(
        &self,
        page_no: u64,
        page_size: u64,
        tenant: &str,
    ) -> Result<Option<Page<ConfigKey>>> {
        let mut w = WhereClause::new();
        w.and_match(None, "tenant_id", &tenant_of(tenant));

        let count_sql = format!("SELECT COUNT(id) FROM config_info{}", w.to_sql());
        let fetch_sql = Self::subquery_sql::<ConfigKey>(&w.to_sql());

        let conn = self.ds.current();
        PaginationHelper::new(&*conn, self.dialect())
            .fetch_page_limit(&count_sql, w.values(), &fetch_sql, w.values(), page_no, page_size)
            .await
    }

    pub async fn find_all_config_info_base(
        &self,
        page_no: u64,
        page_size: u64,
    ) -> Result<Option<Page<ConfigInfoBase>>> {
        let conn = self.ds.current();
        PaginationHelper::new(&*conn, self.dialect())
            .fetch_page_limit(
                "SELECT COUNT(*) FROM config_info",
                vec![],
                &Self::subquery_sql::<ConfigInfoBase>(""),
                vec![],
                page_no,
                page_size,
            )
            .await
    }

    /// Page of every record with modification time, for full dumps.
    pub async fn find_all_config_info_for_dump_all(
        &self,
        page_no: u64,
        page_size: u64,
    ) -> Result<Option<Page<ConfigInfoWrapper>>> {
        let conn = self.ds.current();
        PaginationHelper::new(&*conn, self.dialect())
            .fetch_page_limit(
                "SELECT COUNT(*) FROM config_info",
                vec![],
                &Self::subquery_sql::<ConfigInfoWrapper>(""),
                vec![],
                page_no,
                page_size,
            )
            .await
    }

    /// Next `page_size` records with id greater than `last_max_id`.
    pub async fn find_all_config_info_fragment(
        &self,
        last_max_id: i64,
        page_size: u64,
    ) -> Result<Page<ConfigInfoWrapper>> {
        let sql = format!(
            "SELECT {} FROM config_info WHERE id > ? ORDER BY id ASC LIMIT ?,?",
            ConfigInfoWrapper::select_list()
        );

        let conn = self.ds.current();
        PaginationHelper::new(&*conn, self.dialect())
            .fetch_page_without_count(&sql, vec![last_max_id.into()], 1, page_size)
            .await
    }

    /// Fingerprints of one page of records, without content.
    pub async fn list_group_key_md5_by_page(
        &self,
        page_no: u64,
        page_size: u64,
    ) -> Result<Vec<ConfigInfoState>> {
        let conn = self.ds.current();
        let page: Option<Page<ConfigInfoState>> = PaginationHelper::new(&*conn, self.dialect())
            .fetch_page_limit(
                "SELECT COUNT(*) FROM config_info",
                vec![],
                &Self::subquery_sql::<ConfigInfoState>(""),
                vec![],
                page_no,
                page_size,
            )
            .await?;
        Ok(page.map(|p| p.page_items).unwrap_or_default())
    }

    /// Fingerprints of every record, read page by page.
    pub async fn list_all_group_key_md5(&self) -> Result<Vec<ConfigInfoState>> {
        let total = self.config_info_count().await?;
        let pages = page_count(total, GROUP_KEY_PAGE_SIZE);

        let mut all = Vec::with_capacity(total as usize);
        for page_no in 1..=pages {
            all.extend(
                self.list_group_key_md5_by_page(page_no, GROUP_KEY_PAGE_SIZE)
                    .await?,
            );
        }
        Ok(all)
    }

    /// Distinct (data id, group) pairs, scanned by fragments.
    pub async fn find_all_data_id_and_group(&self) -> Result<Vec<ConfigKey>> {
        let mut seen: BTreeSet<(String, String)> = BTreeSet::new();
        let mut last_max_id = 0;

        loop {
            let page = self
                .find_all_config_info_fragment(last_max_id, GROUP_KEY_PAGE_SIZE)
                .await?;
            let fetched = page.page_items.len() as u64;
            for item in page.page_items {
                last_max_id = last_max_id.max(item.id);
                seen.insert((item.data_id, item.group));
            }
            if fetched < GROUP_KEY_PAGE_SIZE {
                break;
            }
        }

        Ok(seen
            .into_iter()
            .map(|(data_id, group)| ConfigKey::new(&data_id, &group, ""))
            .collect())
    }

    /// Export rows selected by id, or by tenant and optional filters.
    pub async fn find_all_config_info_4_export(
        &self,
        data_id: Option<&str>,
        group: Option<&str>,
        tenant: &str,
        app_name: Option<&str>,
        ids: &[i64],
    ) -> Result<Vec<ConfigAllInfo>> {
        let conn = self.ds.current();

        if !ids.is_empty() {
            let mut result = Vec::with_capacity(ids.len());
            for chunk in chunked(ids, QUERY_LIMIT_SIZE) {
                let sql = format!(
                    "SELECT {} FROM config_info WHERE id in ({}) ORDER BY id",
                    ConfigAllInfo::select_list(),
                    placeholders(chunk.len())
                );
                let rows: Vec<ConfigAllInfo> =
                    query::fetch_all(&*conn, self.dialect(), &sql, chunk).await?;
                result.extend(rows);
            }
            return Ok(result);
        }

        let mut w = WhereClause::new();
        w.and_eq(None, "tenant_id", tenant_of(tenant))
            .and_fuzzy(None, "data_id", data_id)
            .and_eq_opt(None, "group_id", group)
            .and_eq_opt(None, "app_name", app_name);
        let sql = format!(
            "SELECT {} FROM config_info{} ORDER BY id",
            ConfigAllInfo::select_list(),
            w.to_sql()
        );
        query::fetch_all(&*conn, self.dialect(), &sql, w.values()).await
    }

    /// Whether `table_name` exists; any failure reads as absent.
    pub async fn is_exist_table(&self, table_name: &str) -> bool {
        let sql = self.dialect().exist_table_sql(table_name);
        let conn = self.ds.current();
        match conn
            .query_all(sea_orm::Statement::from_string(
                self.dialect().backend(),
                sql,
            ))
            .await
        {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(table = table_name, error = %e, "table existence check failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_of() {
        assert_eq!(tenant_of("  "), "");
        assert_eq!(tenant_of("dev"), "dev");
    }

    #[test]
    fn test_search_source_without_tags() {
        let source = SearchSource::new(Some(" , "));
        assert_eq!(source.table(), "config_info");
        assert_eq!(source.select::<ConfigKey>(), "app_name,data_id,group_id");
        assert_eq!(source.order_by(), " order by id");
    }

    #[test]
    fn test_search_source_with_tags() {
        let source = SearchSource::new(Some("a,b"));
        assert_eq!(source.table(), TAG_JOIN);
        assert_eq!(source.select::<ConfigKey>(), "a.app_name,a.data_id,a.group_id");

        let mut w = WhereClause::new();
        w.and_eq(source.alias, "tenant_id", "");
        source.finish(&mut w);
        assert_eq!(w.to_sql(), " where a.tenant_id = ? and b.tag_name in (?, ?)");
    }

    #[test]
    fn test_subquery_sql() {
        let sql = ConfigInfoRepository::subquery_sql::<ConfigKey>(" where tenant_id = ?");
        assert_eq!(
            sql,
            "SELECT t.app_name,t.data_id,t.group_id FROM ( SELECT id FROM config_info where tenant_id = ? ORDER BY id LIMIT ?,? ) g, config_info t WHERE g.id = t.id ORDER BY t.id"
        );
    }
}
