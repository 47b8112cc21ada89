//! Row projections
//!
//! Every query result is decoded by one generic decoder driven by the
//! projection's [`ColumnSet`]. The same column set renders the SELECT list,
//! so the query text and the decoder never drift apart.

use chrono::NaiveDateTime;
use sea_orm::{DbErr, FromQueryResult, QueryResult};
use serde::{Deserialize, Serialize};

use crate::model::ConfigRecord;

/// Static list of column names selected for a projection
#[derive(Debug, Clone, Copy)]
pub struct ColumnSet(&'static [&'static str]);

impl ColumnSet {
    pub const fn new(columns: &'static [&'static str]) -> Self {
        Self(columns)
    }

    pub fn columns(&self) -> &'static [&'static str] {
        self.0
    }

    /// `a,b,c`
    pub fn select_list(&self) -> String {
        self.0.join(",")
    }

    /// `t.a,t.b,t.c`
    pub fn qualified(&self, alias: &str) -> String {
        self.0
            .iter()
            .map(|c| format!("{}.{}", alias, c))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// A row shape decodable from its own column set
pub trait Projection: FromQueryResult + Send + Sync + Sized + 'static {
    const COLUMNS: ColumnSet;

    fn select_list() -> String {
        Self::COLUMNS.select_list()
    }

    fn qualified(alias: &str) -> String {
        Self::COLUMNS.qualified(alias)
    }
}

macro_rules! decode_column {
    ($res:expr, $pre:expr, $col:literal, $ty:ty) => {
        $res.try_get::<$ty>($pre, $col)?
    };
    ($res:expr, $pre:expr, $col:literal, $ty:ty, nullable) => {
        $res.try_get::<Option<$ty>>($pre, $col)?.unwrap_or_default()
    };
}

/// Declare a projection struct, its column set, and its decoder in one place.
///
/// Fields marked `[nullable]` decode SQL NULL as the type's default.
/// Fields in the trailing `extra` block are not selected and start as default.
macro_rules! projection {
    (
        $(#[$meta:meta])*
        pub struct $name:ident {
            $( $(#[$fmeta:meta])* $field:ident : $ty:ty => $col:literal $([$mode:ident])? ),* $(,)?
        }
        $( extra { $( $(#[$xmeta:meta])* $xfield:ident : $xty:ty ),* $(,)? } )?
    ) => {
        $(#[$meta])*
        #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
        #[serde(rename_all = "camelCase")]
        pub struct $name {
            $( $(#[$fmeta])* pub $field: $ty, )*
            $( $( $(#[$xmeta])* pub $xfield: $xty, )* )?
        }

        impl FromQueryResult for $name {
            fn from_query_result(res: &QueryResult, pre: &str) -> Result<Self, DbErr> {
                Ok(Self {
                    $( $field: decode_column!(res, pre, $col, $ty $(, $mode)?), )*
                    $( $( $xfield: Default::default(), )* )?
                })
            }
        }

        impl Projection for $name {
            const COLUMNS: ColumnSet = ColumnSet::new(&[$($col),*]);
        }
    };
}

#[inline]
fn millis(time: &NaiveDateTime) -> i64 {
    time.and_utc().timestamp_millis()
}

projection! {
    /// Core record fields
    pub struct ConfigInfo {
        id: i64 => "id",
        data_id: String => "data_id",
        group: String => "group_id",
        tenant: String => "tenant_id" [nullable],
        app_name: String => "app_name" [nullable],
        content: String => "content" [nullable],
        md5: String => "md5" [nullable],
        r#type: String => "type" [nullable],
    }
}

impl ConfigInfo {
    /// Snapshot of this row as write-path input
    pub fn to_record(&self) -> ConfigRecord {
        ConfigRecord {
            data_id: self.data_id.clone(),
            group: self.group.clone(),
            tenant: self.tenant.clone(),
            app_name: Some(self.app_name.clone()),
            content: self.content.clone(),
        }
    }
}

projection! {
    /// Minimal record identity and content
    pub struct ConfigInfoBase {
        id: i64 => "id",
        data_id: String => "data_id",
        group: String => "group_id",
        content: String => "content" [nullable],
        md5: String => "md5" [nullable],
    }
}

projection! {
    /// Record plus modification time, used by dump and change scans
    pub struct ConfigInfoWrapper {
        id: i64 => "id",
        data_id: String => "data_id",
        group: String => "group_id",
        tenant: String => "tenant_id" [nullable],
        app_name: String => "app_name" [nullable],
        content: String => "content" [nullable],
        md5: String => "md5" [nullable],
        r#type: String => "type" [nullable],
        gmt_modified: NaiveDateTime => "gmt_modified",
    }
}

impl ConfigInfoWrapper {
    pub fn last_modified(&self) -> i64 {
        millis(&self.gmt_modified)
    }
}

projection! {
    /// Record identity and fingerprint without content
    pub struct ConfigInfoState {
        id: i64 => "id",
        data_id: String => "data_id",
        group: String => "group_id",
        tenant: String => "tenant_id" [nullable],
        app_name: String => "app_name" [nullable],
        md5: String => "md5" [nullable],
        r#type: String => "type" [nullable],
        gmt_modified: NaiveDateTime => "gmt_modified",
    }
}

impl ConfigInfoState {
    pub fn last_modified(&self) -> i64 {
        millis(&self.gmt_modified)
    }
}

projection! {
    /// Every stored column, plus the record's tags
    pub struct ConfigAllInfo {
        id: i64 => "id",
        data_id: String => "data_id",
        group: String => "group_id",
        tenant: String => "tenant_id" [nullable],
        app_name: String => "app_name" [nullable],
        content: String => "content" [nullable],
        md5: String => "md5" [nullable],
        gmt_create: NaiveDateTime => "gmt_create",
        gmt_modified: NaiveDateTime => "gmt_modified",
        create_user: String => "src_user" [nullable],
        create_ip: String => "src_ip" [nullable],
        desc: String => "c_desc" [nullable],
        r#use: String => "c_use" [nullable],
        effect: String => "effect" [nullable],
        r#type: String => "type" [nullable],
        schema: String => "c_schema" [nullable],
    }
    extra {
        config_tags: String,
    }
}

projection! {
    /// Metadata only
    pub struct ConfigAdvanceInfo {
        gmt_create: NaiveDateTime => "gmt_create",
        gmt_modified: NaiveDateTime => "gmt_modified",
        create_user: String => "src_user" [nullable],
        create_ip: String => "src_ip" [nullable],
        desc: String => "c_desc" [nullable],
        r#use: String => "c_use" [nullable],
        effect: String => "effect" [nullable],
        r#type: String => "type" [nullable],
        schema: String => "c_schema" [nullable],
    }
    extra {
        config_tags: String,
    }
}

projection! {
    /// Key triple used by export listings and whitelist/blacklist filters
    pub struct ConfigKey {
        app_name: String => "app_name" [nullable],
        data_id: String => "data_id",
        group: String => "group_id",
    }
}

impl ConfigKey {
    pub fn new(data_id: &str, group: &str, app_name: &str) -> Self {
        Self {
            app_name: app_name.to_string(),
            data_id: data_id.to_string(),
            group: group.to_string(),
        }
    }
}

projection! {
    pub struct ConfigInfoBetaWrapper {
        id: i64 => "id",
        data_id: String => "data_id",
        group: String => "group_id",
        tenant: String => "tenant_id" [nullable],
        app_name: String => "app_name" [nullable],
        content: String => "content" [nullable],
        beta_ips: String => "beta_ips" [nullable],
        md5: String => "md5" [nullable],
        gmt_modified: NaiveDateTime => "gmt_modified",
    }
}

projection! {
    pub struct ConfigInfoTagWrapper {
        id: i64 => "id",
        data_id: String => "data_id",
        group: String => "group_id",
        tenant: String => "tenant_id" [nullable],
        tag: String => "tag_id" [nullable],
        app_name: String => "app_name" [nullable],
        content: String => "content" [nullable],
        md5: String => "md5" [nullable],
        gmt_modified: NaiveDateTime => "gmt_modified",
    }
}

projection! {
    /// Full history entry
    pub struct ConfigHistoryInfo {
        nid: i64 => "nid",
        id: i64 => "id",
        data_id: String => "data_id",
        group: String => "group_id",
        tenant: String => "tenant_id" [nullable],
        app_name: String => "app_name" [nullable],
        content: String => "content" [nullable],
        md5: String => "md5" [nullable],
        src_user: String => "src_user" [nullable],
        src_ip: String => "src_ip" [nullable],
        op_type: String => "op_type" [nullable],
        created_time: NaiveDateTime => "gmt_create",
        last_modified_time: NaiveDateTime => "gmt_modified",
    }
}

projection! {
    /// History listing row without content
    pub struct ConfigHistoryBrief {
        nid: i64 => "nid",
        data_id: String => "data_id",
        group: String => "group_id",
        tenant: String => "tenant_id" [nullable],
        app_name: String => "app_name" [nullable],
        src_ip: String => "src_ip" [nullable],
        src_user: String => "src_user" [nullable],
        op_type: String => "op_type" [nullable],
        created_time: NaiveDateTime => "gmt_create",
        last_modified_time: NaiveDateTime => "gmt_modified",
    }
}

projection! {
    pub struct ConfigInfoAggr {
        id: i64 => "id",
        data_id: String => "data_id",
        group: String => "group_id",
        tenant: String => "tenant_id" [nullable],
        datum_id: String => "datum_id",
        app_name: String => "app_name" [nullable],
        content: String => "content" [nullable],
    }
}

projection! {
    /// Key triple of a changed or deleted record
    pub struct ConfigInfoChanged {
        data_id: String => "data_id",
        group: String => "group_id",
        tenant: String => "tenant_id" [nullable],
    }
}

projection! {
    pub struct TenantInfo {
        tenant_id: String => "tenant_id",
        tenant_name: String => "tenant_name" [nullable],
        tenant_desc: String => "tenant_desc" [nullable],
    }
}

projection! {
    pub struct User {
        username: String => "username",
        password: String => "password",
    }
}

projection! {
    pub struct RoleInfo {
        role: String => "role",
        username: String => "username",
    }
}

projection! {
    pub struct PermissionInfo {
        role: String => "role",
        resource: String => "resource",
        action: String => "action",
    }
}

/// One-column string rows (tenant ids, group ids, tag names, datum ids)
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SingleString(pub String);

impl FromQueryResult for SingleString {
    fn from_query_result(res: &QueryResult, _pre: &str) -> Result<Self, DbErr> {
        Ok(Self(
            res.try_get_by_index::<Option<String>>(0)?
                .unwrap_or_default(),
        ))
    }
}
