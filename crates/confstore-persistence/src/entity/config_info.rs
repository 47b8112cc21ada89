//! Configuration record entity
//!
//! One row per (dataId, group, tenant). The id is assigned on insert and never
//! changes across updates.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "config_info")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub data_id: String,
    pub group_id: String,
    /// Empty string means the default namespace
    pub tenant_id: String,
    pub app_name: Option<String>,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    pub md5: Option<String>,
    pub gmt_create: DateTime,
    pub gmt_modified: DateTime,
    #[sea_orm(column_type = "Text", nullable)]
    pub src_user: Option<String>,
    pub src_ip: Option<String>,
    pub c_desc: Option<String>,
    pub c_use: Option<String>,
    pub effect: Option<String>,
    pub r#type: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub c_schema: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
