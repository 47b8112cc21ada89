//! Configuration history entity
//!
//! Append-only. `nid` is the system-assigned sequence, `id` references the
//! config_info id at the time of the operation.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "his_config_info")]
pub struct Model {
    pub id: i64,
    #[sea_orm(primary_key)]
    pub nid: i64,
    pub data_id: String,
    pub group_id: String,
    pub app_name: Option<String>,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    pub md5: Option<String>,
    pub gmt_create: DateTime,
    pub gmt_modified: DateTime,
    #[sea_orm(column_type = "Text", nullable)]
    pub src_user: Option<String>,
    pub src_ip: Option<String>,
    /// One of `I`, `U`, `D`
    pub op_type: Option<String>,
    pub tenant_id: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
