//! Aggregate configuration entity
//!
//! Stores aggregate configuration items grouped by dataId, groupId, and datumId.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "config_info_aggr")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Parent configuration data ID
    pub data_id: String,
    pub group_id: String,
    /// Item identifier within the parent
    pub datum_id: String,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    pub gmt_modified: DateTime,
    pub app_name: Option<String>,
    pub tenant_id: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
