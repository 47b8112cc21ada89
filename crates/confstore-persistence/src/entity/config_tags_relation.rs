//! Tag index entity
//!
//! Rows are owned by a `config_info` record through `id` and are replaced
//! wholesale whenever the owning record's tags change.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "config_tags_relation")]
pub struct Model {
    /// Owning config_info id
    pub id: i64,
    pub tag_name: String,
    pub tag_type: Option<String>,
    pub data_id: String,
    pub group_id: String,
    pub tenant_id: String,
    #[sea_orm(primary_key)]
    pub nid: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
