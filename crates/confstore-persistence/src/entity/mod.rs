//! SeaORM entity definitions

pub mod prelude;

pub mod config_info;
pub mod config_info_aggr;
pub mod config_info_beta;
pub mod config_info_tag;
pub mod config_tags_relation;
pub mod his_config_info;
pub mod permissions;
pub mod roles;
pub mod tenant_info;
pub mod users;
