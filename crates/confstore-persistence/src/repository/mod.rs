//! Table repositories
//!
//! One repository per table. Methods that can take part in a store
//! transaction accept any [`sea_orm::ConnectionTrait`] and have an `_on` or
//! `_atomic` name; the rest run against the data source's current pool.

pub mod aggr;
pub mod auth;
pub mod config_info;
pub mod config_info_beta;
pub mod config_info_tag;
pub mod history;
pub mod tags_relation;
pub mod tenant_info;

pub use aggr::AggrRepository;
pub use auth::AuthRepository;
pub use config_info::ConfigInfoRepository;
pub use config_info_beta::ConfigInfoBetaRepository;
pub use config_info_tag::ConfigInfoTagRepository;
pub use history::HistoryRepository;
pub use tags_relation::TagsRelationRepository;
pub use tenant_info::TenantInfoRepository;
