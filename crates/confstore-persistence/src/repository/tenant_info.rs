//! `tenant_info` repository

use std::sync::Arc;

use sea_orm::{prelude::Expr, *};

use confstore_common::Result;

use crate::datasource::DataSource;
use crate::entity::tenant_info;
use crate::projection::TenantInfo;
use crate::query::db_error;

fn to_tenant(m: tenant_info::Model) -> TenantInfo {
    TenantInfo {
        tenant_id: m.tenant_id,
        tenant_name: m.tenant_name,
        tenant_desc: m.tenant_desc.unwrap_or_default(),
    }
}

/// Namespace bookkeeping keyed by (kp, tenant id)
pub struct TenantInfoRepository {
    ds: Arc<DataSource>,
}

impl TenantInfoRepository {
    pub fn new(ds: Arc<DataSource>) -> Self {
        Self { ds }
    }

    /// Register a namespace; `time` is epoch millis.
    ///
    /// A duplicate (kp, tenant id) fails with `ConstraintViolation`.
    pub async fn insert_tenant_info_atomic(
        &self,
        kp: &str,
        tenant_id: &str,
        tenant_name: &str,
        tenant_desc: &str,
        create_source: &str,
        time: i64,
    ) -> Result<()> {
        let entity = tenant_info::ActiveModel {
            kp: Set(kp.to_string()),
            tenant_id: Set(tenant_id.to_string()),
            tenant_name: Set(tenant_name.to_string()),
            tenant_desc: Set(Some(tenant_desc.to_string())),
            create_source: Set(Some(create_source.to_string())),
            gmt_create: Set(time),
            gmt_modified: Set(time),
            ..Default::default()
        };

        tenant_info::Entity::insert(entity)
            .exec(&*self.ds.current())
            .await
            .map_err(db_error)?;
        Ok(())
    }

    pub async fn update_tenant_name_atomic(
        &self,
        kp: &str,
        tenant_id: &str,
        tenant_name: &str,
        tenant_desc: &str,
        time: i64,
    ) -> Result<u64> {
        let result = tenant_info::Entity::update_many()
            .col_expr(tenant_info::Column::TenantName, Expr::value(tenant_name))
            .col_expr(tenant_info::Column::TenantDesc, Expr::value(tenant_desc))
            .col_expr(tenant_info::Column::GmtModified, Expr::value(time))
            .filter(tenant_info::Column::Kp.eq(kp))
            .filter(tenant_info::Column::TenantId.eq(tenant_id))
            .exec(&*self.ds.current())
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected)
    }

    pub async fn find_tenant_by_kp(&self, kp: &str) -> Result<Vec<TenantInfo>> {
        let tenants = tenant_info::Entity::find()
            .filter(tenant_info::Column::Kp.eq(kp))
            .order_by_asc(tenant_info::Column::Id)
            .all(&*self.ds.current())
            .await
            .map_err(db_error)?
            .into_iter()
            .map(to_tenant)
            .collect();
        Ok(tenants)
    }

    pub async fn find_tenant_by_kp_and_id(
        &self,
        kp: &str,
        tenant_id: &str,
    ) -> Result<Option<TenantInfo>> {
        let tenant = tenant_info::Entity::find()
            .filter(tenant_info::Column::Kp.eq(kp))
            .filter(tenant_info::Column::TenantId.eq(tenant_id))
            .one(&*self.ds.current())
            .await
            .map_err(db_error)?
            .map(to_tenant);
        Ok(tenant)
    }

    pub async fn remove_tenant_info_atomic(&self, kp: &str, tenant_id: &str) -> Result<u64> {
        let result = tenant_info::Entity::delete_many()
            .filter(tenant_info::Column::Kp.eq(kp))
            .filter(tenant_info::Column::TenantId.eq(tenant_id))
            .exec(&*self.ds.current())
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected)
    }

    pub async fn tenant_info_count_by_tenant_id(&self, tenant_id: &str) -> Result<u64> {
        let total = tenant_info::Entity::find()
            .filter(tenant_info::Column::TenantId.eq(tenant_id))
            .count(&*self.ds.current())
            .await
            .map_err(db_error)?;
        Ok(total)
    }
}
