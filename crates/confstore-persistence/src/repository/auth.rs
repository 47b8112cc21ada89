//! Account bookkeeping: `users`, `roles` and `permissions`
//!
//! Single-table statements only. Nothing here joins a config store
//! transaction, so the SeaORM query builder is used directly.

use std::sync::Arc;

use sea_orm::{prelude::Expr, sea_query::Asterisk, *};

use confstore_common::{ConfStoreError, Result};

use crate::datasource::DataSource;
use crate::entity::{permissions, roles, users};
use crate::model::Page;
use crate::pagination::check_page;
use crate::projection::{PermissionInfo, RoleInfo, User};
use crate::query::db_error;

/// `SELECT COUNT(*)` over a prepared select
async fn count<E, C>(select: Select<E>, conn: &C) -> Result<u64>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    let total = select
        .select_only()
        .column_as(Expr::col(Asterisk).count(), "count")
        .into_tuple::<i64>()
        .one(conn)
        .await
        .map_err(db_error)?
        .unwrap_or_default();
    Ok(total.max(0) as u64)
}

fn to_user(m: users::Model) -> User {
    User {
        username: m.username,
        password: m.password,
    }
}

fn to_role(m: roles::Model) -> RoleInfo {
    RoleInfo {
        role: m.role,
        username: m.username,
    }
}

fn to_permission(m: permissions::Model) -> PermissionInfo {
    PermissionInfo {
        role: m.role,
        resource: m.resource,
        action: m.action,
    }
}

pub struct AuthRepository {
    ds: Arc<DataSource>,
}

impl AuthRepository {
    pub fn new(ds: Arc<DataSource>) -> Self {
        Self { ds }
    }

    // ========================================================================
    // Users
    // ========================================================================

    pub async fn create_user(&self, username: &str, password: &str) -> Result<()> {
        let entity = users::ActiveModel {
            username: Set(username.to_string()),
            password: Set(password.to_string()),
            enabled: Set(true),
        };

        users::Entity::insert(entity)
            .exec(&*self.ds.current())
            .await
            .map_err(db_error)?;
        Ok(())
    }

    pub async fn delete_user(&self, username: &str) -> Result<u64> {
        let result = users::Entity::delete_many()
            .filter(users::Column::Username.eq(username))
            .exec(&*self.ds.current())
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected)
    }

    pub async fn update_user_password(&self, username: &str, password: &str) -> Result<()> {
        let conn = self.ds.current();
        match users::Entity::find_by_id(username)
            .one(&*conn)
            .await
            .map_err(db_error)?
        {
            Some(entity) => {
                let mut user: users::ActiveModel = entity.into();
                user.password = Set(password.to_string());
                user.update(&*conn).await.map_err(db_error)?;
                Ok(())
            }
            None => Err(ConfStoreError::IllegalArgument(format!(
                "user not found: {}",
                username
            ))),
        }
    }

    pub async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&*self.ds.current())
            .await
            .map_err(db_error)?
            .map(to_user);
        Ok(user)
    }

    pub async fn get_users(&self, page_no: u64, page_size: u64) -> Result<Page<User>> {
        check_page(page_no, page_size)?;
        let conn = self.ds.current();

        let total_count = count(users::Entity::find(), &*conn).await?;
        if total_count == 0 {
            return Ok(Page::empty());
        }

        let items = users::Entity::find()
            .order_by_asc(users::Column::Username)
            .offset((page_no - 1) * page_size)
            .limit(page_size)
            .all(&*conn)
            .await
            .map_err(db_error)?
            .into_iter()
            .map(to_user)
            .collect();

        Ok(Page::new(total_count, page_no, page_size, items))
    }

    pub async fn find_user_like_username(&self, username: &str) -> Result<Vec<String>> {
        let usernames = users::Entity::find()
            .select_only()
            .column(users::Column::Username)
            .filter(users::Column::Username.like(format!("%{}%", username)))
            .into_tuple::<String>()
            .all(&*self.ds.current())
            .await
            .map_err(db_error)?;
        Ok(usernames)
    }

    // ========================================================================
    // Roles
    // ========================================================================

    pub async fn get_roles(&self, page_no: u64, page_size: u64) -> Result<Page<RoleInfo>> {
        self.role_page(None, page_no, page_size).await
    }

    pub async fn get_roles_by_user_name(
        &self,
        username: &str,
        page_no: u64,
        page_size: u64,
    ) -> Result<Page<RoleInfo>> {
        self.role_page(Some(username), page_no, page_size).await
    }

    async fn role_page(
        &self,
        username: Option<&str>,
        page_no: u64,
        page_size: u64,
    ) -> Result<Page<RoleInfo>> {
        check_page(page_no, page_size)?;
        let conn = self.ds.current();

        let mut select = roles::Entity::find();
        if let Some(username) = username.filter(|u| !u.is_empty()) {
            select = select.filter(roles::Column::Username.eq(username));
        }

        let total_count = count(select.clone(), &*conn).await?;
        if total_count == 0 {
            return Ok(Page::empty());
        }

        let items = select
            .order_by_asc(roles::Column::Role)
            .order_by_asc(roles::Column::Username)
            .offset((page_no - 1) * page_size)
            .limit(page_size)
            .all(&*conn)
            .await
            .map_err(db_error)?
            .into_iter()
            .map(to_role)
            .collect();

        Ok(Page::new(total_count, page_no, page_size, items))
    }

    pub async fn add_role(&self, role: &str, username: &str) -> Result<()> {
        let entity = roles::ActiveModel {
            role: Set(role.to_string()),
            username: Set(username.to_string()),
        };

        roles::Entity::insert(entity)
            .exec(&*self.ds.current())
            .await
            .map_err(db_error)?;
        Ok(())
    }

    pub async fn delete_role(&self, role: &str) -> Result<u64> {
        let result = roles::Entity::delete_many()
            .filter(roles::Column::Role.eq(role))
            .exec(&*self.ds.current())
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected)
    }

    pub async fn delete_role_for_user(&self, role: &str, username: &str) -> Result<u64> {
        let result = roles::Entity::delete_many()
            .filter(roles::Column::Role.eq(role))
            .filter(roles::Column::Username.eq(username))
            .exec(&*self.ds.current())
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected)
    }

    pub async fn find_roles_like_role_name(&self, role: &str) -> Result<Vec<String>> {
        let roles = roles::Entity::find()
            .select_only()
            .column(roles::Column::Role)
            .distinct()
            .filter(roles::Column::Role.like(format!("%{}%", role)))
            .into_tuple::<String>()
            .all(&*self.ds.current())
            .await
            .map_err(db_error)?;
        Ok(roles)
    }

    // ========================================================================
    // Permissions
    // ========================================================================

    pub async fn get_permissions(
        &self,
        role: &str,
        page_no: u64,
        page_size: u64,
    ) -> Result<Page<PermissionInfo>> {
        check_page(page_no, page_size)?;
        let conn = self.ds.current();

        let select = permissions::Entity::find().filter(permissions::Column::Role.eq(role));

        let total_count = count(select.clone(), &*conn).await?;
        if total_count == 0 {
            return Ok(Page::empty());
        }

        let items = select
            .order_by_asc(permissions::Column::Resource)
            .order_by_asc(permissions::Column::Action)
            .offset((page_no - 1) * page_size)
            .limit(page_size)
            .all(&*conn)
            .await
            .map_err(db_error)?
            .into_iter()
            .map(to_permission)
            .collect();

        Ok(Page::new(total_count, page_no, page_size, items))
    }

    pub async fn add_permission(&self, role: &str, resource: &str, action: &str) -> Result<()> {
        let entity = permissions::ActiveModel {
            role: Set(role.to_string()),
            resource: Set(resource.to_string()),
            action: Set(action.to_string()),
        };

        permissions::Entity::insert(entity)
            .exec(&*self.ds.current())
            .await
            .map_err(db_error)?;
        Ok(())
    }

    pub async fn delete_permission(&self, role: &str, resource: &str, action: &str) -> Result<u64> {
        let result = permissions::Entity::delete_many()
            .filter(permissions::Column::Role.eq(role))
            .filter(permissions::Column::Resource.eq(resource))
            .filter(permissions::Column::Action.eq(action))
            .exec(&*self.ds.current())
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected)
    }
}
