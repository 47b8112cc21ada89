//! Embedded SQLite schema
//!
//! MySQL and PostgreSQL deployments ship their own DDL. SQLite is used for
//! local runs and tests, so its schema is installed on demand.

use sea_orm::{ConnectionTrait, DbBackend, Statement};

use confstore_common::{ConfStoreError, Result};

use crate::query::db_error;

pub const SQLITE_SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS config_info (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        data_id VARCHAR(255) NOT NULL,
        group_id VARCHAR(128) NOT NULL,
        tenant_id VARCHAR(128) NOT NULL DEFAULT '',
        app_name VARCHAR(128),
        content TEXT NOT NULL,
        md5 VARCHAR(32),
        gmt_create DATETIME NOT NULL,
        gmt_modified DATETIME NOT NULL,
        src_user TEXT,
        src_ip VARCHAR(50),
        c_desc VARCHAR(256),
        c_use VARCHAR(64),
        effect VARCHAR(64),
        type VARCHAR(64),
        c_schema TEXT,
        UNIQUE (data_id, group_id, tenant_id)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS config_info_beta (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        data_id VARCHAR(255) NOT NULL,
        group_id VARCHAR(128) NOT NULL,
        tenant_id VARCHAR(128) NOT NULL DEFAULT '',
        app_name VARCHAR(128),
        content TEXT NOT NULL,
        beta_ips VARCHAR(1024),
        md5 VARCHAR(32),
        gmt_create DATETIME NOT NULL,
        gmt_modified DATETIME NOT NULL,
        src_user TEXT,
        src_ip VARCHAR(50),
        UNIQUE (data_id, group_id, tenant_id)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS config_info_tag (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        data_id VARCHAR(255) NOT NULL,
        group_id VARCHAR(128) NOT NULL,
        tenant_id VARCHAR(128) NOT NULL DEFAULT '',
        tag_id VARCHAR(128) NOT NULL,
        app_name VARCHAR(128),
        content TEXT NOT NULL,
        md5 VARCHAR(32),
        gmt_create DATETIME NOT NULL,
        gmt_modified DATETIME NOT NULL,
        src_user TEXT,
        src_ip VARCHAR(50),
        UNIQUE (data_id, group_id, tenant_id, tag_id)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS config_tags_relation (
        id BIGINT NOT NULL,
        tag_name VARCHAR(128) NOT NULL,
        tag_type VARCHAR(64),
        data_id VARCHAR(255) NOT NULL,
        group_id VARCHAR(128) NOT NULL,
        tenant_id VARCHAR(128) NOT NULL DEFAULT '',
        nid INTEGER PRIMARY KEY AUTOINCREMENT,
        UNIQUE (id, tag_name, tag_type)
    )"#,
    "CREATE INDEX IF NOT EXISTS idx_tags_relation_tenant ON config_tags_relation (tenant_id)",
    r#"CREATE TABLE IF NOT EXISTS his_config_info (
        id BIGINT NOT NULL,
        nid INTEGER PRIMARY KEY AUTOINCREMENT,
        data_id VARCHAR(255) NOT NULL,
        group_id VARCHAR(128) NOT NULL,
        app_name VARCHAR(128),
        content TEXT NOT NULL,
        md5 VARCHAR(32),
        gmt_create DATETIME NOT NULL,
        gmt_modified DATETIME NOT NULL,
        src_user TEXT,
        src_ip VARCHAR(50),
        op_type CHAR(10),
        tenant_id VARCHAR(128) NOT NULL DEFAULT ''
    )"#,
    "CREATE INDEX IF NOT EXISTS idx_his_gmt_modified ON his_config_info (gmt_modified)",
    "CREATE INDEX IF NOT EXISTS idx_his_data_id ON his_config_info (data_id)",
    r#"CREATE TABLE IF NOT EXISTS config_info_aggr (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        data_id VARCHAR(255) NOT NULL,
        group_id VARCHAR(128) NOT NULL,
        datum_id VARCHAR(255) NOT NULL,
        content TEXT NOT NULL,
        gmt_modified DATETIME NOT NULL,
        app_name VARCHAR(128),
        tenant_id VARCHAR(128) NOT NULL DEFAULT '',
        UNIQUE (data_id, group_id, tenant_id, datum_id)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS tenant_info (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        kp VARCHAR(128) NOT NULL,
        tenant_id VARCHAR(128) NOT NULL DEFAULT '',
        tenant_name VARCHAR(128) NOT NULL DEFAULT '',
        tenant_desc VARCHAR(256),
        create_source VARCHAR(32),
        gmt_create BIGINT NOT NULL,
        gmt_modified BIGINT NOT NULL,
        UNIQUE (kp, tenant_id)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS users (
        username VARCHAR(50) NOT NULL PRIMARY KEY,
        password VARCHAR(500) NOT NULL,
        enabled BOOLEAN NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS roles (
        username VARCHAR(50) NOT NULL,
        role VARCHAR(50) NOT NULL,
        PRIMARY KEY (username, role)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS permissions (
        role VARCHAR(50) NOT NULL,
        resource VARCHAR(128) NOT NULL,
        action VARCHAR(8) NOT NULL,
        PRIMARY KEY (role, resource, action)
    )"#,
];

/// Create every table on a SQLite connection; existing tables are kept.
pub async fn install_sqlite_schema<C: ConnectionTrait>(conn: &C) -> Result<()> {
    if conn.get_database_backend() != DbBackend::Sqlite {
        return Err(ConfStoreError::IllegalArgument(
            "embedded schema is only available for sqlite".to_string(),
        ));
    }

    for ddl in SQLITE_SCHEMA {
        conn.execute(Statement::from_string(DbBackend::Sqlite, *ddl))
            .await
            .map_err(db_error)?;
    }

    tracing::info!(statements = SQLITE_SCHEMA.len(), "sqlite schema installed");
    Ok(())
}
