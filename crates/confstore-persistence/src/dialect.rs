//! SQL dialect strategy
//!
//! A small strategy selected once at startup. Collaborators only rely on the
//! table existence query and the limit-clause helpers; everything else assembles
//! backend-neutral SQL with `?` placeholders and lets [`Dialect::render`]
//! adapt them.

use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use sea_orm::DbBackend;

use confstore_common::ConfStoreError;

static LIMIT_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)limit\s*\?\s*,\s*\?").expect("Invalid regex pattern"));

/// Backend-specific SQL syntax
pub trait Dialect: Send + Sync + std::fmt::Debug {
    /// Statement that succeeds only when `table_name` exists.
    fn exist_table_sql(&self, table_name: &str) -> String {
        format!("select 1 from {} limit 1", table_name)
    }

    /// Append a limit clause for the given 1-based page to `sql`.
    fn build_limit_sql(&self, sql: &str, page_no: u64, page_size: u64) -> String;

    /// Rewrite an embedded `LIMIT ?,?` (offset, count) into this dialect.
    ///
    /// Parameter order is preserved: offset first, then count.
    fn replace_limit_sql(&self, sql: &str) -> String {
        sql.to_string()
    }

    /// Adapt `?` placeholders to the backend's bind syntax.
    fn render(&self, sql: &str) -> String {
        sql.to_string()
    }

    fn backend(&self) -> DbBackend;

    fn platform(&self) -> Platform;
}

#[inline]
fn start_row(page_no: u64, page_size: u64) -> u64 {
    page_no.saturating_sub(1).saturating_mul(page_size)
}

/// MySQL: `LIMIT offset, count`
#[derive(Debug, Default, Clone, Copy)]
pub struct MySqlDialect;

impl Dialect for MySqlDialect {
    fn build_limit_sql(&self, sql: &str, page_no: u64, page_size: u64) -> String {
        format!(
            "{} limit {} , {}",
            sql,
            start_row(page_no, page_size),
            page_size
        )
    }

    fn backend(&self) -> DbBackend {
        DbBackend::MySql
    }

    fn platform(&self) -> Platform {
        Platform::MySql
    }
}

/// PostgreSQL: `LIMIT count OFFSET offset`, `$n` binds
#[derive(Debug, Default, Clone, Copy)]
pub struct PostgresDialect;

impl Dialect for PostgresDialect {
    fn build_limit_sql(&self, sql: &str, page_no: u64, page_size: u64) -> String {
        format!(
            "{} limit {} offset {}",
            sql,
            page_size,
            start_row(page_no, page_size)
        )
    }

    fn replace_limit_sql(&self, sql: &str) -> String {
        LIMIT_PLACEHOLDER
            .replace_all(sql, " OFFSET ? LIMIT ? ")
            .into_owned()
    }

    fn render(&self, sql: &str) -> String {
        let mut out = String::with_capacity(sql.len() + 16);
        let mut index = 0;
        let mut in_quote = false;
        for c in sql.chars() {
            match c {
                '\'' => {
                    in_quote = !in_quote;
                    out.push(c);
                }
                '?' if !in_quote => {
                    index += 1;
                    out.push('$');
                    out.push_str(&index.to_string());
                }
                _ => out.push(c),
            }
        }
        out
    }

    fn backend(&self) -> DbBackend {
        DbBackend::Postgres
    }

    fn platform(&self) -> Platform {
        Platform::Postgresql
    }
}

/// SQLite: accepts both `LIMIT offset, count` and `LIMIT count OFFSET offset`
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteDialect;

impl Dialect for SqliteDialect {
    fn build_limit_sql(&self, sql: &str, page_no: u64, page_size: u64) -> String {
        format!(
            "{} limit {} offset {}",
            sql,
            page_size,
            start_row(page_no, page_size)
        )
    }

    fn backend(&self) -> DbBackend {
        DbBackend::Sqlite
    }

    fn platform(&self) -> Platform {
        Platform::Sqlite
    }
}

/// Supported datasource platforms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    MySql,
    Postgresql,
    Sqlite,
}

impl Platform {
    /// Infer the platform from a connection URL scheme.
    pub fn from_url(url: &str) -> Option<Self> {
        let scheme = url.split(':').next()?.to_lowercase();
        match scheme.as_str() {
            "mysql" | "mariadb" => Some(Platform::MySql),
            "postgres" | "postgresql" => Some(Platform::Postgresql),
            "sqlite" => Some(Platform::Sqlite),
            _ => None,
        }
    }
}

impl Display for Platform {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Platform::MySql => write!(f, "mysql"),
            Platform::Postgresql => write!(f, "postgresql"),
            Platform::Sqlite => write!(f, "sqlite"),
        }
    }
}

impl FromStr for Platform {
    type Err = ConfStoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(Platform::MySql),
            "postgresql" | "postgres" | "pg" => Ok(Platform::Postgresql),
            "sqlite" => Ok(Platform::Sqlite),
            other => Err(ConfStoreError::IllegalArgument(format!(
                "unsupported datasource platform: {}",
                other
            ))),
        }
    }
}

/// Select the dialect for a configured platform.
pub fn dialect_for(platform: Platform) -> Arc<dyn Dialect> {
    match platform {
        Platform::MySql => Arc::new(MySqlDialect),
        Platform::Postgresql => Arc::new(PostgresDialect),
        Platform::Sqlite => Arc::new(SqliteDialect),
    }
}

/// Select the dialect matching an already established connection.
pub fn dialect_for_backend(backend: DbBackend) -> Arc<dyn Dialect> {
    match backend {
        DbBackend::MySql => Arc::new(MySqlDialect),
        DbBackend::Postgres => Arc::new(PostgresDialect),
        DbBackend::Sqlite => Arc::new(SqliteDialect),
    }
}
