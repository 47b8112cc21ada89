//! Raw statement helpers
//!
//! Every hand-assembled query goes through these functions so that
//! placeholders are rendered for the active dialect and driver errors are
//! classified in one place. They are generic over [`ConnectionTrait`] and run
//! equally against a pool or an open transaction.

use sea_orm::{ConnectionTrait, DbErr, FromQueryResult, Statement, Value};

use confstore_common::{ConfStoreError, Result};

use crate::dialect::Dialect;

/// Classify a driver error, logging connectivity failures.
pub fn db_error(err: DbErr) -> ConfStoreError {
    let err = ConfStoreError::from(err);
    if err.is_connectivity() {
        tracing::error!(error = %err, "[db-error] database unreachable");
    }
    err
}

/// Build a statement with `?` placeholders rendered for the dialect.
pub fn statement(dialect: &dyn Dialect, sql: &str, values: Vec<Value>) -> Statement {
    Statement::from_sql_and_values(dialect.backend(), dialect.render(sql), values)
}

pub async fn fetch_all<T, C>(
    conn: &C,
    dialect: &dyn Dialect,
    sql: &str,
    values: Vec<Value>,
) -> Result<Vec<T>>
where
    T: FromQueryResult,
    C: ConnectionTrait,
{
    T::find_by_statement(statement(dialect, sql, values))
        .all(conn)
        .await
        .map_err(db_error)
}

pub async fn fetch_one<T, C>(
    conn: &C,
    dialect: &dyn Dialect,
    sql: &str,
    values: Vec<Value>,
) -> Result<Option<T>>
where
    T: FromQueryResult,
    C: ConnectionTrait,
{
    T::find_by_statement(statement(dialect, sql, values))
        .one(conn)
        .await
        .map_err(db_error)
}

/// First column of the first row as a count; zero when there is no row.
pub async fn fetch_count<C: ConnectionTrait>(
    conn: &C,
    dialect: &dyn Dialect,
    sql: &str,
    values: Vec<Value>,
) -> Result<u64> {
    let row = conn
        .query_one(statement(dialect, sql, values))
        .await
        .map_err(db_error)?;

    match row {
        Some(row) => {
            let count = row.try_get_by_index::<i64>(0).map_err(db_error)?;
            Ok(count.max(0) as u64)
        }
        None => Ok(0),
    }
}

/// First column of the first row as a nullable integer (`max(id)` and the like).
pub async fn fetch_max<C: ConnectionTrait>(
    conn: &C,
    dialect: &dyn Dialect,
    sql: &str,
    values: Vec<Value>,
) -> Result<Option<i64>> {
    let row = conn
        .query_one(statement(dialect, sql, values))
        .await
        .map_err(db_error)?;

    match row {
        Some(row) => row.try_get_by_index::<Option<i64>>(0).map_err(db_error),
        None => Ok(None),
    }
}

/// Execute a DML statement and return the rows affected.
pub async fn execute<C: ConnectionTrait>(
    conn: &C,
    dialect: &dyn Dialect,
    sql: &str,
    values: Vec<Value>,
) -> Result<u64> {
    let result = conn
        .execute(statement(dialect, sql, values))
        .await
        .map_err(db_error)?;
    Ok(result.rows_affected())
}

/// Split `values` into bind lists no longer than `chunk`.
pub fn chunked<T: Clone + Into<Value>>(values: &[T], chunk: usize) -> Vec<Vec<Value>> {
    values
        .chunks(chunk.max(1))
        .map(|c| c.iter().cloned().map(Into::into).collect())
        .collect()
}
