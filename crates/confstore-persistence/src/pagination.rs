//! Pagination engine
//!
//! Offset pagination runs a count query and a bounded fetch query. Two offset
//! flavors exist: the direct-limit form appends the dialect's limit clause to
//! the fetch query, and the subquery-limit form carries `LIMIT ?,?`
//! placeholders inside an id-only subquery that is rewritten per dialect.
//! Fragment pagination scans by `id > last_max_id` without an offset.

use sea_orm::{ConnectionTrait, FromQueryResult, Value};

use confstore_common::{ConfStoreError, Result};

use crate::dialect::Dialect;
use crate::model::{Page, page_count};
use crate::query;

/// Reject non-positive page numbers and sizes, and pages whose offset does
/// not fit a signed 64-bit bind value.
pub fn check_page(page_no: u64, page_size: u64) -> Result<()> {
    if page_no == 0 || page_size == 0 {
        return Err(ConfStoreError::IllegalArgument(
            "pageNo and pageSize must be greater than zero".to_string(),
        ));
    }
    offset(page_no, page_size)?;
    limit(page_size)?;
    Ok(())
}

fn offset(page_no: u64, page_size: u64) -> Result<i64> {
    page_no
        .checked_sub(1)
        .and_then(|p| p.checked_mul(page_size))
        .and_then(|o| i64::try_from(o).ok())
        .ok_or_else(|| {
            ConfStoreError::IllegalArgument(format!(
                "page {} of size {} is out of range",
                page_no, page_size
            ))
        })
}

fn limit(page_size: u64) -> Result<i64> {
    i64::try_from(page_size).map_err(|_| {
        ConfStoreError::IllegalArgument(format!("pageSize {} is out of range", page_size))
    })
}

/// Page queries bound to one connection or transaction
pub struct PaginationHelper<'a, C> {
    conn: &'a C,
    dialect: &'a dyn Dialect,
}

impl<'a, C: ConnectionTrait> PaginationHelper<'a, C> {
    pub fn new(conn: &'a C, dialect: &'a dyn Dialect) -> Self {
        Self { conn, dialect }
    }

    /// Direct-limit form.
    ///
    /// Returns `None` when `page_no` lies beyond the available pages.
    pub async fn fetch_page<T: FromQueryResult>(
        &self,
        count_sql: &str,
        fetch_sql: &str,
        args: Vec<Value>,
        page_no: u64,
        page_size: u64,
    ) -> Result<Option<Page<T>>> {
        check_page(page_no, page_size)?;

        let total = query::fetch_count(self.conn, self.dialect, count_sql, args.clone()).await?;
        if page_no > page_count(total, page_size) {
            return Ok(None);
        }

        let sql = self.dialect.build_limit_sql(fetch_sql, page_no, page_size);
        let items = query::fetch_all(self.conn, self.dialect, &sql, args).await?;

        Ok(Some(Page::new(total, page_no, page_size, items)))
    }

    /// Subquery-limit form.
    ///
    /// `fetch_sql` carries a `LIMIT ?,?` pair; offset and size are bound after
    /// `fetch_args`.
    pub async fn fetch_page_limit<T: FromQueryResult>(
        &self,
        count_sql: &str,
        count_args: Vec<Value>,
        fetch_sql: &str,
        fetch_args: Vec<Value>,
        page_no: u64,
        page_size: u64,
    ) -> Result<Option<Page<T>>> {
        check_page(page_no, page_size)?;

        let total = query::fetch_count(self.conn, self.dialect, count_sql, count_args).await?;
        if page_no > page_count(total, page_size) {
            return Ok(None);
        }

        let mut args = fetch_args;
        args.push(offset(page_no, page_size)?.into());
        args.push(limit(page_size)?.into());

        let sql = self.dialect.replace_limit_sql(fetch_sql);
        let items = query::fetch_all(self.conn, self.dialect, &sql, args).await?;

        Ok(Some(Page::new(total, page_no, page_size, items)))
    }

    /// Subquery-limit form without a count; `total_count` is the page length.
    pub async fn fetch_page_without_count<T: FromQueryResult>(
        &self,
        fetch_sql: &str,
        fetch_args: Vec<Value>,
        page_no: u64,
        page_size: u64,
    ) -> Result<Page<T>> {
        check_page(page_no, page_size)?;

        let mut args = fetch_args;
        args.push(offset(page_no, page_size)?.into());
        args.push(limit(page_size)?.into());

        let sql = self.dialect.replace_limit_sql(fetch_sql);
        let items: Vec<T> = query::fetch_all(self.conn, self.dialect, &sql, args).await?;

        Ok(Page::new(items.len() as u64, page_no, page_size, items))
    }

    /// Direct-limit form continuing after `last_max_id` in id order.
    ///
    /// `fetch_sql` must end in a where clause; the cursor predicate and
    /// ordering are appended here. The offset always starts at zero, `page_no`
    /// is only reported back.
    #[allow(clippy::too_many_arguments)]
    pub async fn fetch_page_after<T: FromQueryResult>(
        &self,
        count_sql: &str,
        count_args: Vec<Value>,
        fetch_sql: &str,
        fetch_args: Vec<Value>,
        page_no: u64,
        page_size: u64,
        last_max_id: i64,
    ) -> Result<Page<T>> {
        check_page(page_no, page_size)?;

        let total = query::fetch_count(self.conn, self.dialect, count_sql, count_args).await?;

        let mut args = fetch_args;
        args.push(last_max_id.into());
        let sql = self.dialect.build_limit_sql(
            &format!("{} and id > ? order by id asc", fetch_sql),
            1,
            page_size,
        );
        let items = query::fetch_all(self.conn, self.dialect, &sql, args).await?;

        Ok(Page::new(total, page_no, page_size, items))
    }

    /// Execute a bounded DML statement.
    pub async fn update_limit(&self, sql: &str, args: Vec<Value>) -> Result<u64> {
        query::execute(self.conn, self.dialect, sql, args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_check_page() {
        assert!(check_page(1, 1).is_ok());
        assert!(matches!(
            check_page(0, 10),
            Err(ConfStoreError::IllegalArgument(_))
        ));
        assert!(check_page(1, 0).is_err());
    }

    #[test]
    fn test_offset() {
        assert_eq!(offset(1, 10).unwrap(), 0);
        assert_eq!(offset(4, 25).unwrap(), 75);
    }

    #[test]
    fn test_offset_out_of_range() {
        assert!(matches!(
            check_page(u64::MAX, 10),
            Err(ConfStoreError::IllegalArgument(_))
        ));
        assert!(check_page(2, u64::MAX).is_err());
        assert!(check_page(1, u64::MAX).is_err());
        assert!(check_page(1, i64::MAX as u64).is_ok());
    }

    proptest! {
        #[test]
        fn prop_pages_cover_total(total in 0u64..100_000, size in 1u64..500) {
            let pages = page_count(total, size);
            prop_assert!(pages * size >= total);
            if pages > 0 {
                prop_assert!((pages - 1) * size < total);
                prop_assert_eq!(offset(pages, size).unwrap() as u64, (pages - 1) * size);
            }
        }
    }
}
