//! Domain model types for the persistence layer
//!
//! Input records passed to the write path and the generic page result.
//! Row projections returned by queries live in [`crate::projection`].

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use confstore_common::{ConfStoreError, blank_to_empty};

/// Generic paginated result
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub total_count: u64,
    pub page_number: u64,
    pub page_size: u64,
    pub pages_available: u64,
    pub page_items: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(total_count: u64, page_number: u64, page_size: u64, page_items: Vec<T>) -> Self {
        Self {
            total_count,
            page_number,
            page_size,
            pages_available: page_count(total_count, page_size),
            page_items,
        }
    }

    pub fn empty() -> Self {
        Self {
            total_count: 0,
            page_number: 0,
            page_size: 0,
            pages_available: 0,
            page_items: Vec::new(),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            total_count: self.total_count,
            page_number: self.page_number,
            page_size: self.page_size,
            pages_available: self.pages_available,
            page_items: self.page_items.into_iter().map(f).collect(),
        }
    }
}

/// ceil(total / size); zero when size is zero
#[inline]
pub fn page_count(total_count: u64, page_size: u64) -> u64 {
    if page_size == 0 {
        0
    } else {
        total_count.div_ceil(page_size)
    }
}

/// A configuration document submitted to the write path
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigRecord {
    pub data_id: String,
    pub group: String,
    #[serde(default)]
    pub tenant: String,
    /// `None` keeps the stored value on update; `Some("")` clears it.
    #[serde(default)]
    pub app_name: Option<String>,
    pub content: String,
}

impl ConfigRecord {
    pub fn new(data_id: &str, group: &str, tenant: &str, content: &str) -> Self {
        Self {
            data_id: data_id.to_string(),
            group: group.to_string(),
            tenant: tenant.to_string(),
            app_name: None,
            content: content.to_string(),
        }
    }

    pub fn with_app_name(mut self, app_name: &str) -> Self {
        self.app_name = Some(app_name.to_string());
        self
    }

    /// Tenant with blank collapsed to the default namespace
    pub fn tenant_or_default(&self) -> String {
        blank_to_empty(Some(&self.tenant))
    }

    /// App name with blank and absent collapsed to ""
    pub fn app_name_or_default(&self) -> String {
        blank_to_empty(self.app_name.as_deref())
    }
}

/// Optional metadata submitted alongside a record
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigAdvance {
    pub desc: Option<String>,
    pub r#use: Option<String>,
    pub effect: Option<String>,
    pub r#type: Option<String>,
    pub schema: Option<String>,
    /// Comma separated tags. Absent leaves tags untouched on update;
    /// present (even empty) replaces them.
    pub config_tags: Option<String>,
}

impl ConfigAdvance {
    pub fn with_tags(mut self, tags: &str) -> Self {
        self.config_tags = Some(tags.to_string());
        self
    }

    pub fn with_type(mut self, r#type: &str) -> Self {
        self.r#type = Some(r#type.to_string());
        self
    }

    pub fn with_desc(mut self, desc: &str) -> Self {
        self.desc = Some(desc.to_string());
        self
    }
}

/// Search refinements shared by the paged finders
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSearch {
    pub app_name: Option<String>,
    pub config_tags: Option<String>,
    pub content: Option<String>,
}

/// Operation recorded in the history ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpKind {
    Insert,
    Update,
    Delete,
}

impl OpKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OpKind::Insert => "I",
            OpKind::Update => "U",
            OpKind::Delete => "D",
        }
    }
}

impl Display for OpKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OpKind {
    type Err = ConfStoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "I" => Ok(OpKind::Insert),
            "U" => Ok(OpKind::Update),
            "D" => Ok(OpKind::Delete),
            other => Err(ConfStoreError::IllegalArgument(format!(
                "unknown history op type: {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_new_computes_pages() {
        let page = Page::new(21, 1, 10, vec![1, 2, 3]);
        assert_eq!(page.pages_available, 3);
        assert_eq!(page.page_size, 10);

        let page: Page<i32> = Page::new(20, 1, 10, vec![]);
        assert_eq!(page.pages_available, 2);

        let page: Page<i32> = Page::new(0, 1, 10, vec![]);
        assert_eq!(page.pages_available, 0);
    }

    #[test]
    fn test_page_zero_size() {
        assert_eq!(page_count(10, 0), 0);
    }

    #[test]
    fn test_page_empty() {
        let page: Page<String> = Page::empty();
        assert_eq!(page.total_count, 0);
        assert!(page.page_items.is_empty());
    }

    #[test]
    fn test_page_map() {
        let page = Page::new(2, 1, 10, vec![1, 2]).map(|v| v * 10);
        assert_eq!(page.page_items, vec![10, 20]);
        assert_eq!(page.total_count, 2);
    }

    #[test]
    fn test_record_defaults() {
        let record = ConfigRecord::new("app.yaml", "DEFAULT_GROUP", "  ", "a: 1");
        assert_eq!(record.tenant_or_default(), "");
        assert_eq!(record.app_name_or_default(), "");
        assert_eq!(record.with_app_name("svc").app_name_or_default(), "svc");
    }

    #[test]
    fn test_op_kind_round_trip() {
        for op in [OpKind::Insert, OpKind::Update, OpKind::Delete] {
            assert_eq!(op.as_str().parse::<OpKind>().unwrap(), op);
        }
        assert!("X".parse::<OpKind>().is_err());
    }
}
