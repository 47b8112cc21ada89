//! Batch import models

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use confstore_persistence::ConfigRecord;

/// What to do when an imported item collides with an existing record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SameConfigPolicy {
    /// Stop on the first conflict, skipping the rest of the batch
    #[default]
    Abort,
    /// Skip conflicting items, continue with the others
    Skip,
    /// Overwrite existing records with imported data
    Overwrite,
}

impl Display for SameConfigPolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SameConfigPolicy::Abort => write!(f, "ABORT"),
            SameConfigPolicy::Skip => write!(f, "SKIP"),
            SameConfigPolicy::Overwrite => write!(f, "OVERWRITE"),
        }
    }
}

impl FromStr for SameConfigPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ABORT" => Ok(SameConfigPolicy::Abort),
            "SKIP" => Ok(SameConfigPolicy::Skip),
            "OVERWRITE" => Ok(SameConfigPolicy::Overwrite),
            _ => Err(format!("Invalid same config policy: {}", s)),
        }
    }
}

/// One record submitted for import
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BatchItem {
    pub data_id: String,
    pub group: String,
    pub tenant: String,
    pub app_name: Option<String>,
    pub content: String,
    /// Declared type; inferred from the data id's extension when blank
    pub r#type: Option<String>,
    pub desc: Option<String>,
}

impl BatchItem {
    pub fn new(data_id: &str, group: &str, content: &str) -> Self {
        Self {
            data_id: data_id.to_string(),
            group: group.to_string(),
            content: content.to_string(),
            ..Default::default()
        }
    }

    pub fn to_record(&self) -> ConfigRecord {
        ConfigRecord {
            data_id: self.data_id.clone(),
            group: self.group.clone(),
            tenant: self.tenant.clone(),
            app_name: self.app_name.clone(),
            content: self.content.clone(),
        }
    }

    pub fn meta(&self) -> SameConfigMeta {
        SameConfigMeta {
            data_id: self.data_id.clone(),
            group: self.group.clone(),
        }
    }
}

/// Key of an item reported as failed or skipped
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SameConfigMeta {
    pub data_id: String,
    pub group: String,
}

/// Outcome of a batch import
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BatchResult {
    pub succ_count: u64,
    pub skip_count: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fail_data: Vec<SameConfigMeta>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skip_data: Vec<SameConfigMeta>,
}

/// Published for every item the importer writes
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigChangeEvent {
    pub data_id: String,
    pub group: String,
    pub tenant: String,
    pub last_modified: NaiveDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_config_policy_parse() {
        assert_eq!("abort".parse::<SameConfigPolicy>(), Ok(SameConfigPolicy::Abort));
        assert_eq!("Skip".parse::<SameConfigPolicy>(), Ok(SameConfigPolicy::Skip));
        assert_eq!(
            "OVERWRITE".parse::<SameConfigPolicy>(),
            Ok(SameConfigPolicy::Overwrite)
        );
        assert!("merge".parse::<SameConfigPolicy>().is_err());
        assert_eq!(SameConfigPolicy::default(), SameConfigPolicy::Abort);
        assert_eq!(SameConfigPolicy::Skip.to_string(), "SKIP");
    }

    #[test]
    fn test_batch_item_deserialize_defaults() {
        let item: BatchItem =
            serde_json::from_str(r#"{"dataId":"a.yaml","group":"G","content":"x: 1"}"#).unwrap();
        assert_eq!(item.tenant, "");
        assert!(item.app_name.is_none());
        assert!(item.r#type.is_none());
        assert_eq!(item.to_record().data_id, "a.yaml");
    }

    #[test]
    fn test_batch_result_omits_empty_lists() {
        let result = BatchResult {
            succ_count: 3,
            ..Default::default()
        };
        let json = serde_json::to_string(&result).unwrap();
        assert_eq!(json, r#"{"succCount":3,"skipCount":0}"#);
    }
}
