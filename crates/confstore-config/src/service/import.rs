//! Batch import service
//!
//! Inserts a list of records in order, resolving key conflicts with a
//! [`SameConfigPolicy`].

use std::path::Path;

use anyhow::Context;
use chrono::NaiveDateTime;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info, warn};

use confstore_common::{ConfStoreError, DEFAULT_CONFIG_TYPE, Result, is_blank, is_valid};
use confstore_persistence::{ConfigAdvance, ConfigPersistence};

use crate::model::{BatchItem, BatchResult, ConfigChangeEvent, SameConfigPolicy};

/// Receives an event for every record the importer writes
pub trait ChangeNotifier: Send + Sync {
    fn notify(&self, event: ConfigChangeEvent);
}

impl ChangeNotifier for UnboundedSender<ConfigChangeEvent> {
    fn notify(&self, event: ConfigChangeEvent) {
        if let Err(e) = self.send(event) {
            debug!("change event dropped, receiver closed: {}", e.0.data_id);
        }
    }
}

/// Map a data id's file extension to a config type.
///
/// Unknown or missing extensions fall back to `text`.
pub fn infer_config_type(data_id: &str) -> &'static str {
    let Some((_, ext)) = data_id.rsplit_once('.') else {
        return DEFAULT_CONFIG_TYPE;
    };

    match ext.to_lowercase().as_str() {
        "properties" => "properties",
        "xml" => "xml",
        "json" => "json",
        "yaml" | "yml" => "yaml",
        "toml" => "toml",
        "html" | "htm" => "html",
        _ => DEFAULT_CONFIG_TYPE,
    }
}

fn check_item(index: usize, item: &BatchItem) -> Result<()> {
    if is_blank(&item.data_id) || !is_valid(&item.data_id) {
        return Err(ConfStoreError::Validation(format!(
            "item {}: invalid dataId '{}'",
            index, item.data_id
        )));
    }
    if is_blank(&item.group) || !is_valid(&item.group) {
        return Err(ConfStoreError::Validation(format!(
            "item {}: invalid group '{}'",
            index, item.group
        )));
    }
    if is_blank(&item.content) {
        return Err(ConfStoreError::Validation(format!(
            "item {}: content is blank",
            index
        )));
    }
    Ok(())
}

/// Validate every item, then insert them in order.
///
/// A conflict is resolved by `policy`:
/// - `Abort` fails the item and skips everything after it
/// - `Skip` records the item as skipped and moves on
/// - `Overwrite` updates the existing record and counts a success; if the
///   record is gone by then the item is reported as failed
///
/// One invalid item fails the whole call before anything is written.
#[allow(clippy::too_many_arguments)]
pub async fn batch_insert_or_update(
    store: &dyn ConfigPersistence,
    items: &[BatchItem],
    src_user: Option<&str>,
    src_ip: &str,
    advance: &ConfigAdvance,
    time: NaiveDateTime,
    notifier: Option<&dyn ChangeNotifier>,
    policy: SameConfigPolicy,
) -> Result<BatchResult> {
    for (i, item) in items.iter().enumerate() {
        if let Err(e) = check_item(i, item) {
            error!("data verification failed: {}", e);
            return Err(e);
        }
    }

    let mut result = BatchResult::default();

    for (i, item) in items.iter().enumerate() {
        let record = item.to_record();

        let config_type = match item.r#type.as_deref() {
            Some(t) if !is_blank(t) => t.to_string(),
            _ => infer_config_type(&item.data_id).to_string(),
        };
        let item_advance = ConfigAdvance {
            r#type: Some(config_type),
            desc: item.desc.clone(),
            ..advance.clone()
        };

        match store
            .add_config_info(src_ip, src_user, &record, &item_advance, time)
            .await
        {
            Ok(_) => {
                result.succ_count += 1;
            }
            Err(e) if e.is_constraint_violation() => match policy {
                SameConfigPolicy::Abort => {
                    result.fail_data.push(item.meta());
                    result
                        .skip_data
                        .extend(items[i + 1..].iter().map(BatchItem::meta));
                    info!(
                        data_id = %item.data_id,
                        group = %item.group,
                        skipped = items.len() - i - 1,
                        "import aborted on conflict"
                    );
                    break;
                }
                SameConfigPolicy::Skip => {
                    result.skip_count += 1;
                    result.skip_data.push(item.meta());
                    continue;
                }
                SameConfigPolicy::Overwrite => {
                    let updated = store
                        .update_config_info(src_ip, src_user, &record, &item_advance, time)
                        .await?;
                    if !updated {
                        // Conflict was reported but there is no row to overwrite
                        warn!(
                            data_id = %item.data_id,
                            group = %item.group,
                            "overwrite found no record after conflict"
                        );
                        result.fail_data.push(item.meta());
                        continue;
                    }
                    result.succ_count += 1;
                }
            },
            Err(e) => return Err(e),
        }

        if let Some(notifier) = notifier {
            notifier.notify(ConfigChangeEvent {
                data_id: item.data_id.clone(),
                group: item.group.clone(),
                tenant: record.tenant_or_default(),
                last_modified: time,
            });
        }
    }

    info!(
        succ = result.succ_count,
        skip = result.skip_count,
        fail = result.fail_data.len(),
        policy = %policy,
        "batch import finished"
    );

    Ok(result)
}

/// Read import items from a YAML or JSON file, chosen by extension.
pub fn load_batch_items(path: &Path) -> anyhow::Result<Vec<BatchItem>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read import file {}", path.display()))?;

    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    let items = if is_json {
        serde_json::from_str(&text)
            .with_context(|| format!("Invalid JSON in {}", path.display()))?
    } else {
        serde_yaml::from_str(&text)
            .with_context(|| format!("Invalid YAML in {}", path.display()))?
    };
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_infer_config_type() {
        assert_eq!(infer_config_type("app.properties"), "properties");
        assert_eq!(infer_config_type("app.yml"), "yaml");
        assert_eq!(infer_config_type("app.YAML"), "yaml");
        assert_eq!(infer_config_type("index.htm"), "html");
        assert_eq!(infer_config_type("a.b.json"), "json");
        assert_eq!(infer_config_type("Cargo.toml"), "toml");
        assert_eq!(infer_config_type("noext"), "text");
        assert_eq!(infer_config_type("archive.zip"), "text");
    }

    #[test]
    fn test_check_item() {
        assert!(check_item(0, &BatchItem::new("a.yaml", "G", "x")).is_ok());

        let err = check_item(3, &BatchItem::new("", "G", "x")).unwrap_err();
        assert!(matches!(err, ConfStoreError::Validation(_)));
        assert!(err.to_string().contains("item 3"));

        assert!(check_item(0, &BatchItem::new("a.yaml", "", "x")).is_err());
        assert!(check_item(0, &BatchItem::new("a.yaml", "G", "  ")).is_err());
        assert!(check_item(0, &BatchItem::new("a yaml", "G", "x")).is_err());
    }

    proptest! {
        #[test]
        fn test_infer_config_type_is_known(name in "[a-z]{1,8}(\\.[a-zA-Z]{0,6})?") {
            let t = infer_config_type(&name);
            prop_assert!(["properties", "xml", "json", "yaml", "toml", "html", "text"].contains(&t));
        }
    }
}
