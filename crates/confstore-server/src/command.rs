//! Command implementations
//!
//! Commands that produce output write YAML to the given writer.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, bail};
use chrono::Utc;
use tracing::info;

use confstore_common::is_blank;
use confstore_config::service::{
    HistoryCleaner, RepairReport, batch_insert_or_update, load_batch_items, repair_fingerprints,
};
use confstore_config::{BatchResult, SameConfigPolicy};
use confstore_persistence::{
    ConfigAdvance, ConfigPersistence, ExternalConfigStore, HistoryPersistence, PersistenceService,
};

use crate::model::constants::CLI_SRC_USER;
use crate::model::{Command, Configuration};
use crate::startup::wait_for_shutdown_signal;

const CLI_SRC_IP: &str = "127.0.0.1";

/// Dispatch a parsed command
pub async fn run(
    configuration: &Configuration,
    command: Command,
    store: Arc<ExternalConfigStore>,
) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout();
    match command {
        Command::Serve => serve(configuration, store).await,
        Command::Repair => repair(&store, &mut stdout).await.map(|_| ()),
        Command::Import {
            file,
            tenant,
            policy,
        } => import(&store, &file, tenant.as_deref(), policy, &mut stdout)
            .await
            .map(|_| ()),
        Command::Export {
            tenant,
            data_id,
            group,
            app,
        } => export(
            &store,
            &tenant,
            data_id.as_deref(),
            group.as_deref(),
            app.as_deref(),
            &mut stdout,
        )
        .await
        .map(|_| ()),
    }
}

/// Probe the schema, optionally repair fingerprints, then run the history
/// cleaner until a shutdown signal arrives.
pub async fn serve(
    configuration: &Configuration,
    store: Arc<ExternalConfigStore>,
) -> anyhow::Result<()> {
    store.health_check().await.context("Database health check failed")?;
    if !store.is_exist_table("config_info").await {
        bail!("table config_info does not exist, install the schema first");
    }

    if configuration.repair_on_startup() {
        let report = repair_fingerprints(&*store).await?;
        info!(
            scanned = report.scanned,
            updated = report.updated,
            failed = report.failed,
            "Startup fingerprint repair finished"
        );
    }

    let history: Arc<dyn HistoryPersistence> = store.clone();
    let cleaner = HistoryCleaner::new(
        history,
        configuration.history_retention_days(),
        configuration.history_sweep_max_rows(),
        configuration.history_sweep_interval_secs(),
    );
    let cleaner_handle = cleaner.spawn();

    info!("confstore started");
    wait_for_shutdown_signal().await;

    cleaner_handle.abort();
    info!("confstore stopped");
    Ok(())
}

pub async fn repair<W: Write>(
    store: &ExternalConfigStore,
    out: &mut W,
) -> anyhow::Result<RepairReport> {
    let report = repair_fingerprints(store).await?;
    serde_yaml::to_writer(&mut *out, &report)?;
    Ok(report)
}

/// Import items from `file`; items without a tenant get `tenant`.
pub async fn import<W: Write>(
    store: &ExternalConfigStore,
    file: &Path,
    tenant: Option<&str>,
    policy: SameConfigPolicy,
    out: &mut W,
) -> anyhow::Result<BatchResult> {
    let mut items = load_batch_items(file)?;
    if let Some(tenant) = tenant {
        for item in items.iter_mut().filter(|i| is_blank(&i.tenant)) {
            item.tenant = tenant.to_string();
        }
    }

    info!(file = %file.display(), items = items.len(), policy = %policy, "Importing");

    let result = batch_insert_or_update(
        store,
        &items,
        Some(CLI_SRC_USER),
        CLI_SRC_IP,
        &ConfigAdvance::default(),
        Utc::now().naive_utc(),
        None,
        policy,
    )
    .await?;

    serde_yaml::to_writer(&mut *out, &result)?;
    Ok(result)
}

/// Write matching records as YAML and return how many were written.
pub async fn export<W: Write>(
    store: &ExternalConfigStore,
    tenant: &str,
    data_id: Option<&str>,
    group: Option<&str>,
    app_name: Option<&str>,
    out: &mut W,
) -> anyhow::Result<usize> {
    let rows = store
        .find_all_config_info_4_export(data_id, group, tenant, app_name, &[])
        .await?;
    serde_yaml::to_writer(&mut *out, &rows)?;
    Ok(rows.len())
}
