//! History retention
//!
//! Deletes ledger entries older than the retention window in bounded rounds.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDateTime, Utc};
use tracing::{error, info};

use confstore_common::Result;
use confstore_persistence::HistoryPersistence;

/// Delete entries last modified before `cutoff`, `max_rows` per round.
///
/// Stops after the first round that removes fewer than `max_rows`.
pub async fn sweep_history_before(
    store: &dyn HistoryPersistence,
    cutoff: NaiveDateTime,
    max_rows: u64,
) -> Result<u64> {
    if max_rows == 0 {
        return Ok(0);
    }

    let mut total = 0;
    loop {
        let removed = store.remove_config_history(cutoff, max_rows).await?;
        total += removed;
        info!(cutoff = %cutoff, removed, total, "history sweep round");
        if removed < max_rows {
            break;
        }
    }
    Ok(total)
}

/// Delete entries older than `retention_days`.
pub async fn sweep_history(
    store: &dyn HistoryPersistence,
    retention_days: i64,
    max_rows: u64,
) -> Result<u64> {
    let cutoff = Utc::now().naive_utc() - chrono::Duration::days(retention_days);
    sweep_history_before(store, cutoff, max_rows).await
}

/// Background task running the retention sweep on a fixed interval
pub struct HistoryCleaner {
    store: Arc<dyn HistoryPersistence>,
    retention_days: i64,
    max_rows: u64,
    interval_secs: u64,
}

impl HistoryCleaner {
    pub fn new(
        store: Arc<dyn HistoryPersistence>,
        retention_days: i64,
        max_rows: u64,
        interval_secs: u64,
    ) -> Self {
        Self {
            store,
            retention_days,
            max_rows,
            interval_secs,
        }
    }

    /// Run one sweep, logging instead of returning failures
    pub async fn run_once(&self) -> u64 {
        match sweep_history(self.store.as_ref(), self.retention_days, self.max_rows).await {
            Ok(removed) => removed,
            Err(e) => {
                error!("history sweep failed: {}", e);
                0
            }
        }
    }

    /// Start the cleanup loop (runs forever)
    pub async fn start(&self) {
        info!(
            retention_days = self.retention_days,
            max_rows = self.max_rows,
            "History cleaner started with interval: {}s",
            self.interval_secs
        );
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs.max(1)));

        loop {
            interval.tick().await;
            self.run_once().await;
        }
    }

    /// Spawn [`start`](Self::start) on the runtime
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move { self.start().await })
    }
}
