//! Main entry point for confstore.

use std::sync::Arc;

use clap::Parser;
use tracing::info;

use confstore_persistence::ExternalConfigStore;
use confstore_server::{
    command,
    model::{Cli, Configuration},
    startup,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let configuration = Configuration::new(&cli)?;

    let logging_config = configuration.logging_config();
    let _logging_guard = startup::init_logging(&logging_config)?;

    let data_source = configuration.data_source().await?;
    info!(platform = %data_source.dialect().platform(), "Datasource ready");
    let store = Arc::new(ExternalConfigStore::new(Arc::new(data_source)));

    command::run(&configuration, cli.command.unwrap_or_default(), store).await
}
