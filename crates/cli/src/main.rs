mod cli;
mod commands;

use std::sync::Arc;

use clap::Parser;
use devstack_catalog::{CatalogConfig, CatalogManager, FileRegistrySource};
use tokio_util::sync::CancellationToken;

use crate::cli::Commands;
use crate::commands::{handle_registry_command, handle_stack_command};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let source = match cli.config {
        Some(path) => FileRegistrySource::new(path),
        None => FileRegistrySource::user_default()?,
    };
    tracing::debug!("Reading registries from {}", source.path().display());

    let manager = CatalogManager::with_config(Arc::new(source), CatalogConfig::default())?;

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, cancelling");
            interrupt.cancel();
        }
    });

    match cli.command {
        Commands::Registry { command } => handle_registry_command(command, &manager).await?,
        Commands::Stack { command } => handle_stack_command(command, &manager, &cancel).await?,
    }

    Ok(())
}
