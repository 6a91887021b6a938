use devstack_catalog::{CatalogManager, StackQuery};
use eyre::Result;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::print_json;
use crate::cli::StackCommands;

pub async fn handle_stack_command(
    cmd: StackCommands,
    manager: &CatalogManager,
    cancel: &CancellationToken,
) -> Result<()> {
    match cmd {
        StackCommands::List {
            registry,
            name,
            filter,
            lightweight,
        } => {
            let query = build_query(registry, name, filter, lightweight);
            let listing = manager.list_stacks(cancel, &query).await?;

            for failure in &listing.failures {
                warn!("{}", failure.reason);
            }

            print_json(&listing)
        }
    }
}

fn build_query(
    registry: Option<String>,
    name: Option<String>,
    filter: Option<String>,
    lightweight: bool,
) -> StackQuery {
    let mut query = StackQuery::new();
    if let Some(registry) = registry {
        query = query.with_registry(registry);
    }
    if let Some(name) = name {
        query = query.with_name(name);
    }
    if let Some(filter) = filter {
        query = query.with_text(filter);
    }
    if lightweight {
        query = query.lightweight();
    }
    query
}
