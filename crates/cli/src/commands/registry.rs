use devstack_catalog::CatalogManager;
use eyre::Result;

use super::print_json;
use crate::cli::RegistryCommands;

pub async fn handle_registry_command(
    cmd: RegistryCommands,
    manager: &CatalogManager,
) -> Result<()> {
    match cmd {
        RegistryCommands::List { name } => {
            let registries = manager
                .resolve_registries(name.as_deref().unwrap_or_default())
                .await?;
            print_json(&registries)
        }
    }
}
