use std::path::PathBuf;

#[derive(clap::Parser, Debug)]
#[command(name = "devstack", about = "Browse stacks published by devfile registries")]
pub struct Cli {
    /// Path to the registry configuration file
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Inspect configured registries
    Registry {
        #[clap(subcommand)]
        command: RegistryCommands,
    },
    /// Browse stacks across registries
    Stack {
        #[clap(subcommand)]
        command: StackCommands,
    },
}

#[derive(clap::Subcommand, Debug)]
pub enum RegistryCommands {
    /// List configured registries, sorted by name
    List {
        /// Only show the registry with this exact name
        #[clap(long)]
        name: Option<String>,
    },
}

#[derive(clap::Subcommand, Debug)]
pub enum StackCommands {
    /// List stacks from every configured registry
    List {
        /// Only query the registry with this name
        #[clap(long)]
        registry: Option<String>,
        /// Only show the stack with this exact name
        #[clap(long)]
        name: Option<String>,
        /// Case-insensitive text matched against name, display name and description
        #[clap(long)]
        filter: Option<String>,
        /// Skip per-stack version details
        #[clap(long)]
        lightweight: bool,
    },
}
