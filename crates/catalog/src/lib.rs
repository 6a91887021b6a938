//! Devstack Catalog - merged stack listings across devfile registries
//!
//! A developer may have several registries configured, each publishing a JSON
//! index of stacks. This crate queries them concurrently and merges whatever
//! comes back into one deterministic, filterable listing. Registries that are
//! slow, down, or serving garbage only drop their own contribution.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use devstack_catalog::{
//!     CatalogConfig, CatalogManager, RegistryEntry, StackQuery, StaticRegistries,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let source = StaticRegistries::default()
//!     .with_registry(RegistryEntry::new("DefaultDevfileRegistry", "https://registry.devfile.io"));
//! let manager = CatalogManager::with_config(Arc::new(source), CatalogConfig::default())?;
//!
//! let query = StackQuery::new().with_text("python").lightweight();
//! let listing = manager.list_stacks(&CancellationToken::new(), &query).await?;
//! for stack in listing.items {
//!     println!("{} ({}) - {}", stack.name, stack.registry.name, stack.description);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod fetcher;
pub mod filter;
pub mod manager;
pub mod models;
pub mod resolver;

pub use config::{
    CatalogFile, FileRegistrySource, RegistryEntry, RegistrySource, StaticRegistries,
    default_config_path,
};
pub use error::{CatalogError, Result};
pub use fetcher::StackClient;
pub use manager::CatalogManager;
pub use models::{
    CatalogConfig, Registry, RegistryCredentials, RegistryFailure, RegistryRef, Stack,
    StackListing, StackQuery, StackVersion,
};
pub use resolver::{resolve_entries, resolve_registries};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
