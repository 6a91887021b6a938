use thiserror::Error;

use crate::models::{Registry, RegistryFailure};

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO operation '{operation}' failed on path '{path}': {source}")]
    ConfigIo {
        operation: String,
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid configuration at '{path}': {source}")]
    ConfigParse {
        path: std::path::PathBuf,
        source: serde_json::Error,
    },

    #[error("Registry '{registry}' ({url}) is unreachable: {reason}")]
    Transport {
        registry: String,
        url: String,
        reason: String,
    },

    #[error("Registry '{registry}' ({url}) responded with status {status}")]
    Status {
        registry: String,
        url: String,
        status: u16,
    },

    #[error("Registry '{registry}' ({url}) timed out")]
    Timeout { registry: String, url: String },

    #[error("Registry '{registry}' ({url}) returned a malformed index: {source}")]
    Decode {
        registry: String,
        url: String,
        source: serde_json::Error,
    },

    #[error("Secure registry '{registry}' has unusable credentials: {reason}")]
    Credentials { registry: String, reason: String },

    #[error("{}", format_failures(.failures))]
    AllRegistriesFailed {
        queried: Vec<Registry>,
        failures: Vec<RegistryFailure>,
    },

    #[error("Operation cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, CatalogError>;

fn format_failures(failures: &[RegistryFailure]) -> String {
    let causes = failures
        .iter()
        .map(|failure| format!("  - {}", failure.reason))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "All {} queried registries failed:\n{}",
        failures.len(),
        causes
    )
}

impl CatalogError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, CatalogError::Cancelled)
    }

    /// Errors scoped to a single registry. The aggregator drops that
    /// registry's contribution and keeps going.
    pub fn is_recoverable(&self) -> bool {
        match self {
            CatalogError::Transport { .. } => true,
            CatalogError::Status { .. } => true,
            CatalogError::Timeout { .. } => true,
            CatalogError::Decode { .. } => true,
            CatalogError::Credentials { .. } => true,
            _ => false,
        }
    }

    /// Name of the registry this error is about, if it concerns exactly one.
    pub fn registry(&self) -> Option<&str> {
        match self {
            CatalogError::Transport { registry, .. }
            | CatalogError::Status { registry, .. }
            | CatalogError::Timeout { registry, .. }
            | CatalogError::Decode { registry, .. }
            | CatalogError::Credentials { registry, .. } => Some(registry),
            _ => None,
        }
    }
}
