//! Registry configuration sources
//!
//! The catalog never owns the list of registries. It asks a [`RegistrySource`]
//! at the start of every call, so edits made elsewhere are picked up without
//! restarting anything.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::debug;

use crate::error::{CatalogError, Result};
use crate::models::{Registry, RegistryCredentials};

/// Read access to the configured registries.
///
/// One call to [`RegistrySource::load_entries`] is one read of the
/// configuration, so a registry and its credentials always come from the same
/// snapshot. Registry names are unique within a snapshot.
#[async_trait]
pub trait RegistrySource: Send + Sync {
    /// Every configured registry with its credential material, in
    /// configuration order
    async fn load_entries(&self) -> Result<Vec<RegistryEntry>>;

    /// List every configured registry, in configuration order
    async fn list_registries(&self) -> Result<Vec<Registry>> {
        let entries = self.load_entries().await?;
        Ok(entries.iter().map(RegistryEntry::registry).collect())
    }
}

/// A single registry entry as written in a configuration document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryEntry {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub secure: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_certificate: Option<PathBuf>,
}

impl RegistryEntry {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            secure: false,
            token: None,
            ca_certificate: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.secure = true;
        self.token = Some(token.into());
        self
    }

    pub fn with_ca_certificate(mut self, path: impl Into<PathBuf>) -> Self {
        self.secure = true;
        self.ca_certificate = Some(path.into());
        self
    }

    pub fn secure(mut self) -> Self {
        self.secure = true;
        self
    }

    pub fn registry(&self) -> Registry {
        Registry {
            name: self.name.clone(),
            url: self.url.clone(),
            secure: self.secure,
        }
    }

    /// Credential material, only ever present for secure registries
    pub fn credentials(&self) -> Option<RegistryCredentials> {
        if !self.secure {
            return None;
        }
        let credentials = RegistryCredentials {
            token: self.token.clone(),
            ca_certificate: self.ca_certificate.clone(),
        };
        (!credentials.is_empty()).then_some(credentials)
    }
}

/// Top level configuration document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub registries: Vec<RegistryEntry>,
}

impl CatalogFile {
    fn validate(&self) -> Result<()> {
        validate_entries(&self.registries)
    }
}

/// Every registry needs a name, and no name may appear twice
fn validate_entries(entries: &[RegistryEntry]) -> Result<()> {
    let mut seen = HashSet::new();
    for entry in entries {
        if entry.name.is_empty() {
            return Err(CatalogError::Config(format!(
                "Registry with URL '{}' has an empty name",
                entry.url
            )));
        }
        if !seen.insert(entry.name.as_str()) {
            return Err(CatalogError::Config(format!(
                "Registry '{}' is configured more than once",
                entry.name
            )));
        }
    }
    Ok(())
}

/// In-memory registry list
#[derive(Debug, Clone, Default)]
pub struct StaticRegistries {
    entries: Vec<RegistryEntry>,
}

impl StaticRegistries {
    pub fn new(entries: Vec<RegistryEntry>) -> Self {
        Self { entries }
    }

    pub fn with_registry(mut self, entry: RegistryEntry) -> Self {
        self.entries.push(entry);
        self
    }
}

#[async_trait]
impl RegistrySource for StaticRegistries {
    async fn load_entries(&self) -> Result<Vec<RegistryEntry>> {
        validate_entries(&self.entries)?;
        Ok(self.entries.clone())
    }
}

/// Registry list read from a JSON file on every access
#[derive(Debug, Clone)]
pub struct FileRegistrySource {
    path: PathBuf,
}

impl FileRegistrySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Source backed by the per-user configuration file
    pub fn user_default() -> Result<Self> {
        Ok(Self::new(default_config_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<CatalogFile> {
        if !fs::try_exists(&self.path)
            .await
            .map_err(|e| CatalogError::ConfigIo {
                operation: "stat".to_string(),
                path: self.path.clone(),
                source: e,
            })?
        {
            debug!("No configuration at {}, using an empty registry list", self.path.display());
            return Ok(CatalogFile::default());
        }

        let content = fs::read_to_string(&self.path)
            .await
            .map_err(|e| CatalogError::ConfigIo {
                operation: "read".to_string(),
                path: self.path.clone(),
                source: e,
            })?;

        let file: CatalogFile =
            serde_json::from_str(&content).map_err(|e| CatalogError::ConfigParse {
                path: self.path.clone(),
                source: e,
            })?;
        file.validate()?;
        Ok(file)
    }
}

#[async_trait]
impl RegistrySource for FileRegistrySource {
    async fn load_entries(&self) -> Result<Vec<RegistryEntry>> {
        Ok(self.load().await?.registries)
    }
}

/// Location of the per-user configuration file
pub fn default_config_path() -> Result<PathBuf> {
    ProjectDirs::from("", "", "devstack")
        .map(|dirs| dirs.config_dir().join("config.json"))
        .ok_or_else(|| {
            CatalogError::Config("Could not determine a home directory".to_string())
        })
}
