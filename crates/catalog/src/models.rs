use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A configured registry endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registry {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub secure: bool,
}

impl Registry {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            secure: false,
        }
    }

    pub fn secure(mut self) -> Self {
        self.secure = true;
        self
    }

    /// Provenance reference carried by stacks fetched from this registry
    pub fn reference(&self) -> RegistryRef {
        RegistryRef::new(&self.name, &self.url)
    }
}

/// Credential material for a secure registry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryCredentials {
    pub token: Option<String>,
    pub ca_certificate: Option<PathBuf>,
}

impl RegistryCredentials {
    pub fn is_empty(&self) -> bool {
        self.token.is_none() && self.ca_certificate.is_none()
    }
}

/// Back-reference from a stack to the registry it was fetched from.
///
/// Only the name and URL are kept so that security settings never end up in
/// catalog data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryRef {
    pub name: String,
    pub url: String,
}

impl RegistryRef {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// A template published in a registry index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stack {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub language: String,
    pub icon: String,
    pub global_memory_limit: String,
    pub devfile_path: String,
    pub registry: RegistryRef,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub versions: Vec<StackVersion>,
}

impl Stack {
    /// Stacks are identified by their name within the registry they came from
    pub fn identity(&self) -> (&str, &str) {
        (&self.name, &self.registry.name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackVersion {
    pub version: String,
    pub schema_version: String,
    pub default: bool,
    pub starter_projects: Vec<String>,
}

/// A registry that could not contribute to a listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryFailure {
    pub registry: RegistryRef,
    pub reason: String,
}

/// Merged result of listing stacks across registries
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackListing {
    pub queried_registries: Vec<Registry>,
    pub items: Vec<Stack>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<RegistryFailure>,
}

impl StackListing {
    pub fn is_empty(&self) -> bool {
        self.queried_registries.is_empty() && self.items.is_empty()
    }
}

/// Criteria for a stack listing. Empty strings count as unset.
#[derive(Debug, Clone, Default)]
pub struct StackQuery {
    pub registry: Option<String>,
    pub name: Option<String>,
    pub text: Option<String>,
    pub lightweight: bool,
}

impl StackQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registry(mut self, registry: impl Into<String>) -> Self {
        self.registry = non_empty(registry.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = non_empty(name.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = non_empty(text.into());
        self
    }

    pub fn lightweight(mut self) -> Self {
        self.lightweight = true;
        self
    }

    pub fn registry_filter(&self) -> &str {
        self.registry.as_deref().unwrap_or_default()
    }

    pub fn name_filter(&self) -> Option<&str> {
        self.name.as_deref().filter(|name| !name.is_empty())
    }

    pub fn text_filter(&self) -> Option<&str> {
        self.text.as_deref().filter(|text| !text.is_empty())
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

/// Tunables for the catalog client
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Upper bound for a single registry round trip
    pub timeout: Duration,
    pub parallel_fetches: usize,
    pub user_agent: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            parallel_fetches: 4,
            user_agent: format!("{}/{}", crate::NAME, crate::VERSION),
        }
    }
}
