//! Registry index client
//!
//! One [`StackClient`] is built per process and handed to the manager. Every
//! call performs exactly one round trip against one registry; retries belong
//! to the transport, not here.

use std::collections::HashMap;

use reqwest::{Client, RequestBuilder};
use reqwest::header::ACCEPT;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use crate::error::{CatalogError, Result};
use crate::models::{CatalogConfig, Registry, RegistryCredentials, Stack, StackVersion};

pub const INDEX_PATH: &str = "index";
pub const VERSIONS_PATH: &str = "v2index";

const JSON_CONTENT: &str = "application/json";

/// Index entry as published by a registry
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndexEntry {
    name: Option<String>,
    display_name: Option<String>,
    description: Option<String>,
    tags: Option<Vec<String>>,
    language: Option<String>,
    icon: Option<String>,
    global_memory_limit: Option<String>,
    links: Option<IndexLinks>,
}

#[derive(Debug, Default, Deserialize)]
struct IndexLinks {
    #[serde(rename = "self")]
    self_link: Option<String>,
}

impl IndexEntry {
    fn into_stack(self, registry: &Registry) -> Stack {
        Stack {
            name: self.name.unwrap_or_default(),
            display_name: self.display_name.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            tags: self.tags.unwrap_or_default(),
            language: self.language.unwrap_or_default(),
            icon: self.icon.unwrap_or_default(),
            global_memory_limit: self.global_memory_limit.unwrap_or_default(),
            devfile_path: self
                .links
                .and_then(|links| links.self_link)
                .unwrap_or_default(),
            registry: registry.reference(),
            versions: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct VersionedEntry {
    name: Option<String>,
    versions: Option<Vec<VersionEntry>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VersionEntry {
    version: Option<String>,
    schema_version: Option<String>,
    default: Option<bool>,
    starter_projects: Option<Vec<String>>,
}

impl From<VersionEntry> for StackVersion {
    fn from(entry: VersionEntry) -> Self {
        StackVersion {
            version: entry.version.unwrap_or_default(),
            schema_version: entry.schema_version.unwrap_or_default(),
            default: entry.default.unwrap_or_default(),
            starter_projects: entry.starter_projects.unwrap_or_default(),
        }
    }
}

/// HTTP client for registry indexes
#[derive(Debug, Clone)]
pub struct StackClient {
    client: Client,
    /// Refuses plain HTTP, including redirects to it
    secure_client: Client,
    config: CatalogConfig,
}

impl StackClient {
    pub fn new(config: CatalogConfig) -> Result<Self> {
        let client = base_builder(&config)
            .build()
            .map_err(|e| CatalogError::Config(format!("Failed to create HTTP client: {}", e)))?;
        let secure_client = base_builder(&config)
            .https_only(true)
            .build()
            .map_err(|e| CatalogError::Config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            secure_client,
            config,
        })
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Fetch the stacks listed in a registry's index.
    ///
    /// Each stack is tagged with the registry's name and URL only.
    pub async fn fetch(
        &self,
        cancel: &CancellationToken,
        registry: &Registry,
        credentials: Option<&RegistryCredentials>,
    ) -> Result<Vec<Stack>> {
        let entries: Vec<IndexEntry> = self
            .get_json(cancel, registry, credentials, INDEX_PATH)
            .await?;

        debug!(
            "Registry '{}' lists {} stacks",
            registry.name,
            entries.len()
        );

        Ok(entries
            .into_iter()
            .map(|entry| entry.into_stack(registry))
            .collect())
    }

    /// Fetch the published versions of every stack in a registry, keyed by
    /// stack name
    pub async fn fetch_versions(
        &self,
        cancel: &CancellationToken,
        registry: &Registry,
        credentials: Option<&RegistryCredentials>,
    ) -> Result<HashMap<String, Vec<StackVersion>>> {
        let entries: Vec<VersionedEntry> = self
            .get_json(cancel, registry, credentials, VERSIONS_PATH)
            .await?;

        Ok(entries
            .into_iter()
            .filter_map(|entry| {
                let name = entry.name?;
                let versions = entry
                    .versions
                    .unwrap_or_default()
                    .into_iter()
                    .map(StackVersion::from)
                    .collect();
                Some((name, versions))
            })
            .collect())
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        cancel: &CancellationToken,
        registry: &Registry,
        credentials: Option<&RegistryCredentials>,
        resource: &str,
    ) -> Result<T> {
        let url = endpoint(registry, resource)?;
        let client = self.client_for(registry, &url, credentials).await?;
        let request = build_request(&client, url.clone(), credentials);

        debug!("Fetching {} from registry '{}'", url, registry.name);

        let exchange = async {
            let response = request
                .send()
                .await
                .map_err(|e| transport_error(registry, &e))?;

            let status = response.status();
            if !status.is_success() {
                return Err(CatalogError::Status {
                    registry: registry.name.clone(),
                    url: registry.url.clone(),
                    status: status.as_u16(),
                });
            }

            let body = response
                .bytes()
                .await
                .map_err(|e| transport_error(registry, &e))?;

            serde_json::from_slice::<T>(&body).map_err(|e| CatalogError::Decode {
                registry: registry.name.clone(),
                url: registry.url.clone(),
                source: e,
            })
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Fetch from registry '{}' cancelled", registry.name);
                Err(CatalogError::Cancelled)
            }
            outcome = tokio::time::timeout(self.config.timeout, exchange) => match outcome {
                Ok(result) => result,
                Err(_) => Err(CatalogError::Timeout {
                    registry: registry.name.clone(),
                    url: registry.url.clone(),
                }),
            },
        }
    }

    /// Unsecured registries share the default client. Secure ones must be
    /// served over HTTPS and get an HTTPS-only client, trusting the
    /// configured certificate authority when there is one.
    async fn client_for(
        &self,
        registry: &Registry,
        url: &Url,
        credentials: Option<&RegistryCredentials>,
    ) -> Result<Client> {
        if !registry.secure {
            return Ok(self.client.clone());
        }

        if url.scheme() != "https" {
            return Err(CatalogError::Credentials {
                registry: registry.name.clone(),
                reason: format!("secure registry must use an https URL, got '{}'", registry.url),
            });
        }

        let credentials = credentials.ok_or_else(|| CatalogError::Credentials {
            registry: registry.name.clone(),
            reason: "no credentials are configured".to_string(),
        })?;

        let Some(ca_path) = &credentials.ca_certificate else {
            return Ok(self.secure_client.clone());
        };

        let pem = tokio::fs::read(ca_path)
            .await
            .map_err(|e| CatalogError::Credentials {
                registry: registry.name.clone(),
                reason: format!("cannot read CA certificate '{}': {}", ca_path.display(), e),
            })?;
        let certificates = reqwest::Certificate::from_pem_bundle(&pem)
            .ok()
            .filter(|certificates| !certificates.is_empty())
            .ok_or_else(|| CatalogError::Credentials {
                registry: registry.name.clone(),
                reason: format!(
                    "invalid CA certificate '{}': no PEM certificate found",
                    ca_path.display()
                ),
            })?;

        certificates
            .into_iter()
            .fold(base_builder(&self.config).https_only(true), |builder, cert| {
                builder.add_root_certificate(cert)
            })
            .build()
            .map_err(|e| CatalogError::Credentials {
                registry: registry.name.clone(),
                reason: format!("cannot build TLS client: {}", e),
            })
    }
}

fn build_request(
    client: &Client,
    url: Url,
    credentials: Option<&RegistryCredentials>,
) -> RequestBuilder {
    let request = client.get(url).header(ACCEPT, JSON_CONTENT);
    match credentials.and_then(|c| c.token.as_deref()) {
        Some(token) => request.bearer_auth(token),
        None => request,
    }
}

fn base_builder(config: &CatalogConfig) -> reqwest::ClientBuilder {
    Client::builder()
        .timeout(config.timeout)
        .user_agent(config.user_agent.clone())
}

/// Resolve a resource below the registry's base URL
pub fn endpoint(registry: &Registry, resource: &str) -> Result<Url> {
    let mut url = Url::parse(&registry.url).map_err(|e| CatalogError::Transport {
        registry: registry.name.clone(),
        url: registry.url.clone(),
        reason: format!("invalid URL: {}", e),
    })?;

    let path = format!("{}/{}", url.path().trim_end_matches('/'), resource);
    url.set_path(&path);
    Ok(url)
}

fn transport_error(registry: &Registry, err: &reqwest::Error) -> CatalogError {
    if err.is_timeout() {
        return CatalogError::Timeout {
            registry: registry.name.clone(),
            url: registry.url.clone(),
        };
    }

    CatalogError::Transport {
        registry: registry.name.clone(),
        url: registry.url.clone(),
        reason: err.to_string(),
    }
}
