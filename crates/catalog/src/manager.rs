use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::{Semaphore, SemaphorePermit};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{RegistryEntry, RegistrySource};
use crate::error::{CatalogError, Result};
use crate::fetcher::StackClient;
use crate::filter;
use crate::models::{
    CatalogConfig, Registry, RegistryCredentials, RegistryFailure, Stack, StackListing,
    StackQuery,
};
use crate::resolver;

/// Entry point for listing stacks across every configured registry
pub struct CatalogManager {
    source: Arc<dyn RegistrySource>,
    client: StackClient,
    /// Bounds the number of registry requests in flight
    fetch_semaphore: Arc<Semaphore>,
}

impl CatalogManager {
    pub fn new(source: Arc<dyn RegistrySource>, client: StackClient) -> Self {
        let fetch_semaphore = Arc::new(Semaphore::new(client.config().parallel_fetches.max(1)));

        Self {
            source,
            client,
            fetch_semaphore,
        }
    }

    /// Create a manager with its own HTTP client
    pub fn with_config(source: Arc<dyn RegistrySource>, config: CatalogConfig) -> Result<Self> {
        Ok(Self::new(source, StackClient::new(config)?))
    }

    pub fn client(&self) -> &StackClient {
        &self.client
    }

    /// Registries targeted by `name_filter`, see [`resolver::resolve_registries`]
    pub async fn resolve_registries(&self, name_filter: &str) -> Result<Vec<Registry>> {
        resolver::resolve_registries(self.source.as_ref(), name_filter).await
    }

    /// List stacks from every registry the query targets.
    ///
    /// Registries are queried concurrently and a failing registry never hides
    /// the others: as long as one registry answers, the merged listing is
    /// returned and the failures are recorded on it. Only when every registry
    /// fails is an error returned. Cancellation always wins.
    pub async fn list_stacks(
        &self,
        cancel: &CancellationToken,
        query: &StackQuery,
    ) -> Result<StackListing> {
        if cancel.is_cancelled() {
            return Err(CatalogError::Cancelled);
        }

        let entries = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(CatalogError::Cancelled),
            entries = resolver::resolve_entries(self.source.as_ref(), query.registry_filter()) => entries?,
        };
        if entries.is_empty() {
            return Ok(StackListing::default());
        }

        let targets: Vec<Registry> = entries.iter().map(RegistryEntry::registry).collect();
        let credentials: Vec<Option<RegistryCredentials>> =
            entries.iter().map(RegistryEntry::credentials).collect();

        info!("Listing stacks from {} registries", targets.len());

        let fetches = targets
            .iter()
            .zip(&credentials)
            .map(|(registry, credentials)| async move {
                let _permit = self.acquire_fetch_slot(cancel).await?;
                match self.client.fetch(cancel, registry, credentials.as_ref()).await {
                    Ok(stacks) => {
                        debug!(
                            "Registry '{}' returned {} stacks",
                            registry.name,
                            stacks.len()
                        );
                        Ok(stacks)
                    }
                    Err(e) => {
                        if !e.is_cancelled() {
                            warn!("Listing failed for registry '{}': {}", registry.name, e);
                        }
                        Err(e)
                    }
                }
            });

        let outcomes = join_all(fetches).await;

        if cancel.is_cancelled()
            || outcomes
                .iter()
                .any(|outcome| matches!(outcome, Err(e) if e.is_cancelled()))
        {
            return Err(CatalogError::Cancelled);
        }

        let mut combined = Vec::new();
        let mut failures = Vec::new();
        for (registry, outcome) in targets.iter().zip(outcomes) {
            match outcome {
                Ok(mut stacks) => combined.append(&mut stacks),
                Err(e) => failures.push(RegistryFailure {
                    registry: registry.reference(),
                    reason: e.to_string(),
                }),
            }
        }

        if failures.len() == targets.len() {
            return Err(CatalogError::AllRegistriesFailed {
                queried: targets,
                failures,
            });
        }

        let mut items = filter::apply(combined, query);

        if !query.lightweight {
            self.enrich(cancel, &targets, &credentials, &mut items)
                .await?;
        }

        info!(
            "Found {} stacks ({} of {} registries answered)",
            items.len(),
            targets.len() - failures.len(),
            targets.len()
        );

        Ok(StackListing {
            queried_registries: targets,
            items,
            failures,
        })
    }

    /// Attach version details to the surviving stacks. One request per
    /// registry that still contributes stacks; a failed request leaves that
    /// registry's stacks as they are.
    async fn enrich(
        &self,
        cancel: &CancellationToken,
        targets: &[Registry],
        credentials: &[Option<RegistryCredentials>],
        items: &mut [Stack],
    ) -> Result<()> {
        let lookups = targets
            .iter()
            .zip(credentials)
            .filter(|(registry, _)| items.iter().any(|s| s.registry.name == registry.name))
            .map(|(registry, credentials)| async move {
                let _permit = self.acquire_fetch_slot(cancel).await?;
                let versions = self
                    .client
                    .fetch_versions(cancel, registry, credentials.as_ref())
                    .await;
                Ok::<_, CatalogError>((registry, versions))
            });

        for lookup in join_all(lookups).await {
            let (registry, versions) = lookup?;
            match versions {
                Ok(versions) => {
                    for stack in items
                        .iter_mut()
                        .filter(|s| s.registry.name == registry.name)
                    {
                        if let Some(found) = versions.get(&stack.name) {
                            stack.versions = found.clone();
                        }
                    }
                }
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => {
                    warn!(
                        "Skipping version details for registry '{}': {}",
                        registry.name, e
                    );
                }
            }
        }

        Ok(())
    }

    async fn acquire_fetch_slot(&self, cancel: &CancellationToken) -> Result<SemaphorePermit<'_>> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(CatalogError::Cancelled),
            permit = self.fetch_semaphore.acquire() => {
                permit.map_err(|_| CatalogError::Cancelled)
            }
        }
    }
}
