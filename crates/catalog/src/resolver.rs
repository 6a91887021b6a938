use tracing::debug;

use crate::config::{RegistryEntry, RegistrySource};
use crate::error::Result;
use crate::models::Registry;

/// Select the registries a request targets.
///
/// An empty filter selects every configured registry, sorted by name. A
/// non-empty filter selects the registry with exactly that name, or nothing.
/// A miss is not an error, so callers can tell an unknown registry apart from
/// an unreachable one.
pub async fn resolve_registries(
    source: &dyn RegistrySource,
    name_filter: &str,
) -> Result<Vec<Registry>> {
    let entries = resolve_entries(source, name_filter).await?;
    Ok(entries.iter().map(RegistryEntry::registry).collect())
}

/// Same selection as [`resolve_registries`], keeping each registry's
/// credentials from the same configuration read
pub async fn resolve_entries(
    source: &dyn RegistrySource,
    name_filter: &str,
) -> Result<Vec<RegistryEntry>> {
    let entries = source.load_entries().await?;

    if name_filter.is_empty() {
        let mut all = entries;
        all.sort_by(|a, b| a.name.cmp(&b.name));
        return Ok(all);
    }

    let selected: Vec<RegistryEntry> = entries
        .into_iter()
        .find(|entry| entry.name == name_filter)
        .into_iter()
        .collect();

    if selected.is_empty() {
        debug!("No registry named '{}' is configured", name_filter);
    }

    Ok(selected)
}
