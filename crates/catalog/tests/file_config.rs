//! Registries read from a configuration file on every call

use std::sync::Arc;

use devstack_catalog::{
    CatalogConfig, CatalogError, CatalogFile, CatalogManager, FileRegistrySource, RegistryEntry,
    StackQuery,
};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn write_config(path: &std::path::Path, registries: Vec<RegistryEntry>) {
    let file = CatalogFile { registries };
    tokio::fs::write(path, serde_json::to_string_pretty(&file).unwrap())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_configuration_changes_apply_to_next_call() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/index"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(r#"[{"name":"go","displayName":"Go"}]"#, "application/json"),
        )
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.json");
    let manager = CatalogManager::with_config(
        Arc::new(FileRegistrySource::new(&config_path)),
        CatalogConfig::default(),
    )
    .unwrap();
    let cancel = CancellationToken::new();
    let query = StackQuery::new().lightweight();

    // No file yet: nothing configured, nothing queried
    let listing = manager.list_stacks(&cancel, &query).await.unwrap();
    assert!(listing.is_empty());

    write_config(
        &config_path,
        vec![RegistryEntry::new("Local", server.uri())],
    )
    .await;

    let listing = manager.list_stacks(&cancel, &query).await.unwrap();
    assert_eq!(listing.queried_registries.len(), 1);
    assert_eq!(listing.items[0].name, "go");

    let registries = manager.resolve_registries("Local").await.unwrap();
    assert_eq!(registries[0].url, server.uri());
}

#[tokio::test]
async fn test_unreadable_configuration_is_fatal() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.json");
    tokio::fs::write(&config_path, "{ registries: ").await.unwrap();

    let manager = CatalogManager::with_config(
        Arc::new(FileRegistrySource::new(&config_path)),
        CatalogConfig::default(),
    )
    .unwrap();

    let err = manager
        .list_stacks(&CancellationToken::new(), &StackQuery::new())
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::ConfigParse { .. }));
    assert!(!err.is_recoverable());
}

#[tokio::test]
async fn test_missing_ca_certificate_fails_that_registry() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.json");
    write_config(
        &config_path,
        vec![
            RegistryEntry::new("Private", "https://127.0.0.1:9")
                .with_ca_certificate(temp_dir.path().join("missing.pem")),
        ],
    )
    .await;

    let manager = CatalogManager::with_config(
        Arc::new(FileRegistrySource::new(&config_path)),
        CatalogConfig::default(),
    )
    .unwrap();

    let err = manager
        .list_stacks(&CancellationToken::new(), &StackQuery::new())
        .await
        .unwrap_err();
    match err {
        CatalogError::AllRegistriesFailed { failures, .. } => {
            assert!(failures[0].reason.contains("CA certificate"));
        }
        other => panic!("Expected AllRegistriesFailed, got {other:?}"),
    }
}
