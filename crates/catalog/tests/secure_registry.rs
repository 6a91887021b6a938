//! Secure registries served over TLS with a private certificate authority

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use devstack_catalog::{
    CatalogConfig, CatalogError, CatalogFile, CatalogManager, FileRegistrySource, RegistryEntry,
    StackQuery, StaticRegistries,
};
use tempfile::TempDir;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;
use tokio_rustls::rustls::ServerConfig;
use tokio_rustls::rustls::crypto::aws_lc_rs;
use tokio_rustls::rustls::pki_types::pem::PemObject;
use tokio_rustls::rustls::pki_types::{CertificateDer, PrivateKeyDer};
use tokio_util::sync::CancellationToken;

const INDEX: &str = r#"[{"name":"java-maven","displayName":"Maven Java","description":"Java application based on Maven"}]"#;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// A registry answering every request with [`INDEX`] over HTTPS, using a
/// certificate issued by `fixtures/ca.pem`
struct TlsRegistry {
    url: String,
    /// Authorization header of every request that completed a handshake
    authorizations: Arc<Mutex<Vec<Option<String>>>>,
}

impl TlsRegistry {
    async fn start() -> Self {
        let certs = CertificateDer::pem_slice_iter(include_bytes!("fixtures/registry.pem"))
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        let key = PrivateKeyDer::from_pem_slice(include_bytes!("fixtures/registry.key")).unwrap();
        let config = ServerConfig::builder_with_provider(Arc::new(aws_lc_rs::default_provider()))
            .with_safe_default_protocol_versions()
            .unwrap()
            .with_no_client_auth()
            .with_single_cert(certs, key)
            .unwrap();
        let acceptor = TlsAcceptor::from(Arc::new(config));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let authorizations = Arc::new(Mutex::new(Vec::new()));

        let seen = authorizations.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let acceptor = acceptor.clone();
                let seen = seen.clone();
                tokio::spawn(async move {
                    let Ok(mut tls) = acceptor.accept(stream).await else {
                        return;
                    };
                    let head = read_request_head(&mut tls).await;
                    seen.lock().unwrap().push(authorization(&head));

                    let response = format!(
                        "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                        INDEX.len(),
                        INDEX
                    );
                    let _ = tls.write_all(response.as_bytes()).await;
                    let _ = tls.shutdown().await;
                });
            }
        });

        Self {
            url: format!("https://127.0.0.1:{port}"),
            authorizations,
        }
    }

    fn authorizations(&self) -> Vec<Option<String>> {
        self.authorizations.lock().unwrap().clone()
    }
}

async fn read_request_head<S: AsyncRead + Unpin>(stream: &mut S) -> String {
    let mut head = Vec::new();
    let mut chunk = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => head.extend_from_slice(&chunk[..n]),
        }
    }
    String::from_utf8_lossy(&head).into_owned()
}

fn authorization(head: &str) -> Option<String> {
    head.lines().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        name.eq_ignore_ascii_case("authorization")
            .then(|| value.trim().to_string())
    })
}

fn manager(entries: Vec<RegistryEntry>) -> CatalogManager {
    CatalogManager::with_config(
        Arc::new(StaticRegistries::new(entries)),
        CatalogConfig::default(),
    )
    .unwrap()
}

#[tokio::test]
async fn test_trusted_registry_receives_token() {
    let registry = TlsRegistry::start().await;
    let manager = manager(vec![
        RegistryEntry::new("Private", &registry.url)
            .with_token("s3cret")
            .with_ca_certificate(fixture("ca.pem")),
    ]);

    let listing = manager
        .list_stacks(&CancellationToken::new(), &StackQuery::new().lightweight())
        .await
        .unwrap();

    assert!(listing.queried_registries[0].secure);
    assert!(listing.failures.is_empty());
    assert_eq!(listing.items.len(), 1);
    assert_eq!(listing.items[0].name, "java-maven");
    assert_eq!(listing.items[0].registry.url, registry.url);
    assert_eq!(
        registry.authorizations(),
        vec![Some("Bearer s3cret".to_string())]
    );
}

#[tokio::test]
async fn test_untrusted_certificate_never_sees_token() {
    let registry = TlsRegistry::start().await;
    // No CA configured: the private authority is not trusted
    let manager = manager(vec![
        RegistryEntry::new("Private", &registry.url).with_token("s3cret"),
    ]);

    let err = manager
        .list_stacks(&CancellationToken::new(), &StackQuery::new().lightweight())
        .await
        .unwrap_err();

    match err {
        CatalogError::AllRegistriesFailed { failures, .. } => {
            assert_eq!(failures[0].registry.name, "Private");
        }
        other => panic!("Expected AllRegistriesFailed, got {other:?}"),
    }
    assert!(registry.authorizations().is_empty());
}

#[tokio::test]
async fn test_invalid_ca_certificate_fails_that_registry() {
    let registry = TlsRegistry::start().await;
    let public = TlsRegistry::start().await;
    let temp_dir = TempDir::new().unwrap();
    let bogus = temp_dir.path().join("bogus.pem");
    tokio::fs::write(&bogus, "this is not a certificate").await.unwrap();

    let manager = manager(vec![
        RegistryEntry::new("Broken", &registry.url)
            .with_token("s3cret")
            .with_ca_certificate(&bogus),
        RegistryEntry::new("Trusted", &public.url).with_ca_certificate(fixture("ca.pem")),
    ]);

    let listing = manager
        .list_stacks(&CancellationToken::new(), &StackQuery::new().lightweight())
        .await
        .unwrap();

    assert_eq!(listing.items.len(), 1);
    assert_eq!(listing.items[0].registry.name, "Trusted");
    assert_eq!(listing.failures.len(), 1);
    assert_eq!(listing.failures[0].registry.name, "Broken");
    assert!(listing.failures[0].reason.contains("invalid CA certificate"));
    assert!(registry.authorizations().is_empty());
    assert_eq!(public.authorizations(), vec![None]);
}

#[tokio::test]
async fn test_credentials_from_file_reach_the_registry() {
    let registry = TlsRegistry::start().await;
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.json");
    let file = CatalogFile {
        registries: vec![
            RegistryEntry::new("Private", &registry.url)
                .with_token("from-file")
                .with_ca_certificate(fixture("ca.pem")),
        ],
    };
    tokio::fs::write(&config_path, serde_json::to_string_pretty(&file).unwrap())
        .await
        .unwrap();

    let manager = CatalogManager::with_config(
        Arc::new(FileRegistrySource::new(&config_path)),
        CatalogConfig::default(),
    )
    .unwrap();

    let listing = manager
        .list_stacks(&CancellationToken::new(), &StackQuery::new().lightweight())
        .await
        .unwrap();

    assert_eq!(listing.items.len(), 1);
    assert_eq!(
        registry.authorizations(),
        vec![Some("Bearer from-file".to_string())]
    );
}
