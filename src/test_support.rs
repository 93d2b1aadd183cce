//! Test doubles shared across unit tests.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use azure_core::credentials::{AccessToken, Secret, TokenCredential, TokenRequestOptions};
use azure_core::error::ErrorKind;
use azure_core::time::{Duration, OffsetDateTime};
use url::Url;

use crate::auth::{ClientCertificate, CredentialProvider};
use crate::config::{Config, CONFIG_TOML};
use crate::error::{ApiError, AppError, CredentialError};
use crate::graph::{DirectoryClient, DirectoryClientFactory, User, UsersPage};
use crate::keyvault::SecretStore;
use crate::secure::SecureString;

/// Embedded configuration with `pairs` applied as environment variables.
pub fn config_with(pairs: &[(&str, &str)]) -> Config {
    Config::load_from(CONFIG_TOML, pairs.iter().copied()).unwrap()
}

/// A credential with a fixed outcome that counts its token requests.
///
/// `Debug` prints only the name, so tests can tell credentials apart.
pub struct StaticCredential {
    name: &'static str,
    token: Option<String>,
    calls: AtomicUsize,
}

impl StaticCredential {
    pub fn token(name: &'static str, token: &str) -> Arc<Self> {
        Arc::new(Self {
            name,
            token: Some(token.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            token: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for StaticCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

#[async_trait]
impl TokenCredential for StaticCredential {
    async fn get_token(
        &self,
        _scopes: &[&str],
        _options: Option<TokenRequestOptions<'_>>,
    ) -> azure_core::Result<AccessToken> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.token {
            Some(token) => Ok(AccessToken::new(
                Secret::new(token.clone()),
                OffsetDateTime::now_utc() + Duration::hours(1),
            )),
            None => Err(azure_core::Error::new(
                ErrorKind::Credential,
                format!("{} authentication failed", self.name),
            )),
        }
    }
}

/// Records every construction request instead of building real credentials.
#[derive(Default)]
pub struct RecordingProvider {
    calls: Mutex<Vec<String>>,
    certificate: Mutex<Option<ClientCertificate>>,
    reject_secrets: bool,
}

impl RecordingProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A provider whose client secret credential construction always fails.
    pub fn rejecting_secrets() -> Arc<Self> {
        Arc::new(Self {
            reject_secrets: true,
            ..Self::default()
        })
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last_certificate(&self) -> Option<ClientCertificate> {
        self.certificate.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

impl CredentialProvider for RecordingProvider {
    fn managed_identity(
        &self,
        _client_id: Option<&str>,
    ) -> Result<Arc<dyn TokenCredential>, CredentialError> {
        self.record("managed_identity".to_string());
        Ok(StaticCredential::token("ManagedIdentityCredential", "mi-token"))
    }

    fn client_secret(
        &self,
        tenant_id: &str,
        client_id: &str,
        _client_secret: &SecureString,
    ) -> Result<Arc<dyn TokenCredential>, CredentialError> {
        self.record(format!("client_secret({}, {})", tenant_id, client_id));
        if self.reject_secrets {
            return Err(CredentialError::ConstructionFailed(
                "client secret rejected".to_string(),
            ));
        }
        Ok(StaticCredential::token("ClientSecretCredential", "secret-token"))
    }

    fn client_certificate(
        &self,
        tenant_id: &str,
        client_id: &str,
        certificate: &ClientCertificate,
    ) -> Result<Arc<dyn TokenCredential>, CredentialError> {
        self.record(format!("client_certificate({}, {})", tenant_id, client_id));
        *self.certificate.lock().unwrap() = Some(certificate.clone());
        Ok(StaticCredential::token(
            "ClientCertificateCredential",
            "certificate-token",
        ))
    }

    fn chained(
        &self,
        sources: Vec<Arc<dyn TokenCredential>>,
    ) -> Result<Arc<dyn TokenCredential>, CredentialError> {
        let names: Vec<String> = sources.iter().map(|s| format!("{:?}", s)).collect();
        self.record(format!("chained({})", names.join(", ")));
        Ok(StaticCredential::token("ChainedTokenCredential", "chained-token"))
    }
}

/// Directory client returning a fixed page of users.
#[derive(Debug)]
pub struct StubDirectoryClient {
    users: usize,
}

#[async_trait]
impl DirectoryClient for StubDirectoryClient {
    async fn list_users(&self) -> Result<UsersPage, AppError> {
        let value = (0..self.users)
            .map(|i| User {
                id: i.to_string(),
                display_name: Some(format!("User {}", i)),
                user_principal_name: Some(format!("user{}@contoso.com", i)),
                mail: None,
            })
            .collect();
        Ok(UsersPage {
            value,
            next_link: None,
        })
    }
}

/// Factory that counts creations and remembers which credential each used.
pub struct StubFactory {
    users: usize,
    fail_next: AtomicBool,
    creates: AtomicUsize,
    created_with: Mutex<Vec<String>>,
}

impl StubFactory {
    pub fn new(users: usize) -> Self {
        Self {
            users,
            fail_next: AtomicBool::new(false),
            creates: AtomicUsize::new(0),
            created_with: Mutex::new(Vec::new()),
        }
    }

    /// A factory whose first `create` call fails.
    pub fn failing_first(users: usize) -> Self {
        let factory = Self::new(users);
        factory.fail_next.store(true, Ordering::SeqCst);
        factory
    }

    /// Number of `create` calls, including failed ones.
    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    /// `Debug` output of each credential a client was created with.
    pub fn created_with(&self) -> Vec<String> {
        self.created_with.lock().unwrap().clone()
    }
}

impl DirectoryClientFactory for StubFactory {
    type Client = StubDirectoryClient;

    fn create(
        &self,
        credential: Arc<dyn TokenCredential>,
        _scopes: &[String],
    ) -> Result<StubDirectoryClient, AppError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(ApiError::GraphRequestFailed("transient".to_string()).into());
        }
        self.created_with.lock().unwrap().push(format!("{:?}", credential));
        Ok(StubDirectoryClient { users: self.users })
    }
}

/// Secret store returning one fixed value and recording lookups.
pub struct StubSecretStore {
    value: String,
    requests: Mutex<Vec<String>>,
}

impl StubSecretStore {
    pub fn new(value: &str) -> Arc<Self> {
        Arc::new(Self {
            value: value.to_string(),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Each lookup as `"<vault url> <name>"`.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl SecretStore for StubSecretStore {
    async fn get_secret(&self, vault_url: &Url, name: &str) -> Result<SecureString, AppError> {
        self.requests
            .lock()
            .unwrap()
            .push(format!("{} {}", vault_url, name));
        Ok(SecureString::from(self.value.as_str()))
    }
}
