//! Credential strategy selection and the lazily created directory client.

use std::fmt;
use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::client::{DirectoryClientFactory, GraphClientFactory};
use crate::auth::{CredentialProvider, TokenCredential};
use crate::config::{
    Config, CredentialMode, HostEnvironment, ResolvedCredentials, CERTIFICATE_NAME_KEY,
    CLIENT_SECRET_KEY, KEY_VAULT_URL_KEY,
};
use crate::error::{AppError, ConfigError, CredentialError};
use crate::keyvault::{load_certificate, SecretStore};
use crate::secure::SecureString;

/// The identity strategy used to build the directory client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialStrategy {
    /// Managed identity only (production).
    ManagedIdentity,
    /// Managed identity first, then the app registration's client secret (development).
    ManagedIdentityThenClientSecret,
    ClientSecret,
    /// Certificate fetched from Key Vault.
    ClientCertificate,
}

impl CredentialStrategy {
    /// Pick the strategy for a configured mode and host environment.
    pub fn select(mode: CredentialMode, environment: HostEnvironment) -> Self {
        match mode {
            CredentialMode::Environment if environment.is_development() => {
                Self::ManagedIdentityThenClientSecret
            }
            CredentialMode::Environment => Self::ManagedIdentity,
            CredentialMode::ClientSecret => Self::ClientSecret,
            CredentialMode::ClientCertificate => Self::ClientCertificate,
        }
    }

    pub fn requires_client_secret(&self) -> bool {
        matches!(
            self,
            Self::ManagedIdentityThenClientSecret | Self::ClientSecret
        )
    }

    pub fn requires_certificate(&self) -> bool {
        matches!(self, Self::ClientCertificate)
    }
}

impl fmt::Display for CredentialStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ManagedIdentity => "managed identity",
            Self::ManagedIdentityThenClientSecret => "managed identity with client secret fallback",
            Self::ClientSecret => "client secret",
            Self::ClientCertificate => "client certificate",
        })
    }
}

/// Owns the one directory client of this instance.
///
/// The client is built on the first `get_client` call and reused for the
/// lifetime of the service. Concurrent first calls build it exactly once,
/// and a failed build leaves nothing cached.
pub struct GraphService<F: DirectoryClientFactory = GraphClientFactory> {
    config: Config,
    environment: HostEnvironment,
    credentials: Arc<dyn CredentialProvider>,
    secrets: Option<Arc<dyn SecretStore>>,
    factory: F,
    client: OnceCell<Arc<F::Client>>,
}

impl<F: DirectoryClientFactory> GraphService<F> {
    pub fn new(
        config: Config,
        environment: HostEnvironment,
        credentials: Arc<dyn CredentialProvider>,
        factory: F,
    ) -> Self {
        Self {
            config,
            environment,
            credentials,
            secrets: None,
            factory,
            client: OnceCell::new(),
        }
    }

    /// Secret store used to fetch the certificate for the certificate strategy.
    pub fn with_secret_store(mut self, secrets: Arc<dyn SecretStore>) -> Self {
        self.secrets = Some(secrets);
        self
    }

    /// The strategy `get_client` will use.
    pub fn strategy(&self) -> CredentialStrategy {
        CredentialStrategy::select(self.config.graph.credential, self.environment)
    }

    /// Return the cached client, creating it on first use.
    pub async fn get_client(&self) -> Result<Arc<F::Client>, AppError> {
        let client = self
            .client
            .get_or_try_init(|| self.create_client())
            .await?;
        Ok(Arc::clone(client))
    }

    async fn create_client(&self) -> Result<Arc<F::Client>, AppError> {
        let strategy = self.strategy();
        let resolved = self.config.resolve(strategy)?;
        info!("Selected {} credential", strategy);

        let credential = self.create_credential(strategy, &resolved).await?;
        let client = self.factory.create(credential, &self.config.graph.scopes)?;

        info!("Graph client created");
        Ok(Arc::new(client))
    }

    async fn create_credential(
        &self,
        strategy: CredentialStrategy,
        resolved: &ResolvedCredentials,
    ) -> Result<Arc<dyn TokenCredential>, AppError> {
        let managed_identity_client_id = resolved.managed_identity_client_id.as_deref();

        let credential = match strategy {
            CredentialStrategy::ManagedIdentity => self
                .credentials
                .managed_identity(managed_identity_client_id)?,
            CredentialStrategy::ManagedIdentityThenClientSecret => {
                let managed = self
                    .credentials
                    .managed_identity(managed_identity_client_id)?;
                let secret = self.credentials.client_secret(
                    &resolved.tenant_id,
                    &resolved.client_id,
                    client_secret(resolved)?,
                )?;
                self.credentials.chained(vec![managed, secret])?
            }
            CredentialStrategy::ClientSecret => self.credentials.client_secret(
                &resolved.tenant_id,
                &resolved.client_id,
                client_secret(resolved)?,
            )?,
            CredentialStrategy::ClientCertificate => {
                let location = resolved.certificate.as_ref().ok_or(ConfigError::Missing {
                    keys: vec![CERTIFICATE_NAME_KEY, KEY_VAULT_URL_KEY],
                })?;
                let secrets = self.secrets.as_ref().ok_or_else(|| {
                    CredentialError::ConstructionFailed(
                        "no secret store is configured for the certificate credential"
                            .to_string(),
                    )
                })?;
                debug!(
                    "Loading certificate {} from {}",
                    location.name, location.vault_url
                );
                let certificate =
                    load_certificate(secrets.as_ref(), &location.vault_url, &location.name)
                        .await?;
                self.credentials.client_certificate(
                    &resolved.tenant_id,
                    &resolved.client_id,
                    &certificate,
                )?
            }
        };

        Ok(credential)
    }
}

fn client_secret(resolved: &ResolvedCredentials) -> Result<&SecureString, ConfigError> {
    resolved.client_secret.as_ref().ok_or(ConfigError::Missing {
        keys: vec![CLIENT_SECRET_KEY],
    })
}
