//! Credential constructors behind a trait, so strategy selection can be
//! exercised without touching the network.

use std::sync::Arc;

use azure_core::credentials::{Secret, TokenCredential};
use azure_identity::{
    ClientCertificateCredential, ClientCertificateCredentialOptions, ClientSecretCredential, ManagedIdentityCredential,
    ManagedIdentityCredentialOptions, UserAssignedId,
};
use tracing::debug;

use super::certificate::ClientCertificate;
use super::chained::ChainedTokenCredential;
use crate::error::CredentialError;
use crate::secure::SecureString;

/// Builds token credentials for each identity strategy.
pub trait CredentialProvider: Send + Sync {
    /// System-assigned identity, or the user-assigned identity `client_id`.
    fn managed_identity(
        &self,
        client_id: Option<&str>,
    ) -> Result<Arc<dyn TokenCredential>, CredentialError>;

    fn client_secret(
        &self,
        tenant_id: &str,
        client_id: &str,
        client_secret: &SecureString,
    ) -> Result<Arc<dyn TokenCredential>, CredentialError>;

    fn client_certificate(
        &self,
        tenant_id: &str,
        client_id: &str,
        certificate: &ClientCertificate,
    ) -> Result<Arc<dyn TokenCredential>, CredentialError>;

    fn chained(
        &self,
        sources: Vec<Arc<dyn TokenCredential>>,
    ) -> Result<Arc<dyn TokenCredential>, CredentialError>;
}

/// Production provider backed by `azure_identity`.
#[derive(Debug, Default, Clone, Copy)]
pub struct AzureCredentialProvider;

impl AzureCredentialProvider {
    pub fn new() -> Self {
        Self
    }
}

fn construction_failed(e: azure_core::Error) -> CredentialError {
    CredentialError::ConstructionFailed(e.to_string())
}

impl CredentialProvider for AzureCredentialProvider {
    fn managed_identity(
        &self,
        client_id: Option<&str>,
    ) -> Result<Arc<dyn TokenCredential>, CredentialError> {
        let options = ManagedIdentityCredentialOptions {
            user_assigned_id: client_id.map(|id| UserAssignedId::ClientId(id.to_string())),
            ..Default::default()
        };
        debug!(
            "Creating managed identity credential (user assigned: {})",
            client_id.is_some()
        );

        let credential: Arc<dyn TokenCredential> =
            ManagedIdentityCredential::new(Some(options)).map_err(construction_failed)?;
        Ok(credential)
    }

    fn client_secret(
        &self,
        tenant_id: &str,
        client_id: &str,
        client_secret: &SecureString,
    ) -> Result<Arc<dyn TokenCredential>, CredentialError> {
        let credential: Arc<dyn TokenCredential> = ClientSecretCredential::new(
            tenant_id,
            client_id.to_string(),
            Secret::new(client_secret.as_str().to_string()),
            None,
        )
        .map_err(construction_failed)?;
        Ok(credential)
    }

    fn client_certificate(
        &self,
        tenant_id: &str,
        client_id: &str,
        certificate: &ClientCertificate,
    ) -> Result<Arc<dyn TokenCredential>, CredentialError> {
        let credential: Arc<dyn TokenCredential> = ClientCertificateCredential::new(
            tenant_id.to_string(),
            client_id.to_string(),
            certificate.to_secret(),
            Some(ClientCertificateCredentialOptions {
                password: Some(certificate.password_secret()),
                ..Default::default()
            }),
        )
        .map_err(construction_failed)?;
        Ok(credential)
    }

    fn chained(
        &self,
        sources: Vec<Arc<dyn TokenCredential>>,
    ) -> Result<Arc<dyn TokenCredential>, CredentialError> {
        Ok(Arc::new(ChainedTokenCredential::new(sources)?))
    }
}
