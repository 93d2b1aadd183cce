//! Azure Key Vault secret access, used to fetch the client certificate.

use std::sync::Arc;

use async_trait::async_trait;
use azure_core::credentials::TokenCredential;
use azure_core::http::StatusCode;
use azure_security_keyvault_secrets::SecretClient;
use base64::{engine::general_purpose::STANDARD, Engine};
use tracing::{debug, error, info};
use url::Url;

use crate::auth::ClientCertificate;
use crate::error::{AppError, SecretError};
use crate::secure::SecureString;

/// Reads named secrets from a vault.
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get_secret(&self, vault_url: &Url, name: &str) -> Result<SecureString, AppError>;
}

/// [`SecretStore`] backed by the Key Vault `SecretClient`.
pub struct KeyVaultSecretClient {
    credential: Arc<dyn TokenCredential>,
}

impl KeyVaultSecretClient {
    pub fn new(credential: Arc<dyn TokenCredential>) -> Self {
        Self { credential }
    }
}

/// Key Vault secret names are 1-127 alphanumerics and dashes.
fn validate_secret_name(name: &str) -> Result<(), SecretError> {
    if name.is_empty()
        || name.len() > 127
        || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    {
        return Err(SecretError::RequestFailed(format!(
            "invalid secret name '{}'",
            name
        )));
    }
    Ok(())
}

/// Map a failed Key Vault call by its HTTP status.
fn secret_error(name: &str, status: Option<StatusCode>, message: String) -> SecretError {
    match status {
        Some(StatusCode::NotFound) => SecretError::NotFound(name.to_string()),
        Some(StatusCode::Unauthorized) => SecretError::Unauthorized,
        Some(StatusCode::Forbidden) => SecretError::Forbidden,
        _ => SecretError::RequestFailed(message),
    }
}

#[async_trait]
impl SecretStore for KeyVaultSecretClient {
    async fn get_secret(&self, vault_url: &Url, name: &str) -> Result<SecureString, AppError> {
        validate_secret_name(name)?;

        let client = SecretClient::new(vault_url.as_str(), self.credential.clone(), None)
            .map_err(|e| SecretError::RequestFailed(e.to_string()))?;

        debug!("Fetching secret {} from {}", name, vault_url);
        let response = client.get_secret(name, None).await.map_err(|e| {
            error!("Failed to read secret {}: {}", name, e);
            secret_error(name, e.http_status(), e.to_string())
        })?;
        let secret = response
            .into_model()
            .map_err(|e| SecretError::RequestFailed(e.to_string()))?;

        secret
            .value
            .map(SecureString::from)
            .ok_or_else(|| SecretError::NotFound(name.to_string()).into())
    }
}

/// Fetch certificate `name` from the vault and decode it for the certificate credential.
///
/// The secret value is the base64 PKCS#12 export; it is decoded byte for
/// byte and paired with an empty password.
pub async fn load_certificate(
    store: &dyn SecretStore,
    vault_url: &Url,
    name: &str,
) -> Result<ClientCertificate, AppError> {
    let secret = store.get_secret(vault_url, name).await?;
    let value = secret.as_str().trim();

    if value.starts_with("-----BEGIN") {
        return Err(SecretError::UnsupportedFormat(format!(
            "certificate {} is PEM; export it as PKCS#12",
            name
        ))
        .into());
    }
    let bytes = STANDARD.decode(value).map_err(SecretError::from)?;

    info!("Loaded certificate {} ({} bytes)", name, bytes.len());
    Ok(ClientCertificate::new(bytes, SecureString::default()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{StaticCredential, StubSecretStore};

    fn vault() -> Url {
        Url::parse("https://contoso.vault.azure.net").unwrap()
    }

    #[test]
    fn test_validate_secret_name() {
        assert!(validate_secret_name("graph-cert").is_ok());
        assert!(validate_secret_name("../keys/x").is_err());
        assert!(validate_secret_name("").is_err());
        assert!(validate_secret_name(&"a".repeat(128)).is_err());
    }

    #[test]
    fn test_secret_error_status_mapping() {
        let err = secret_error("missing", Some(StatusCode::NotFound), String::new());
        assert!(matches!(err, SecretError::NotFound(ref n) if n == "missing"));

        assert!(matches!(
            secret_error("locked", Some(StatusCode::Forbidden), String::new()),
            SecretError::Forbidden
        ));
        assert!(matches!(
            secret_error("locked", Some(StatusCode::Unauthorized), String::new()),
            SecretError::Unauthorized
        ));
        assert!(matches!(
            secret_error("graph-cert", None, "connection refused".to_string()),
            SecretError::RequestFailed(ref m) if m == "connection refused"
        ));
    }

    #[tokio::test]
    async fn test_invalid_name_fails_before_any_token_request() {
        let credential = StaticCredential::token("ManagedIdentityCredential", "vault-token");
        let client = KeyVaultSecretClient::new(credential.clone());

        let err = client.get_secret(&vault(), "../keys/x").await.unwrap_err();

        assert!(matches!(err, AppError::Secret(SecretError::RequestFailed(_))));
        assert_eq!(credential.calls(), 0);
    }

    #[tokio::test]
    async fn test_load_certificate_decodes_base64() {
        let payload = vec![0x30, 0x82, 0x01, 0x00, 0xff];
        let store = StubSecretStore::new(&format!("  {}\n", STANDARD.encode(&payload)));

        let certificate = load_certificate(store.as_ref(), &vault(), "graph-cert")
            .await
            .unwrap();

        assert_eq!(certificate.bytes(), payload.as_slice());
        assert!(certificate.password().as_str().is_empty());
        assert_eq!(
            store.requests(),
            vec!["https://contoso.vault.azure.net/ graph-cert"]
        );
    }

    #[tokio::test]
    async fn test_load_certificate_rejects_pem() {
        let pem = "-----BEGIN CERTIFICATE-----\nMIIB\n-----END CERTIFICATE-----";
        let store = StubSecretStore::new(pem);

        let err = load_certificate(store.as_ref(), &vault(), "graph-cert")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Secret(SecretError::UnsupportedFormat(_))));
    }

    #[tokio::test]
    async fn test_load_certificate_rejects_invalid_base64() {
        let store = StubSecretStore::new("not base64!");

        let err = load_certificate(store.as_ref(), &vault(), "graph-cert")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Secret(SecretError::InvalidEncoding(_))));
    }
}
