//! Client certificate material for the certificate credential.
//!
//! The bytes are a PKCS#12 archive holding the certificate and its private
//! key, as Key Vault exports certificate-backed secrets.

use azure_core::credentials::Secret;
use base64::{engine::general_purpose::STANDARD, Engine};

use crate::secure::{SecureBytes, SecureString};

/// A PKCS#12 archive and the password protecting it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientCertificate {
    bytes: SecureBytes,
    password: SecureString,
}

impl ClientCertificate {
    pub fn new(bytes: Vec<u8>, password: SecureString) -> Self {
        Self {
            bytes: SecureBytes::new(bytes),
            password,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        self.bytes.as_slice()
    }

    pub fn password(&self) -> &SecureString {
        &self.password
    }

    /// The archive re-encoded as base64, the form `ClientCertificateCredential` takes.
    pub(crate) fn to_secret(&self) -> Secret {
        Secret::new(STANDARD.encode(self.bytes()))
    }

    pub(crate) fn password_secret(&self) -> Secret {
        Secret::new(self.password.as_str().to_string())
    }
}
