//! Error types for the graph-credentials application.
//!
//! Uses `thiserror` for library-style errors with automatic `Display` and `Error` implementations.

use thiserror::Error;

/// Top-level application error type.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Key Vault error: {0}")]
    Secret(#[from] SecretError),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Configuration loading and validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required configuration: {}", .keys.join(", "))]
    Missing { keys: Vec<&'static str> },

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Credential construction and token acquisition errors.
#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("Credential construction failed: {0}")]
    ConstructionFailed(String),

    #[error("Token request failed: {0}")]
    TokenRequestFailed(String),

    #[error("All chained credentials failed: {}", .0.join("; "))]
    ChainExhausted(Vec<String>),
}

/// Microsoft Graph API errors.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Graph API request failed: {0}")]
    GraphRequestFailed(String),

    #[error("Failed to parse API response: {0}")]
    ParseFailed(String),

    #[error("Unauthorized (401): Token may be expired")]
    Unauthorized,

    #[error("Forbidden (403): Insufficient permissions")]
    Forbidden,

    #[error("Rate limited (429): Too many requests")]
    RateLimited,
}

/// Key Vault secret store errors.
#[derive(Error, Debug)]
pub enum SecretError {
    #[error("Secret not found: {0}")]
    NotFound(String),

    #[error("Key Vault request failed: {0}")]
    RequestFailed(String),

    #[error("Unauthorized (401)")]
    Unauthorized,

    #[error("Forbidden (403): Missing secret get permission")]
    Forbidden,

    #[error("Secret value is not valid base64: {0}")]
    InvalidEncoding(#[from] base64::DecodeError),

    #[error("Unsupported certificate format: {0}")]
    UnsupportedFormat(String),
}

impl From<azure_core::Error> for CredentialError {
    /// Token failures from `azure_core`, keeping a chain's per-source failures.
    fn from(e: azure_core::Error) -> Self {
        match std::error::Error::source(&e).and_then(|s| s.downcast_ref::<CredentialError>()) {
            Some(CredentialError::ChainExhausted(failures)) => {
                CredentialError::ChainExhausted(failures.clone())
            }
            _ => CredentialError::TokenRequestFailed(e.to_string()),
        }
    }
}

impl AppError {
    /// Returns a user-friendly message for display in place of the user count.
    pub fn user_message(&self) -> &str {
        match self {
            Self::Config(ConfigError::Missing { .. }) => {
                "Azure AD settings are incomplete. Check the configuration."
            }
            Self::Config(_) => "Configuration error. Please check settings.",
            Self::Credential(CredentialError::ConstructionFailed(_)) => {
                "The configured credentials were rejected."
            }
            Self::Credential(CredentialError::ChainExhausted(_)) => {
                "No usable identity is available in this environment."
            }
            Self::Credential(_) => "Failed to acquire an access token.",
            Self::Api(ApiError::Unauthorized) => "Graph rejected the access token.",
            Self::Api(ApiError::Forbidden) => {
                "The application lacks permission to read users."
            }
            Self::Api(ApiError::RateLimited) => "Too many requests. Please wait a moment.",
            Self::Secret(SecretError::NotFound(_)) => "Certificate not found in Key Vault.",
            Self::Secret(SecretError::UnsupportedFormat(_)) => {
                "The Key Vault certificate must be a PKCS#12 archive."
            }
            Self::Secret(_) => "Failed to read the certificate from Key Vault.",
            Self::Network(_) => "Network error. Check your connection.",
            _ => "An error occurred. Please try again.",
        }
    }

    /// Returns true if this error is a missing required configuration key.
    pub fn is_configuration_missing(&self) -> bool {
        matches!(self, Self::Config(ConfigError::Missing { .. }))
    }
}
