//! Configuration loading and management.
//!
//! Loads configuration from embedded config.toml with environment variable
//! overrides. Settings can also be given with their flat ASP.NET-style names
//! (`AzureAd:TenantId`, or `AzureAd__TenantId` as an environment variable).

use std::env;
use std::str::FromStr;

use serde::Deserialize;
use url::Url;

use crate::auth::GRAPH_DEFAULT_SCOPE;
use crate::error::ConfigError;
use crate::graph::CredentialStrategy;
use crate::secure::SecureString;

/// Embedded configuration file content.
pub(crate) const CONFIG_TOML: &str = include_str!("../config.toml");

pub const TENANT_ID_KEY: &str = "AzureAd:TenantId";
pub const CLIENT_ID_KEY: &str = "AzureAd:ClientId";
pub const CLIENT_SECRET_KEY: &str = "AzureAd:ClientSecret";
pub const MANAGED_IDENTITY_CLIENT_ID_KEY: &str = "AzureAd:ManagedIdentityClientId";
pub const CERTIFICATE_NAME_KEY: &str = "AzureAd:ClientCertificates:0:KeyVaultCertificateName";
pub const KEY_VAULT_URL_KEY: &str = "CallApi:ClientCertificates:0:KeyVaultUrl";
pub const CREDENTIAL_KEY: &str = "Graph:Credential";
pub const GRAPH_BASE_URL_KEY: &str = "Graph:BaseUrl";
pub const GRAPH_SCOPES_KEY: &str = "Graph:Scopes";

/// Conventional environment variable names and the setting each one sets.
const ENV_ALIASES: &[(&str, &str)] = &[
    ("AZURE_TENANT_ID", TENANT_ID_KEY),
    ("AZURE_CLIENT_ID", CLIENT_ID_KEY),
    ("AZURE_CLIENT_SECRET", CLIENT_SECRET_KEY),
    ("AZURE_MANAGED_IDENTITY_CLIENT_ID", MANAGED_IDENTITY_CLIENT_ID_KEY),
    ("AZURE_KEYVAULT_CERTIFICATE_NAME", CERTIFICATE_NAME_KEY),
    ("AZURE_KEYVAULT_URL", KEY_VAULT_URL_KEY),
    ("GRAPH_CREDENTIAL", CREDENTIAL_KEY),
];

/// Deployment environment, injected by the host rather than read ambiently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HostEnvironment {
    #[default]
    Production,
    Development,
}

impl HostEnvironment {
    /// Read `APP_ENVIRONMENT`, then `ASPNETCORE_ENVIRONMENT`; production when unset.
    pub fn from_env() -> Self {
        env::var("APP_ENVIRONMENT")
            .or_else(|_| env::var("ASPNETCORE_ENVIRONMENT"))
            .map(|value| Self::parse(&value))
            .unwrap_or_default()
    }

    /// Anything other than a development name is treated as production.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" | "local" => Self::Development,
            _ => Self::Production,
        }
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

/// Which credential family to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialMode {
    /// Managed identity in production, with a client-secret fallback in development.
    #[default]
    Environment,
    ClientSecret,
    ClientCertificate,
}

impl FromStr for CredentialMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "environment" | "managed_identity" => Ok(Self::Environment),
            "client_secret" => Ok(Self::ClientSecret),
            "client_certificate" | "certificate" => Ok(Self::ClientCertificate),
            other => Err(ConfigError::Invalid {
                key: CREDENTIAL_KEY,
                reason: format!("unknown credential mode '{}'", other),
            }),
        }
    }
}

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub azure_ad: AzureAdConfig,
    #[serde(default)]
    pub call_api: CallApiConfig,
    pub graph: GraphConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AzureAdConfig {
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<SecureString>,
    #[serde(default)]
    pub managed_identity_client_id: Option<String>,
    #[serde(default)]
    pub key_vault_certificate_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallApiConfig {
    #[serde(default)]
    pub key_vault_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphConfig {
    #[serde(default)]
    pub credential: CredentialMode,
    pub base_url: String,
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

fn default_scopes() -> Vec<String> {
    vec![GRAPH_DEFAULT_SCOPE.to_string()]
}

/// Where the certificate for the certificate strategy lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateLocation {
    pub vault_url: Url,
    pub name: String,
}

/// Configuration values a credential strategy needs, all present.
#[derive(Debug, Clone)]
pub struct ResolvedCredentials {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: Option<SecureString>,
    pub managed_identity_client_id: Option<String>,
    pub certificate: Option<CertificateLocation>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl Config {
    /// Load configuration from embedded config.toml with environment variable overrides.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(CONFIG_TOML, env::vars())
    }

    /// Parse `toml` and apply overrides from `vars`.
    ///
    /// Flat keys (`AzureAd:TenantId`, `AzureAd__TenantId`) are applied first,
    /// then the conventional `AZURE_*` variables, so the latter win.
    pub fn load_from<I, K, V>(toml: &str, vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config: Config = toml::from_str(toml)?;

        let vars: Vec<(K, V)> = vars.into_iter().collect();
        for (key, value) in &vars {
            let key = key.as_ref();
            if key.contains(':') || key.contains("__") {
                config.apply_setting(key, value.as_ref())?;
            }
        }
        for (key, value) in &vars {
            let key = key.as_ref();
            if let Some((_, setting)) = ENV_ALIASES.iter().find(|(alias, _)| *alias == key) {
                config.apply_setting(setting, value.as_ref())?;
            } else if key == "RUST_LOG" {
                config.logging.level = value.as_ref().to_string();
            }
        }

        Ok(config)
    }

    /// Set a value by its flat name. Names are case-insensitive and `__`
    /// may stand in for `:`. Returns false for names this application does
    /// not use.
    pub fn apply_setting(&mut self, key: &str, value: &str) -> Result<bool, ConfigError> {
        let key = key.replace("__", ":");
        let is = |name: &str| key.eq_ignore_ascii_case(name);
        let value = value.trim();

        if is(TENANT_ID_KEY) {
            self.azure_ad.tenant_id = Some(value.to_string());
        } else if is(CLIENT_ID_KEY) {
            self.azure_ad.client_id = Some(value.to_string());
        } else if is(CLIENT_SECRET_KEY) {
            self.azure_ad.client_secret = Some(value.into());
        } else if is(MANAGED_IDENTITY_CLIENT_ID_KEY) {
            self.azure_ad.managed_identity_client_id = Some(value.to_string());
        } else if is(CERTIFICATE_NAME_KEY) {
            self.azure_ad.key_vault_certificate_name = Some(value.to_string());
        } else if is(KEY_VAULT_URL_KEY) {
            self.call_api.key_vault_url = Some(value.to_string());
        } else if is(CREDENTIAL_KEY) {
            self.graph.credential = value.parse()?;
        } else if is(GRAPH_BASE_URL_KEY) {
            self.graph.base_url = value.to_string();
        } else if is(GRAPH_SCOPES_KEY) {
            self.graph.scopes = value
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        } else {
            return Ok(false);
        }
        Ok(true)
    }

    /// Validate everything the selected strategy needs, reporting all
    /// missing keys together.
    pub fn validate(&self, environment: HostEnvironment) -> Result<(), ConfigError> {
        let strategy = CredentialStrategy::select(self.graph.credential, environment);
        self.resolve(strategy)?;
        self.graph_base_url()?;
        if self.graph.scopes.is_empty() {
            return Err(ConfigError::Missing {
                keys: vec![GRAPH_SCOPES_KEY],
            });
        }
        Ok(())
    }

    /// Collect the values `strategy` needs, failing with every missing key at once.
    pub fn resolve(&self, strategy: CredentialStrategy) -> Result<ResolvedCredentials, ConfigError> {
        let mut missing = Vec::new();

        let tenant_id = non_empty(&self.azure_ad.tenant_id);
        if tenant_id.is_none() {
            missing.push(TENANT_ID_KEY);
        }
        let client_id = non_empty(&self.azure_ad.client_id);
        if client_id.is_none() {
            missing.push(CLIENT_ID_KEY);
        }

        let client_secret = self
            .azure_ad
            .client_secret
            .as_ref()
            .filter(|s| !s.is_empty());
        if strategy.requires_client_secret() && client_secret.is_none() {
            missing.push(CLIENT_SECRET_KEY);
        }

        let certificate_name = non_empty(&self.azure_ad.key_vault_certificate_name);
        let vault_url = non_empty(&self.call_api.key_vault_url);
        if strategy.requires_certificate() {
            if certificate_name.is_none() {
                missing.push(CERTIFICATE_NAME_KEY);
            }
            if vault_url.is_none() {
                missing.push(KEY_VAULT_URL_KEY);
            }
        }

        let (Some(tenant_id), Some(client_id), true) = (tenant_id, client_id, missing.is_empty())
        else {
            return Err(ConfigError::Missing { keys: missing });
        };

        let certificate = match (strategy.requires_certificate(), certificate_name, vault_url) {
            (true, Some(name), Some(url)) => Some(CertificateLocation {
                vault_url: Url::parse(url).map_err(|e| ConfigError::Invalid {
                    key: KEY_VAULT_URL_KEY,
                    reason: e.to_string(),
                })?,
                name: name.to_string(),
            }),
            _ => None,
        };

        Ok(ResolvedCredentials {
            tenant_id: tenant_id.to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.cloned(),
            managed_identity_client_id: non_empty(&self.azure_ad.managed_identity_client_id)
                .map(str::to_string),
            certificate,
        })
    }

    /// The Graph API base URL, without a trailing slash.
    pub fn graph_base_url(&self) -> Result<String, ConfigError> {
        let url = Url::parse(&self.graph.base_url).map_err(|e| ConfigError::Invalid {
            key: GRAPH_BASE_URL_KEY,
            reason: e.to_string(),
        })?;
        Ok(url.as_str().trim_end_matches('/').to_string())
    }
}
