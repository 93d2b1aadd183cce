//! Graph Credentials
//!
//! Picks an Azure AD credential for the host environment, builds one shared
//! Microsoft Graph client and reports the number of directory users.

#![deny(clippy::all)]

mod auth;
mod config;
mod error;
mod graph;
mod keyvault;
mod secure;
#[cfg(test)]
mod test_support;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use auth::{AzureCredentialProvider, CredentialProvider, TokenCredential};
use config::{Config, HostEnvironment};
use error::AppError;
use graph::client::http_client;
use graph::{CredentialStrategy, GraphClientFactory, GraphService, UserDirectory};
use keyvault::KeyVaultSecretClient;

fn main() {
    // Load .env file (if present) before anything else
    if let Err(e) = dotenvy::dotenv() {
        // .env file is optional - only log if it's not a "file not found" error
        if !e.to_string().contains("not found") {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    let environment = HostEnvironment::from_env();

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config.logging.level);

    info!(
        "Starting {} v{} ({:?})",
        config.app.name,
        env!("CARGO_PKG_VERSION"),
        environment
    );

    // Report every missing setting up front instead of on first use
    if let Err(e) = config.validate(environment).map_err(AppError::from) {
        error!("Invalid configuration: {}", e);
        eprintln!("{}", e);
        if e.is_configuration_missing() {
            eprintln!("\nSettings can be provided as environment variables, e.g.:");
            eprintln!("  AZURE_TENANT_ID=<your-tenant-id>");
            eprintln!("  AZURE_CLIENT_ID=<your-azure-ad-client-id>");
            if environment.is_development() {
                eprintln!("  AZURE_CLIENT_SECRET=<your-client-secret>");
            }
        }
        std::process::exit(1);
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to create Tokio runtime: {}", e);
            std::process::exit(1);
        }
    };

    match runtime.block_on(run(config, environment)) {
        Ok(count) => println!("Users: {}", count),
        Err(e) => {
            error!("{:#}", e);
            let message = e
                .downcast_ref::<AppError>()
                .map(AppError::user_message)
                .unwrap_or("An error occurred. Please try again.");
            eprintln!("Users: {}", message);
            std::process::exit(1);
        }
    }
}

/// Initialize tracing/logging.
fn init_logging(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_thread_ids(false)
        .init();
}

/// Wire the production adapters together and count users.
async fn run(config: Config, environment: HostEnvironment) -> Result<usize> {
    let credentials = Arc::new(AzureCredentialProvider::new());
    let http = http_client().context("Failed to create HTTP client")?;
    let factory = GraphClientFactory::new(http, config.graph_base_url()?);

    let strategy = CredentialStrategy::select(config.graph.credential, environment);
    let vault_credential = if strategy.requires_certificate() {
        Some(key_vault_credential(&config, credentials.as_ref())?)
    } else {
        None
    };

    let mut service = GraphService::new(config, environment, credentials, factory);
    if let Some(credential) = vault_credential {
        service = service.with_secret_store(Arc::new(KeyVaultSecretClient::new(credential)));
    }

    let directory = UserDirectory::new(Arc::new(service));
    let count = directory.get_users_count().await?;

    info!("Counted {} users", count);
    Ok(count)
}

/// Credential for reading the certificate from Key Vault: managed identity,
/// then the client secret when one is configured.
fn key_vault_credential(
    config: &Config,
    provider: &dyn CredentialProvider,
) -> Result<Arc<dyn TokenCredential>, AppError> {
    let resolved = config.resolve(CredentialStrategy::ClientCertificate)?;

    let mut sources = vec![provider.managed_identity(resolved.managed_identity_client_id.as_deref())?];
    if let Some(secret) = &resolved.client_secret {
        sources.push(provider.client_secret(
            &resolved.tenant_id,
            &resolved.client_id,
            secret,
        )?);
    }

    Ok(provider.chained(sources)?)
}
