//! Microsoft Graph API client for listing directory users.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use azure_core::credentials::TokenCredential;
use serde::Deserialize;
use tracing::{debug, error};

use crate::error::{ApiError, AppError, CredentialError};

/// HTTP request timeout.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
/// HTTP connection timeout.
const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Build the HTTP client shared by Graph requests.
pub fn http_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .connect_timeout(HTTP_CONNECT_TIMEOUT)
        .redirect(reqwest::redirect::Policy::none())
        .build()
}

/// One page of the `/users` collection.
#[derive(Debug, Clone, Deserialize)]
pub struct UsersPage {
    pub value: Vec<User>,
    #[serde(rename = "@odata.nextLink")]
    pub next_link: Option<String>,
}

/// A directory user as returned by `/users`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(dead_code)]
pub struct User {
    pub id: String,
    pub display_name: Option<String>,
    pub user_principal_name: Option<String>,
    pub mail: Option<String>,
}

/// An authenticated connection to the directory API.
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    /// Fetch the first page of directory users.
    async fn list_users(&self) -> Result<UsersPage, AppError>;
}

/// Creates directory clients from a credential and the scopes to request.
pub trait DirectoryClientFactory: Send + Sync {
    type Client: DirectoryClient;

    fn create(
        &self,
        credential: Arc<dyn TokenCredential>,
        scopes: &[String],
    ) -> Result<Self::Client, AppError>;
}

/// Microsoft Graph API client.
pub struct GraphClient {
    http_client: reqwest::Client,
    credential: Arc<dyn TokenCredential>,
    scopes: Vec<String>,
    base_url: String,
}

impl GraphClient {
    /// Create a new Graph client.
    pub fn new(
        http_client: reqwest::Client,
        credential: Arc<dyn TokenCredential>,
        scopes: Vec<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            credential,
            scopes,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl DirectoryClient for GraphClient {
    async fn list_users(&self) -> Result<UsersPage, AppError> {
        let scopes: Vec<&str> = self.scopes.iter().map(String::as_str).collect();
        let token = self
            .credential
            .get_token(&scopes, None)
            .await
            .map_err(CredentialError::from)?;
        let url = format!("{}/users", self.base_url);
        debug!("Listing users from {}", url);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(token.token.secret())
            .send()
            .await?;

        match response.status().as_u16() {
            200 => {
                let page: UsersPage = response
                    .json()
                    .await
                    .map_err(|e| ApiError::ParseFailed(e.to_string()))?;
                Ok(page)
            }
            401 => Err(ApiError::Unauthorized.into()),
            403 => Err(ApiError::Forbidden.into()),
            429 => Err(ApiError::RateLimited.into()),
            // Don't expose raw API error details - just log them
            status => {
                let body = response.text().await.unwrap_or_default();
                error!("Failed to list users: HTTP {} - {}", status, body);
                Err(ApiError::GraphRequestFailed(format!("HTTP {}", status)).into())
            }
        }
    }
}

/// Builds [`GraphClient`]s that share one HTTP connection pool.
pub struct GraphClientFactory {
    http_client: reqwest::Client,
    base_url: String,
}

impl GraphClientFactory {
    pub fn new(http_client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http_client,
            base_url: base_url.into(),
        }
    }
}

impl DirectoryClientFactory for GraphClientFactory {
    type Client = GraphClient;

    fn create(
        &self,
        credential: Arc<dyn TokenCredential>,
        scopes: &[String],
    ) -> Result<GraphClient, AppError> {
        if scopes.is_empty() {
            return Err(ApiError::GraphRequestFailed("no scopes configured".to_string()).into());
        }
        Ok(GraphClient::new(
            self.http_client.clone(),
            credential,
            scopes.to_vec(),
            self.base_url.trim_end_matches('/'),
        ))
    }
}
