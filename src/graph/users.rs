//! Directory user queries.

use std::sync::Arc;

use tracing::debug;

use super::client::{DirectoryClient, DirectoryClientFactory, GraphClientFactory};
use super::service::GraphService;
use crate::error::AppError;

/// Counts directory users through the shared Graph client.
pub struct UserDirectory<F: DirectoryClientFactory = GraphClientFactory> {
    service: Arc<GraphService<F>>,
}

impl<F: DirectoryClientFactory> UserDirectory<F> {
    pub fn new(service: Arc<GraphService<F>>) -> Self {
        Self { service }
    }

    /// Number of users on the first page of `/users`.
    ///
    /// Later pages are not followed, so large tenants report the page size.
    pub async fn get_users_count(&self) -> Result<usize, AppError> {
        let client = self.service.get_client().await?;
        let page = client.list_users().await?;

        if page.next_link.is_some() {
            debug!("More users are available; counting the first page only");
        }
        Ok(page.value.len())
    }
}
