//! Chained credential: try several sources in order.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use azure_core::credentials::{AccessToken, TokenCredential, TokenRequestOptions};
use azure_core::error::ErrorKind;
use tracing::debug;

use crate::error::CredentialError;

/// Tries each source in order until one returns a token.
///
/// Every failure moves the chain on. When all sources fail, the error wraps
/// a [`CredentialError::ChainExhausted`] listing each source's failure.
pub struct ChainedTokenCredential {
    sources: Vec<Arc<dyn TokenCredential>>,
}

impl ChainedTokenCredential {
    pub fn new(sources: Vec<Arc<dyn TokenCredential>>) -> Result<Self, CredentialError> {
        if sources.is_empty() {
            return Err(CredentialError::ConstructionFailed(
                "a chained credential needs at least one source".to_string(),
            ));
        }
        Ok(Self { sources })
    }
}

impl fmt::Debug for ChainedTokenCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainedTokenCredential")
            .field("sources", &self.sources.len())
            .finish()
    }
}

#[async_trait]
impl TokenCredential for ChainedTokenCredential {
    async fn get_token(
        &self,
        scopes: &[&str],
        options: Option<TokenRequestOptions<'_>>,
    ) -> azure_core::Result<AccessToken> {
        let mut failures = Vec::new();

        for (index, source) in self.sources.iter().enumerate() {
            match source.get_token(scopes, options.clone()).await {
                Ok(token) => {
                    debug!("Credential source {} acquired a token", index + 1);
                    return Ok(token);
                }
                Err(e) => {
                    debug!("Credential source {} failed: {}", index + 1, e);
                    failures.push(format!("source {}: {}", index + 1, e));
                }
            }
        }

        Err(azure_core::Error::new(
            ErrorKind::Credential,
            CredentialError::ChainExhausted(failures),
        ))
    }
}
