//! Azure AD authentication module.
//!
//! Token credentials come from `azure_identity`. This module adds the
//! certificate material type, an ordered credential chain, and the provider
//! seam used to construct them.

pub mod certificate;
pub mod chained;
pub mod provider;

pub use azure_core::credentials::TokenCredential;
pub use certificate::ClientCertificate;
pub use provider::{AzureCredentialProvider, CredentialProvider};

/// Default scope of the Microsoft Graph API.
pub const GRAPH_DEFAULT_SCOPE: &str = "https://graph.microsoft.com/.default";
