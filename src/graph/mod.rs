//! Microsoft Graph access: strategy selection, the cached client and user queries.

pub mod client;
pub mod service;
pub mod users;

pub use client::{DirectoryClient, DirectoryClientFactory, GraphClientFactory, User, UsersPage};
pub use service::{CredentialStrategy, GraphService};
pub use users::UserDirectory;
