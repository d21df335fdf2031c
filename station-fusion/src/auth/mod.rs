//! OAuth2 client-credentials token handling.
//!
//! The upstream API expects a bearer token obtained from a separate
//! authorization endpoint. Tokens live for about an hour, so they are
//! cached in memory and persisted to disk to be reused across runs.

mod error;
#[cfg(test)]
pub(crate) mod mock;
mod source;
mod store;

pub use error::AuthError;
pub use source::{ClientCredentialsConfig, ClientCredentialsSource, DEFAULT_TOKEN_URL, TokenSource};
pub use store::{Credential, TokenStore};
