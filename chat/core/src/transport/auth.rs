//! Bearer Credentials
//!
//! Token acquisition lives outside this crate. The transport asks a
//! [`CredentialProvider`] for a bearer token right before each request, so
//! a provider backed by a refreshing identity client sees every send.

use std::fmt;

use async_trait::async_trait;

use super::traits::TransportError;

/// Source of the bearer credential placed in the `Authorization` header
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Current bearer token, or `None` to send the request unauthenticated
    async fn bearer_token(&self) -> Result<Option<String>, TransportError>;
}

/// A fixed token supplied by the caller (or no token at all)
#[derive(Clone, Default)]
pub struct StaticCredentials {
    token: Option<String>,
}

impl StaticCredentials {
    /// Use the given token for every request
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    /// Send requests without an `Authorization` header
    #[must_use]
    pub fn none() -> Self {
        Self { token: None }
    }

    /// Build from an optional token, treating blank strings as absent
    #[must_use]
    pub fn from_option(token: Option<String>) -> Self {
        Self {
            token: token.filter(|t| !t.trim().is_empty()),
        }
    }
}

impl fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Don't expose the actual token in debug output
        match self.token {
            Some(_) => write!(f, "StaticCredentials([REDACTED])"),
            None => write!(f, "StaticCredentials(None)"),
        }
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentials {
    async fn bearer_token(&self) -> Result<Option<String>, TransportError> {
        Ok(self.token.clone())
    }
}
