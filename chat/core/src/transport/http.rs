//! HTTP Transport
//!
//! `POST`s a [`ChatRequest`] as JSON and hands back the response body as a
//! byte stream. Timeouts are enforced by the HTTP client; the caller adds
//! no timer of its own.

use std::sync::Arc;

use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Url};
use tracing::debug;

use super::auth::{CredentialProvider, StaticCredentials};
use super::traits::{ByteStream, ChatRequest, ChatTransport, TransportError};
use crate::config::ChatConfig;

/// Media type of the streamed response
pub const EVENT_STREAM: &str = "text/event-stream";

/// Chat transport over HTTP
pub struct HttpTransport {
    client: Client,
    endpoint: Url,
    health_url: Url,
    credentials: Arc<dyn CredentialProvider>,
}

impl HttpTransport {
    /// Create a transport from configuration, using its static token
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Network` if the endpoint is not a valid URL
    /// or the HTTP client cannot be built.
    pub fn new(config: &ChatConfig) -> Result<Self, TransportError> {
        let credentials = StaticCredentials::from_option(config.auth_token.clone());
        Self::with_credentials(config, Arc::new(credentials))
    }

    /// Create a transport that asks `credentials` for a token on every send
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Network` if the endpoint is not a valid URL
    /// or the HTTP client cannot be built.
    pub fn with_credentials(
        config: &ChatConfig,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self, TransportError> {
        let endpoint = Url::parse(config.endpoint.trim()).map_err(|e| {
            TransportError::Network(format!("invalid endpoint {}: {e}", config.endpoint))
        })?;
        let health_url = health_url(&endpoint, &config.health_path)?;

        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;

        Ok(Self {
            client,
            endpoint,
            health_url,
            credentials,
        })
    }

    /// The chat endpoint
    #[must_use]
    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    /// The resolved health check URL
    #[must_use]
    pub fn health_url(&self) -> &str {
        self.health_url.as_str()
    }
}

/// Resolve `path` against the origin of `endpoint`
fn health_url(endpoint: &Url, path: &str) -> Result<Url, TransportError> {
    let absolute = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };
    endpoint
        .join(&absolute)
        .map_err(|e| TransportError::Network(format!("invalid health path {path}: {e}")))
}

fn network_error(e: &reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Network("request timed out".to_string())
    } else {
        TransportError::Network(e.to_string())
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    fn name(&self) -> &str {
        "http"
    }

    async fn open(&self, request: &ChatRequest) -> Result<ByteStream, TransportError> {
        let body =
            serde_json::to_vec(request).map_err(|e| TransportError::Serialization(e.to_string()))?;

        let mut builder = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, EVENT_STREAM)
            .body(body);

        if let Some(token) = self.credentials.bearer_token().await? {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(|e| network_error(&e))?;

        let status = response.status().as_u16();
        if let Some(err) = TransportError::from_status(status) {
            debug!(status, endpoint = %self.endpoint, "Chat request rejected");
            return Err(err);
        }

        let stream = response.bytes_stream().map_err(|e| network_error(&e));
        Ok(Box::pin(stream))
    }

    async fn health_check(&self) -> bool {
        match self.client.get(self.health_url.clone()).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(url = %self.health_url, error = %e, "Health check failed");
                false
            }
        }
    }
}
